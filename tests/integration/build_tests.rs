//! End-to-end build tests against in-process renderers

use crate::common::{links, output_dir, read_tree, test_config, MockSite, Page};
use static_export::config::TrailingSlash;
use static_export::crawler::export_with;
use static_export::output::{BuildError, BuildWarning, CollisionKind, OutputOwner};
use static_export::{RoutePath, RouteState};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn route(raw: &str) -> RoutePath {
    RoutePath::parse(raw).unwrap()
}

#[tokio::test]
async fn test_home_about_contact_with_transient_failures() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/about", "/contact"])),
        ("/about", Page::Html("<h1>About</h1>".to_string())),
        (
            "/contact",
            Page::Flaky {
                failures: 2,
                html: "<h1>Contact</h1>".to_string(),
            },
        ),
    ]));

    let outcome = export_with(test_config(&dir, &["/"]), site.clone())
        .await
        .unwrap();

    assert!(outcome.success, "errors: {:?}", outcome.errors);
    assert!(outcome.errors.is_empty());
    assert_eq!(site.calls("/contact"), 3);

    let tree = read_tree(&output_dir(&dir));
    let paths: Vec<_> = tree.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec!["200.html", "about/index.html", "contact/index.html", "index.html"]
    );
    assert_eq!(tree["contact/index.html"], b"<h1>Contact</h1>");

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(
        outcome.warnings[0],
        BuildWarning::RetriedRender {
            route: route("/contact"),
            attempts: 3
        }
    );
}

#[tokio::test]
async fn test_cyclic_graph_visits_each_route_once() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/a", "/b", "/"])),
        ("/a", links(&["/b", "/", "/a"])),
        ("/b", links(&["/a", "/c", "/?page=2", "/#top"])),
        ("/c", links(&["/", "/a", "/b"])),
    ]));

    let mut config = test_config(&dir, &["/", "/a"]);
    config.export.concurrency = 3;
    let outcome = export_with(config, site.clone()).await.unwrap();

    assert!(outcome.success);
    let calls = site.all_calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.values().all(|count| *count == 1), "calls: {:?}", calls);

    let discovered: Vec<_> = outcome.routes.iter().map(|r| r.route.to_string()).collect();
    assert_eq!(discovered, vec!["/", "/a", "/b", "/c"]);
    assert!(outcome.routes.iter().all(|r| r.state == RouteState::Succeeded));
    assert_eq!(outcome.routes[3].parent, Some(route("/b")));
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let pages = || {
        vec![
            ("/", links(&["/docs/", "/feed.xml", "/blog/hello"])),
            ("/docs/", Page::Html("<p>docs</p>".to_string())),
            ("/feed.xml", Page::Html("<rss/>".to_string())),
            ("/blog/hello", Page::Html("<p>hello</p>".to_string())),
        ]
    };

    let mut config = test_config(&dir, &["/"]);
    config.export.concurrency = 4;

    let first = export_with(config.clone(), Arc::new(MockSite::new(pages())))
        .await
        .unwrap();
    let first_tree = read_tree(&output_dir(&dir));

    let second = export_with(config, Arc::new(MockSite::new(pages())))
        .await
        .unwrap();
    let second_tree = read_tree(&output_dir(&dir));

    assert!(first.success && second.success);
    assert_eq!(first_tree, second_tree);
    assert!(first_tree.contains_key("feed.xml"));
    assert_eq!(first.written_files, second.written_files);
}

#[tokio::test]
async fn test_merge_order_is_independent_of_completion_order() {
    let build = |concurrency: u32| async move {
        let dir = TempDir::new().unwrap();
        // Earlier routes finish last when run in parallel
        let site = MockSite::new(vec![
            ("/", links(&["/one", "/two", "/three"])),
            ("/one", links(&["/one/a"])),
            ("/two", links(&["/two/a"])),
            ("/three", Page::Broken),
            ("/one/a", Page::Html("1a".to_string())),
            ("/two/a", Page::Html("2a".to_string())),
        ])
        .with_route_delay("/one", Duration::from_millis(60))
        .with_route_delay("/two", Duration::from_millis(30));

        let mut config = test_config(&dir, &["/"]);
        config.export.concurrency = concurrency;
        export_with(config, Arc::new(site)).await.unwrap()
    };

    let serial = build(1).await;
    let parallel = build(8).await;

    let order = |outcome: &static_export::BuildOutcome| -> Vec<String> {
        outcome.routes.iter().map(|r| r.route.to_string()).collect()
    };
    assert_eq!(order(&serial), order(&parallel));
    assert_eq!(
        order(&parallel),
        vec!["/", "/one", "/two", "/three", "/one/a", "/two/a"]
    );

    let files = |outcome: &static_export::BuildOutcome| -> Vec<String> {
        outcome.written_files.iter().map(|f| f.path.clone()).collect()
    };
    assert_eq!(files(&serial), files(&parallel));
    assert_eq!(serial.warnings, parallel.warnings);
}

#[tokio::test]
async fn test_trailing_slash_collision_is_fatal() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/a", "/a/"])),
        ("/a", Page::Html("a".to_string())),
        ("/a/", Page::Html("a slash".to_string())),
    ]));

    let outcome = export_with(test_config(&dir, &["/"]), site).await.unwrap();

    assert!(!outcome.success);
    let collision = outcome
        .errors
        .iter()
        .find_map(|e| match e {
            BuildError::Collision(c) => Some(c),
            _ => None,
        })
        .expect("collision error");

    assert_eq!(collision.path, "a/index.html");
    assert_eq!(collision.kind, CollisionKind::SamePath);
    assert_eq!(collision.first, OutputOwner::Route(route("/a")));
    assert_eq!(collision.second, OutputOwner::Route(route("/a/")));
}

#[tokio::test]
async fn test_collision_stops_later_renders() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(
        MockSite::new(vec![
            ("/", links(&["/a", "/a/"])),
            ("/a", links(&["/deep"])),
            ("/a/", links(&["/deeper"])),
            ("/deep", Page::Html("deep".to_string())),
            ("/deeper", Page::Html("deeper".to_string())),
        ])
        .with_route_delay("/a", Duration::from_millis(100)),
    );

    let outcome = export_with(test_config(&dir, &["/"]), site.clone())
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome
        .errors
        .iter()
        .any(|e| matches!(e, BuildError::Collision(_))));

    // "/deep" was discovered before the collision was merged, "/deeper" by
    // the colliding route itself; neither may be rendered
    assert_eq!(site.calls("/deep"), 0);
    assert_eq!(site.calls("/deeper"), 0);
    assert!(outcome.routes.iter().all(|r| r.route != route("/deeper")));
    let deep = outcome
        .routes
        .iter()
        .find(|r| r.route == route("/deep"))
        .expect("discovered route");
    assert_eq!(deep.state, RouteState::Pending);
}

#[tokio::test]
async fn test_collision_before_crawl_renders_nothing() {
    let dir = TempDir::new().unwrap();
    let assets = dir.path().join("static");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("200.html"), "<p>not the shell</p>").unwrap();

    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/a", "/b"])),
        ("/a", Page::Html("a".to_string())),
        ("/b", Page::Html("b".to_string())),
    ]));

    let mut config = test_config(&dir, &["/"]);
    config.output.assets_dir = Some(assets.display().to_string());
    let outcome = export_with(config, site.clone()).await.unwrap();

    assert!(!outcome.success);
    let collision = outcome
        .errors
        .iter()
        .find_map(|e| match e {
            BuildError::Collision(c) => Some(c),
            _ => None,
        })
        .expect("collision error");
    assert_eq!(collision.path, "200.html");
    assert_eq!(collision.second, OutputOwner::Fallback);
    assert!(site.all_calls().is_empty());
}

#[tokio::test]
async fn test_links_to_resources_are_not_rendered() {
    let dir = TempDir::new().unwrap();
    let assets = dir.path().join("static");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("guide.pdf"), b"%PDF-1.7").unwrap();

    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/guide.pdf", "/logo.png", "/docs", "/feed.xml"])),
        ("/docs", Page::Html("<h1>Docs</h1>".to_string())),
        ("/feed.xml", Page::Html("<rss></rss>".to_string())),
    ]));

    let mut config = test_config(&dir, &["/"]);
    config.output.assets_dir = Some(assets.display().to_string());
    let outcome = export_with(config, site.clone()).await.unwrap();

    assert!(outcome.success, "errors: {:?}", outcome.errors);
    assert_eq!(site.calls("/guide.pdf"), 0);
    assert_eq!(site.calls("/logo.png"), 0);
    assert_eq!(site.calls("/feed.xml"), 1);

    let tree = read_tree(&output_dir(&dir));
    let paths: Vec<_> = tree.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec!["200.html", "docs/index.html", "feed.xml", "guide.pdf", "index.html"]
    );
    assert_eq!(tree["guide.pdf"], b"%PDF-1.7");
}

#[tokio::test]
async fn test_resource_entry_is_written_verbatim() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", Page::Html("<h1>Home</h1>".to_string())),
        ("/logo.png", Page::Html("PNG".to_string())),
    ]));

    let outcome = export_with(test_config(&dir, &["/", "/logo.png"]), site)
        .await
        .unwrap();

    assert!(outcome.success);
    let tree = read_tree(&output_dir(&dir));
    assert_eq!(tree["logo.png"], b"PNG");
    assert!(!tree.contains_key("logo.png/index.html"));
}

#[tokio::test]
async fn test_escape_spellings_are_one_route() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/caf%C3%A9", "/caf%c3%a9", "/%7Eu", "/~u"])),
        ("/caf%C3%A9", Page::Html("cafe".to_string())),
        ("/~u", Page::Html("home dir".to_string())),
    ]));

    let outcome = export_with(test_config(&dir, &["/"]), site.clone())
        .await
        .unwrap();

    assert!(outcome.success, "errors: {:?}", outcome.errors);
    assert_eq!(outcome.routes.len(), 3);
    assert_eq!(site.calls("/caf%C3%A9"), 1);
    assert_eq!(site.calls("/~u"), 1);

    let tree = read_tree(&output_dir(&dir));
    assert_eq!(tree["café/index.html"], b"cafe");
    assert_eq!(tree["~u/index.html"], b"home dir");
}

#[tokio::test]
async fn test_ignore_mode_keeps_a_and_a_slash_apart() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/a", "/a/"])),
        ("/a", Page::Html("a".to_string())),
        ("/a/", Page::Html("a slash".to_string())),
    ]));

    let mut config = test_config(&dir, &["/"]);
    config.export.trailing_slash = TrailingSlash::Ignore;
    let outcome = export_with(config, site).await.unwrap();

    assert!(outcome.success);
    let tree = read_tree(&output_dir(&dir));
    assert_eq!(tree["a.html"], b"a");
    assert_eq!(tree["a/index.html"], b"a slash");
}

#[tokio::test]
async fn test_fallback_written_with_zero_entries() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(Vec::new()));

    let mut config = test_config(&dir, &[]);
    config.export.fallback = "index.html".to_string();
    let outcome = export_with(config, site.clone()).await.unwrap();

    assert!(outcome.success);
    assert!(outcome.routes.is_empty());
    assert!(site.all_calls().is_empty());

    let tree = read_tree(&output_dir(&dir));
    assert_eq!(tree.len(), 1);
    let shell = String::from_utf8(tree["index.html"].clone()).unwrap();
    assert!(shell.contains("<script"));
    assert_eq!(outcome.written_files[0].owner, OutputOwner::Fallback);
}

#[tokio::test]
async fn test_concurrency_limit_is_never_exceeded() {
    let dir = TempDir::new().unwrap();
    let children: Vec<String> = (0..20).map(|i| format!("/item/{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

    let mut pages = vec![("/", links(&child_refs))];
    for &child in &child_refs {
        pages.push((child, Page::Html(format!("<p>{}</p>", child))));
    }
    let site = Arc::new(MockSite::new(pages).with_delay(Duration::from_millis(10)));

    let mut config = test_config(&dir, &["/"]);
    config.export.concurrency = 3;
    let outcome = export_with(config, site.clone()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.routes.len(), 21);
    assert!(site.max_active() <= 3, "max active: {}", site.max_active());
    assert!(site.max_active() > 1);
}

#[tokio::test]
async fn test_single_failure_is_contained() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/ok-1", "/broken", "/ok-2"])),
        ("/ok-1", Page::Html("1".to_string())),
        ("/broken", Page::Broken),
        ("/ok-2", Page::Html("2".to_string())),
    ]));

    let outcome = export_with(test_config(&dir, &["/"]), site.clone())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(site.calls("/broken"), 1);

    let pages: Vec<_> = outcome
        .written_files
        .iter()
        .filter(|f| matches!(f.owner, OutputOwner::Route(_)))
        .collect();
    assert_eq!(pages.len(), 3);

    assert_eq!(outcome.warnings.len(), 1);
    assert!(matches!(
        &outcome.warnings[0],
        BuildWarning::RenderFailed { route: r, attempts: 1, .. } if r.to_string() == "/broken"
    ));
    assert_eq!(outcome.count_by_state()[&RouteState::Failed], 1);
}

#[tokio::test]
async fn test_dynamic_routes_and_redirects() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![
        ("/", links(&["/dashboard", "/old-blog", "https://example.com/ext"])),
        ("/dashboard", Page::Dynamic),
        ("/old-blog", Page::Redirect("/blog/".to_string())),
        ("/blog/", Page::Html("<p>blog</p>".to_string())),
    ]));

    let outcome = export_with(test_config(&dir, &["/"]), site.clone())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(site.calls("/blog/"), 1);

    let states: Vec<_> = outcome
        .routes
        .iter()
        .map(|r| (r.route.to_string(), r.state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("/".to_string(), RouteState::Succeeded),
            ("/dashboard".to_string(), RouteState::Skipped),
            ("/old-blog".to_string(), RouteState::Succeeded),
            ("/blog/".to_string(), RouteState::Succeeded),
        ]
    );

    assert_eq!(outcome.redirects.len(), 1);
    assert_eq!(outcome.redirects[0].target, "/blog/");
    assert_eq!(
        outcome.warnings,
        vec![BuildWarning::DynamicRoute {
            route: route("/dashboard")
        }]
    );
}

#[tokio::test]
async fn test_missing_shell_template_fails_build() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new(vec![("/", Page::Html("home".to_string()))]));

    let mut config = test_config(&dir, &["/"]);
    config.fallback.shell_template = Some(dir.path().join("missing.html").display().to_string());
    let outcome = export_with(config, site).await.unwrap();

    assert!(!outcome.success);
    assert!(matches!(outcome.errors[0], BuildError::Fallback(_)));
    // The crawl still ran
    assert!(outcome.file("index.html").is_some());
}

#[tokio::test]
async fn test_markdown_report_is_written() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.md");
    let site = Arc::new(MockSite::new(vec![("/", Page::Html("home".to_string()))]));

    let mut config = test_config(&dir, &["/"]);
    config.output.report_path = Some(report.display().to_string());
    export_with(config, site).await.unwrap();

    let content = std::fs::read_to_string(report).unwrap();
    assert!(content.contains("# Static Export Build Report"));
    assert!(content.contains("`index.html`"));
}

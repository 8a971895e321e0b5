use crate::route::RoutePath;
use crate::{RouteError, RouteResult};
use url::Url;

/// Builds the absolute URL of a route under the given origin
///
/// # Examples
///
/// ```
/// use url::Url;
/// use static_export::route::{route_url, RoutePath};
///
/// let origin = Url::parse("http://127.0.0.1:4173").unwrap();
/// let route = RoutePath::parse("/blog/").unwrap();
/// assert_eq!(route_url(&origin, &route).unwrap().as_str(), "http://127.0.0.1:4173/blog/");
/// ```
pub fn route_url(origin: &Url, route: &RoutePath) -> RouteResult<Url> {
    origin
        .join(&route.to_string())
        .map_err(|e| RouteError::Parse(format!("{}: {}", route, e)))
}

/// Returns true if both URLs share scheme, host and effective port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str().map(str::to_lowercase) == b.host_str().map(str::to_lowercase)
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Converts an absolute URL into a route if it belongs to `origin`
///
/// Returns None for URLs on other origins and for non-HTTP(S) schemes.
pub fn route_from_url(origin: &Url, url: &Url) -> Option<RoutePath> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    if !same_origin(origin, url) {
        return None;
    }
    Some(RoutePath::from_url_path(url.path()))
}

/// Resolves a reference (absolute or relative) seen while rendering `route`
///
/// Used for redirect targets, which may be relative to the route that
/// issued them.
pub fn resolve_reference(origin: &Url, route: &RoutePath, reference: &str) -> Option<RoutePath> {
    let base = route_url(origin, route).ok()?;
    let resolved = base.join(reference.trim()).ok()?;
    route_from_url(origin, &resolved)
}

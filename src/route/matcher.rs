/// Checks if a route string matches an exclude pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "/admin" matches "/admin" and "/admin/"
/// 2. Prefix match: "/admin/*" matches:
///    - "/admin" (the bare prefix)
///    - "/admin/users" (single segment below it)
///    - "/admin/users/42/" (nested segments)
///
/// Trailing slashes are ignored on both sides. Matching is case-sensitive,
/// like the routes themselves.
///
/// # Examples
///
/// ```
/// use static_export::route::matches_pattern;
///
/// assert!(matches_pattern("/admin", "/admin/"));
/// assert!(!matches_pattern("/admin", "/admin/users"));
///
/// assert!(matches_pattern("/admin/*", "/admin"));
/// assert!(matches_pattern("/admin/*", "/admin/users/42"));
/// assert!(!matches_pattern("/admin/*", "/administrator"));
/// ```
pub fn matches_pattern(pattern: &str, candidate: &str) -> bool {
    let candidate = trim_trailing_slash(candidate);

    if let Some(base) = pattern.strip_suffix("/*") {
        let base = trim_trailing_slash(base);
        if base.is_empty() || base == "/" {
            return true;
        }
        candidate == base || candidate.starts_with(&format!("{}/", base))
    } else {
        candidate == trim_trailing_slash(pattern)
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

//! Route handling module
//!
//! This module provides route path normalization, same-origin resolution of
//! discovered references, and exclude pattern matching.

mod matcher;
mod origin;
mod path;

// Re-export main types and functions
pub use matcher::matches_pattern;
pub use origin::{resolve_reference, route_from_url, route_url, same_origin};
pub use path::RoutePath;

/// Returns true if the route matches any of the exclude patterns
///
/// # Examples
///
/// ```
/// use static_export::route::{is_excluded, RoutePath};
///
/// let patterns = vec!["/admin/*".to_string(), "/draft".to_string()];
/// assert!(is_excluded(&RoutePath::parse("/admin/users").unwrap(), &patterns));
/// assert!(is_excluded(&RoutePath::parse("/draft/").unwrap(), &patterns));
/// assert!(!is_excluded(&RoutePath::parse("/blog").unwrap(), &patterns));
/// ```
pub fn is_excluded(route: &RoutePath, patterns: &[String]) -> bool {
    let candidate = route.to_string();
    patterns
        .iter()
        .any(|pattern| matches_pattern(pattern, &candidate))
}

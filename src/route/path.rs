use crate::{RouteError, RouteResult};
use std::fmt;
use url::Url;

/// Base used to let the `url` crate normalize bare route strings
const PARSE_BASE: &str = "http://route.invalid/";

/// A logical, navigable path within the application's address space
///
/// Identity is the ordered list of (percent-encoded) path segments plus
/// whether the path ends with a slash. Query strings and fragments never
/// take part in identity, so `/a?x=1` and `/a#top` both resolve to `/a`.
/// `/a` and `/a/` are distinct routes; whether they map to the same file
/// is decided by the output mapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutePath {
    segments: Vec<String>,
    trailing_slash: bool,
}

impl RoutePath {
    /// The root route `/`
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
            trailing_slash: false,
        }
    }

    /// Parses a route string such as `/blog/hello/`
    ///
    /// # Normalization Steps
    ///
    /// 1. Reject anything not starting with `/`
    /// 2. Let the URL parser percent-encode and remove dot segments
    /// 3. Drop query and fragment
    /// 4. Collapse repeated slashes
    ///
    /// # Examples
    ///
    /// ```
    /// use static_export::route::RoutePath;
    ///
    /// let route = RoutePath::parse("/blog//./post/?page=2#top").unwrap();
    /// assert_eq!(route.to_string(), "/blog/post/");
    /// ```
    pub fn parse(raw: &str) -> RouteResult<Self> {
        let raw = raw.trim();
        if !raw.starts_with('/') {
            return Err(RouteError::NotAbsolute(raw.to_string()));
        }
        // "//host/path" would be read as a network-path reference
        if raw.starts_with("//") {
            return Self::parse(&format!("/{}", raw.trim_start_matches('/')));
        }

        let base = Url::parse(PARSE_BASE).map_err(|e| RouteError::Parse(e.to_string()))?;
        let url = base
            .join(raw)
            .map_err(|e| RouteError::Parse(format!("{}: {}", raw, e)))?;

        Ok(Self::from_url_path(url.path()))
    }

    /// Builds a route from the path component of an already-parsed URL
    pub fn from_url_path(path: &str) -> Self {
        let segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .map(normalize_segment)
            .collect();

        let trailing_slash = !segments.is_empty() && path.ends_with('/');

        Self {
            segments,
            trailing_slash,
        }
    }

    /// Returns the percent-encoded path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the final segment, if any
    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if the route was written with a trailing slash
    pub fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// Returns the extension of the final segment (lowercased), if it has one
    pub fn extension(&self) -> Option<String> {
        let last = self.last_segment()?;
        let (stem, ext) = last.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Brings percent-escapes in a segment into one canonical spelling
///
/// Hex digits are uppercased and escapes of unreserved characters
/// (`A-Z a-z 0-9 - . _ ~`) are decoded, so `%c3%a9` and `%C3%A9` or `%7E`
/// and `~` name the same route. A segment that would decode to `.` or `..`
/// keeps its escapes.
fn normalize_segment(segment: &str) -> String {
    let decoded = rewrite_escapes(segment, true);
    if decoded == "." || decoded == ".." {
        return rewrite_escapes(segment, false);
    }
    decoded
}

fn rewrite_escapes(segment: &str, decode_unreserved: bool) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = (
                (bytes[i + 1] as char).to_digit(16),
                (bytes[i + 2] as char).to_digit(16),
            );
            if let (Some(hi), Some(lo)) = hex {
                let value = (hi * 16 + lo) as u8;
                if decode_unreserved && is_unreserved(value) {
                    out.push(value);
                } else {
                    out.push(b'%');
                    out.push(bytes[i + 1].to_ascii_uppercase());
                    out.push(bytes[i + 2].to_ascii_uppercase());
                }
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| segment.to_string())
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))?;
        if self.trailing_slash {
            write!(f, "/")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for RoutePath {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

//! Route-to-file mapping and output collision detection
//!
//! # Mapping Rules
//!
//! | Route | `always` | `never` | `ignore` |
//! |-------|----------|---------|----------|
//! | `/` | `index.html` | `index.html` | `index.html` |
//! | `/feed.xml` | `feed.xml` | `feed.xml` | `feed.xml` |
//! | `/logo.png` | `logo.png` | `logo.png` | `logo.png` |
//! | `/a` | `a/index.html` | `a.html` | `a.html` |
//! | `/a/` | `a/index.html` | `a.html` | `a/index.html` |
//!
//! A last segment with a file extension names a file and is used verbatim
//! as long as the route has no trailing slash. Segments are percent-decoded
//! before they become path components.

use crate::config::{ExportConfig, TrailingSlash};
use crate::output::{OutputEntry, OutputOwner};
use crate::route::RoutePath;
use crate::{RouteError, RouteResult};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

const INDEX_FILE: &str = "index.html";

/// Maps routes onto relative file paths
#[derive(Debug, Clone)]
pub struct OutputMapper {
    trailing_slash: TrailingSlash,
}

impl OutputMapper {
    pub fn new(trailing_slash: TrailingSlash) -> Self {
        Self { trailing_slash }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.trailing_slash)
    }

    /// Returns the relative destination path for a route
    ///
    /// # Errors
    ///
    /// `RouteError::Unmappable` if a decoded segment cannot be a path
    /// component (empty, `.`, `..`, or containing a separator or NUL).
    ///
    /// # Examples
    ///
    /// ```
    /// use static_export::config::TrailingSlash;
    /// use static_export::output::OutputMapper;
    /// use static_export::route::RoutePath;
    ///
    /// let mapper = OutputMapper::new(TrailingSlash::Always);
    /// let about = RoutePath::parse("/about").unwrap();
    /// assert_eq!(mapper.destination(&about).unwrap(), "about/index.html");
    ///
    /// let feed = RoutePath::parse("/feed.xml").unwrap();
    /// assert_eq!(mapper.destination(&feed).unwrap(), "feed.xml");
    ///
    /// let logo = RoutePath::parse("/img/logo.png").unwrap();
    /// assert_eq!(mapper.destination(&logo).unwrap(), "img/logo.png");
    /// ```
    pub fn destination(&self, route: &RoutePath) -> RouteResult<String> {
        if route.is_root() {
            return Ok(INDEX_FILE.to_string());
        }

        let segments = route
            .segments()
            .iter()
            .map(|segment| decode_segment(route, segment))
            .collect::<RouteResult<Vec<String>>>()?;
        let joined = segments.join("/");

        if !route.has_trailing_slash() && route.extension().is_some() {
            return Ok(joined);
        }

        let as_directory = match self.trailing_slash {
            TrailingSlash::Always => true,
            TrailingSlash::Never => false,
            TrailingSlash::Ignore => route.has_trailing_slash(),
        };

        if as_directory {
            Ok(format!("{}/{}", joined, INDEX_FILE))
        } else {
            Ok(format!("{}.html", joined))
        }
    }

    /// Maps a rendered route to its output entry
    pub fn map_to_file(&self, route: &RoutePath, content: Vec<u8>) -> RouteResult<OutputEntry> {
        let path = self.destination(route)?;
        Ok(OutputEntry::new(OutputOwner::Route(route.clone()), path, content))
    }
}

fn decode_segment(route: &RoutePath, segment: &str) -> RouteResult<String> {
    let unmappable = |reason: &str| RouteError::Unmappable {
        route: route.to_string(),
        reason: reason.to_string(),
    };

    let decoded = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| unmappable("segment is not valid UTF-8 after decoding"))?;

    if decoded.is_empty() {
        return Err(unmappable("empty path segment"));
    }
    if decoded == "." || decoded == ".." {
        return Err(unmappable("dot segment"));
    }
    if decoded.contains(['/', '\\', '\0']) {
        return Err(unmappable("segment contains a path separator or NUL"));
    }

    Ok(decoded.into_owned())
}

/// How two output entries collide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// Both entries want the same file
    SamePath,
    /// One entry's file is another entry's directory
    FileDirectory,
}

impl fmt::Display for CollisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionKind::SamePath => write!(f, "same path"),
            CollisionKind::FileDirectory => write!(f, "file/directory conflict"),
        }
    }
}

/// Two output entries claiming the same place in the tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("output collision at '{path}' ({kind}): {first} and {second}")]
pub struct CollisionError {
    /// The contested path
    pub path: String,
    /// The entry that claimed it first
    pub first: OutputOwner,
    /// The entry that tried to claim it afterwards
    pub second: OutputOwner,
    pub kind: CollisionKind,
}

/// Tracks every claimed output path for global collision detection
#[derive(Debug, Default)]
pub struct OutputRegistry {
    case_insensitive: bool,
    files: HashMap<String, OutputOwner>,
    dirs: HashMap<String, OutputOwner>,
}

impl OutputRegistry {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            case_insensitive,
            ..Self::default()
        }
    }

    /// Claims a destination path for an owner
    ///
    /// A failed claim leaves the registry unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use static_export::output::{OutputOwner, OutputRegistry};
    ///
    /// let mut registry = OutputRegistry::new(false);
    /// assert!(registry.claim("about/index.html", OutputOwner::Fallback).is_ok());
    /// assert!(registry.claim("about", OutputOwner::Asset("about".into())).is_err());
    /// ```
    pub fn claim(&mut self, path: &str, owner: OutputOwner) -> Result<(), CollisionError> {
        let key = self.key(path);

        if let Some(first) = self.files.get(&key) {
            return Err(CollisionError {
                path: path.to_string(),
                first: first.clone(),
                second: owner,
                kind: CollisionKind::SamePath,
            });
        }

        if let Some(first) = self.dirs.get(&key) {
            return Err(CollisionError {
                path: path.to_string(),
                first: first.clone(),
                second: owner,
                kind: CollisionKind::FileDirectory,
            });
        }

        let ancestors = ancestors(&key);
        for ancestor in &ancestors {
            if let Some(first) = self.files.get(ancestor) {
                return Err(CollisionError {
                    path: ancestor.clone(),
                    first: first.clone(),
                    second: owner,
                    kind: CollisionKind::FileDirectory,
                });
            }
        }

        for ancestor in ancestors {
            self.dirs.entry(ancestor).or_insert_with(|| owner.clone());
        }
        self.files.insert(key, owner);
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&self.key(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn key(&self, path: &str) -> String {
        if self.case_insensitive {
            path.to_lowercase()
        } else {
            path.to_string()
        }
    }
}

/// Directory prefixes of a relative path: `a/b/c.html` gives `a`, `a/b`
fn ancestors(path: &str) -> Vec<String> {
    path.match_indices('/')
        .map(|(i, _)| path[..i].to_string())
        .filter(|prefix| !prefix.is_empty())
        .collect()
}

/// Checks a complete set of entries for collisions
///
/// Entries are claimed in order, so `first` in each error is the earlier
/// entry.
pub fn check_collisions(entries: &[OutputEntry], case_insensitive: bool) -> Vec<CollisionError> {
    let mut registry = OutputRegistry::new(case_insensitive);
    entries
        .iter()
        .filter_map(|entry| registry.claim(&entry.path, entry.owner.clone()).err())
        .collect()
}

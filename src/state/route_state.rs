/// Route state definitions for tracking crawl progress
///
/// This module defines all possible states a route can be in during a build.
use std::fmt;

/// Represents the current state of a route in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteState {
    // ===== Active States =====
    /// Route has been discovered and waits in the frontier
    Pending,

    /// Route has been dispatched to the resolver
    InProgress,

    // ===== Terminal States =====
    /// Route rendered (or redirected) and its output was accepted
    Succeeded,

    /// Route failed to render, could not be mapped, or collided
    Failed,

    /// Route requires a live server and was left to the fallback
    Skipped,
}

impl RouteState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (route may still be processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Short machine-readable name, used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped-non-prerenderable",
        }
    }

    /// Parses a state from its report name
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in-progress" => Some(Self::InProgress),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "skipped-non-prerenderable" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns all possible route states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::InProgress,
            Self::Succeeded,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

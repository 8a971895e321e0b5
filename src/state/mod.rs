//! State module for tracking crawl progress
//!
//! `RouteState` tracks the lifecycle of individual routes (pending,
//! in-progress, succeeded, failed, skipped) during a build.

mod route_state;

pub use route_state::RouteState;

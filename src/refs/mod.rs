//! Element reference resolution
//!
//! - `cache`: snapshot reference types and the bounded cross-session tier
//! - `resolver`: token-to-locator resolution over both tiers

pub mod cache;
pub mod resolver;

pub use cache::{
    FifoCache, RoleRefEntry, RoleRefSnapshot, SnapshotMode, TargetKey, CROSS_SESSION_CAP,
};
pub use resolver::RefCache;

#[cfg(test)]
mod tests;

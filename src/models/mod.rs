//! Data models for the traffic router

pub mod target;
pub mod visit;

// Re-export commonly used types
pub use target::{AcceptRules, InclusionSet, NewTarget, Target, TargetUpdate};
pub use visit::{Decision, RoutingDecision, Visit};

//! Shape-driven strategy selection.
//!
//! Metrics are derived from the graph, a prioritized rule list maps them to a strategy, and the
//! selector morphs node positions when the winning strategy changes.

mod metrics;
mod rules;
mod selector;

pub use metrics::GraphMetrics;
pub use rules::{AdaptationRule, RuleCondition, RuleSet};
pub use selector::{AdaptiveSelector, Selection};

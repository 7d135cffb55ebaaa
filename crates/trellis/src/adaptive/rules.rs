use super::GraphMetrics;
use crate::config::AdaptiveConfig;
use crate::strategy::StrategyKind;
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleCondition {
    NodeCountAtMost(usize),
    NodeCountAbove(usize),
    DensityAbove(f64),
    HierarchyAbove(f64),
    AverageDegreeAbove(f64),
    ClusteringAbove(f64),
    /// Spread-out graphs with enough nodes to fill a grid.
    Sparse {
        max_connection_density: f64,
        min_nodes: usize,
    },
    Always,
}

impl RuleCondition {
    pub fn matches(&self, m: &GraphMetrics) -> bool {
        match *self {
            RuleCondition::NodeCountAtMost(n) => m.node_count <= n,
            RuleCondition::NodeCountAbove(n) => m.node_count > n,
            RuleCondition::DensityAbove(d) => m.density > d,
            RuleCondition::HierarchyAbove(h) => m.hierarchy_score > h,
            RuleCondition::AverageDegreeAbove(d) => m.average_degree > d,
            RuleCondition::ClusteringAbove(c) => m.clustering_coefficient > c,
            RuleCondition::Sparse {
                max_connection_density,
                min_nodes,
            } => m.connection_density < max_connection_density && m.node_count > min_nodes,
            RuleCondition::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationRule {
    pub name: String,
    /// Higher runs first.
    pub priority: i32,
    pub condition: RuleCondition,
    pub strategy: StrategyKind,
}

impl AdaptationRule {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        condition: RuleCondition,
        strategy: StrategyKind,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            condition,
            strategy,
        }
    }
}

/// Rules ordered by descending priority; equal priorities keep registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<AdaptationRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defaults(config: &AdaptiveConfig) -> Self {
        let mut set = Self::new();
        set.add(AdaptationRule::new(
            "small-graph",
            100,
            RuleCondition::NodeCountAtMost(config.small_node_threshold),
            StrategyKind::Circular,
        ));
        set.add(AdaptationRule::new(
            "dense-graph",
            90,
            RuleCondition::DensityAbove(config.dense_threshold),
            StrategyKind::Force,
        ));
        set.add(AdaptationRule::new(
            "hierarchical-graph",
            80,
            RuleCondition::HierarchyAbove(config.hierarchy_threshold),
            StrategyKind::Hierarchical,
        ));
        set.add(AdaptationRule::new(
            "sparse-grid",
            70,
            RuleCondition::Sparse {
                max_connection_density: config.grid_connection_density,
                min_nodes: config.grid_min_nodes,
            },
            StrategyKind::Grid,
        ));
        set.add(AdaptationRule::new(
            "large-graph",
            60,
            RuleCondition::NodeCountAbove(config.large_node_threshold),
            StrategyKind::Force,
        ));
        set.add(AdaptationRule::new(
            "high-degree",
            50,
            RuleCondition::AverageDegreeAbove(config.high_degree_threshold),
            StrategyKind::Force,
        ));
        set
    }

    pub fn add(&mut self, rule: AdaptationRule) {
        self.rules.push(rule);
        // Stable: ties stay in registration order.
        self.rules.sort_by_key(|r| Reverse(r.priority));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdaptationRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule, in priority order, whose condition holds.
    pub fn select(&self, metrics: &GraphMetrics) -> Option<&AdaptationRule> {
        self.rules.iter().find(|r| r.condition.matches(metrics))
    }
}

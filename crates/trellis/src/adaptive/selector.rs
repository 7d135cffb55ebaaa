use super::{AdaptationRule, GraphMetrics, RuleSet};
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::strategy::{LayoutStrategy, StrategyKind, create_inline_strategy};
use crate::transition::Transition;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use trellis_graph::{Graph, GraphEvent};

const FALLBACK_REASON: &str = "default";
const PATTERN_REASON: &str = "pattern-cycle";

/// Outcome of evaluating the rule list against a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub strategy: StrategyKind,
    /// Name of the winning rule, or `"default"` when none matched.
    pub reason: String,
    pub metrics: GraphMetrics,
}

/// Picks the best-fit strategy for the graph's shape and morphs to it when the shape changes.
///
/// Only one morph is ever in flight; re-selection waits until it lands.
pub struct AdaptiveSelector {
    config: LayoutConfig,
    rules: RuleSet,
    current: Option<StrategyKind>,
    strategy: Option<Box<dyn LayoutStrategy>>,
    morph: Option<Transition>,
    /// Time left before a debounced re-evaluation.
    pending: Option<Duration>,
    pattern_elapsed: Duration,
    pattern_index: usize,
}

impl fmt::Debug for AdaptiveSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveSelector")
            .field("rules", &self.rules.len())
            .field("current", &self.current)
            .field("adapting", &self.morph.is_some())
            .field("pending", &self.pending)
            .finish()
    }
}

impl AdaptiveSelector {
    pub fn new(config: LayoutConfig) -> Self {
        let rules = RuleSet::defaults(&config.adaptive);
        Self {
            config,
            rules,
            current: None,
            strategy: None,
            morph: None,
            pending: None,
            pattern_elapsed: Duration::ZERO,
            pattern_index: 0,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: AdaptationRule) {
        self.rules.add(rule);
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        self.rules.remove(name)
    }

    pub fn current(&self) -> Option<StrategyKind> {
        self.current
    }

    /// True while a morph is still interpolating.
    pub fn is_adapting(&self) -> bool {
        self.morph.is_some()
    }

    pub fn has_pending_evaluation(&self) -> bool {
        self.pending.is_some()
    }

    pub fn metrics(&self, graph: &Graph) -> GraphMetrics {
        GraphMetrics::compute(graph)
    }

    /// Evaluates the rules without touching the graph.
    pub fn select(&self, graph: &Graph) -> Selection {
        let metrics = GraphMetrics::compute(graph);
        match self.rules.select(&metrics) {
            Some(rule) => Selection {
                strategy: rule.strategy,
                reason: rule.name.clone(),
                metrics,
            },
            None => Selection {
                strategy: StrategyKind::Force,
                reason: FALLBACK_REASON.to_string(),
                metrics,
            },
        }
    }

    /// Re-selects immediately. Returns the strategy morphed to, or `None` when the current one
    /// still fits or a morph is already in flight.
    pub fn evaluate_now(&mut self, graph: &mut Graph) -> Result<Option<StrategyKind>> {
        if self.is_adapting() {
            debug!("adaptation in flight; skipping evaluation");
            return Ok(None);
        }
        let selection = self.select(graph);
        if self.current == Some(selection.strategy) {
            debug!(strategy = %selection.strategy, "current strategy still fits");
            return Ok(None);
        }
        debug!(
            strategy = %selection.strategy,
            rule = %selection.reason,
            nodes = selection.metrics.node_count,
            density = selection.metrics.density,
            "strategy mismatch"
        );
        self.morph_to(graph, selection.strategy, &selection.reason)?;
        Ok(Some(selection.strategy))
    }

    fn morph_to(&mut self, graph: &mut Graph, kind: StrategyKind, reason: &str) -> Result<()> {
        let mut next = create_inline_strategy(kind);
        let config = &self.config;
        let captured = Transition::capture(
            graph,
            config.adaptive.morph_duration(),
            config.adaptive.morph_easing,
            |g| next.init(g, config),
        );
        let mut morph = match captured {
            Ok(morph) => morph,
            Err(err) => {
                warn!(strategy = %kind, error = %err, "adaptation failed");
                graph.emit(GraphEvent::LayoutError {
                    error: err.to_string(),
                });
                next.dispose();
                return Err(err);
            }
        };

        if let Some(mut old) = self.strategy.take() {
            old.stop();
            old.dispose();
        }
        let from = self.current.map_or("none", StrategyKind::as_str);
        info!(from, to = %kind, reason, "adapting layout");
        graph.emit(GraphEvent::LayoutAdapted {
            from: from.to_string(),
            to: kind.to_string(),
            reason: reason.to_string(),
        });

        self.current = Some(kind);
        if morph.is_still() {
            morph.finish(graph);
            next.run();
        } else {
            self.morph = Some(morph);
        }
        self.strategy = Some(next);
        Ok(())
    }

    /// Restarts the debounce timer after a graph mutation.
    pub fn notify_mutation(&mut self) {
        if self.config.adaptive.auto_adapt {
            self.pending = Some(self.config.adaptive.adaptation_delay());
        }
    }

    pub fn add_node(&mut self, graph: &Graph, id: &str) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.add_node(graph, id);
        }
        self.notify_mutation();
    }

    pub fn remove_node(&mut self, id: &str) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.remove_node(id);
        }
        self.notify_mutation();
    }

    pub fn add_edge(&mut self, graph: &Graph, id: &str) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.add_edge(graph, id);
        }
        self.notify_mutation();
    }

    pub fn remove_edge(&mut self, id: &str) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.remove_edge(id);
        }
        self.notify_mutation();
    }

    pub fn kick(&mut self, intensity: f64) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.kick(intensity);
        }
    }

    /// Advances the morph, then the debounce timer, then the pattern cycle.
    pub fn update(&mut self, graph: &mut Graph, dt: Duration) {
        match self.morph.as_mut() {
            Some(morph) => {
                if morph.advance(graph, dt) {
                    self.morph = None;
                    if let Some(strategy) = self.strategy.as_mut() {
                        strategy.run();
                    }
                    debug!(strategy = ?self.current, "morph finished");
                }
            }
            None => {
                if let Some(strategy) = self.strategy.as_mut() {
                    strategy.update(graph);
                }
            }
        }

        if let Some(remaining) = self.pending {
            let remaining = remaining.saturating_sub(dt);
            if remaining.is_zero() && !self.is_adapting() {
                self.pending = None;
                if let Err(err) = self.evaluate_now(graph) {
                    debug!(error = %err, "debounced evaluation failed");
                }
            } else {
                self.pending = Some(remaining);
            }
        }

        self.advance_pattern(graph, dt);
    }

    fn advance_pattern(&mut self, graph: &mut Graph, dt: Duration) {
        let len = self.config.adaptive.pattern_cycle.len();
        let interval = self.config.adaptive.pattern_interval();
        if len == 0 || interval.is_zero() {
            return;
        }
        self.pattern_elapsed = self.pattern_elapsed.saturating_add(dt);
        if self.pattern_elapsed < interval || self.is_adapting() {
            return;
        }
        self.pattern_elapsed = Duration::ZERO;
        let index = self.pattern_index % len;
        self.pattern_index = (index + 1) % len;
        let Some(name) = self.config.adaptive.pattern_cycle.get(index) else {
            return;
        };
        match name.parse::<StrategyKind>() {
            Ok(kind) if self.current != Some(kind) => {
                if let Err(err) = self.morph_to(graph, kind, PATTERN_REASON) {
                    debug!(error = %err, "pattern step failed");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "skipping pattern cycle entry"),
        }
    }

    pub fn stop(&mut self) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.stop();
        }
    }

    pub fn dispose(&mut self) {
        if let Some(mut strategy) = self.strategy.take() {
            strategy.dispose();
        }
        self.morph = None;
        self.pending = None;
        self.current = None;
    }
}

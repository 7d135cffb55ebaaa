use std::time::Duration;
use test_log::test;
use trellis::hybrid::{Systems, select_mode};
use trellis::{Edge, Graph, HybridComposer, HybridMode, LayoutConfig, Node, StrategyKind};

fn complete(n: usize) -> Graph {
    let mut g = Graph::new();
    for i in 0..n {
        g.add_node(Node::at(format!("n{i}"), i as f64, 0.0, 0.0));
    }
    for i in 0..n {
        for j in (i + 1)..n {
            g.add_edge(Edge::new(format!("e{i}-{j}"), format!("n{i}"), format!("n{j}")))
                .unwrap();
        }
    }
    g
}

fn pair_with_distance() -> Graph {
    let mut g = Graph::new();
    g.add_node(Node::at("a", 0.0, 0.0, 0.0));
    g.add_node(Node::at("b", 30.0, 0.0, 0.0));
    g.add_edge(Edge::new("ab", "a", "b").with_distance(150.0, 1.0))
        .unwrap();
    g
}

#[test]
fn mode_follows_graph_features_and_complexity() {
    let config = LayoutConfig::default();

    let mut plain = Graph::new();
    plain.add_node(Node::new("a"));
    plain.add_node(Node::new("b"));
    assert_eq!(select_mode(&plain, &config), HybridMode::Standard);

    assert_eq!(select_mode(&pair_with_distance(), &config), HybridMode::Constraint);

    let mut nested = Graph::new();
    nested.add_node(Node::new("box").container("grid"));
    nested.add_node(Node::new("child").inside("box"));
    assert_eq!(select_mode(&nested, &config), HybridMode::Nested);

    let mut dense = complete(30);
    assert_eq!(select_mode(&dense, &config), HybridMode::Adaptive);
    dense.add_node(Node::new("box").container("circular"));
    assert_eq!(select_mode(&dense, &config), HybridMode::Hybrid);
}

#[test]
fn disabled_systems_are_never_selected() {
    let mut config = LayoutConfig::default();
    config.hybrid.enable_constraints = false;
    config.hybrid.enable_adaptive = false;
    assert_eq!(select_mode(&pair_with_distance(), &config), HybridMode::Standard);
    assert_eq!(select_mode(&complete(30), &config), HybridMode::Standard);
}

#[test]
fn constraint_mode_relaxes_edge_distances() {
    let mut g = pair_with_distance();
    let mut composer = HybridComposer::new(LayoutConfig::default());
    let mode = composer.layout(&mut g, None).unwrap();
    assert_eq!(mode, HybridMode::Constraint);
    let d = (g.position("a").unwrap() - g.position("b").unwrap()).norm();
    assert!((d - 150.0).abs() < 1.0, "distance {d}");

    composer.update(&mut g, Duration::from_millis(16));
    let again = (g.position("a").unwrap() - g.position("b").unwrap()).norm();
    assert!((again - d).abs() < composer.config().solver.convergence_threshold);
}

#[test]
fn hybrid_mode_broadcasts_mutations_to_every_enabled_system() {
    let mut g = complete(30);
    g.add_node(Node::new("box").container("grid"));
    let mut composer = HybridComposer::new(LayoutConfig::default());
    assert_eq!(composer.layout(&mut g, None).unwrap(), HybridMode::Hybrid);
    assert_eq!(
        composer.systems(),
        Systems {
            adaptive: true,
            nested: true,
            constraint: true,
            standard: false,
        }
    );
    assert_eq!(composer.adaptive().current(), Some(StrategyKind::Force));
    assert_eq!(composer.orchestrator().active_kind(), None);
    let loaded = composer.solver().node_count();

    g.add_node(Node::new("late").inside("box"));
    composer.add_node(&g, "late");
    assert_eq!(composer.solver().node_count(), loaded + 1);
    assert!(composer.adaptive().has_pending_evaluation());

    composer.update(&mut g, Duration::from_millis(16));
    composer.dispose();
    assert_eq!(composer.mode(), None);
}

#[test]
fn manual_mode_selection_defaults_to_standard() {
    let mut config = LayoutConfig::default();
    config.hybrid.auto_mode_selection = false;
    config.hybrid.default_layout = "sphere".to_string();
    let mut g = pair_with_distance();
    let mut composer = HybridComposer::new(config);
    assert_eq!(composer.layout(&mut g, None).unwrap(), HybridMode::Standard);
    assert_eq!(composer.orchestrator().active_kind(), Some(StrategyKind::Sphere));
}

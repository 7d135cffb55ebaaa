use std::time::{Duration, Instant};
use test_log::test;
use trellis::config::ForceSettings;
use trellis::sim::{EdgeSnapshot, NodeSnapshot, SimulationEngine};
use trellis::{
    Edge, ForceLayout, Graph, GraphEvent, LayoutConfig, LayoutStrategy, Node, StrategyKind, Vec3,
    create_inline_strategy,
};

fn chain() -> Graph {
    let mut g = Graph::new();
    g.add_node(Node::at("A", -80.0, 10.0, 0.0));
    g.add_node(Node::at("B", 0.0, 0.0, 0.0));
    g.add_node(Node::at("C", 80.0, -10.0, 0.0));
    g.add_edge(Edge::new("ab", "A", "B").elastic(100.0, 0.5)).unwrap();
    g.add_edge(Edge::new("bc", "B", "C").elastic(100.0, 0.5)).unwrap();
    g
}

fn chain_config() -> LayoutConfig {
    let mut config = LayoutConfig::default();
    config.force.repulsion = 100.0;
    config.force.center_strength = 0.001;
    config
}

fn distance(g: &Graph, a: &str, b: &str) -> f64 {
    (g.position(a).unwrap() - g.position(b).unwrap()).norm()
}

#[test]
fn elastic_chain_settles_at_ideal_length_through_the_center() {
    let mut g = chain();
    let mut layout = create_inline_strategy(StrategyKind::Force);
    layout.init(&mut g, &chain_config()).unwrap();

    assert!((distance(&g, "A", "B") - 100.0).abs() < 2.0);
    assert!((distance(&g, "B", "C") - 100.0).abs() < 2.0);

    let a = g.position("A").unwrap();
    let b = g.position("B").unwrap();
    let c = g.position("C").unwrap();
    assert!(b.norm() < 1.0, "middle node drifted to {b:?}");
    let cos = (a - b).normalize().dot(&(c - b).normalize());
    assert!(cos < -0.99, "chain is bent: cos = {cos}");
}

#[test]
fn pinned_nodes_never_move() {
    let settings = ForceSettings::default();
    let mut g = chain();
    g.node_mut("B").unwrap().position = Vec3::new(3.25, -7.5, 1.125);
    g.node_mut("B").unwrap().is_pinned = true;

    let mut engine = SimulationEngine::new(settings.clone());
    engine.load(
        g.nodes().map(NodeSnapshot::from).collect(),
        g.edges().map(|e| EdgeSnapshot::from_edge(e, &settings)).collect(),
    );
    engine.start();
    let before = engine.position("B").unwrap();
    for _ in 0..500 {
        engine.step().unwrap();
    }
    assert_eq!(engine.position("B").unwrap(), before);
    assert_ne!(engine.position("A").unwrap(), Vec3::new(-80.0, 10.0, 0.0));
}

#[test]
fn energy_decays_once_motion_dies_down() {
    let settings = ForceSettings {
        repulsion: 100.0,
        center_strength: 0.001,
        ..ForceSettings::default()
    };
    let g = chain();
    let mut engine = SimulationEngine::new(settings.clone());
    engine.load(
        g.nodes().map(NodeSnapshot::from).collect(),
        g.edges().map(|e| EdgeSnapshot::from_edge(e, &settings)).collect(),
    );
    let steps = engine.settle(settings.max_inline_steps).unwrap();
    assert!(steps < settings.max_inline_steps);
    assert!(engine.is_settled());
    assert!(engine.smoothed_energy() < settings.min_energy_threshold);
}

#[test]
fn background_layout_streams_positions_and_stops_on_rest() {
    let mut config = chain_config();
    config.force.tick_interval_ms = 0;
    let mut g = chain();
    let mut layout = ForceLayout::new();
    layout.init(&mut g, &config).unwrap();
    layout.run();
    assert!(layout.is_running());

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut stopped = false;
    while Instant::now() < deadline {
        layout.update(&mut g);
        if g
            .drain_events()
            .iter()
            .any(|e| matches!(e, GraphEvent::LayoutStopped { name } if name == "force"))
        {
            stopped = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(stopped, "simulation never came to rest");
    assert!(!layout.is_running());
    assert!(!layout.is_lost());
    assert!((distance(&g, "A", "B") - 100.0).abs() < 2.0);

    layout.dispose();
    layout.run();
    assert!(!layout.is_running());
}

/// Calls `update` until `done` sees a matching event or ten seconds pass.
fn pump_until(layout: &mut ForceLayout, g: &mut Graph, done: impl Fn(&GraphEvent) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        layout.update(g);
        if g.drain_events().iter().any(&done) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

fn is_stopped(e: &GraphEvent) -> bool {
    matches!(e, GraphEvent::LayoutStopped { name } if name == "force")
}

#[test]
fn non_finite_state_surfaces_as_a_layout_error() {
    let mut g = Graph::new();
    g.add_node(Node::at("a", f64::NAN, 0.0, 0.0));
    g.add_node(Node::at("b", 10.0, 0.0, 0.0));

    let mut engine = SimulationEngine::default();
    engine.load(g.nodes().map(NodeSnapshot::from).collect(), Vec::new());
    engine.start();
    let err = engine.step().unwrap_err();
    assert!(matches!(err, trellis::Error::Engine { .. }));
    assert!(!engine.is_running());

    let mut config = LayoutConfig::default();
    config.force.tick_interval_ms = 0;
    let mut layout = ForceLayout::new();
    layout.init(&mut g, &config).unwrap();
    layout.run();
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut error = None;
    while Instant::now() < deadline && error.is_none() {
        layout.update(&mut g);
        error = g.drain_events().into_iter().find_map(|e| match e {
            GraphEvent::LayoutError { error } => Some(error),
            _ => None,
        });
        std::thread::sleep(Duration::from_millis(5));
    }
    let error = error.expect("engine failure was never reported");
    assert!(error.contains("non-finite"), "{error}");
    assert!(!layout.is_running());
    assert!(!layout.is_lost());
}

#[test]
fn fixing_a_node_through_the_worker_freezes_it() {
    let mut config = chain_config();
    config.force.tick_interval_ms = 0;
    let mut g = chain();
    let mut layout = ForceLayout::new();
    layout.init(&mut g, &config).unwrap();
    let anchor = Vec3::new(-40.0, 5.0, 0.0);
    layout.update_node_state("A", true, false, Some(anchor)).unwrap();
    layout.run();

    assert!(pump_until(&mut layout, &mut g, is_stopped), "simulation never came to rest");
    assert_eq!(g.position("A"), Some(anchor));
    assert_ne!(g.position("C"), Some(Vec3::new(80.0, -10.0, 0.0)));
    layout.dispose();
}

#[test]
fn kick_restarts_a_settled_simulation() {
    let mut config = chain_config();
    config.force.tick_interval_ms = 0;
    let mut g = chain();
    let mut layout = ForceLayout::new();
    layout.init(&mut g, &config).unwrap();
    layout.run();
    assert!(pump_until(&mut layout, &mut g, is_stopped), "simulation never came to rest");
    let rest = g.positions();

    layout.kick(25.0);
    assert!(layout.is_running());
    assert!(pump_until(&mut layout, &mut g, is_stopped), "kicked simulation never settled");
    assert_ne!(g.positions(), rest);
    assert!((distance(&g, "A", "B") - 100.0).abs() < 2.0);
    layout.dispose();
}

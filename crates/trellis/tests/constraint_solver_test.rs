use test_log::test;
use trellis::config::SolverConfig;
use trellis::{BoundaryShape, ConstraintSolver, Edge, Error, Graph, Node, Vec3};

fn solver_for(g: &Graph) -> ConstraintSolver {
    let config = SolverConfig::default();
    let mut solver = ConstraintSolver::new(config.clone());
    solver.init(g, &config);
    solver
}

#[test]
fn sphere_boundary_pushes_an_outside_node_toward_the_center() {
    let mut g = Graph::new();
    g.add_node(Node::at("far", 500.0, 0.0, 0.0));
    let mut solver = solver_for(&g);
    solver
        .add_boundary_constraint(
            ["far"],
            BoundaryShape::Sphere {
                center: Vec3::zeros(),
                radius: 200.0,
            },
            1.0,
            0.0,
        )
        .unwrap();

    solver.pass();
    let force = solver.force("far").unwrap();
    let toward_center = -Vec3::x();
    assert!(force.norm() > 0.0);
    assert!(force.normalize().dot(&toward_center) > 0.999_999, "force {force:?}");
    assert!(solver.position("far").unwrap().x < 500.0);
}

#[test]
fn satisfied_constraints_are_a_fixed_point() {
    let mut g = Graph::new();
    g.add_node(Node::at("a", -100.0, 0.0, 0.0));
    g.add_node(Node::at("b", 100.0, 0.0, 0.0));
    g.add_edge(Edge::new("ab", "a", "b").with_distance(200.0, 0.5))
        .unwrap();
    let mut solver = solver_for(&g);

    let report = solver.solve();
    assert!(report.converged);
    let threshold = solver.config().convergence_threshold;
    let before = (solver.position("a").unwrap(), solver.position("b").unwrap());
    let moved = solver.pass();
    assert!(moved <= threshold);
    assert!((solver.position("a").unwrap() - before.0).norm() <= threshold);
    assert!((solver.position("b").unwrap() - before.1).norm() <= threshold);
}

#[test]
fn removing_a_node_prunes_exactly_its_constraints() {
    let mut g = Graph::new();
    for (id, x) in [("a", 0.0), ("b", 150.0), ("c", 0.0), ("d", 300.0)] {
        g.add_node(Node::at(id, x, if id == "c" { 150.0 } else { 0.0 }, 0.0));
    }
    g.add_edge(Edge::new("ab", "a", "b")).unwrap();
    g.add_edge(Edge::new("cd", "c", "d")).unwrap();
    let mut solver = solver_for(&g);
    solver
        .add_position_constraint("a", Vec3::zeros(), 0.5, 1.0)
        .unwrap();
    solver
        .add_angle_constraint("b", "a", "c", std::f64::consts::FRAC_PI_2, 0.5)
        .unwrap();
    solver
        .add_position_constraint("d", Vec3::new(300.0, 0.0, 0.0), 0.5, 1.0)
        .unwrap();
    assert_eq!(solver.constraint_count(), 5);

    assert_eq!(solver.remove_node("a"), 3);
    assert_eq!(solver.constraint_count(), 2);
    assert!(solver.constraints().all(|c| !c.references("a")));
    assert_eq!(solver.node_count(), 3);
}

#[test]
fn constraints_naming_unknown_nodes_are_rejected() {
    let mut g = Graph::new();
    g.add_node(Node::new("a"));
    let mut solver = solver_for(&g);
    let err = solver
        .add_distance_constraint("a", "ghost", 50.0, 0.5)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConstraint { .. }));
    assert_eq!(solver.constraint_count(), 0);
}

#[test]
fn layout_writes_back_but_leaves_pinned_nodes() {
    let mut g = Graph::new();
    g.add_node(Node::at("anchor", 0.0, 0.0, 0.0).pinned());
    g.add_node(Node::at("free", 40.0, 0.0, 0.0));
    g.add_edge(Edge::new("e", "anchor", "free").with_distance(120.0, 1.0))
        .unwrap();
    let config = SolverConfig::default();
    let mut solver = ConstraintSolver::new(config.clone());
    solver.layout(&mut g, &config);

    assert_eq!(g.position("anchor"), Some(Vec3::zeros()));
    let d = g.position("free").unwrap().norm();
    assert!((d - 120.0).abs() < 5.0, "distance {d}");
}

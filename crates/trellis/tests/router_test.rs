use test_log::test;
use trellis::config::RouterConfig;
use trellis::geom::{Obstacle, polyline_blocked};
use trellis::{ConnectionRouter, ConnectionType, Error, Graph, Node, StrategyKind, Vec3};

fn scene(with_blocker: bool) -> (Graph, ConnectionRouter) {
    let mut g = Graph::new();
    g.add_node(Node::at("a", 0.0, 0.0, 0.0));
    g.add_node(Node::at("b", 400.0, 0.0, 0.0));
    let mut router = ConnectionRouter::new(RouterConfig::default());
    router.add_region("left", StrategyKind::Grid, ["a"]);
    router.add_region("right", StrategyKind::Circular, ["b"]);
    if with_blocker {
        g.add_node(Node::at("m", 200.0, 0.0, 0.0));
        router.add_region("middle", StrategyKind::Sphere, ["m"]);
    }
    router.refresh(&g);
    (g, router)
}

#[test]
fn direct_route_without_obstacles_is_a_single_segment() {
    let (_g, mut router) = scene(false);
    let id = router.add_connection("a", "b", ConnectionType::Direct).unwrap();
    let route = router.route(&id).unwrap();
    assert_eq!(route.points.len(), 2);
    assert!(!route.rerouted);
    assert_eq!(route.points[0], Vec3::new(20.0, 0.0, 0.0));
    assert_eq!(route.points[1], Vec3::new(380.0, 0.0, 0.0));
}

#[test]
fn blocked_route_detours_around_the_obstacle() {
    let (_g, mut router) = scene(true);
    let id = router.add_connection("a", "b", ConnectionType::Direct).unwrap();
    let route = router.route(&id).unwrap();
    let straight = vec![Vec3::new(20.0, 0.0, 0.0), Vec3::new(380.0, 0.0, 0.0)];

    assert!(route.rerouted);
    assert_ne!(route.points, straight);
    assert!(route.points.len() > 2);
    assert_eq!(route.points.first(), straight.first());
    assert_eq!(route.points.last(), straight.last());
    let blocker = Obstacle {
        center: Vec3::new(200.0, 0.0, 0.0),
        radius: 20.0,
        owner: "m".to_string(),
    };
    assert!(!polyline_blocked(&route.points, [&blocker]));
}

#[test]
fn bundled_routes_share_one_waypoint() {
    let (g, mut router) = scene(false);
    for _ in 0..3 {
        router.add_connection("a", "b", ConnectionType::Bundled).unwrap();
    }
    let routes = router.routes(&g);
    assert_eq!(routes.len(), 3);

    let mid = routes[0].points.len() / 2;
    let waypoint = routes[0].points[mid];
    let centers_mid = Vec3::new(200.0, 0.0, 0.0);
    assert!(((waypoint - centers_mid).norm() - 40.0).abs() < 1e-9);
    for route in &routes {
        assert_eq!(route.points[mid], waypoint);
        assert!(!route.rerouted);
    }
}

#[test]
fn too_few_bundled_connections_are_drawn_as_curves() {
    let (_g, mut router) = scene(false);
    let id = router.add_connection("a", "b", ConnectionType::Bundled).unwrap();
    let bundled = router.route(&id).unwrap();
    router.remove_connection(&id);
    let id = router.add_connection("a", "b", ConnectionType::Curved).unwrap();
    let curved = router.route(&id).unwrap();
    assert_eq!(bundled.points, curved.points);
    assert_eq!(curved.points.len(), 17);
}

#[test]
fn orthogonal_route_bends_on_the_dominant_axis() {
    let mut g = Graph::new();
    g.add_node(Node::at("a", 0.0, 0.0, 0.0));
    g.add_node(Node::at("b", 400.0, 100.0, 0.0));
    let mut router = ConnectionRouter::new(RouterConfig::default());
    router.add_region("left", StrategyKind::Grid, ["a"]);
    router.add_region("right", StrategyKind::Grid, ["b"]);
    router.refresh(&g);
    let id = router.add_connection("a", "b", ConnectionType::Orthogonal).unwrap();
    let points = router.route(&id).unwrap().points;

    assert_eq!(points.len(), 4);
    for pair in points.windows(2) {
        let d = pair[1] - pair[0];
        let moving = d.iter().filter(|c| c.abs() > 1e-12).count();
        assert_eq!(moving, 1, "segment {pair:?} is not axis aligned");
    }
}

#[test]
fn endpoints_must_belong_to_a_region() {
    let (mut g, mut router) = scene(false);
    g.add_node(Node::new("loose"));
    let err = router
        .add_connection("a", "loose", ConnectionType::Direct)
        .unwrap_err();
    assert!(matches!(err, Error::MissingNode { id } if id == "loose"));
}

#[test]
fn membership_changes_rebuild_the_routing_graph() {
    let (g, mut router) = scene(true);
    let before = router.routing_graph().len();
    router.remove_node("m");
    router.refresh(&g);
    router.remove_region("middle");
    let after = router.routing_graph().len();
    assert!(after < before);
    assert!(router.connections().next().is_none());
}

use trellis_graph::{Edge, Graph, GraphDocument, GraphError, GraphEvent, Node, Vec3};

fn path_graph() -> Graph {
    let mut g = Graph::new();
    g.add_node(Node::at("a", 0.0, 0.0, 0.0));
    g.add_node(Node::at("b", 10.0, 0.0, 0.0));
    g.add_node(Node::at("c", 20.0, 0.0, 0.0));
    g.add_edge(Edge::new("ab", "a", "b")).unwrap();
    g.add_edge(Edge::new("bc", "b", "c")).unwrap();
    g
}

#[test]
fn add_edge_rejects_missing_endpoint() {
    let mut g = path_graph();
    let err = g.add_edge(Edge::new("ax", "a", "x")).unwrap_err();
    assert_eq!(
        err,
        GraphError::MissingEndpoint {
            edge_id: "ax".to_string(),
            node_id: "x".to_string(),
        }
    );
    assert_eq!(g.edge_count(), 2);
}

#[test]
fn neighbors_and_degree_follow_incident_edges() {
    let g = path_graph();
    assert_eq!(g.neighbors("b"), vec!["a", "c"]);
    assert_eq!(g.degree("b"), 2);
    assert_eq!(g.degree("a"), 1);
    assert_eq!(g.successors("a"), vec!["b"]);
    assert_eq!(g.in_degree("a"), 0);
    assert_eq!(g.in_degree("c"), 1);
}

#[test]
fn remove_node_drops_incident_edges_only() {
    let mut g = path_graph();
    g.add_edge(Edge::new("ac", "a", "c")).unwrap();

    let (node, removed) = g.remove_node("b").unwrap();
    assert_eq!(node.id, "b");
    assert_eq!(removed, vec!["ab".to_string(), "bc".to_string()]);
    assert_eq!(g.edge_count(), 1);
    assert_eq!(g.neighbors("a"), vec!["c"]);
}

#[test]
fn replacing_an_edge_updates_the_incident_index() {
    let mut g = path_graph();
    g.add_edge(Edge::new("ab", "a", "c")).unwrap();
    assert_eq!(g.neighbors("b"), vec!["c"]);
    assert_eq!(g.neighbors("a"), vec!["c"]);
}

#[test]
fn positions_snapshot_round_trips() {
    let mut g = path_graph();
    let snapshot = g.positions();
    g.set_position("a", Vec3::new(5.0, 5.0, 5.0));
    g.restore_positions(&snapshot);
    assert_eq!(g.position("a"), Some(Vec3::zeros()));
    assert_eq!(
        g.bounds(),
        Some((Vec3::new(0.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 0.0)))
    );
}

#[test]
fn events_are_queued_until_drained() {
    let mut g = Graph::new();
    g.emit(GraphEvent::LayoutStarted {
        name: "grid".to_string(),
    });
    assert_eq!(g.events().len(), 1);
    assert_eq!(g.events()[0].name(), "layout:started");
    assert_eq!(g.drain_events().len(), 1);
    assert!(g.events().is_empty());
}

#[test]
fn document_uses_camel_case_fields() {
    let json = r#"{
        "nodes": [
            {"id": "a", "position": [1.0, 2.0, 3.0], "isPinned": true},
            {"id": "b", "data": {"isContainer": true, "childLayout": "grid"}}
        ],
        "edges": [{"id": "ab", "source": "a", "target": "b", "data": {"idealLength": 80.0}}]
    }"#;
    let doc: GraphDocument = serde_json::from_str(json).unwrap();
    let g = Graph::from_document(doc).unwrap();
    let a = g.node("a").unwrap();
    assert!(a.is_pinned);
    assert_eq!(a.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(a.mass, 1.0);
    assert!(g.node("b").unwrap().data.is_container);
    assert_eq!(g.edge("ab").unwrap().data.ideal_length, Some(80.0));
}

#[test]
fn event_serializes_with_layout_prefixed_tag() {
    let event = GraphEvent::LayoutAdapted {
        from: "grid".to_string(),
        to: "force".to_string(),
        reason: "dense".to_string(),
    };
    let v = serde_json::to_value(&event).unwrap();
    assert_eq!(v["type"], "layout:adapted");
    assert_eq!(v["to"], "force");
}

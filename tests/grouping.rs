use blocknest::editor::{DEFAULT_GROUP_NAME, group_blocks};
use blocknest::error::DiagramError;
use blocknest::model::{Block, Diagram, Port, PortRef, Side};
use blocknest::resolver::flattened_connections;

fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn sorted_flat(d: &Diagram) -> Vec<(PortRef, PortRef)> {
    let mut edges = flattened_connections(d);
    edges.sort();
    edges
}

/// a -> b -> c -> d, every block on the top level.
fn chain() -> Diagram {
    let a = Block::new("a", "A")
        .at(0.0, 0.0)
        .with_port(Port::new("o1", "alpha", Side::Right).targeting("b", "i1"));
    let b = Block::new("b", "B")
        .at(200.0, 40.0)
        .with_port(Port::new("i1", "in", Side::Left))
        .with_port(Port::new("o1", "out", Side::Right).targeting("c", "i1"));
    let c = Block::new("c", "C")
        .at(400.0, 10.0)
        .with_port(Port::new("i1", "in", Side::Left))
        .with_port(Port::new("o1", "out", Side::Right).targeting("d", "i1"));
    let d = Block::new("d", "D")
        .at(600.0, 10.0)
        .with_port(Port::new("i1", "sink", Side::Left));
    let mut diagram = Diagram::new("chain", "Chain");
    diagram.blocks = vec![a, b, c, d];
    diagram
}

#[test]
fn test_internal_edge_needs_no_proxy() {
    let mut d = Diagram::new("d", "D");
    d.blocks = vec![
        Block::new("a", "A")
            .at(10.0, 20.0)
            .with_port(Port::new("o1", "out", Side::Right).targeting("b", "i1")),
        Block::new("b", "B")
            .at(200.0, 50.0)
            .with_port(Port::new("i1", "in", Side::Left)),
    ];

    let before = d.clone();
    let err = group_blocks(&mut d, &[], &ids(&["a"]), DEFAULT_GROUP_NAME).unwrap_err();
    assert!(matches!(err, DiagramError::InsufficientSelection { selected: 1 }));
    assert_eq!(d, before);

    let outcome = group_blocks(&mut d, &[], &ids(&["a", "b"]), DEFAULT_GROUP_NAME).unwrap();
    assert_eq!((outcome.inputs, outcome.outputs), (0, 0));
    assert_eq!(d.blocks.len(), 1);

    let g = &d.blocks[0];
    assert_eq!(g.name, DEFAULT_GROUP_NAME);
    assert!(g.ports.is_empty());
    assert_eq!((g.x, g.y), (Some(10.0), Some(20.0)));
    let kids = g.children();
    assert_eq!((kids[0].x, kids[0].y), (Some(0.0), Some(0.0)));
    assert_eq!((kids[1].x, kids[1].y), (Some(190.0), Some(30.0)));
    assert_eq!(kids[0].ports[0].target, Some(PortRef::new("b", "i1")));
}

#[test]
fn test_incoming_edge_gets_left_proxy() {
    let mut d = Diagram::new("d", "D");
    d.blocks = vec![
        Block::new("a", "A").with_port(Port::new("o1", "feed", Side::Right).targeting("b", "i1")),
        Block::new("b", "B").with_port(Port::new("i1", "in", Side::Left)),
        Block::new("c", "C"),
    ];

    let outcome = group_blocks(&mut d, &[], &ids(&["b", "c"]), "Pair").unwrap();
    assert_eq!(outcome.group_id, "g1");
    assert_eq!((outcome.inputs, outcome.outputs), (1, 0));

    let g = d.lookup("g1").unwrap();
    assert_eq!(g.name, "Pair");
    assert_eq!(g.ports.len(), 1);
    let proxy = &g.ports[0];
    assert_eq!(proxy.id, "g1-in-0");
    assert_eq!(proxy.side, Side::Left);
    assert_eq!(proxy.name.as_deref(), Some("feed"));
    assert_eq!(proxy.target, Some(PortRef::new("b", "i1")));

    assert_eq!(
        d.lookup("a").unwrap().ports[0].target,
        Some(PortRef::new("g1", "g1-in-0"))
    );
    assert_eq!(d.lookup("b").unwrap().ports[0].target, None);
    assert_eq!(
        flattened_connections(&d),
        vec![(PortRef::new("a", "o1"), PortRef::new("b", "i1"))]
    );
}

#[test]
fn test_fan_in_shares_one_proxy() {
    let mut d = chain();
    d.blocks.push(
        Block::new("e", "E")
            .at(0.0, 200.0)
            .with_port(Port::new("o1", "", Side::Right).targeting("b", "i1")),
    );
    let before = sorted_flat(&d);

    let outcome = group_blocks(&mut d, &[], &ids(&["b", "c"]), DEFAULT_GROUP_NAME).unwrap();
    assert_eq!((outcome.inputs, outcome.outputs), (1, 1));
    let proxy = PortRef::new("g1", "g1-in-1");
    assert_eq!(d.lookup("a").unwrap().ports[0].target.as_ref(), Some(&proxy));
    assert_eq!(d.lookup("e").unwrap().ports[0].target.as_ref(), Some(&proxy));
    assert_eq!(sorted_flat(&d), before);
}

#[test]
fn test_grouping_preserves_every_edge() {
    let mut d = chain();
    let before = sorted_flat(&d);
    group_blocks(&mut d, &[], &ids(&["c", "b"]), DEFAULT_GROUP_NAME).unwrap();
    assert_eq!(sorted_flat(&d), before);
    d.validate().unwrap();
}

#[test]
fn test_nested_grouping_chains_proxies() {
    let mut d = chain();
    let before = sorted_flat(&d);
    group_blocks(&mut d, &[], &ids(&["b", "c"]), DEFAULT_GROUP_NAME).unwrap();

    let path = ids(&["g1"]);
    let outcome = group_blocks(&mut d, &path, &ids(&["b", "c"]), "Inner").unwrap();
    assert_eq!(outcome.group_id, "g2");
    assert_eq!((outcome.inputs, outcome.outputs), (1, 1));

    let g1 = d.lookup("g1").unwrap();
    assert_eq!(g1.children().len(), 1);
    assert_eq!(g1.children()[0].id, "g2");
    assert_eq!(d.path_to("b"), Some(ids(&["g1", "g2"])));

    // the outer group's ports now feed and drain the inner group
    let g2 = d.lookup("g2").unwrap();
    assert_eq!(g2.ports[0].target, Some(PortRef::new("g1", "g1-out-0")));
    assert_eq!(
        g1.port("g1-in-1").unwrap().target,
        Some(PortRef::new("g2", &g2.ports[1].id))
    );
    assert_eq!(sorted_flat(&d), before);
    d.validate().unwrap();
}

#[test]
fn test_group_ids_never_reused() {
    let mut d = chain();
    let first = group_blocks(&mut d, &[], &ids(&["a", "b"]), DEFAULT_GROUP_NAME).unwrap();
    let second = group_blocks(&mut d, &[], &ids(&["c", "d"]), DEFAULT_GROUP_NAME).unwrap();
    assert_eq!(first.group_id, "g1");
    assert_eq!(second.group_id, "g2");

    let mut port_ids: Vec<String> = Vec::new();
    d.walk_blocks(&mut |_, b| {
        if b.id.starts_with('g') {
            port_ids.extend(b.ports.iter().map(|p| format!("{}:{}", b.id, p.id)));
        }
    });
    let count = port_ids.len();
    port_ids.sort();
    port_ids.dedup();
    assert_eq!(port_ids.len(), count);
    d.validate().unwrap();
}

#[test]
fn test_block_from_another_frame_rejected() {
    let mut d = chain();
    group_blocks(&mut d, &[], &ids(&["b", "c"]), DEFAULT_GROUP_NAME).unwrap();
    let before = d.clone();
    assert!(matches!(
        group_blocks(&mut d, &[], &ids(&["a", "b"]), DEFAULT_GROUP_NAME),
        Err(DiagramError::NotFound { .. })
    ));
    assert_eq!(d, before);
}

#[test]
fn test_group_id_with_exhausted_suffix() {
    let mut d = chain();
    d.blocks.push(Block::new("g18446744073709551615", "Imported"));
    let outcome = group_blocks(&mut d, &[], &ids(&["a", "b"]), DEFAULT_GROUP_NAME).unwrap();
    assert_eq!(outcome.group_id, "g1");
    d.validate().unwrap();
}

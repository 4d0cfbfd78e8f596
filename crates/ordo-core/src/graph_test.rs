use super::*;
use crate::params::ParameterValue;

fn m(title: &str, order: u64) -> Migration {
    Migration::builder("alice", title)
        .body(format!("SELECT '{title}'"))
        .natural_order(order)
        .build()
        .unwrap()
}

fn after(title: &str, order: u64, previous: &[&str]) -> Migration {
    Migration::builder("alice", title)
        .body(format!("SELECT '{title}'"))
        .natural_order(order)
        .param(ParameterValue::RunAfter(
            previous.iter().map(|p| MigrationName::new(*p)).collect(),
        ))
        .build()
        .unwrap()
}

fn before(title: &str, order: u64, next: &[&str]) -> Migration {
    Migration::builder("alice", title)
        .body(format!("SELECT '{title}'"))
        .natural_order(order)
        .param(ParameterValue::RunBefore(
            next.iter().map(|n| MigrationName::new(*n)).collect(),
        ))
        .build()
        .unwrap()
}

fn order(graph: &MigrationGraph) -> Vec<String> {
    graph
        .ordered_names()
        .into_iter()
        .map(String::from)
        .collect()
}

#[test]
fn test_independent_migrations_keep_natural_order() {
    let graph = MigrationGraph::build(vec![m("t1", 1), m("t2", 2)]).unwrap();
    assert_eq!(order(&graph), vec!["t1", "t2"]);
    assert_eq!(graph.clusters().len(), 2);

    let graph = MigrationGraph::build(vec![m("t3", 3), m("t1", 1), m("t2", 2)]).unwrap();
    assert_eq!(order(&graph), vec!["t1", "t2", "t3"]);
}

#[test]
fn test_run_after_regardless_of_input_order() {
    let graph = MigrationGraph::build(vec![after("t2", 2, &["t1"]), m("t1", 1)]).unwrap();
    assert_eq!(order(&graph), vec!["t1", "t2"]);

    let graph = MigrationGraph::build(vec![m("t1", 1), after("t2", 2, &["t1"])]).unwrap();
    assert_eq!(order(&graph), vec!["t1", "t2"]);
}

#[test]
fn test_run_after_overrides_natural_order() {
    // t1 is discovered first but must wait for t2
    let graph = MigrationGraph::build(vec![after("t1", 1, &["t2"]), m("t2", 2)]).unwrap();
    assert_eq!(order(&graph), vec!["t2", "t1"]);
}

#[test]
fn test_run_before_places_target_after() {
    let graph = MigrationGraph::build(vec![m("t1", 1), before("t2", 2, &["t1"])]).unwrap();
    assert_eq!(order(&graph), vec!["t2", "t1"]);
    assert_eq!(graph.next("t2")[0].name(), "t1");
    assert_eq!(graph.previous("t1")[0].name(), "t2");
}

#[test]
fn test_transitive_chain() {
    let graph = MigrationGraph::build(vec![
        after("c", 1, &["b"]),
        after("b", 2, &["a"]),
        m("a", 3),
        m("z", 0),
    ])
    .unwrap();
    // cluster {a,b,c} is keyed by its root a (3), after the lone z (0)
    assert_eq!(order(&graph), vec!["z", "a", "b", "c"]);
}

#[test]
fn test_two_node_cycle() {
    let err = MigrationGraph::build(vec![after("t1", 1, &["t2"]), after("t2", 2, &["t1"])])
        .unwrap_err();
    match err {
        CoreError::CircularDependency { cycle } => {
            assert!(cycle.contains("t1"));
            assert!(cycle.contains("t2"));
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_self_reference_is_cycle() {
    let err = MigrationGraph::build(vec![after("t1", 1, &["t1"])]).unwrap_err();
    assert!(matches!(
        err,
        CoreError::CircularDependency { ref cycle } if cycle == "t1 -> t1"
    ));
}

#[test]
fn test_cycle_with_root_attached() {
    // root -> a -> b -> a: still a cycle even though a root exists
    let err = MigrationGraph::build(vec![
        m("root", 1),
        after("a", 2, &["root", "b"]),
        after("b", 3, &["a"]),
    ])
    .unwrap_err();
    assert!(matches!(err, CoreError::CircularDependency { .. }));
}

#[test]
fn test_cycle_report_is_stable_execution_order() {
    let build = || {
        MigrationGraph::build(vec![
            m("root", 1),
            after("a", 2, &["root", "b"]),
            after("b", 3, &["a"]),
        ])
        .unwrap_err()
        .to_string()
    };
    let first = build();
    assert!(first.ends_with("a -> b -> a"), "got: {first}");
    for _ in 0..5 {
        assert_eq!(build(), first);
    }
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let graph = MigrationGraph::build(vec![
        m("top", 1),
        after("left", 2, &["top"]),
        after("right", 3, &["top"]),
        after("bottom", 4, &["left", "right"]),
    ])
    .unwrap();
    assert_eq!(order(&graph), vec!["top", "left", "right", "bottom"]);
    assert_eq!(graph.clusters().len(), 1);
}

#[test]
fn test_node_emitted_after_all_predecessors() {
    // bottom is reachable from a after one hop but must wait for the long branch
    let graph = MigrationGraph::build(vec![
        m("a", 1),
        after("long1", 2, &["a"]),
        after("long2", 3, &["long1"]),
        after("bottom", 4, &["a", "long2"]),
    ])
    .unwrap();
    assert_eq!(order(&graph), vec!["a", "long1", "long2", "bottom"]);
}

#[test]
fn test_shared_successor_merges_clusters() {
    let graph = MigrationGraph::build(vec![
        m("r1", 5),
        m("r2", 1),
        m("solo", 3),
        after("joined", 6, &["r1", "r2"]),
    ])
    .unwrap();

    assert_eq!(graph.clusters().len(), 2);
    let merged = &graph.clusters()[0];
    assert_eq!(merged.key(), 1);
    assert_eq!(merged.roots(), &[MigrationName::new("r2"), MigrationName::new("r1")]);
    assert_eq!(order(&graph), vec!["r2", "r1", "joined", "solo"]);
}

#[test]
fn test_unknown_reference() {
    let err = MigrationGraph::build(vec![after("t1", 1, &["missing"])]).unwrap_err();
    match err {
        CoreError::UnknownReference {
            migration,
            constraint,
            target,
        } => {
            assert_eq!(migration, "t1");
            assert_eq!(constraint, "runAfter");
            assert_eq!(target, "missing");
        }
        other => panic!("expected unknown reference, got {other:?}"),
    }
}

#[test]
fn test_duplicate_name() {
    let err = MigrationGraph::build(vec![m("t1", 1), m("t1", 2)]).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateMigration { ref name } if name == "t1"));
}

#[test]
fn test_duplicate_edges_collapse() {
    let graph =
        MigrationGraph::build(vec![m("t1", 1), after("t2", 2, &["t1"]), before("t0", 0, &["t2"])])
            .unwrap();
    assert_eq!(graph.previous("t2").len(), 2);

    let graph = MigrationGraph::build(vec![before("t1", 1, &["t2"]), after("t2", 2, &["t1"])])
        .unwrap();
    assert_eq!(graph.previous("t2").len(), 1);
    assert_eq!(order(&graph), vec!["t1", "t2"]);
}

#[test]
fn test_ordering_is_deterministic() {
    let build = || {
        MigrationGraph::build(vec![
            after("d", 4, &["b"]),
            m("a", 1),
            after("b", 2, &["a"]),
            after("c", 3, &["a"]),
        ])
        .unwrap()
    };
    let first = order(&build());
    for _ in 0..5 {
        assert_eq!(order(&build()), first);
    }
    assert_eq!(first, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_into_ordered_and_lookup() {
    let graph = MigrationGraph::build(vec![after("t2", 2, &["t1"]), m("t1", 1)]).unwrap();
    assert!(graph.contains("t1"));
    assert!(!graph.contains("t3"));
    assert_eq!(graph.get("t2").unwrap().natural_order(), 2);
    assert_eq!(graph.len(), 2);

    let migrations = graph.into_ordered();
    let names: Vec<&str> = migrations.iter().map(|m| m.name().as_str()).collect();
    assert_eq!(names, vec!["t1", "t2"]);
}

#[test]
fn test_empty_graph() {
    let graph = MigrationGraph::build(Vec::new()).unwrap();
    assert!(graph.is_empty());
    assert!(graph.clusters().is_empty());
}

//! Migration ordering graph and cluster partitioning

use crate::error::{CoreError, CoreResult};
use crate::migration::Migration;
use crate::migration_name::MigrationName;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// A maximal weakly-connected group of migrations, ordered on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    key: u64,
    roots: Vec<MigrationName>,
    members: Vec<MigrationName>,
}

impl Cluster {
    /// Smallest natural order among the roots
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Members without predecessors, by natural order
    pub fn roots(&self) -> &[MigrationName] {
        &self.roots
    }

    /// Members in execution order
    pub fn members(&self) -> &[MigrationName] {
        &self.members
    }
}

/// Directed graph of migrations; an edge `a -> b` means `a` runs before `b`.
///
/// Built once from the parsed migrations and immutable afterwards.
#[derive(Debug)]
pub struct MigrationGraph {
    /// The underlying graph
    graph: DiGraph<Migration, ()>,

    /// Map from migration name to node index
    node_map: HashMap<MigrationName, NodeIndex>,

    /// Clusters sorted by key
    clusters: Vec<Cluster>,

    /// Final execution order
    order: Vec<NodeIndex>,
}

/// Visitation state of one root search, kept outside the nodes
#[derive(Default)]
struct RootSearch {
    path: Vec<NodeIndex>,
    finished: HashSet<NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl MigrationGraph {
    /// Build the graph, validate references and cycles, and compute the order
    pub fn build(migrations: Vec<Migration>) -> CoreResult<Self> {
        let mut graph = DiGraph::with_capacity(migrations.len(), migrations.len());
        let mut node_map = HashMap::with_capacity(migrations.len());

        for migration in migrations {
            if node_map.contains_key(migration.name().as_str()) {
                return Err(CoreError::DuplicateMigration {
                    name: migration.name().to_string(),
                });
            }
            let name = migration.name().clone();
            let idx = graph.add_node(migration);
            node_map.insert(name, idx);
        }

        let mut edges = Vec::new();
        for idx in graph.node_indices() {
            let migration = &graph[idx];
            for target in migration.explicit_previous_names() {
                let prev = resolve(&node_map, migration, "runAfter", target)?;
                edges.push((prev, idx));
            }
            for target in migration.explicit_next_names() {
                let next = resolve(&node_map, migration, "runBefore", target)?;
                edges.push((idx, next));
            }
        }
        for (from, to) in edges {
            graph.update_edge(from, to, ());
        }

        let mut dag = Self {
            graph,
            node_map,
            clusters: Vec::new(),
            order: Vec::new(),
        };
        dag.partition()?;

        log::debug!(
            "Built migration graph: {} migrations in {} clusters",
            dag.len(),
            dag.clusters.len()
        );
        Ok(dag)
    }

    /// Split into clusters, order each one, then order the clusters by key
    fn partition(&mut self) -> CoreResult<()> {
        let mut assigned = vec![false; self.graph.node_count()];
        let mut clusters = Vec::new();

        for start in self.graph.node_indices() {
            if assigned[start.index()] {
                continue;
            }
            let members = self.component(start);
            for idx in &members {
                assigned[idx.index()] = true;
            }

            let roots = self.find_roots(&members)?;
            let ordered = self.traverse(&roots, members.len());
            let key = roots
                .iter()
                .map(|&idx| self.graph[idx].natural_order())
                .min()
                .unwrap_or_else(|| self.graph[start].natural_order());
            clusters.push((key, roots, ordered));
        }

        clusters.sort_by_key(|(key, _, _)| *key);

        self.order = clusters
            .iter()
            .flat_map(|(_, _, ordered)| ordered.iter().copied())
            .collect();
        self.clusters = clusters
            .into_iter()
            .map(|(key, roots, ordered)| Cluster {
                key,
                roots: self.names(&roots),
                members: self.names(&ordered),
            })
            .collect();
        Ok(())
    }

    /// Weakly-connected component containing `start`
    fn component(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut members = Vec::new();
        while let Some(idx) = queue.pop_front() {
            members.push(idx);
            for neighbor in self.graph.neighbors_undirected(idx) {
                if seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members
    }

    /// Roots of a cluster, sorted by natural order.
    ///
    /// Walks predecessors from every member. Reaching a node on the current
    /// path is a cycle; reaching a finished node is a reconvergent path.
    fn find_roots(&self, members: &[NodeIndex]) -> CoreResult<Vec<NodeIndex>> {
        let mut search = RootSearch::default();
        for &idx in members {
            self.collect_roots(idx, &mut search)?;
        }
        let mut roots = search.roots;
        roots.sort_by(|&a, &b| self.sort_key(a).cmp(&self.sort_key(b)));
        Ok(roots)
    }

    fn collect_roots(&self, idx: NodeIndex, search: &mut RootSearch) -> CoreResult<()> {
        if search.finished.contains(&idx) {
            return Ok(());
        }
        if let Some(pos) = search.path.iter().position(|&n| n == idx) {
            // path runs from successor to predecessor; report it in execution order
            let cycle: Vec<String> = std::iter::once(&idx)
                .chain(search.path[pos..].iter().rev())
                .map(|&n| self.graph[n].name().to_string())
                .collect();
            return Err(CoreError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }

        search.path.push(idx);
        let mut has_previous = false;
        for prev in self.graph.neighbors_directed(idx, Direction::Incoming) {
            has_previous = true;
            self.collect_roots(prev, search)?;
        }
        if !has_previous {
            search.roots.push(idx);
        }
        search.path.pop();
        search.finished.insert(idx);
        Ok(())
    }

    /// Breadth-first from the roots; a node is emitted once all its
    /// predecessors have been emitted.
    ///
    /// Cycles are rejected by `find_roots`, so every member is reached.
    fn traverse(&self, roots: &[NodeIndex], size: usize) -> Vec<NodeIndex> {
        let mut pending: HashMap<NodeIndex, usize> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = roots.iter().copied().collect();
        let mut ordered = Vec::with_capacity(size);

        while let Some(idx) = queue.pop_front() {
            ordered.push(idx);
            for next in self.successors(idx) {
                let left = pending.entry(next).or_insert_with(|| {
                    self.graph
                        .neighbors_directed(next, Direction::Incoming)
                        .count()
                });
                *left -= 1;
                if *left == 0 {
                    queue.push_back(next);
                }
            }
        }

        debug_assert_eq!(ordered.len(), size, "acyclic cluster fully traversed");
        ordered
    }

    /// Direct successors sorted by natural order
    fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        next.sort_by(|&a, &b| self.sort_key(a).cmp(&self.sort_key(b)));
        next
    }

    fn sort_key(&self, idx: NodeIndex) -> (u64, &str) {
        let migration = &self.graph[idx];
        (migration.natural_order(), migration.name().as_str())
    }

    fn names(&self, indices: &[NodeIndex]) -> Vec<MigrationName> {
        indices
            .iter()
            .map(|&idx| self.graph[idx].name().clone())
            .collect()
    }

    /// Clusters in execution order
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// All migrations in execution order
    pub fn ordered_migrations(&self) -> Vec<&Migration> {
        self.order.iter().map(|&idx| &self.graph[idx]).collect()
    }

    /// Migration names in execution order
    pub fn ordered_names(&self) -> Vec<MigrationName> {
        self.names(&self.order)
    }

    /// Consume the graph, returning the migrations in execution order
    pub fn into_ordered(self) -> Vec<Migration> {
        let (nodes, _) = self.graph.into_nodes_edges();
        let mut slots: Vec<Option<Migration>> = nodes.into_iter().map(|n| Some(n.weight)).collect();
        self.order
            .iter()
            .filter_map(|idx| slots[idx.index()].take())
            .collect()
    }

    /// Look up a migration by name
    pub fn get(&self, name: &str) -> Option<&Migration> {
        self.node_map.get(name).map(|&idx| &self.graph[idx])
    }

    /// Migrations with an edge into `name`
    pub fn previous(&self, name: &str) -> Vec<&Migration> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Migrations with an edge from `name`
    pub fn next(&self, name: &str) -> Vec<&Migration> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&Migration> {
        let Some(&idx) = self.node_map.get(name) else {
            return Vec::new();
        };
        let mut found: Vec<&Migration> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n])
            .collect();
        found.sort_by_key(|m| m.natural_order());
        found
    }

    /// Check if a migration exists in the graph
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

fn resolve(
    node_map: &HashMap<MigrationName, NodeIndex>,
    migration: &Migration,
    constraint: &str,
    target: &MigrationName,
) -> CoreResult<NodeIndex> {
    node_map
        .get(target.as_str())
        .copied()
        .ok_or_else(|| CoreError::UnknownReference {
            migration: migration.name().to_string(),
            constraint: constraint.to_string(),
            target: target.to_string(),
        })
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;

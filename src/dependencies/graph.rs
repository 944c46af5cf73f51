//! Import graph between dependencies
//!
//! Nodes are dependency names, edges point from an importing contract to
//! the contract it imports. Edges keep the order they were discovered in.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(index) = self.nodes.get(name) {
            return *index;
        }
        let index = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), index);
        index
    }

    /// Record that `from` imports `to`; repeated edges are kept once
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Node names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|index| self.graph[index].as_str())
            .collect()
    }

    /// What `name` imports, in discovery order
    pub fn imports_of(&self, name: &str) -> Vec<&str> {
        let Some(index) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges(*index)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges
            .into_iter()
            .map(|(_, target)| self.graph[target].as_str())
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_keep_discovery_order() {
        let mut graph = ImportGraph::new();
        graph.add_edge("Foo", "Bar");
        graph.add_edge("Foo", "Baz");
        graph.add_edge("Foo", "Bar");
        assert_eq!(graph.imports_of("Foo"), vec!["Bar", "Baz"]);
        assert_eq!(graph.names(), vec!["Foo", "Bar", "Baz"]);
        assert_eq!(graph.edge_count(), 2);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let mut graph = ImportGraph::new();
        graph.add_edge("Loop", "Loop");
        assert!(graph.has_cycle());
        assert!(graph.imports_of("Missing").is_empty());
    }
}

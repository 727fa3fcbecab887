use crate::catalog::{ConnectionKind, ConnectivityCatalog, PairKey, RegionCatalog};
use crate::topology::GraphTopology;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// A connection in a request-scoped graph, carrying its mutable weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub key: PairKey,
    pub kind: ConnectionKind,
    pub baseline_weight: f64,
    pub current_weight: f64,
}

/// The catalog restricted to regions with textual evidence.
///
/// Every edge's endpoints are vertices. Built per request and never shared.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilteredGraph {
    vertices: Vec<String>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    vertex_ids: BTreeMap<String, u32>,
    #[serde(skip)]
    topology: GraphTopology,
}

impl FilteredGraph {
    fn add_vertex(&mut self, code: &str) {
        let id = self.topology.add_node();
        self.vertex_ids.insert(code.to_string(), id);
        self.vertices.push(code.to_string());
    }

    fn add_edge(&mut self, edge: GraphEdge) {
        let src = self.vertex_ids.get(edge.key.first()).copied();
        let dst = self.vertex_ids.get(edge.key.second()).copied();
        if let (Some(src), Some(dst)) = (src, dst) {
            let edge_id = self.edges.len() as u32;
            self.topology.add_edge(src, dst, edge_id);
            self.edges.push(edge);
        }
    }

    /// Vertex codes in ascending order
    pub fn vertices(&self) -> &[String] {
        &self.vertices
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Only weights may change after construction; keys are fixed by the builder.
    pub(crate) fn edges_mut(&mut self) -> &mut [GraphEdge] {
        &mut self.edges
    }

    pub fn contains(&self, code: &str) -> bool {
        self.vertex_ids.contains_key(code)
    }

    pub fn edge(&self, key: &PairKey) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| &e.key == key)
    }

    /// Adjacent vertices with the connecting edge.
    pub fn neighbors(&self, code: &str) -> Vec<(&str, &GraphEdge)> {
        let Some(&id) = self.vertex_ids.get(code) else {
            return Vec::new();
        };
        self.topology
            .neighbors(id)
            .map(|(neighbor, edge_id)| {
                (
                    self.vertices[neighbor as usize].as_str(),
                    &self.edges[edge_id as usize],
                )
            })
            .collect()
    }

    pub fn degree(&self, code: &str) -> usize {
        self.vertex_ids
            .get(code)
            .map(|&id| self.topology.degree(id))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// What was left out while building a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Confirmed codes with no catalog entry
    pub missing_codes: Vec<String>,
    /// Catalog edges touching the vertex set whose other endpoint is not a vertex
    pub omitted_edges: usize,
}

pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build(
        confirmed: &BTreeSet<String>,
        regions: &RegionCatalog,
        connections: &ConnectivityCatalog,
    ) -> (FilteredGraph, BuildReport) {
        let mut graph = FilteredGraph::default();
        let mut report = BuildReport::default();

        for code in confirmed {
            if regions.contains(code) {
                graph.add_vertex(code);
            } else {
                warn!(code = %code, "Confirmed region missing from catalog, skipping");
                report.missing_codes.push(code.clone());
            }
        }

        for edge in connections.iter() {
            let a = graph.contains(edge.endpoint_a());
            let b = graph.contains(edge.endpoint_b());
            match (a, b) {
                (true, true) => graph.add_edge(GraphEdge {
                    key: edge.key.clone(),
                    kind: edge.kind,
                    baseline_weight: edge.baseline_weight,
                    current_weight: edge.baseline_weight,
                }),
                (true, false) | (false, true) => report.omitted_edges += 1,
                (false, false) => {}
            }
        }

        info!(
            vertices = graph.vertices.len(),
            edges = graph.edges.len(),
            missing = report.missing_codes.len(),
            "Filtered graph built"
        );
        (graph, report)
    }
}

pub mod topology {
    use serde::{Deserialize, Serialize};

    /// Undirected graph topology represented as an adjacency list.
    /// Vertex and edge ids are dense indices owned by the enclosing graph.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct GraphTopology {
        /// Adjacency list: VertexID -> Vec<(NeighborID, EdgeID)>
        pub adj: Vec<Vec<(u32, u32)>>,
    }

    impl GraphTopology {
        pub fn new() -> Self {
            Self { adj: Vec::new() }
        }

        pub fn num_nodes(&self) -> usize {
            self.adj.len()
        }

        /// Each undirected edge is stored once per endpoint.
        pub fn num_edges(&self) -> usize {
            self.adj.iter().map(|neighbors| neighbors.len()).sum::<usize>() / 2
        }

        pub fn neighbors(&self, node_id: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
            self.adj
                .get(node_id as usize)
                .into_iter()
                .flatten()
                .cloned()
        }

        pub fn degree(&self, node_id: u32) -> usize {
            self.adj.get(node_id as usize).map(Vec::len).unwrap_or(0)
        }

        pub fn add_node(&mut self) -> u32 {
            let id = self.adj.len() as u32;
            self.adj.push(Vec::new());
            id
        }

        pub fn add_edge(&mut self, a: u32, b: u32, edge_id: u32) {
            if a as usize >= self.adj.len() || b as usize >= self.adj.len() || a == b {
                return;
            }
            self.adj[a as usize].push((b, edge_id));
            self.adj[b as usize].push((a, edge_id));
        }
    }

}

pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod mention;
pub mod modulation;
pub mod processor;
pub mod simulation;

pub use catalog::{ConnectionEdge, ConnectionKind, PairKey, ReferenceCatalog, Region};
pub use graph::{FilteredGraph, GraphBuilder};
pub use mention::{AliasIndex, Document, MentionEvidence, MentionExtractor};
pub use modulation::{ConnectivityModulator, PerturbationProfile, WeightDelta};
pub use simulation::{Simulation, SimulationOutcome};

//! Point/line connectivity as a petgraph graph.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use ps_core::{InvId, PhaseSet, UniId};

use crate::section::Section;

/// Edge payload: the line and the phase vanishing along it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopologyEdge {
    pub uni: UniId,
    pub out: PhaseSet,
}

/// Invariant points as nodes, lines bound at both ends as edges.
pub type TopologyGraph = UnGraph<InvId, TopologyEdge>;

impl Section {
    /// Build the point/line graph. Lines with an open end are left out.
    pub fn topology_graph(&self) -> TopologyGraph {
        let mut graph = TopologyGraph::default();
        let mut nodes: HashMap<InvId, NodeIndex> = HashMap::new();
        for (id, _) in self.invpoints() {
            nodes.insert(id, graph.add_node(id));
        }
        for (uid, uni) in self.unilines() {
            let (Some(b), Some(e)) = (uni.begin, uni.end) else {
                continue;
            };
            if let (Some(&nb), Some(&ne)) = (nodes.get(&b), nodes.get(&e)) {
                graph.add_edge(
                    nb,
                    ne,
                    TopologyEdge {
                        uni: uid,
                        out: uni.out.clone(),
                    },
                );
            }
        }
        graph
    }

    /// Points no stored line ends at.
    pub fn isolated_points(&self) -> Vec<InvId> {
        let referenced: HashSet<InvId> = self
            .unilines()
            .flat_map(|(_, uni)| [uni.begin, uni.end])
            .flatten()
            .collect();
        self.invpoints()
            .map(|(id, _)| id)
            .filter(|id| !referenced.contains(id))
            .collect()
    }
}

//! The network-bearing unit of evolution.

use crate::neural::NeuronGraph;

/// An evolvable individual owning exactly one [`NeuronGraph`].
///
/// Task-specific state (episode progress, recorded metrics) is opaque to the
/// engine. `Clone` must produce an independent copy; cloning the graph
/// already allocates fresh neuron identities.
pub trait Individual: Clone + Send {
    /// Wrap a freshly built graph
    fn from_graph(graph: NeuronGraph) -> Self;

    fn graph(&self) -> &NeuronGraph;

    fn graph_mut(&mut self) -> &mut NeuronGraph;
}

/// Minimal individual carrying nothing but its graph
#[derive(Clone, Debug)]
pub struct Network(pub NeuronGraph);

impl Individual for Network {
    fn from_graph(graph: NeuronGraph) -> Self {
        Network(graph)
    }

    fn graph(&self) -> &NeuronGraph {
        &self.0
    }

    fn graph_mut(&mut self) -> &mut NeuronGraph {
        &mut self.0
    }
}

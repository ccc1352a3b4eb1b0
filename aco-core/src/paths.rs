use crate::colony::Ant;
use aco_types::{EdgeId, NodeId};

/// Earliest recorded visit to a node, used to collapse a looped trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CycleCut {
    /// Number of steps kept, the revisited node being the last of them.
    pub(crate) prefix_len: u16,
    /// Summed length of the kept steps.
    pub(crate) prefix_length: f32,
    /// Edge the agent originally arrived on at the revisited node.
    pub(crate) closing_edge: EdgeId,
}

/// Per-agent step buffers laid out as fixed chunks in two flat vectors.
///
/// Chunk size equals the node count at sizing time, which bounds any simple
/// path. Entries at or beyond an agent's `path_idx` are stale and never read,
/// so the recorder has to be resized whenever the node count changes before a run.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathRecorder {
    chunk_size: usize,
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
}

impl PathRecorder {
    pub(crate) fn resize(&mut self, node_count: usize, ant_count: usize) {
        self.chunk_size = node_count;
        let total = node_count * ant_count;
        self.nodes.clear();
        self.nodes.resize(total, NodeId::EMPTY);
        self.edges.clear();
        self.edges.resize(total, EdgeId::EMPTY);
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Forgets the recorded trail. Stale entries stay in the chunk, gated by the index.
    pub(crate) fn start(&self, ant: &mut Ant) {
        ant.path_idx = 0;
    }

    /// Appends a step at the agent's path index. Callers guarantee the chunk
    /// has room: foraging truncates cycles before every step.
    pub(crate) fn record(&mut self, slot: usize, ant: &mut Ant, edge: EdgeId, node: NodeId) {
        debug_assert!(
            (ant.path_idx as usize) < self.chunk_size,
            "path chunk overflow for ant {slot}"
        );
        let p = self.offset(slot, ant.path_idx);
        self.edges[p] = edge;
        self.nodes[p] = node;
        ant.path_idx += 1;
    }

    pub(crate) fn step(&self, slot: usize, idx: u16) -> (EdgeId, NodeId) {
        let p = self.offset(slot, idx);
        (self.edges[p], self.nodes[p])
    }

    /// Scans the recorded prefix for the first visit to `node`.
    pub(crate) fn find_cycle(
        &self,
        slot: usize,
        ant: &Ant,
        node: NodeId,
        lengths: &[f32],
    ) -> Option<CycleCut> {
        let start = self.offset(slot, 0);
        let mut prefix_length = 0.0;
        for i in 0..ant.path_idx as usize {
            let edge = self.edges[start + i];
            prefix_length += lengths[edge.index()];
            if self.nodes[start + i] == node {
                return Some(CycleCut {
                    prefix_len: (i + 1) as u16,
                    prefix_length,
                    closing_edge: edge,
                });
            }
        }
        None
    }

    /// Recorded steps of one agent, oldest first.
    pub(crate) fn recorded(
        &self,
        slot: usize,
        ant: &Ant,
    ) -> impl Iterator<Item = (EdgeId, NodeId)> + '_ {
        let start = self.offset(slot, 0);
        let len = ant.path_idx as usize;
        self.edges[start..start + len]
            .iter()
            .copied()
            .zip(self.nodes[start..start + len].iter().copied())
    }

    fn offset(&self, slot: usize, idx: u16) -> usize {
        slot * self.chunk_size + idx as usize
    }
}

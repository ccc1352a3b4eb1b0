use aco_types::{AntPhase, AntView, EdgeId, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ant {
    pub(crate) source: NodeId,
    pub(crate) destination: NodeId,
    pub(crate) edge: Option<EdgeId>,
    /// Position along `edge`, 0 on departure. Anything `>= 1.0` means arrived.
    pub(crate) progress: f32,
    /// Length walked since leaving the nest, frozen while homing.
    pub(crate) path_length: f32,
    pub(crate) ttl: i32,
    pub(crate) phase: AntPhase,
    /// Steps recorded while foraging; backtracking cursor while homing.
    pub(crate) path_idx: u16,
}

impl Ant {
    /// The state every agent returns to after a round trip or an expired search:
    /// sitting at the nest, arrived, with an empty trail.
    pub(crate) fn at_nest(nest: NodeId, node_count: usize) -> Self {
        Self {
            source: nest,
            destination: nest,
            edge: None,
            progress: 1.0,
            path_length: 0.0,
            ttl: ttl_budget(node_count),
            phase: AntPhase::Foraging,
            path_idx: 0,
        }
    }

    pub(crate) fn is_foraging(&self) -> bool {
        self.phase == AntPhase::Foraging
    }

    pub(crate) fn view(&self, slot: usize) -> AntView {
        AntView {
            slot: slot as u32,
            source: self.source,
            destination: self.destination,
            edge: self.edge,
            progress: self.progress.min(1.0),
            phase: self.phase,
            path_len: self.path_idx,
        }
    }
}

pub(crate) fn ttl_budget(node_count: usize) -> i32 {
    i32::try_from(node_count.saturating_mul(2)).unwrap_or(i32::MAX)
}

/// Candidate edges and their weights for one roulette draw. Every selection
/// overwrites the buffers from the start; nothing carries over between calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectionScratch {
    pub(crate) edges: Vec<EdgeId>,
    pub(crate) weights: Vec<f32>,
}

impl SelectionScratch {
    pub(crate) fn reserve_for(&mut self, edge_count: usize) {
        self.edges.clear();
        self.weights.clear();
        self.edges.reserve(edge_count + 1);
        self.weights.reserve(edge_count + 1);
    }

    pub(crate) fn clear(&mut self) {
        self.edges.clear();
        self.weights.clear();
    }
}

/// Fixed pool of agents plus the trickle-start state.
#[derive(Debug, Clone, Default)]
pub(crate) struct Colony {
    pub(crate) ants: Vec<Ant>,
    pub(crate) actives: usize,
    pub(crate) activation_timer: f32,
    pub(crate) scratch: SelectionScratch,
}

impl Colony {
    pub(crate) fn populate(
        &mut self,
        count: usize,
        nest: NodeId,
        node_count: usize,
        edge_count: usize,
    ) {
        self.ants.clear();
        self.ants.resize(count, Ant::at_nest(nest, node_count));
        self.actives = 0;
        self.activation_timer = 0.0;
        self.scratch.reserve_for(edge_count);
    }

    pub(crate) fn clear(&mut self) {
        self.ants.clear();
        self.actives = 0;
        self.activation_timer = 0.0;
        self.scratch.clear();
    }

    /// Advances the trickle-start timer, activating at most one more agent.
    /// Returns whether an agent was activated.
    pub(crate) fn trickle(&mut self, elapsed_secs: f32, interval: f32) -> bool {
        if self.actives >= self.ants.len() {
            return false;
        }
        self.activation_timer += elapsed_secs;
        if self.activation_timer >= interval {
            self.activation_timer -= interval;
            self.actives += 1;
            return true;
        }
        false
    }

    pub(crate) fn activate_all(&mut self) -> usize {
        let newly = self.ants.len() - self.actives;
        self.actives = self.ants.len();
        newly
    }
}

use aco_config::{validate_colony_config, validate_params};
use aco_types::{
    AcoParams, AntView, ColonyConfig, ColonySnapshot, EdgeId, EdgeView, MetricsSnapshot, NodeId,
    NodeView, Point, RunState, TickDelta, HANDLE_LIMIT,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, warn};

mod colony;
mod graph;
mod graph_file;
mod grid;
mod paths;
mod pheromone;
mod routing;

#[cfg(test)]
mod tests;

pub use graph::GraphError;
pub use graph_file::{GraphFile, GraphFileError};
pub use pheromone::edge_width;

use colony::{Ant, Colony};
use graph::Graph;
use paths::PathRecorder;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid colony config: {0}")]
    InvalidConfig(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    GraphFile(#[from] GraphFileError),
    #[error("graph is locked while a run is active")]
    GraphLocked,
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("ant slot {0} does not exist")]
    UnknownAnt(usize),
    #[error("nest is not set")]
    NestMissing,
    #[error("nest node {0} has no exit")]
    NestIsolated(NodeId),
    #[error("food cannot be placed on the nest")]
    FoodOnNest,
    #[error("ant_count must be between 1 and {max}", max = HANDLE_LIMIT - 1)]
    InvalidAntCount(u32),
    #[error("ant_count can only change while the colony is not running")]
    ColonyRunning,
    #[error("simulation has not been started")]
    NotStarted,
}

/// The whole simulation context: graph, agents, parameters and clocks.
/// Nothing lives in statics; every engine call goes through this value.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: ColonyConfig,
    seed: u64,
    rng: ChaCha8Rng,
    tick: u64,
    run_state: RunState,
    graph: Graph,
    paths: PathRecorder,
    colony: Colony,
    nest: Option<NodeId>,
    food: Option<NodeId>,
    evaporation_timer: f32,
    metrics: MetricsSnapshot,
}

impl Simulation {
    pub fn new(config: ColonyConfig, seed: u64) -> Result<Self, SimError> {
        validate_colony_config(&config).map_err(SimError::InvalidConfig)?;

        Ok(Self {
            graph: Graph::new(config.geometry),
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            run_state: RunState::Editing,
            paths: PathRecorder::default(),
            colony: Colony::default(),
            nest: None,
            food: None,
            evaporation_timer: 0.0,
            metrics: MetricsSnapshot::default(),
        })
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn params(&self) -> &AcoParams {
        &self.config.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn nest(&self) -> Option<NodeId> {
        self.nest
    }

    pub fn food(&self) -> Option<NodeId> {
        self.food
    }

    pub fn is_graph_locked(&self) -> bool {
        self.run_state != RunState::Editing
    }

    // ---- graph editing -------------------------------------------------

    pub fn add_node(&mut self, x: i32, y: i32) -> Result<NodeId, SimError> {
        if self.is_graph_locked() {
            warn!("node placement refused: graph is locked");
            return Err(SimError::GraphLocked);
        }
        self.graph.add_node(x, y).map_err(|err| {
            warn!("node placement refused: {err}");
            SimError::from(err)
        })
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId, SimError> {
        if self.is_graph_locked() {
            warn!("edge insertion refused: graph is locked");
            return Err(SimError::GraphLocked);
        }
        let edge = self
            .graph
            .add_edge(a, b, self.config.params.pheromone_min)
            .map_err(|err| {
                warn!("edge insertion refused: {err}");
                SimError::from(err)
            })?;
        debug!(
            edge = edge.0,
            a = a.0,
            b = b.0,
            length = self.graph.length(edge),
            "edge added"
        );
        Ok(edge)
    }

    /// Node whose circle covers `point`, if any.
    pub fn locate_node(&self, point: Point) -> Option<NodeId> {
        self.graph
            .locate(point, self.config.geometry.pick_radius_sq())
    }

    pub fn set_nest(&mut self, nest: Option<NodeId>) -> Result<(), SimError> {
        if self.is_graph_locked() {
            return Err(SimError::GraphLocked);
        }
        if let Some(node) = nest {
            self.ensure_node(node)?;
            if self.food == Some(node) {
                self.food = None;
            }
        }
        self.nest = nest;
        Ok(())
    }

    /// Food may be moved while a run is active; it can never share the nest's node.
    pub fn set_food(&mut self, food: Option<NodeId>) -> Result<(), SimError> {
        if let Some(node) = food {
            self.ensure_node(node)?;
            if self.nest == Some(node) {
                return Err(SimError::FoodOnNest);
            }
        }
        self.food = food;
        Ok(())
    }

    // ---- parameters ----------------------------------------------------

    /// Takes effect immediately, including mid-run. Existing trails are pulled
    /// into the new pheromone bounds.
    pub fn set_params(&mut self, params: AcoParams) -> Result<(), SimError> {
        validate_params(&params).map_err(SimError::InvalidParams)?;
        self.apply_params(params);
        Ok(())
    }

    pub fn reset_params(&mut self) {
        self.apply_params(AcoParams::BASELINE);
    }

    pub fn set_ant_count(&mut self, count: u32) -> Result<(), SimError> {
        if self.run_state == RunState::Running {
            return Err(SimError::ColonyRunning);
        }
        if count == 0 || count >= u32::from(HANDLE_LIMIT) {
            return Err(SimError::InvalidAntCount(count));
        }
        self.config.ant_count = count;
        Ok(())
    }

    // ---- run control ---------------------------------------------------

    /// Locks the graph and releases the colony from the nest. Calling it on a
    /// started simulation restarts the run.
    pub fn start(&mut self) -> Result<(), SimError> {
        if self.run_state != RunState::Editing {
            return self.restart();
        }
        let nest = self.nest.ok_or(SimError::NestMissing)?;
        if self.graph.incident(nest).is_empty() {
            return Err(SimError::NestIsolated(nest));
        }
        if self.config.ant_count == 0 {
            return Err(SimError::InvalidAntCount(0));
        }

        self.initialize_colony(nest);
        self.run_state = RunState::Running;
        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            ants = self.config.ant_count,
            "colony started"
        );
        Ok(())
    }

    /// Fresh colony and trails on the same graph.
    pub fn restart(&mut self) -> Result<(), SimError> {
        if self.run_state == RunState::Editing {
            return Err(SimError::NotStarted);
        }
        let nest = self.nest.ok_or(SimError::NestMissing)?;
        self.initialize_colony(nest);
        self.reset_pheromones();
        debug!("colony restarted");
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<RunState, SimError> {
        self.run_state = match self.run_state {
            RunState::Editing => return Err(SimError::NotStarted),
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
        };
        Ok(self.run_state)
    }

    /// Drops the graph and the colony and returns to editing.
    pub fn reset(&mut self, seed: Option<u64>) {
        self.seed = seed.unwrap_or(self.seed);
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.tick = 0;
        self.run_state = RunState::Editing;
        self.graph.clear();
        self.paths = PathRecorder::default();
        self.colony.clear();
        self.nest = None;
        self.food = None;
        self.evaporation_timer = 0.0;
        self.metrics = MetricsSnapshot::default();
    }

    pub fn step_n(&mut self, count: u32, elapsed_secs: f32) -> Vec<TickDelta> {
        let mut deltas = Vec::with_capacity(count as usize);
        for _ in 0..count {
            deltas.push(self.tick(elapsed_secs));
        }
        deltas
    }

    /// One JSON snapshot per line: the current state, then one after every tick.
    pub fn export_trace_jsonl(
        &mut self,
        ticks: u32,
        elapsed_secs: f32,
    ) -> Result<Vec<String>, serde_json::Error> {
        let mut lines = Vec::with_capacity(ticks as usize + 1);
        lines.push(serde_json::to_string(&self.snapshot())?);
        for _ in 0..ticks {
            self.tick(elapsed_secs);
            lines.push(serde_json::to_string(&self.snapshot())?);
        }
        Ok(lines)
    }

    pub fn activate_all(&mut self) -> Result<usize, SimError> {
        if self.run_state == RunState::Editing {
            return Err(SimError::NotStarted);
        }
        let newly = self.colony.activate_all();
        self.metrics.active_ants = self.colony.actives as u32;
        Ok(newly)
    }

    pub fn reset_ant(&mut self, slot: usize) -> Result<(), SimError> {
        let nest = self.nest.ok_or(SimError::NestMissing)?;
        let node_count = self.graph.node_count();
        let ant = self
            .colony
            .ants
            .get_mut(slot)
            .ok_or(SimError::UnknownAnt(slot))?;
        *ant = Ant::at_nest(nest, node_count);
        Ok(())
    }

    pub fn reset_all_ants(&mut self) -> Result<(), SimError> {
        let nest = self.nest.ok_or(SimError::NestMissing)?;
        let node_count = self.graph.node_count();
        self.colony
            .ants
            .fill(Ant::at_nest(nest, node_count));
        Ok(())
    }

    // ---- queries -------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn active_ants(&self) -> usize {
        self.colony.actives
    }

    pub fn node(&self, id: NodeId) -> Option<NodeView> {
        self.graph.contains_node(id).then(|| NodeView {
            id,
            center: self.graph.center(id),
            degree: self.graph.incident(id).len() as u16,
        })
    }

    pub fn edge(&self, id: EdgeId) -> Option<EdgeView> {
        if id.index() >= self.graph.edge_count() {
            return None;
        }
        let (a, b) = self.graph.endpoints(id);
        let pheromone = self.graph.pheromone(id);
        Some(EdgeView {
            id,
            a,
            b,
            length: self.graph.length(id),
            pheromone,
            width: edge_width(pheromone, &self.config.params, &self.config.geometry),
        })
    }

    pub fn find_edge(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.graph.find_edge(a, b)
    }

    pub fn ant(&self, slot: usize) -> Option<AntView> {
        self.colony.ants.get(slot).map(|ant| ant.view(slot))
    }

    /// Nodes an agent has recorded since leaving the nest, oldest first. While
    /// homing, only the part still ahead of it is returned.
    pub fn ant_trail(&self, slot: usize) -> Option<Vec<NodeId>> {
        let ant = self.colony.ants.get(slot)?;
        Some(self.paths.recorded(slot, ant).map(|(_, node)| node).collect())
    }

    pub fn nodes(&self) -> Vec<NodeView> {
        (0..self.graph.node_count())
            .filter_map(|idx| NodeId::from_index(idx).and_then(|id| self.node(id)))
            .collect()
    }

    pub fn edges(&self) -> Vec<EdgeView> {
        (0..self.graph.edge_count())
            .filter_map(|idx| EdgeId::from_index(idx).and_then(|id| self.edge(id)))
            .collect()
    }

    /// Views of the agents that have been released from the nest.
    pub fn ants(&self) -> Vec<AntView> {
        self.colony.ants[..self.colony.actives]
            .iter()
            .enumerate()
            .map(|(slot, ant)| ant.view(slot))
            .collect()
    }

    pub fn snapshot(&self) -> ColonySnapshot {
        ColonySnapshot {
            tick: self.tick,
            rng_seed: self.seed,
            run_state: self.run_state,
            nest: self.nest,
            food: self.food,
            config: self.config.clone(),
            nodes: self.nodes(),
            edges: self.edges(),
            ants: self.ants(),
            metrics: self.metrics.clone(),
        }
    }

    fn apply_params(&mut self, params: AcoParams) {
        let previous = self.config.params;
        self.config.params = params;
        if previous.pheromone_min != params.pheromone_min
            || previous.pheromone_max != params.pheromone_max
        {
            self.clamp_pheromones();
            debug!(
                min = params.pheromone_min,
                max = params.pheromone_max,
                "pheromone bounds changed"
            );
        }
    }

    fn ensure_node(&self, node: NodeId) -> Result<(), SimError> {
        if self.graph.contains_node(node) {
            Ok(())
        } else {
            Err(SimError::UnknownNode(node))
        }
    }

    /// Path chunks are sized from the current node count, so this runs every
    /// time a run (re)starts on a possibly edited graph.
    fn initialize_colony(&mut self, nest: NodeId) {
        let ant_count = self.config.ant_count as usize;
        let node_count = self.graph.node_count();
        self.paths.resize(node_count, ant_count);
        self.colony
            .populate(ant_count, nest, node_count, self.graph.edge_count());
        self.clamp_pheromones();
        self.evaporation_timer = 0.0;
        self.metrics.active_ants = 0;
    }

    fn debug_assert_consistent_state(&self) {
        if cfg!(debug_assertions) {
            debug_assert_eq!(
                self.graph.grid().occupied_slots(),
                self.graph.node_count(),
                "every node should occupy exactly one grid slot",
            );
            for (idx, center) in self.graph.centers().iter().enumerate() {
                let Some(node) = NodeId::from_index(idx) else {
                    break;
                };
                debug_assert_eq!(
                    self.graph.grid().cell_of(node),
                    self.graph.grid().owning_cell(*center),
                    "node must sit in the cell owning its center",
                );
            }
            let params = &self.config.params;
            for pheromone in self.graph.pheromones() {
                debug_assert!(
                    (params.pheromone_min..=params.pheromone_max).contains(pheromone),
                    "pheromone {pheromone} escaped its bounds",
                );
            }
            for ant in &self.colony.ants[..self.colony.actives] {
                debug_assert!(
                    (ant.path_idx as usize) <= self.paths.chunk_size(),
                    "path index must stay within the agent's chunk",
                );
            }
        }
    }
}

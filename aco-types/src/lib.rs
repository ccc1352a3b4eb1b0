use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the handle space. The maximum value is reserved as the `EMPTY` sentinel,
/// so at most `HANDLE_LIMIT` nodes or edges can ever exist.
pub const HANDLE_LIMIT: u16 = u16::MAX;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u16);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u16);

impl NodeId {
    pub const EMPTY: NodeId = NodeId(HANDLE_LIMIT);

    /// Handle for a dense index, or `None` when the index would collide with the sentinel.
    pub fn from_index(idx: usize) -> Option<Self> {
        u16::try_from(idx)
            .ok()
            .filter(|raw| *raw != HANDLE_LIMIT)
            .map(NodeId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl EdgeId {
    pub const EMPTY: EdgeId = EdgeId(HANDLE_LIMIT);

    pub fn from_index(idx: usize) -> Option<Self> {
        u16::try_from(idx)
            .ok()
            .filter(|raw| *raw != HANDLE_LIMIT)
            .map(EdgeId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Point) -> i64 {
        let dx = i64::from(other.x) - i64::from(self.x);
        let dy = i64::from(other.y) - i64::from(self.y);
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.distance_sq(other) as f64).sqrt() as f32
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AntPhase {
    Foraging,
    Homing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunState {
    /// Graph is editable, no agents exist.
    Editing,
    Running,
    Paused,
}

/// Placement plane dimensions. Every other spatial constant is derived from the
/// node diameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldGeometry {
    pub world_width: u32,
    pub world_height: u32,
    pub node_diameter: u32,
}

impl WorldGeometry {
    pub fn node_radius(&self) -> i32 {
        (self.node_diameter / 2) as i32
    }

    pub fn cell_size(&self) -> i32 {
        (self.node_diameter * 2) as i32
    }

    /// Squared center distance at or below which a new node is refused.
    pub fn min_spacing_sq(&self) -> i64 {
        let d = i64::from(self.node_diameter);
        d * d * 4
    }

    /// Squared radius used when resolving the node under a point.
    pub fn pick_radius_sq(&self) -> i64 {
        let r = i64::from(self.node_radius());
        r * r
    }

    pub fn min_edge_width(&self) -> f32 {
        2.0
    }

    pub fn max_edge_width(&self) -> f32 {
        self.node_diameter as f32
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AcoParams {
    pub evaporation_rate: f32,
    /// Seconds between evaporation passes.
    pub evaporation_interval: f32,
    pub pheromone_min: f32,
    pub pheromone_max: f32,
    pub alpha: f32,
    pub beta: f32,
    pub q: f32,
    pub ant_speed: f32,
}

impl AcoParams {
    pub const BASELINE: AcoParams = AcoParams {
        evaporation_rate: 0.1,
        evaporation_interval: 1.0,
        pheromone_min: 0.1,
        pheromone_max: 15.0,
        alpha: 1.0,
        beta: 2.0,
        q: 10.0,
        ant_speed: 100.0,
    };

    pub fn clamp_pheromone(&self, value: f32) -> f32 {
        value.clamp(self.pheromone_min, self.pheromone_max)
    }
}

impl Default for AcoParams {
    fn default() -> Self {
        Self::BASELINE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColonyConfig {
    pub geometry: WorldGeometry,
    pub params: AcoParams,
    pub ant_count: u32,
    /// Seconds between two trickle-start activations.
    pub activation_interval: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub center: Point,
    pub degree: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EdgeView {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
    pub length: f32,
    pub pheromone: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AntView {
    pub slot: u32,
    pub source: NodeId,
    pub destination: NodeId,
    pub edge: Option<EdgeId>,
    pub progress: f32,
    pub phase: AntPhase,
    pub path_len: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub simulated_secs: f64,
    pub active_ants: u32,
    pub food_arrivals: u64,
    pub round_trips: u64,
    pub expired_searches: u64,
    pub abandoned_searches: u64,
    pub evaporation_passes: u64,
    pub best_path_length: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColonySnapshot {
    pub tick: u64,
    pub rng_seed: u64,
    pub run_state: RunState,
    pub nest: Option<NodeId>,
    pub food: Option<NodeId>,
    pub config: ColonyConfig,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub ants: Vec<AntView>,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TickDelta {
    pub tick: u64,
    pub activated: u32,
    pub food_arrivals: u32,
    pub round_trips: u32,
    pub expired_searches: u32,
    pub evaporated: bool,
    pub metrics: MetricsSnapshot,
}

use crate::grid::SpatialGrid;
use aco_types::{EdgeId, NodeId, Point, WorldGeometry, HANDLE_LIMIT};
use thiserror::Error;

const NODE_BASE_CAPACITY: usize = 32;
const EDGE_BASE_CAPACITY: usize = 32;
const ADJACENCY_BASE_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("point ({x}, {y}) is too close to node {existing}")]
    TooClose { x: i32, y: i32, existing: NodeId },
    #[error("grid cell owning ({x}, {y}) is full")]
    CellFull { x: i32, y: i32 },
    #[error("{0} handle space exhausted")]
    CapacityExhausted(&'static str),
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("edge would loop on node {0}")]
    SelfLoop(NodeId),
    #[error("nodes {a} and {b} are already joined by edge {existing}")]
    DuplicateEdge {
        a: NodeId,
        b: NodeId,
        existing: EdgeId,
    },
}

/// Struct-of-arrays node and edge store. Handles are dense indices into the
/// parallel vectors; nothing is ever removed individually.
#[derive(Debug, Clone)]
pub(crate) struct Graph {
    geometry: WorldGeometry,
    grid: SpatialGrid,
    centers: Vec<Point>,
    adjacency: Vec<Vec<EdgeId>>,
    edge_a: Vec<NodeId>,
    edge_b: Vec<NodeId>,
    lengths: Vec<f32>,
    pheromones: Vec<f32>,
}

impl Graph {
    pub(crate) fn new(geometry: WorldGeometry) -> Self {
        Self {
            geometry,
            grid: SpatialGrid::new(&geometry),
            centers: Vec::with_capacity(NODE_BASE_CAPACITY),
            adjacency: Vec::with_capacity(NODE_BASE_CAPACITY),
            edge_a: Vec::with_capacity(EDGE_BASE_CAPACITY),
            edge_b: Vec::with_capacity(EDGE_BASE_CAPACITY),
            lengths: Vec::with_capacity(EDGE_BASE_CAPACITY),
            pheromones: Vec::with_capacity(EDGE_BASE_CAPACITY),
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new(self.geometry);
    }

    /// Clamps the point into the interior play area, then registers a new node
    /// unless another center is within the minimum spacing.
    pub(crate) fn add_node(&mut self, x: i32, y: i32) -> Result<NodeId, GraphError> {
        let margin = self.geometry.cell_size() + self.geometry.node_radius();
        let max_x = self.geometry.world_width as i32 - margin;
        let max_y = self.geometry.world_height as i32 - margin;
        let point = Point::new(x.clamp(margin, max_x), y.clamp(margin, max_y));

        if let Some(existing) = self
            .grid
            .locate(point, self.geometry.min_spacing_sq(), &self.centers)
        {
            return Err(GraphError::TooClose {
                x: point.x,
                y: point.y,
                existing,
            });
        }

        let id = NodeId::from_index(self.centers.len())
            .ok_or(GraphError::CapacityExhausted("node"))?;
        grow_for_push(&mut self.centers, NODE_BASE_CAPACITY);
        grow_for_push(&mut self.adjacency, NODE_BASE_CAPACITY);

        if !self.grid.insert(point, id) {
            return Err(GraphError::CellFull {
                x: point.x,
                y: point.y,
            });
        }
        self.centers.push(point);
        self.adjacency
            .push(Vec::with_capacity(ADJACENCY_BASE_CAPACITY));
        Ok(id)
    }

    pub(crate) fn add_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        initial_pheromone: f32,
    ) -> Result<EdgeId, GraphError> {
        for node in [a, b] {
            if node.index() >= self.centers.len() {
                return Err(GraphError::UnknownNode(node));
            }
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }

        let (a, b) = if a < b { (a, b) } else { (b, a) };
        // Canonical order means scanning the lower endpoint is enough.
        if let Some(existing) = self.find_edge(a, b) {
            return Err(GraphError::DuplicateEdge { a, b, existing });
        }

        let id = EdgeId::from_index(self.lengths.len())
            .ok_or(GraphError::CapacityExhausted("edge"))?;

        for node in [a, b] {
            let incident = &mut self.adjacency[node.index()];
            grow_for_push(incident, ADJACENCY_BASE_CAPACITY);
            incident.push(id);
        }

        grow_for_push(&mut self.edge_a, EDGE_BASE_CAPACITY);
        grow_for_push(&mut self.edge_b, EDGE_BASE_CAPACITY);
        grow_for_push(&mut self.lengths, EDGE_BASE_CAPACITY);
        grow_for_push(&mut self.pheromones, EDGE_BASE_CAPACITY);
        self.edge_a.push(a);
        self.edge_b.push(b);
        self.lengths
            .push(self.centers[a.index()].distance(self.centers[b.index()]));
        self.pheromones.push(initial_pheromone);
        Ok(id)
    }

    /// Edge joining a canonical pair, looked up through `a`'s adjacency.
    pub(crate) fn find_edge(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.adjacency
            .get(a.index())?
            .iter()
            .copied()
            .find(|edge| self.edge_b[edge.index()] == b)
    }

    pub(crate) fn locate(&self, point: Point, radius_sq: i64) -> Option<NodeId> {
        self.grid.locate(point, radius_sq, &self.centers)
    }

    pub(crate) fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub(crate) fn node_count(&self) -> usize {
        self.centers.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.lengths.len()
    }

    pub(crate) fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.centers.len()
    }

    pub(crate) fn center(&self, node: NodeId) -> Point {
        self.centers[node.index()]
    }

    pub(crate) fn centers(&self) -> &[Point] {
        &self.centers
    }

    pub(crate) fn incident(&self, node: NodeId) -> &[EdgeId] {
        &self.adjacency[node.index()]
    }

    pub(crate) fn endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        (self.edge_a[edge.index()], self.edge_b[edge.index()])
    }

    pub(crate) fn other_end(&self, edge: EdgeId, node: NodeId) -> NodeId {
        let (a, b) = self.endpoints(edge);
        if a == node {
            b
        } else {
            a
        }
    }

    pub(crate) fn length(&self, edge: EdgeId) -> f32 {
        self.lengths[edge.index()]
    }

    pub(crate) fn lengths(&self) -> &[f32] {
        &self.lengths
    }

    pub(crate) fn pheromone(&self, edge: EdgeId) -> f32 {
        self.pheromones[edge.index()]
    }

    pub(crate) fn pheromones(&self) -> &[f32] {
        &self.pheromones
    }

    pub(crate) fn pheromones_mut(&mut self) -> &mut [f32] {
        &mut self.pheromones
    }
}

/// Doubles capacity (starting from `base`) when the vector is full, never past
/// the handle space. A failed allocation aborts the process.
fn grow_for_push<T>(items: &mut Vec<T>, base: usize) {
    if items.len() < items.capacity() {
        return;
    }
    let target = if items.capacity() == 0 {
        base
    } else {
        items.capacity() * 2
    };
    let target = target.min(HANDLE_LIMIT as usize).max(items.len() + 1);
    items.reserve_exact(target - items.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_doubles_from_base_capacity() {
        let mut items: Vec<u16> = Vec::new();
        grow_for_push(&mut items, 8);
        assert!(items.capacity() >= 8);

        let mut items: Vec<u16> = Vec::with_capacity(8);
        items.extend(0..8);
        grow_for_push(&mut items, 8);
        assert!(items.capacity() >= 16);
        assert_eq!(items.len(), 8);
    }

    #[test]
    fn growth_is_capped_at_handle_space() {
        let mut items: Vec<u8> = Vec::with_capacity(40_000);
        items.resize(items.capacity(), 0);
        grow_for_push(&mut items, 32);
        assert!(items.capacity() >= HANDLE_LIMIT as usize);
    }
}

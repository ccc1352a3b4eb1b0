use aco_types::{NodeId, Point, WorldGeometry};

pub(crate) const CELL_SLOTS: usize = 4;

/// Uniform bucket grid over the placement plane. Each cell holds up to four node
/// handles, unused slots carry `NodeId::EMPTY`.
#[derive(Debug, Clone)]
pub(crate) struct SpatialGrid {
    cell_size: i32,
    columns: i32,
    rows: i32,
    world_width: i32,
    world_height: i32,
    cells: Vec<[NodeId; CELL_SLOTS]>,
}

impl SpatialGrid {
    pub(crate) fn new(geometry: &WorldGeometry) -> Self {
        let cell_size = geometry.cell_size();
        let world_width = geometry.world_width as i32;
        let world_height = geometry.world_height as i32;
        let columns = (world_width + cell_size - 1) / cell_size;
        let rows = (world_height + cell_size - 1) / cell_size;
        Self {
            cell_size,
            columns,
            rows,
            world_width,
            world_height,
            cells: vec![[NodeId::EMPTY; CELL_SLOTS]; (columns * rows) as usize],
        }
    }

    /// Points inside the one-cell border around the plane are never valid targets.
    pub(crate) fn in_playable_area(&self, point: Point) -> bool {
        point.x >= self.cell_size
            && point.x <= self.world_width - self.cell_size
            && point.y >= self.cell_size
            && point.y <= self.world_height - self.cell_size
    }

    /// First node whose center lies within `radius_sq` of `point`, scanning the
    /// owning cell and its eight neighbors row by row, slots in order.
    pub(crate) fn locate(&self, point: Point, radius_sq: i64, centers: &[Point]) -> Option<NodeId> {
        if !self.in_playable_area(point) {
            return None;
        }

        let (column, row) = self.cell_coords(point);
        for dr in -1..=1 {
            for dc in -1..=1 {
                let Some(idx) = self.cell_index(column + dc, row + dr) else {
                    continue;
                };
                for node in self.cells[idx] {
                    if node.is_empty() {
                        continue;
                    }
                    if centers[node.index()].distance_sq(point) <= radius_sq {
                        return Some(node);
                    }
                }
            }
        }
        None
    }

    /// Places `node` into the first free slot of the cell owning `point`.
    /// Returns false when the cell is already full.
    pub(crate) fn insert(&mut self, point: Point, node: NodeId) -> bool {
        let (column, row) = self.cell_coords(point);
        let Some(idx) = self.cell_index(column, row) else {
            return false;
        };
        match self.cells[idx].iter_mut().find(|slot| slot.is_empty()) {
            Some(slot) => {
                *slot = node;
                true
            }
            None => false,
        }
    }

    pub(crate) fn occupied_slots(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|node| !node.is_empty())
            .count()
    }

    pub(crate) fn cell_of(&self, node: NodeId) -> Option<usize> {
        self.cells
            .iter()
            .position(|cell| cell.contains(&node))
    }

    pub(crate) fn owning_cell(&self, point: Point) -> Option<usize> {
        let (column, row) = self.cell_coords(point);
        self.cell_index(column, row)
    }

    fn cell_coords(&self, point: Point) -> (i32, i32) {
        (
            point.x.div_euclid(self.cell_size),
            point.y.div_euclid(self.cell_size),
        )
    }

    fn cell_index(&self, column: i32, row: i32) -> Option<usize> {
        if column < 0 || row < 0 || column >= self.columns || row >= self.rows {
            return None;
        }
        Some((row * self.columns + column) as usize)
    }
}

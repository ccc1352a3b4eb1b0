use crate::Simulation;
use aco_types::{AcoParams, EdgeId, WorldGeometry};

/// Multiplies every edge by `(1 - rate)` and clamps into the configured bounds.
pub(crate) fn evaporate_all(pheromones: &mut [f32], params: &AcoParams) {
    let retained = 1.0 - params.evaporation_rate;
    for pheromone in pheromones.iter_mut() {
        *pheromone = params.clamp_pheromone(*pheromone * retained);
    }
}

/// Adds `Q / path_length` to one edge. The ceiling is applied immediately so the
/// bound holds between evaporation passes too.
pub(crate) fn deposit(pheromones: &mut [f32], edge: EdgeId, path_length: f32, params: &AcoParams) {
    if path_length <= 0.0 {
        return;
    }
    let slot = &mut pheromones[edge.index()];
    *slot = params.clamp_pheromone(*slot + params.q / path_length);
}

/// Render width for a trail strength, linear between the geometry's width bounds.
pub fn edge_width(pheromone: f32, params: &AcoParams, geometry: &WorldGeometry) -> f32 {
    let span = params.pheromone_max - params.pheromone_min;
    let ratio = if span > 0.0 {
        ((pheromone - params.pheromone_min) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let min_width = geometry.min_edge_width();
    min_width + ratio * (geometry.max_edge_width() - min_width)
}

impl Simulation {
    /// Runs at most one evaporation pass per call, keeping the sub-interval
    /// remainder in the timer.
    pub(crate) fn evaporation_phase(&mut self, elapsed_secs: f32) -> bool {
        self.evaporation_timer += elapsed_secs;
        if self.evaporation_timer < self.config.params.evaporation_interval {
            return false;
        }
        evaporate_all(self.graph.pheromones_mut(), &self.config.params);
        self.evaporation_timer -= self.config.params.evaporation_interval;
        self.metrics.evaporation_passes += 1;
        true
    }

    pub(crate) fn clamp_pheromones(&mut self) {
        let params = self.config.params;
        for pheromone in self.graph.pheromones_mut() {
            *pheromone = params.clamp_pheromone(*pheromone);
        }
    }

    pub(crate) fn reset_pheromones(&mut self) {
        let floor = self.config.params.pheromone_min;
        self.graph.pheromones_mut().fill(floor);
    }
}

use crate::colony::{Ant, SelectionScratch};
use crate::graph::Graph;
use crate::pheromone::deposit;
use crate::Simulation;
use aco_types::{AcoParams, AntPhase, EdgeId, NodeId, RunState, TickDelta};
use rand::Rng;
use tracing::{debug, trace};

/// Per-tick event tallies folded into the delta and the running metrics.
#[derive(Debug, Default)]
struct ArrivalCounts {
    food_arrivals: u32,
    round_trips: u32,
    expired_searches: u32,
    abandoned_searches: u32,
}

impl Simulation {
    /// Advances the colony by `elapsed_secs` of simulated time: trickle-start,
    /// then every active agent in slot order, then at most one evaporation pass.
    /// Outside of `Running` nothing moves and the delta only echoes the metrics.
    pub fn tick(&mut self, elapsed_secs: f32) -> TickDelta {
        let Some(nest) = self.nest.filter(|_| self.run_state == RunState::Running) else {
            return TickDelta {
                tick: self.tick,
                metrics: self.metrics.clone(),
                ..TickDelta::default()
            };
        };

        let activated = self
            .colony
            .trickle(elapsed_secs, self.config.activation_interval);

        let mut counts = ArrivalCounts::default();
        for slot in 0..self.colony.actives {
            self.update_ant(slot, nest, elapsed_secs, &mut counts);
        }

        let evaporated = self.evaporation_phase(elapsed_secs);

        self.tick += 1;
        self.metrics.ticks = self.tick;
        self.metrics.simulated_secs += f64::from(elapsed_secs);
        self.metrics.active_ants = self.colony.actives as u32;
        self.metrics.food_arrivals += u64::from(counts.food_arrivals);
        self.metrics.round_trips += u64::from(counts.round_trips);
        self.metrics.expired_searches += u64::from(counts.expired_searches);
        self.metrics.abandoned_searches += u64::from(counts.abandoned_searches);
        self.debug_assert_consistent_state();

        TickDelta {
            tick: self.tick,
            activated: u32::from(activated),
            food_arrivals: counts.food_arrivals,
            round_trips: counts.round_trips,
            expired_searches: counts.expired_searches,
            evaporated,
            metrics: self.metrics.clone(),
        }
    }

    fn update_ant(
        &mut self,
        slot: usize,
        nest: NodeId,
        elapsed_secs: f32,
        counts: &mut ArrivalCounts,
    ) {
        let speed = self.config.params.ant_speed;
        let ant = &mut self.colony.ants[slot];
        match (ant.progress < 1.0, ant.edge) {
            (true, Some(edge)) => {
                ant.progress += elapsed_secs * speed / self.graph.length(edge);
            }
            _ => {
                ant.source = ant.destination;
                if ant.is_foraging() {
                    self.forage_arrival(slot, nest, counts);
                } else {
                    self.home_arrival(slot, nest, counts);
                }
            }
        }
    }

    fn forage_arrival(&mut self, slot: usize, nest: NodeId, counts: &mut ArrivalCounts) {
        let ant = &mut self.colony.ants[slot];
        let node = ant.source;

        if node == nest {
            if ant.path_idx == 0 {
                ant.edge = None;
                self.forage_step(slot, nest, counts);
            } else {
                // Wandered back home without food: drop the trail and rest one tick.
                self.paths.start(ant);
                ant.path_length = 0.0;
                counts.abandoned_searches += 1;
            }
            return;
        }

        if Some(node) == self.food {
            ant.phase = AntPhase::Homing;
            ant.path_idx = ant.path_idx.saturating_sub(1);
            counts.food_arrivals += 1;
            let length = ant.path_length;
            self.metrics.best_path_length = Some(
                self.metrics
                    .best_path_length
                    .map_or(length, |best| best.min(length)),
            );
            trace!(slot, length, "agent reached food");
            return;
        }

        if let Some(cut) = self
            .paths
            .find_cycle(slot, ant, node, self.graph.lengths())
        {
            ant.path_idx = cut.prefix_len;
            ant.path_length = cut.prefix_length;
            ant.edge = Some(cut.closing_edge);
        }
        self.forage_step(slot, nest, counts);
    }

    /// Spends one unit of TTL and sends the agent down a freshly drawn edge.
    fn forage_step(&mut self, slot: usize, nest: NodeId, counts: &mut ArrivalCounts) {
        let node_count = self.graph.node_count();
        let ant = &mut self.colony.ants[slot];

        ant.ttl -= 1;
        if ant.ttl <= 0 {
            *ant = Ant::at_nest(nest, node_count);
            counts.expired_searches += 1;
            return;
        }

        let node = ant.source;
        let Some(edge) = select_edge(
            &self.graph,
            node,
            ant.edge,
            &self.config.params,
            &mut self.colony.scratch,
            &mut self.rng,
        ) else {
            debug!(slot, node = node.0, "no edge leaves node, agent returns to the nest");
            *ant = Ant::at_nest(nest, node_count);
            return;
        };

        let destination = self.graph.other_end(edge, node);
        ant.edge = Some(edge);
        ant.destination = destination;
        ant.path_length += self.graph.length(edge);
        self.paths.record(slot, ant, edge, destination);
        ant.progress = 0.0;
    }

    /// Walks the recorded trail backwards, depositing on every edge it takes.
    /// Homing agents never spend TTL.
    fn home_arrival(&mut self, slot: usize, nest: NodeId, counts: &mut ArrivalCounts) {
        let node_count = self.graph.node_count();
        let ant = &mut self.colony.ants[slot];
        let (edge, _) = self.paths.step(slot, ant.path_idx);
        ant.edge = Some(edge);

        if ant.path_idx == 0 {
            if ant.source == nest {
                *ant = Ant::at_nest(nest, node_count);
                counts.round_trips += 1;
                debug!(slot, "round trip complete");
                return;
            }
            deposit(
                self.graph.pheromones_mut(),
                edge,
                ant.path_length,
                &self.config.params,
            );
            ant.destination = nest;
        } else {
            deposit(
                self.graph.pheromones_mut(),
                edge,
                ant.path_length,
                &self.config.params,
            );
            let (_, previous) = self.paths.step(slot, ant.path_idx - 1);
            ant.destination = previous;
            ant.path_idx -= 1;
        }
        ant.progress = 0.0;
    }
}

/// Roulette-wheel choice over the edges incident to `node`, weighting each by
/// `pheromone^alpha * (1 / length)^beta`. The edge the agent arrived on is
/// excluded unless it is the only exit. `None` only for an isolated node.
pub(crate) fn select_edge<R: Rng>(
    graph: &Graph,
    node: NodeId,
    arrived_on: Option<EdgeId>,
    params: &AcoParams,
    scratch: &mut SelectionScratch,
    rng: &mut R,
) -> Option<EdgeId> {
    let incident = graph.incident(node);
    let &first = incident.first()?;

    scratch.clear();
    let mut total = 0.0_f32;
    for &edge in incident {
        if Some(edge) == arrived_on {
            continue;
        }
        let weight = graph.pheromone(edge).powf(params.alpha)
            * (1.0 / graph.length(edge)).powf(params.beta);
        scratch.edges.push(edge);
        scratch.weights.push(weight);
        total += weight;
    }
    if scratch.edges.is_empty() {
        return Some(first);
    }

    let draw = rng.random::<f32>() * total;
    let mut cumulative = 0.0_f32;
    for (&edge, &weight) in scratch.edges.iter().zip(&scratch.weights) {
        cumulative += weight;
        if draw <= cumulative {
            return Some(edge);
        }
    }
    // Float rounding can leave the draw just above the final partial sum.
    scratch.edges.last().copied()
}

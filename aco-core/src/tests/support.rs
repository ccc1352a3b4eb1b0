use super::*;

/// 100x100 world with 2px nodes: margins of 5px, refusal within 4px.
pub(super) fn small_config(ant_count: u32) -> ColonyConfig {
    ColonyConfig {
        geometry: WorldGeometry {
            world_width: 100,
            world_height: 100,
            node_diameter: 2,
        },
        params: AcoParams {
            evaporation_interval: 1.0e6,
            ..AcoParams::BASELINE
        },
        ant_count,
        activation_interval: 0.1,
    }
}

pub(super) fn node_at(sim: &mut Simulation, x: i32, y: i32) -> NodeId {
    sim.add_node(x, y).expect("node placement should succeed")
}

pub(super) fn join(sim: &mut Simulation, a: NodeId, b: NodeId) -> EdgeId {
    sim.add_edge(a, b).expect("edge insertion should succeed")
}

/// Nest - A - Food on a horizontal line; edges of length 10 and 20.
pub(super) struct LineGraph {
    pub(super) sim: Simulation,
    pub(super) nest: NodeId,
    pub(super) middle: NodeId,
    pub(super) food: NodeId,
    pub(super) near: EdgeId,
    pub(super) far: EdgeId,
}

pub(super) fn line_graph(ant_count: u32, seed: u64) -> LineGraph {
    let mut sim =
        Simulation::new(small_config(ant_count), seed).expect("simulation should initialize");
    let nest = node_at(&mut sim, 10, 10);
    let middle = node_at(&mut sim, 20, 10);
    let food = node_at(&mut sim, 40, 10);
    let near = join(&mut sim, nest, middle);
    let far = join(&mut sim, middle, food);
    sim.set_nest(Some(nest)).expect("nest");
    sim.set_food(Some(food)).expect("food");
    LineGraph {
        sim,
        nest,
        middle,
        food,
        near,
        far,
    }
}

/// Nest feeding a triangle A-B-C with the food hanging off B, so foraging
/// agents routinely close loops.
pub(super) fn looped_graph(ant_count: u32, seed: u64) -> Simulation {
    let mut sim =
        Simulation::new(small_config(ant_count), seed).expect("simulation should initialize");
    let nest = node_at(&mut sim, 10, 50);
    let a = node_at(&mut sim, 30, 50);
    let b = node_at(&mut sim, 50, 30);
    let c = node_at(&mut sim, 50, 70);
    let food = node_at(&mut sim, 90, 30);
    join(&mut sim, nest, a);
    join(&mut sim, a, b);
    join(&mut sim, a, c);
    join(&mut sim, b, c);
    join(&mut sim, b, food);
    sim.set_nest(Some(nest)).expect("nest");
    sim.set_food(Some(food)).expect("food");
    sim
}

/// Ticks until `done` holds, failing the test after `max_ticks`.
pub(super) fn run_until(
    sim: &mut Simulation,
    elapsed_secs: f32,
    max_ticks: u32,
    mut done: impl FnMut(&Simulation) -> bool,
) -> u32 {
    for ticks in 1..=max_ticks {
        sim.tick(elapsed_secs);
        if done(sim) {
            return ticks;
        }
    }
    panic!("condition not reached within {max_ticks} ticks");
}

pub(super) fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() <= 1.0e-4,
        "expected {expected}, got {actual}"
    );
}

use super::support::*;
use super::*;
use crate::colony::{Ant, SelectionScratch};
use crate::paths::PathRecorder;
use crate::routing::select_edge;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn selection_never_returns_the_arrival_edge_when_another_exists() {
    let sim = looped_graph(1, 5);
    let a = NodeId(1);
    let arrived_on = sim.find_edge(NodeId(0), a);
    let mut scratch = SelectionScratch::default();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for _ in 0..500 {
        let picked = select_edge(
            &sim.graph,
            a,
            arrived_on,
            &sim.config.params,
            &mut scratch,
            &mut rng,
        )
        .expect("node has exits");
        assert_ne!(Some(picked), arrived_on);
    }
}

#[test]
fn selection_falls_back_to_the_sole_edge() {
    let LineGraph { sim, nest, near, .. } = line_graph(1, 5);
    let mut scratch = SelectionScratch::default();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let picked = select_edge(
        &sim.graph,
        nest,
        Some(near),
        &sim.config.params,
        &mut scratch,
        &mut rng,
    );
    assert_eq!(picked, Some(near));
}

#[test]
fn selection_on_an_isolated_node_yields_nothing() {
    let mut sim = Simulation::new(small_config(1), 1).expect("simulation should initialize");
    let lonely = node_at(&mut sim, 50, 50);
    let mut scratch = SelectionScratch::default();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let picked = select_edge(
        &sim.graph,
        lonely,
        None,
        &sim.config.params,
        &mut scratch,
        &mut rng,
    );
    assert_eq!(picked, None);
}

#[test]
fn selection_prefers_short_strong_edges() {
    let mut sim = Simulation::new(small_config(1), 1).expect("simulation should initialize");
    let hub = node_at(&mut sim, 50, 50);
    let close = node_at(&mut sim, 60, 50);
    let distant = node_at(&mut sim, 50, 90);
    let short = join(&mut sim, hub, close);
    let long = join(&mut sim, hub, distant);
    sim.graph.pheromones_mut()[short.index()] = 5.0;

    let mut scratch = SelectionScratch::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut short_picks = 0;
    for _ in 0..1_000 {
        let picked = select_edge(&sim.graph, hub, None, &sim.config.params, &mut scratch, &mut rng)
            .expect("hub has exits");
        if picked == short {
            short_picks += 1;
        } else {
            assert_eq!(picked, long);
        }
    }
    // Weight ratio is 50 * 16 = 800 to 1.
    assert!(short_picks > 980, "short edge picked {short_picks} times");
}

#[test]
fn single_ant_round_trip_deposits_once_per_edge() {
    let LineGraph {
        mut sim,
        nest,
        near,
        far,
        ..
    } = line_graph(1, 9);
    sim.start().expect("start");

    run_until(&mut sim, 0.1, 200, |sim| sim.metrics().round_trips == 1);

    let expected = AcoParams::BASELINE.pheromone_min + AcoParams::BASELINE.q / 30.0;
    assert_close(sim.edge(near).expect("near").pheromone, expected);
    assert_close(sim.edge(far).expect("far").pheromone, expected);
    assert_eq!(sim.metrics().food_arrivals, 1);
    assert_eq!(sim.metrics().best_path_length, Some(30.0));

    let ant = sim.ant(0).expect("ant 0");
    assert_eq!(ant.source, nest);
    assert_eq!(ant.destination, nest);
    assert_eq!(ant.edge, None);
    assert_eq!(ant.phase, AntPhase::Foraging);
    assert_eq!(ant.path_len, 0);
    assert_close(ant.progress, 1.0);
}

#[test]
fn arrival_at_food_switches_to_homing_with_the_trail_intact() {
    let LineGraph {
        mut sim,
        middle,
        food,
        ..
    } = line_graph(1, 9);
    sim.start().expect("start");

    run_until(&mut sim, 0.1, 200, |sim| sim.metrics().food_arrivals == 1);

    let ant = sim.ant(0).expect("ant 0");
    assert_eq!(ant.phase, AntPhase::Homing);
    assert_eq!(ant.source, food);
    assert_eq!(ant.path_len, 1);
    assert_close(sim.colony.ants[0].path_length, 30.0);
    assert_eq!(sim.ant_trail(0), Some(vec![middle]));
    assert_eq!(sim.ant_trail(1), None);

    run_until(&mut sim, 0.1, 200, |sim| sim.metrics().round_trips == 1);
    assert_eq!(sim.ant_trail(0), Some(Vec::new()));
}

#[test]
fn cycle_cut_keeps_the_trail_up_to_the_first_visit() {
    let mut paths = PathRecorder::default();
    paths.resize(5, 2);
    let mut ant = Ant::at_nest(NodeId(0), 5);
    let lengths = [10.0_f32, 20.0, 5.0, 7.0];
    // nest -e0-> 1 -e1-> 2 -e2-> 3 -e3-> 1
    for (edge, node) in [(0, 1), (1, 2), (2, 3), (3, 1)] {
        paths.record(1, &mut ant, EdgeId(edge), NodeId(node));
    }

    let cut = paths
        .find_cycle(1, &ant, NodeId(1), &lengths)
        .expect("node 1 is revisited");
    assert_eq!(cut.prefix_len, 1);
    assert_eq!(cut.closing_edge, EdgeId(0));
    assert_close(cut.prefix_length, 10.0);

    let cut = paths
        .find_cycle(1, &ant, NodeId(2), &lengths)
        .expect("node 2 is on the trail");
    assert_eq!(cut.prefix_len, 2);
    assert_eq!(cut.closing_edge, EdgeId(1));
    let kept: f32 = paths
        .recorded(1, &ant)
        .take(cut.prefix_len as usize)
        .map(|(edge, _)| lengths[edge.index()])
        .sum();
    assert_close(cut.prefix_length, kept);
    assert_close(kept, 30.0);

    assert_eq!(paths.find_cycle(1, &ant, NodeId(4), &lengths), None);
    assert_eq!(paths.find_cycle(0, &Ant::at_nest(NodeId(0), 5), NodeId(1), &lengths), None);

    ant.path_idx = cut.prefix_len;
    let trail: Vec<NodeId> = paths.recorded(1, &ant).map(|(_, node)| node).collect();
    assert_eq!(trail, vec![NodeId(1), NodeId(2)]);
}

#[test]
fn homing_agents_do_not_spend_ttl() {
    let LineGraph { mut sim, .. } = line_graph(1, 9);
    sim.start().expect("start");
    run_until(&mut sim, 0.1, 200, |sim| sim.metrics().food_arrivals == 1);

    sim.colony.ants[0].ttl = 1;
    run_until(&mut sim, 0.1, 200, |sim| sim.metrics().round_trips == 1);

    assert_eq!(sim.metrics().expired_searches, 0);
    let expected = AcoParams::BASELINE.pheromone_min + AcoParams::BASELINE.q / 30.0;
    for edge in sim.edges() {
        assert_close(edge.pheromone, expected);
    }
}

#[test]
fn ttl_expiry_returns_the_agent_to_the_nest_without_depositing() {
    let LineGraph {
        mut sim, nest, ..
    } = line_graph(1, 9);
    sim.set_food(None).expect("clear food");
    sim.start().expect("start");

    run_until(&mut sim, 0.1, 500, |sim| sim.metrics().expired_searches == 1);

    let ant = sim.ant(0).expect("ant 0");
    assert_eq!(ant.source, nest);
    assert_eq!(ant.path_len, 0);
    assert_eq!(sim.colony.ants[0].ttl, crate::colony::ttl_budget(3));
    for edge in sim.edges() {
        assert_close(edge.pheromone, AcoParams::BASELINE.pheromone_min);
    }
    assert_eq!(sim.metrics().round_trips, 0);
}

#[test]
fn wandering_back_to_the_nest_abandons_the_search() {
    let mut sim = Simulation::new(small_config(1), 2).expect("simulation should initialize");
    let nest = node_at(&mut sim, 20, 50);
    let a = node_at(&mut sim, 50, 30);
    let b = node_at(&mut sim, 50, 70);
    join(&mut sim, nest, a);
    join(&mut sim, a, b);
    join(&mut sim, b, nest);
    sim.set_nest(Some(nest)).expect("nest");
    sim.start().expect("start");

    // Without food the only way home is around the triangle.
    run_until(&mut sim, 0.1, 500, |sim| sim.metrics().abandoned_searches == 1);
    let ant = sim.ant(0).expect("ant 0");
    assert_eq!(ant.source, nest);
    assert_eq!(ant.path_len, 0);
    assert_eq!(sim.colony.ants[0].path_length, 0.0);
    assert_eq!(ant.phase, AntPhase::Foraging);
}

#[test]
fn foraging_trails_stay_simple_while_loops_are_closed() {
    let mut sim = looped_graph(12, 21);
    let nest = sim.nest().expect("nest");
    sim.start().expect("start");
    sim.activate_all().expect("activate");

    for _ in 0..2_000 {
        sim.tick(0.05);
        for (slot, ant) in sim.colony.ants.iter().enumerate() {
            let trail: Vec<NodeId> = sim
                .paths
                .recorded(slot, ant)
                .map(|(_, node)| node)
                .collect();
            assert!(trail.len() <= sim.paths.chunk_size());
            if !ant.is_foraging() || trail.is_empty() {
                continue;
            }
            // The final entry is the pending destination and may close a loop.
            let settled = &trail[..trail.len() - 1];
            assert!(!settled.contains(&nest), "nest recorded mid-trail: {trail:?}");
            for (idx, node) in settled.iter().enumerate() {
                assert!(
                    !settled[idx + 1..].contains(node),
                    "slot {slot} revisits {node} in {trail:?}"
                );
            }
        }
    }
    assert!(sim.metrics().round_trips > 0);
}

#[test]
fn recorded_trail_length_matches_edge_lengths() {
    let mut sim = looped_graph(6, 33);
    sim.start().expect("start");
    sim.activate_all().expect("activate");

    for _ in 0..1_000 {
        sim.tick(0.05);
        for (slot, ant) in sim.colony.ants.iter().enumerate() {
            if !ant.is_foraging() {
                continue;
            }
            let walked: f32 = sim
                .paths
                .recorded(slot, ant)
                .map(|(edge, _)| sim.graph.length(edge))
                .sum();
            assert!(
                (walked - ant.path_length).abs() < 1.0e-2,
                "slot {slot}: trail sums to {walked}, agent carries {}",
                ant.path_length
            );
        }
    }
}

#[test]
fn shorter_route_accumulates_more_pheromone() {
    let mut sim = Simulation::new(
        ColonyConfig {
            params: AcoParams {
                evaporation_interval: 1.0,
                ..AcoParams::BASELINE
            },
            ..small_config(20)
        },
        42,
    )
    .expect("simulation should initialize");
    let nest = node_at(&mut sim, 10, 50);
    let top = node_at(&mut sim, 50, 40);
    let bottom = node_at(&mut sim, 50, 95);
    let food = node_at(&mut sim, 90, 50);
    let short_out = join(&mut sim, nest, top);
    let short_in = join(&mut sim, top, food);
    let long_out = join(&mut sim, nest, bottom);
    let long_in = join(&mut sim, bottom, food);
    sim.set_nest(Some(nest)).expect("nest");
    sim.set_food(Some(food)).expect("food");
    sim.start().expect("start");

    sim.step_n(2_000, 0.05);

    let strength = |edge| sim.edge(edge).expect("edge").pheromone;
    assert!(strength(short_out) > strength(long_out));
    assert!(strength(short_in) > strength(long_in));
    assert!(sim.metrics().round_trips > 50);
}

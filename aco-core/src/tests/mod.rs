pub(super) use super::*;
pub(super) use aco_types::{
    AcoParams, AntPhase, ColonyConfig, ColonySnapshot, EdgeId, MetricsSnapshot, NodeId, Point,
    RunState, WorldGeometry,
};

mod routing_and_backtracking;
mod support;

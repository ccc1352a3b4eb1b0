//! Plain-text graph persistence.
//!
//! ```text
//! N <x> <y>          one line per node, in handle order
//! E <a> <b>          one line per edge, in handle order
//! -
//! <nest>             65535 when unset
//! <food>             65535 when unset
//! <ant count>
//! <evaporation rate> <evaporation interval> <pheromone min> <pheromone max>
//! <alpha> <beta> <q> <ant speed>        one value per line
//! ```
//!
//! Parameters are written with two decimals, or in full when two decimals
//! would change the value, so every saved file loads back.

use crate::graph::{Graph, GraphError};
use crate::{SimError, Simulation};
use aco_config::validate_params;
use aco_types::{AcoParams, NodeId, Point, HANDLE_LIMIT};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

const NODE_TAG: &str = "N";
const EDGE_TAG: &str = "E";
const SEPARATOR: &str = "-";
const PARAMETER_NAMES: [&str; 8] = [
    "evaporation rate",
    "evaporation interval",
    "pheromone min",
    "pheromone max",
    "alpha",
    "beta",
    "q",
    "ant speed",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphFileError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("missing '-' separator after the graph section")]
    MissingSeparator,
    #[error("parameter block ended before {0}")]
    MissingValue(&'static str),
    #[error("line {line}: unexpected trailing content")]
    TrailingContent { line: usize },
    #[error("record {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: GraphError,
    },
    #[error("{role} handle {handle} does not name a node")]
    UnknownMarker { role: &'static str, handle: u16 },
    #[error("nest and food share node {0}")]
    FoodOnNest(NodeId),
    #[error("ant count {0} is out of range")]
    InvalidAntCount(u32),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// Parsed contents of a graph file. Edge endpoints are raw node handles and
/// are only checked when the file is replayed into a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphFile {
    pub nodes: Vec<Point>,
    pub edges: Vec<(u16, u16)>,
    pub nest: Option<NodeId>,
    pub food: Option<NodeId>,
    pub ant_count: u32,
    pub params: AcoParams,
}

impl GraphFile {
    pub fn parse(raw: &str) -> Result<Self, GraphFileError> {
        let mut lines = raw
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut separated = false;
        for (line_no, line) in lines.by_ref() {
            if line == SEPARATOR {
                separated = true;
                break;
            }
            let mut tokens = line.split_whitespace();
            let tag = tokens.next().unwrap_or_default();
            let operands: Vec<&str> = tokens.collect();
            match tag {
                NODE_TAG => {
                    let [x, y] = operands_pair(line_no, tag, &operands)?;
                    nodes.push(Point::new(
                        parse_value(line_no, x, "node x")?,
                        parse_value(line_no, y, "node y")?,
                    ));
                }
                EDGE_TAG => {
                    let [a, b] = operands_pair(line_no, tag, &operands)?;
                    edges.push((
                        parse_value(line_no, a, "edge endpoint")?,
                        parse_value(line_no, b, "edge endpoint")?,
                    ));
                }
                other => {
                    return Err(GraphFileError::Malformed {
                        line: line_no,
                        reason: format!("unknown record tag '{other}'"),
                    });
                }
            }
        }
        if !separated {
            return Err(GraphFileError::MissingSeparator);
        }

        let mut next_value = |name: &'static str| {
            lines
                .next()
                .ok_or(GraphFileError::MissingValue(name))
        };

        let (line_no, raw_nest) = next_value("nest")?;
        let nest = parse_marker(parse_value(line_no, raw_nest, "nest")?);
        let (line_no, raw_food) = next_value("food")?;
        let food = parse_marker(parse_value(line_no, raw_food, "food")?);
        let (line_no, raw_count) = next_value("ant count")?;
        let ant_count = parse_value(line_no, raw_count, "ant count")?;

        let mut values = [0.0_f32; PARAMETER_NAMES.len()];
        for (slot, name) in values.iter_mut().zip(PARAMETER_NAMES) {
            let (line_no, raw_value) = next_value(name)?;
            *slot = parse_value(line_no, raw_value, name)?;
        }
        if let Some((line, _)) = lines.next() {
            return Err(GraphFileError::TrailingContent { line });
        }

        let [
            evaporation_rate,
            evaporation_interval,
            pheromone_min,
            pheromone_max,
            alpha,
            beta,
            q,
            ant_speed,
        ] = values;
        Ok(Self {
            nodes,
            edges,
            nest,
            food,
            ant_count,
            params: AcoParams {
                evaporation_rate,
                evaporation_interval,
                pheromone_min,
                pheromone_max,
                alpha,
                beta,
                q,
                ant_speed,
            },
        })
    }

    /// Replays the records into an empty graph, the same way interactive edits
    /// would. Errors carry the 1-based record number.
    fn replay(&self, graph: &mut Graph) -> Result<(), GraphFileError> {
        for (idx, point) in self.nodes.iter().enumerate() {
            graph
                .add_node(point.x, point.y)
                .map_err(|source| GraphFileError::Replay {
                    line: idx + 1,
                    source,
                })?;
        }
        for (idx, &(a, b)) in self.edges.iter().enumerate() {
            graph
                .add_edge(NodeId(a), NodeId(b), self.params.pheromone_min)
                .map_err(|source| GraphFileError::Replay {
                    line: self.nodes.len() + idx + 1,
                    source,
                })?;
        }
        Ok(())
    }

    fn validate_markers(&self, node_count: usize) -> Result<(), GraphFileError> {
        for (role, marker) in [("nest", self.nest), ("food", self.food)] {
            if let Some(node) = marker {
                if node.index() >= node_count {
                    return Err(GraphFileError::UnknownMarker {
                        role,
                        handle: node.0,
                    });
                }
            }
        }
        if let (Some(nest), Some(food)) = (self.nest, self.food) {
            if nest == food {
                return Err(GraphFileError::FoodOnNest(nest));
            }
        }
        if self.ant_count == 0 || self.ant_count >= u32::from(HANDLE_LIMIT) {
            return Err(GraphFileError::InvalidAntCount(self.ant_count));
        }
        validate_params(&self.params).map_err(GraphFileError::InvalidParams)
    }
}

impl FromStr for GraphFile {
    type Err = GraphFileError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for GraphFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for point in &self.nodes {
            writeln!(f, "{NODE_TAG} {} {}", point.x, point.y)?;
        }
        for (a, b) in &self.edges {
            writeln!(f, "{EDGE_TAG} {a} {b}")?;
        }
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "{}", self.nest.unwrap_or(NodeId::EMPTY).0)?;
        writeln!(f, "{}", self.food.unwrap_or(NodeId::EMPTY).0)?;
        writeln!(f, "{}", self.ant_count)?;
        let p = &self.params;
        for value in [
            p.evaporation_rate,
            p.evaporation_interval,
            p.pheromone_min,
            p.pheromone_max,
            p.alpha,
            p.beta,
            p.q,
            p.ant_speed,
        ] {
            write_parameter(f, value)?;
        }
        Ok(())
    }
}

fn write_parameter(f: &mut fmt::Formatter<'_>, value: f32) -> fmt::Result {
    let fixed = format!("{value:.2}");
    if fixed.parse::<f32>() == Ok(value) {
        writeln!(f, "{fixed}")
    } else {
        writeln!(f, "{value}")
    }
}

fn operands_pair<'a>(
    line: usize,
    tag: &str,
    operands: &[&'a str],
) -> Result<[&'a str; 2], GraphFileError> {
    match operands {
        [first, second] => Ok([*first, *second]),
        _ => Err(GraphFileError::Malformed {
            line,
            reason: format!("'{tag}' expects 2 operands, found {}", operands.len()),
        }),
    }
}

fn parse_value<T: FromStr>(line: usize, raw: &str, what: &str) -> Result<T, GraphFileError> {
    raw.trim().parse().map_err(|_| GraphFileError::Malformed {
        line,
        reason: format!("invalid {what} '{}'", raw.trim()),
    })
}

fn parse_marker(raw: u16) -> Option<NodeId> {
    let node = NodeId(raw);
    (!node.is_empty()).then_some(node)
}

impl Simulation {
    /// Current graph, markers, colony size and parameters in file form.
    pub fn graph_file(&self) -> GraphFile {
        GraphFile {
            nodes: self.graph.centers().to_vec(),
            edges: self
                .edges()
                .into_iter()
                .map(|edge| (edge.a.0, edge.b.0))
                .collect(),
            nest: self.nest,
            food: self.food,
            ant_count: self.config.ant_count,
            params: self.config.params,
        }
    }

    pub fn save_graph_string(&self) -> String {
        self.graph_file().to_string()
    }

    /// Replaces the whole simulation state with the file's contents. The file
    /// is parsed and replayed into a scratch graph first; on any error the
    /// current state is left untouched.
    pub fn load_graph(&mut self, file: &GraphFile) -> Result<(), SimError> {
        let mut graph = Graph::new(self.config.geometry);
        file.replay(&mut graph)?;
        file.validate_markers(graph.node_count())?;

        self.reset(None);
        self.graph = graph;
        self.nest = file.nest;
        self.food = file.food;
        self.config.ant_count = file.ant_count;
        self.config.params = file.params;
        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "graph loaded"
        );
        Ok(())
    }

    pub fn load_graph_str(&mut self, raw: &str) -> Result<(), SimError> {
        let file = GraphFile::parse(raw)?;
        self.load_graph(&file)
    }
}

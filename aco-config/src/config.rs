use aco_types::{AcoParams, ColonyConfig, HANDLE_LIMIT};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const DEFAULT_COLONY_CONFIG_REL_PATH: &str = "default.toml";
const NODE_DIAMETER_DIVISOR: i64 = 32;

pub fn colony_config_from_toml_str(raw: &str) -> Result<ColonyConfig, toml::de::Error> {
    let mut value: toml::Value = toml::from_str(raw)?;
    normalize_colony_config_toml(&mut value);
    value.try_into()
}

pub fn default_colony_config() -> ColonyConfig {
    colony_config_from_toml_str(include_str!("../default.toml"))
        .expect("default colony config TOML must deserialize")
}

pub fn default_colony_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_COLONY_CONFIG_REL_PATH)
}

pub fn load_colony_config_from_path(path: &Path) -> Result<ColonyConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read colony config from {}", path.display()))?;
    colony_config_from_toml_str(&raw)
        .context("colony config TOML failed schema deserialization")
        .with_context(|| format!("failed to parse colony config from {}", path.display()))
}

pub fn validate_colony_config(config: &ColonyConfig) -> Result<(), String> {
    let geometry = &config.geometry;
    if geometry.node_diameter < 2 {
        return Err("node_diameter must be at least 2".to_owned());
    }
    // A border cell on each side plus one node must still fit.
    let min_extent = geometry.node_diameter * 5;
    if geometry.world_width <= min_extent || geometry.world_height <= min_extent {
        return Err(format!(
            "world must be larger than {min_extent}px in both dimensions for node_diameter {}",
            geometry.node_diameter
        ));
    }
    if config.ant_count == 0 {
        return Err("ant_count must be greater than zero".to_owned());
    }
    if config.ant_count >= u32::from(HANDLE_LIMIT) {
        return Err(format!("ant_count must be below {HANDLE_LIMIT}"));
    }
    if !config.activation_interval.is_finite() || config.activation_interval <= 0.0 {
        return Err("activation_interval must be finite and greater than zero".to_owned());
    }
    validate_params(&config.params)
}

pub fn validate_params(params: &AcoParams) -> Result<(), String> {
    if !(0.0..=1.0).contains(&params.evaporation_rate) {
        return Err("evaporation_rate must be in [0.0, 1.0]".to_owned());
    }
    if !params.evaporation_interval.is_finite() || params.evaporation_interval <= 0.0 {
        return Err("evaporation_interval must be finite and greater than zero".to_owned());
    }
    if !params.pheromone_min.is_finite() || params.pheromone_min <= 0.0 {
        return Err("pheromone_min must be finite and greater than zero".to_owned());
    }
    if !params.pheromone_max.is_finite() || params.pheromone_max <= params.pheromone_min {
        return Err("pheromone_max must be finite and greater than pheromone_min".to_owned());
    }
    if !params.alpha.is_finite() || !params.beta.is_finite() {
        return Err("alpha and beta must be finite".to_owned());
    }
    if !params.q.is_finite() || params.q <= 0.0 {
        return Err("q must be finite and greater than zero".to_owned());
    }
    if !params.ant_speed.is_finite() || params.ant_speed <= 0.0 {
        return Err("ant_speed must be finite and greater than zero".to_owned());
    }
    Ok(())
}

fn normalize_colony_config_toml(value: &mut toml::Value) {
    let Some(table) = value.as_table_mut() else {
        return;
    };

    table
        .entry("ant_count")
        .or_insert_with(|| toml::Value::Integer(1));
    table
        .entry("activation_interval")
        .or_insert_with(|| toml::Value::Float(0.1));

    if let Some(geometry) = table
        .entry("geometry")
        .or_insert_with(|| toml::Value::Table(Default::default()))
        .as_table_mut()
    {
        let world_height = geometry
            .get("world_height")
            .and_then(toml::Value::as_integer);
        if let Some(world_height) = world_height {
            geometry
                .entry("node_diameter")
                .or_insert_with(|| toml::Value::Integer(world_height / NODE_DIAMETER_DIVISOR));
        }
    }

    if let Some(params) = table
        .entry("params")
        .or_insert_with(|| toml::Value::Table(Default::default()))
        .as_table_mut()
    {
        let baseline = AcoParams::BASELINE;
        for (key, fallback) in [
            ("evaporation_rate", baseline.evaporation_rate),
            ("evaporation_interval", baseline.evaporation_interval),
            ("pheromone_min", baseline.pheromone_min),
            ("pheromone_max", baseline.pheromone_max),
            ("alpha", baseline.alpha),
            ("beta", baseline.beta),
            ("q", baseline.q),
            ("ant_speed", baseline.ant_speed),
        ] {
            params
                .entry(key)
                .or_insert_with(|| toml::Value::Float(f64::from(fallback)));
        }
        // Integer literals such as `q = 10` are accepted for float fields.
        for (_, entry) in params.iter_mut() {
            if let toml::Value::Integer(v) = entry {
                *entry = toml::Value::Float(*v as f64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_matches_baseline() {
        let config = default_colony_config();
        assert_eq!(validate_colony_config(&config), Ok(()));
        assert_eq!(config.geometry.node_diameter, 30);
        assert_eq!(config.params, AcoParams::BASELINE);
        assert_eq!(config.ant_count, 1);
    }

    #[test]
    fn missing_sections_fall_back_to_baseline() {
        let raw = r#"
            ant_count = 12

            [geometry]
            world_width = 640
            world_height = 480

            [params]
            q = 25
        "#;
        let config = colony_config_from_toml_str(raw).expect("partial config should parse");
        assert_eq!(config.ant_count, 12);
        assert_eq!(config.geometry.node_diameter, 15);
        assert_eq!(config.params.q, 25.0);
        assert_eq!(config.params.alpha, AcoParams::BASELINE.alpha);
        assert!((config.activation_interval - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn validation_rejects_inverted_pheromone_bounds() {
        let mut config = default_colony_config();
        config.params.pheromone_max = config.params.pheromone_min;
        let err = validate_colony_config(&config).expect_err("bounds must be rejected");
        assert!(err.contains("pheromone_max"));
    }

    #[test]
    fn validation_rejects_world_too_small_for_nodes() {
        let mut config = default_colony_config();
        config.geometry.world_width = 100;
        let err = validate_colony_config(&config).expect_err("tiny world must be rejected");
        assert!(err.contains("world must be larger"));
    }

    #[test]
    fn default_config_path_points_at_bundled_file() {
        let config = load_colony_config_from_path(&default_colony_config_path())
            .expect("bundled default config should load");
        assert_eq!(config, default_colony_config());
    }
}

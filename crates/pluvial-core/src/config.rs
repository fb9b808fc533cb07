//! Run configuration, read from JSON.
//! Every field has a default, so `{}` is a valid config.
use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::coords::Extent;
use crate::error::{Error, Result};
use crate::source::GridKey;

/// The 17 CMIP5 GCMs of the WorldClim 1.4 RCP8.5 downscaled set used by default.
pub const DEFAULT_MODELS: [&str; 17] = [
    "AC", "BC", "CC", "CE", "CN", "GF", "GD", "GS", "HD", "HG", "HE", "IN", "IP", "MI", "MR", "MC",
    "MG",
];

/// What to do with a cell whose baseline is present but some projection is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMemberPolicy {
    /// Leave the missing member out of that cell's ensemble (`n` shrinks).
    #[default]
    Exclude,
    /// Remove the cell from the table.
    DropRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory the acquisition step left the grids in.
    pub data_dir: PathBuf,
    /// File name template with `{model}`, `{scenario}` and `{resolution}` placeholders.
    pub path_template: String,
    /// Present-day baseline grid.
    pub baseline: GridKey,
    /// Emission scenario of every projection, e.g. `rcp85`.
    pub scenario: String,
    /// Resolution tag of every projection, e.g. `10m`.
    pub resolution: String,
    /// Projection model identifiers, in band order.
    pub models: Vec<String>,
    /// Region of interest; the table only covers cells inside it.
    pub region: Extent,
    pub missing_members: MissingMemberPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/raw"),
            path_template: "{model}_{scenario}_{resolution}.tif".to_string(),
            baseline: GridKey::new("worldclim", "present", "10m"),
            scenario: "rcp85".to_string(),
            resolution: "10m".to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            region: Extent::tropics(),
            missing_members: MissingMemberPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// One key per model, in `models` order.
    pub fn projection_keys(&self) -> Vec<GridKey> {
        self.models
            .iter()
            .map(|m| GridKey::new(m, &self.scenario, &self.resolution))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(Error::EmptyEnsemble);
        }
        let mut seen = HashSet::new();
        for m in &self.models {
            if !seen.insert(m.as_str()) {
                return Err(Error::Config(format!("model `{m}` listed twice")));
            }
        }
        if !self.region.is_valid() {
            return Err(Error::Config(format!("region {} is empty or inverted", self.region)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let cfg = RunConfig::from_json("{}").unwrap();
        assert_eq!(cfg, RunConfig::default());
        assert_eq!(cfg.models.len(), 17);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let cfg = RunConfig::from_json(
            r#"{ "models": ["AC", "MG"], "scenario": "rcp45", "missing_members": "drop_row",
                 "region": { "min_lon": -80, "max_lon": -30, "min_lat": -20, "max_lat": 10 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.missing_members, MissingMemberPolicy::DropRow);
        let keys = cfg.projection_keys();
        assert_eq!(keys[1], GridKey::new("MG", "rcp45", "10m"));
        assert_eq!(cfg.region.min_lon, -80.0);
    }

    #[test]
    fn validate_rejects_bad_configs() {
        let mut cfg = RunConfig { models: vec![], ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(Error::EmptyEnsemble)));
        cfg.models = vec!["AC".into(), "AC".into()];
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
        cfg.models = vec!["AC".into()];
        cfg.region = Extent::new(10.0, 0.0, 0.0, 1.0);
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}

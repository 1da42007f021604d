use std::{fs, path::Path, path::PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{util, util::RenderConfig, Heuristic, IntensityField};

/// Where the intensity field of a run comes from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FieldSource {
    /// A square field of uniformly random intensities
    Random {
        #[serde(default = "default_size")]
        size: usize,
        /// Fixed seed for reproducible fields, a fresh one is drawn when absent
        #[serde(default)]
        seed: Option<u64>,
    },
    /// The grayscale version of an image file
    Image { path: PathBuf },
}

fn default_size() -> usize {
    64
}

impl Default for FieldSource {
    fn default() -> Self {
        Self::Random {
            size: default_size(),
            seed: None,
        }
    }
}

impl FieldSource {
    pub fn load(&self) -> Result<IntensityField, anyhow::Error> {
        match self {
            FieldSource::Random {
                size,
                seed: Some(seed),
            } => IntensityField::random_seeded(*size, *size, *seed),
            FieldSource::Random { size, seed: None } => {
                IntensityField::random(*size, *size, &mut rand::thread_rng())
            }
            FieldSource::Image { path } => util::load_field(path),
        }
    }
}

/// Everything the `gridpath` binary needs for one run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)] // every key is optional
pub struct RunConfig {
    pub source: FieldSource,
    pub heuristic: Heuristic,
    pub render: RenderConfig,
    /// PNG the rendered field and path are written to
    pub output: PathBuf,
    /// Optional JSON dump of the path result
    pub path_json: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: FieldSource::default(),
            heuristic: Heuristic::default(),
            render: RenderConfig::default(),
            output: PathBuf::from("path.png"),
            path_json: None,
        }
    }
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

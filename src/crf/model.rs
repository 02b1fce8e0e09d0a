use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File layout of a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub dir: PathBuf,
}

impl ModelPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn lexicon(&self) -> PathBuf {
        self.dir.join("lexicon")
    }

    pub fn pos(&self) -> PathBuf {
        self.dir.join("pos")
    }

    pub fn tags(&self) -> PathBuf {
        self.dir.join("tags")
    }

    pub fn attributes(&self) -> PathBuf {
        self.dir.join("attributes")
    }

    pub fn info(&self) -> PathBuf {
        self.dir.join("model.json")
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io("unable to create model directory", &self.dir, e))
    }
}

/// Everything about a trained model that is not a dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Longest training sentence, used to pre-size lattices.
    pub max_size: usize,
    pub num_tags: usize,
    pub num_attributes: usize,
    /// Enabled template ids in registration order.
    pub types: Vec<String>,
    pub weights: Vec<f64>,
}

impl ModelInfo {
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| Error::io("unable to open model info", path, e))?;
        let info: ModelInfo = serde_json::from_reader(BufReader::new(f))?;
        if info.weights.len() != info.num_attributes {
            return Err(Error::Model(format!(
                "{} has {} weights for {} attributes",
                path.display(),
                info.weights.len(),
                info.num_attributes
            )));
        }
        Ok(info)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let f = File::create(path).map_err(|e| Error::io("unable to open file for writing", path, e))?;
        let mut out = BufWriter::new(f);
        serde_json::to_writer(&mut out, self)?;
        out.flush().map_err(|e| Error::io("unable to write model info", path, e))
    }
}

use anyhow::{anyhow, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use fieldgraph_graph::Model;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct DumpData {
    pub models: Vec<Model>,
    pub timestamp: u64,
}

#[derive(Serialize)]
struct DumpRef<'a> {
    models: Vec<&'a Model>,
    timestamp: u64,
}

/// Binary dump of every catalogued model in a single file
pub struct ModelDump {
    dump_path: PathBuf,
}

impl ModelDump {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            dump_path: data_dir.as_ref().join("models.dump"),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.dump_path
    }

    /// Replace the dump. Readers see either the previous file or the new one, never a
    /// partial write.
    pub fn save(&self, models: &[Arc<Model>]) -> Result<()> {
        let dump = DumpRef {
            models: models.iter().map(|m| m.as_ref()).collect(),
            timestamp: SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
        };
        let data = bincode::serialize(&dump).map_err(|e| anyhow!("Serialization error: {}", e))?;

        AtomicFile::new(&self.dump_path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&data))
            .map_err(|e| anyhow!("Failed to write {:?}: {}", self.dump_path, e))?;

        info!(models = models.len(), bytes = data.len(), path = ?self.dump_path, "dump saved");
        Ok(())
    }

    /// Load the dump written by [`ModelDump::save`], if there is one
    pub fn load(&self) -> Result<Option<DumpData>> {
        if !self.dump_path.exists() {
            return Ok(None);
        }

        let data = std::fs::read(&self.dump_path)?;
        let dump: DumpData = bincode::deserialize(&data).map_err(|e| anyhow!("Deserialization error: {}", e))?;
        Ok(Some(dump))
    }
}

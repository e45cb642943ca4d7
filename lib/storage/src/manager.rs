use fieldgraph_core::{Error, Result};
use fieldgraph_graph::Model;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::persistence::ModelDump;
use crate::snapshot::{SnapshotDescription, SnapshotManager};

/// Named models side by side, with snapshot and dump persistence
pub struct ModelCatalog {
    models: RwLock<HashMap<String, Arc<Model>>>,
    data_dir: PathBuf,
    snapshots: SnapshotManager,
    dump: ModelDump,
}

impl ModelCatalog {
    /// Open a catalog under `data_dir`, restoring models from the last dump if present
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let snapshots = SnapshotManager::new(data_dir.join("snapshots"))
            .map_err(|e| Error::Storage(e.to_string()))?;
        let dump = ModelDump::new(&data_dir);

        let mut models = HashMap::new();
        if let Some(data) = dump.load().map_err(|e| Error::Storage(e.to_string()))? {
            for model in data.models {
                models.insert(model.name().to_string(), Arc::new(model));
            }
            info!(models = models.len(), "restored models from dump");
        }

        Ok(Self {
            models: RwLock::new(models),
            data_dir,
            snapshots,
            dump,
        })
    }

    /// Add a model, replacing any model with the same name
    pub fn insert(&self, model: Model) -> Arc<Model> {
        let model = Arc::new(model);
        let previous = self
            .models
            .write()
            .insert(model.name().to_string(), model.clone());
        if previous.is_some() {
            warn!(model = model.name(), "replaced existing model");
        }
        model
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<Arc<Model>> {
        self.models.read().get(name).cloned()
    }

    /// Like [`ModelCatalog::get`], failing with NotFound
    pub fn require(&self, name: &str) -> Result<Arc<Model>> {
        self.get(name)
            .ok_or_else(|| Error::NotFound(format!("model '{}'", name)))
    }

    pub fn remove(&self, name: &str) -> bool {
        self.models.write().remove(name).is_some()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    /// Model names, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.read().keys().cloned().collect();
        names.sort();
        names
    }

    #[inline]
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write every model to the dump file
    pub fn save(&self) -> Result<()> {
        let models: Vec<Arc<Model>> = {
            let guard = self.models.read();
            let mut models: Vec<Arc<Model>> = guard.values().cloned().collect();
            models.sort_by(|a, b| a.name().cmp(b.name()));
            models
        };
        self.dump.save(&models).map_err(|e| Error::Storage(e.to_string()))
    }

    // ==================== Snapshot Methods ====================

    pub fn create_snapshot(&self, model_name: &str) -> Result<SnapshotDescription> {
        let model = self.require(model_name)?;
        self.snapshots
            .create_model_snapshot(&model)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    pub fn list_snapshots(&self, model_name: &str) -> Result<Vec<SnapshotDescription>> {
        self.snapshots
            .list_model_snapshots(model_name)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    pub fn list_all_snapshots(&self) -> Result<Vec<SnapshotDescription>> {
        self.snapshots
            .list_all_snapshots()
            .map_err(|e| Error::Storage(e.to_string()))
    }

    pub fn delete_snapshot(&self, model_name: &str, snapshot_name: &str) -> Result<bool> {
        self.snapshots
            .delete_model_snapshot(model_name, snapshot_name)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Load a snapshot and put its model in the catalog
    pub fn recover_from_snapshot(&self, model_name: &str, snapshot_name: &str) -> Result<Arc<Model>> {
        let data = self
            .snapshots
            .load_model_snapshot(model_name, snapshot_name)
            .map_err(|e| Error::Storage(e.to_string()))?;
        info!(model = model_name, snapshot = snapshot_name, created_at = %data.created_at, "recovered from snapshot");
        Ok(self.insert(data.model))
    }
}

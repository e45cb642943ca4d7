// Gzip-compressed JSON snapshots of built models
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use fieldgraph_graph::Model;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SNAPSHOT_EXTENSION: &str = "snapshot";
const CHECKSUM_EXTENSION: &str = "sha256";

/// Snapshot description for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub model: String,
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// On-disk snapshot payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSnapshotData {
    pub created_at: DateTime<Utc>,
    pub model: Model,
}

pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)?;
        Ok(Self { snapshot_dir })
    }

    /// Directory holding the snapshots of one model
    fn model_snapshot_dir(&self, model_name: &str) -> Result<PathBuf> {
        if model_name.is_empty()
            || model_name.starts_with('.')
            || model_name.contains(|c| c == '/' || c == '\\')
        {
            bail!("Invalid model name '{}'", model_name);
        }
        Ok(self.snapshot_dir.join(model_name))
    }

    /// Path of one snapshot file inside its model directory
    fn snapshot_file(&self, model_name: &str, snapshot_name: &str) -> Result<PathBuf> {
        let suffix = format!(".{}", SNAPSHOT_EXTENSION);
        if snapshot_name.len() <= suffix.len()
            || snapshot_name.starts_with('.')
            || snapshot_name.contains(|c| c == '/' || c == '\\')
            || !snapshot_name.ends_with(&suffix)
        {
            bail!("Invalid snapshot name '{}'", snapshot_name);
        }
        Ok(self.model_snapshot_dir(model_name)?.join(snapshot_name))
    }

    /// Sidecar holding the checksum recorded when the snapshot was written
    fn checksum_file(snapshot_path: &Path) -> PathBuf {
        let mut name = snapshot_path.as_os_str().to_owned();
        name.push(".");
        name.push(CHECKSUM_EXTENSION);
        PathBuf::from(name)
    }

    fn stored_checksum(snapshot_path: &Path) -> Result<Option<String>> {
        let path = Self::checksum_file(snapshot_path);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?.trim().to_string()))
    }

    /// Timestamped file name, unique within the model directory
    fn generate_snapshot_name(dir: &Path, model_name: &str, now: DateTime<Utc>) -> String {
        let stem = format!("{}-{}", model_name, now.format("%Y-%m-%d-%H-%M-%S-%3f"));
        let mut name = format!("{}.{}", stem, SNAPSHOT_EXTENSION);
        let mut n = 1;
        while dir.join(&name).exists() {
            name = format!("{}-{}.{}", stem, n, SNAPSHOT_EXTENSION);
            n += 1;
        }
        name
    }

    fn checksum_of(path: &Path) -> Result<String> {
        let file_data = fs::read(path)?;
        Ok(format!("{:x}", Sha256::digest(&file_data)))
    }

    fn describe(model_name: &str, path: &Path) -> Result<SnapshotDescription> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Snapshot path {:?} has no file name", path))?
            .to_string();
        let metadata = fs::metadata(path)?;
        let creation_time = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%dT%H:%M:%SZ").to_string());

        Ok(SnapshotDescription {
            model: model_name.to_string(),
            name,
            creation_time,
            size: metadata.len(),
            checksum: Self::stored_checksum(path)?,
        })
    }

    /// Write a snapshot of the model
    pub fn create_model_snapshot(&self, model: &Model) -> Result<SnapshotDescription> {
        let model_dir = self.model_snapshot_dir(model.name())?;
        fs::create_dir_all(&model_dir)?;

        let now = Utc::now();
        let snapshot_name = Self::generate_snapshot_name(&model_dir, model.name(), now);
        let snapshot_path = model_dir.join(&snapshot_name);

        let data = SnapshotRef { created_at: now, model };
        let json_data = serde_json::to_vec(&data)?;

        let file = File::create(&snapshot_path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(&json_data)?;
        encoder.finish()?.flush()?;
        fs::write(Self::checksum_file(&snapshot_path), Self::checksum_of(&snapshot_path)?)?;

        let description = Self::describe(model.name(), &snapshot_path)?;
        info!(model = model.name(), snapshot = %description.name, size = description.size, "snapshot created");
        Ok(description)
    }

    /// Snapshots of one model, newest first
    pub fn list_model_snapshots(&self, model_name: &str) -> Result<Vec<SnapshotDescription>> {
        let model_dir = self.model_snapshot_dir(model_name)?;
        if !model_dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&model_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some(SNAPSHOT_EXTENSION) {
                snapshots.push(Self::describe(model_name, &path)?);
            }
        }

        // Names embed the timestamp
        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }

    pub fn load_model_snapshot(&self, model_name: &str, snapshot_name: &str) -> Result<ModelSnapshotData> {
        let snapshot_path = self.snapshot_file(model_name, snapshot_name)?;
        if !snapshot_path.exists() {
            bail!("Snapshot '{}' not found for model '{}'", snapshot_name, model_name);
        }
        let expected = Self::stored_checksum(&snapshot_path)?;
        self.load_snapshot_from_path(&snapshot_path, expected.as_deref())
    }

    /// Load a snapshot file, optionally checking its SHA-256 first
    pub fn load_snapshot_from_path(&self, path: &Path, expected_checksum: Option<&str>) -> Result<ModelSnapshotData> {
        if let Some(expected) = expected_checksum {
            let actual = Self::checksum_of(path)?;
            if actual != expected {
                bail!("Checksum mismatch: expected {}, got {}", expected, actual);
            }
        }

        let file = File::open(path)?;
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut json_data = Vec::new();
        decoder.read_to_end(&mut json_data)?;

        let data: ModelSnapshotData = serde_json::from_slice(&json_data)?;
        debug!(model = data.model.name(), path = ?path, "snapshot loaded");
        Ok(data)
    }

    pub fn delete_model_snapshot(&self, model_name: &str, snapshot_name: &str) -> Result<bool> {
        let snapshot_path = self.snapshot_file(model_name, snapshot_name)?;
        if snapshot_path.exists() {
            fs::remove_file(&snapshot_path)?;
            let checksum_path = Self::checksum_file(&snapshot_path);
            if checksum_path.exists() {
                fs::remove_file(checksum_path)?;
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get_snapshot_path(&self, model_name: &str, snapshot_name: &str) -> Option<PathBuf> {
        let path = self.snapshot_file(model_name, snapshot_name).ok()?;
        path.exists().then_some(path)
    }

    /// Snapshots of every model, newest first
    pub fn list_all_snapshots(&self) -> Result<Vec<SnapshotDescription>> {
        let mut all_snapshots = Vec::new();
        if !self.snapshot_dir.exists() {
            return Ok(all_snapshots);
        }

        for entry in fs::read_dir(&self.snapshot_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(model_name) = entry.file_name().to_str() {
                    all_snapshots.extend(self.list_model_snapshots(model_name)?);
                }
            }
        }

        all_snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(all_snapshots)
    }
}

/// Borrowing twin of [`ModelSnapshotData`] so writing does not clone the model
#[derive(Serialize)]
struct SnapshotRef<'a> {
    created_at: DateTime<Utc>,
    model: &'a Model,
}

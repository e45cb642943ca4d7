pub mod manager;
pub mod snapshot;
pub mod persistence;

pub use manager::ModelCatalog;
pub use snapshot::{ModelSnapshotData, SnapshotDescription, SnapshotManager};
pub use persistence::{DumpData, ModelDump};

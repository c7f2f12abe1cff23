use crate::{
    buffer::buffer_manager::BufferManager,
    config::ExecConfig,
    file::file_manager::FileManager,
    metadata::metadata_manager::MetadataManager,
    opt::heuristic_query_planner::HeuristicQueryPlanner,
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tracing::info;

/// TinyExec opens a database directory and wires the storage managers,
/// the catalog and the planner together.
pub struct TinyExec {
    pub file_manager: Arc<Mutex<FileManager>>,
    pub buffer_manager: Arc<Mutex<BufferManager>>,
    pub metadata_manager: Arc<MetadataManager>,
}

impl TinyExec {
    pub fn new(dir: impl Into<PathBuf>, block_size: i32, num_buffers: usize) -> Result<Self> {
        let file_manager = Arc::new(Mutex::new(FileManager::new(dir, block_size)?));
        let is_new = unlock!(file_manager).is_new;
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(
            file_manager.clone(),
            num_buffers,
        )));

        let tx = Arc::new(Mutex::new(Transaction::new(
            file_manager.clone(),
            buffer_manager.clone(),
        )));
        if is_new {
            info!("creating new database");
        } else {
            info!("opening existing database");
        }
        let metadata_manager = Arc::new(MetadataManager::new(is_new, tx.clone())?);
        unlock!(tx).commit()?;

        Ok(Self {
            file_manager,
            buffer_manager,
            metadata_manager,
        })
    }

    pub fn new_tx(&self) -> Arc<Mutex<Transaction>> {
        Arc::new(Mutex::new(Transaction::new(
            self.file_manager.clone(),
            self.buffer_manager.clone(),
        )))
    }

    pub fn planner(&self, config: ExecConfig) -> HeuristicQueryPlanner {
        HeuristicQueryPlanner::new(self.metadata_manager.clone(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn should_reopen_database() {
        let dir = tempdir().unwrap();
        {
            let db = TinyExec::new(dir.path().join("db"), 400, 8).unwrap();
            assert_eq!(unlock!(db.buffer_manager).available(), 8);
        }
        let db = TinyExec::new(dir.path().join("db"), 400, 8).unwrap();
        let tx = db.new_tx();
        let layout = db.metadata_manager.get_layout("idxcat", tx).unwrap();
        assert!(layout.schema().has_field("indexname"));
    }
}

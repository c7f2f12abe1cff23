use crate::{
    file::file_manager::TEMP_PREFIX,
    record::{layout::Layout, schema::Schema, table_scan::TableScan},
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// TempTable is an uncatalogued table holding an intermediate result.
/// Its file is removed the next time the database directory is opened.
#[derive(Clone)]
pub struct TempTable {
    tx: Arc<Mutex<Transaction>>,
    table_name: String,
    layout: Arc<Layout>,
}

impl TempTable {
    pub fn new(tx: Arc<Mutex<Transaction>>, schema: Arc<Schema>) -> Result<Self> {
        let table_name = format!("{}{}", TEMP_PREFIX, Uuid::new_v4().simple());
        Ok(Self {
            tx,
            table_name,
            layout: Arc::new(Layout::new(schema)?),
        })
    }

    pub fn open(&self) -> Result<TableScan> {
        TableScan::new(self.tx.clone(), &self.table_name, self.layout.clone())
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn file_name(&self) -> String {
        format!("{}.tbl", self.table_name)
    }

    pub fn layout(&self) -> Arc<Layout> {
        self.layout.clone()
    }

    /// blocks returns the current size of the table file
    pub fn blocks(&self) -> Result<u64> {
        Ok(unlock!(self.tx).size(&self.file_name())?.max(0) as u64)
    }
}

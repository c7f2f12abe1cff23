use super::{explain::ExecutionChain, Plan};
use crate::{
    metadata::{metadata_manager::MetadataManager, stat_info::StatInfo},
    query::scan::Scan,
    record::{layout::Layout, schema::Schema, table_scan::TableScan},
    tx::transaction::Transaction,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// TablePlan reads a stored table.
#[derive(Clone)]
pub struct TablePlan {
    table_name: String,
    tx: Arc<Mutex<Transaction>>,
    layout: Arc<Layout>,
    stat_info: StatInfo,
}

impl TablePlan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        table_name: &str,
        md: &MetadataManager,
    ) -> Result<Self> {
        let layout = Arc::new(md.get_layout(table_name, tx.clone())?);
        let stat_info = md.get_stat_info(table_name, layout.clone(), tx.clone())?;
        Ok(Self {
            table_name: table_name.to_string(),
            tx,
            layout,
            stat_info,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// open_table_scan opens the randomly addressable cursor of the table
    pub fn open_table_scan(&self) -> Result<TableScan> {
        TableScan::new(self.tx.clone(), &self.table_name, self.layout.clone())
    }
}

impl Plan for TablePlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        Ok(Box::new(self.open_table_scan()?))
    }

    fn blocks_accessed(&self) -> u64 {
        self.stat_info.num_blocks
    }

    fn records_output(&self) -> u64 {
        self.stat_info.num_records
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        self.stat_info.distinct_values(field_name)
    }

    fn schema(&self) -> Arc<Schema> {
        self.layout.schema()
    }

    fn chain(&self) -> ExecutionChain {
        ExecutionChain::table(&self.table_name, self.blocks_accessed())
    }
}

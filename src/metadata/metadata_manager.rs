use super::{
    index_info::IndexInfo, index_manager::IndexManager, stat_info::StatInfo,
    stat_manager::StatManager, table_manager::TableManager,
};
use crate::{
    record::{layout::Layout, schema::Schema},
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// MetadataManager is the catalog: table layouts, statistics and indexes.
pub struct MetadataManager {
    table_manager: Arc<Mutex<TableManager>>,
    stat_manager: Arc<Mutex<StatManager>>,
    index_manager: Arc<Mutex<IndexManager>>,
}

impl MetadataManager {
    pub fn new(is_new: bool, tx: Arc<Mutex<Transaction>>) -> Result<Self> {
        let table_manager = Arc::new(Mutex::new(TableManager::new(is_new, tx.clone())?));
        let stat_manager = Arc::new(Mutex::new(StatManager::new(
            table_manager.clone(),
            tx.clone(),
        )?));
        let index_manager = Arc::new(Mutex::new(IndexManager::new(
            is_new,
            table_manager.clone(),
            stat_manager.clone(),
            tx,
        )?));

        Ok(Self {
            table_manager,
            stat_manager,
            index_manager,
        })
    }

    pub fn create_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<()> {
        unlock!(self.table_manager).create_table(table_name, schema, tx)
    }

    pub fn get_layout(&self, table_name: &str, tx: Arc<Mutex<Transaction>>) -> Result<Layout> {
        unlock!(self.table_manager).get_layout(table_name, tx)
    }

    pub fn create_index(
        &self,
        index_name: &str,
        table_name: &str,
        field_name: &str,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<()> {
        unlock!(self.index_manager).create_index(index_name, table_name, field_name, tx)
    }

    pub fn get_index_info(
        &self,
        table_name: &str,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<HashMap<String, IndexInfo>> {
        unlock!(self.index_manager).get_index_info(table_name, tx)
    }

    pub fn get_stat_info(
        &self,
        table_name: &str,
        layout: Arc<Layout>,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<StatInfo> {
        unlock!(self.stat_manager).get_stat_info(table_name, layout, tx)
    }

    /// refresh_statistics recomputes every table's statistics, typically
    /// after a bulk load
    pub fn refresh_statistics(&self, tx: Arc<Mutex<Transaction>>) -> Result<()> {
        unlock!(self.stat_manager).refresh_statistics(tx)
    }
}

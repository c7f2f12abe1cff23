use super::{
    index_info::IndexInfo,
    stat_manager::StatManager,
    table_manager::{TableManager, MAX_NAME},
};
use crate::{
    query::scan::{Scan as _, UpdateScan as _},
    record::{layout::Layout, schema::Schema, table_scan::TableScan},
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub struct IndexManager {
    layout: Arc<Layout>,
    table_manager: Arc<Mutex<TableManager>>,
    stat_manager: Arc<Mutex<StatManager>>,
}

impl IndexManager {
    pub fn new(
        is_new: bool,
        table_manager: Arc<Mutex<TableManager>>,
        stat_manager: Arc<Mutex<StatManager>>,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<Self> {
        if is_new {
            let mut schema = Schema::default();
            schema.add_string_field("indexname", MAX_NAME);
            schema.add_string_field("tablename", MAX_NAME);
            schema.add_string_field("fieldname", MAX_NAME);
            unlock!(table_manager).create_table("idxcat", Arc::new(schema), tx.clone())?;
        }

        let layout = Arc::new(unlock!(table_manager).get_layout("idxcat", tx)?);

        Ok(Self {
            layout,
            table_manager,
            stat_manager,
        })
    }

    pub fn create_index(
        &self,
        index_name: &str,
        table_name: &str,
        field_name: &str,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<()> {
        let mut ts = TableScan::new(tx, "idxcat", self.layout.clone())?;
        ts.insert()?;
        ts.set_string("indexname", index_name)?;
        ts.set_string("tablename", table_name)?;
        ts.set_string("fieldname", field_name)?;
        ts.close();
        Ok(())
    }

    /// get_index_info returns the indexes of a table keyed by indexed field
    pub fn get_index_info(
        &self,
        table_name: &str,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<HashMap<String, IndexInfo>> {
        let mut found = vec![];
        let mut ts = TableScan::new(tx.clone(), "idxcat", self.layout.clone())?;
        while ts.next()? {
            if ts.get_string("tablename")? == table_name {
                found.push((ts.get_string("indexname")?, ts.get_string("fieldname")?));
            }
        }
        ts.close();

        let mut result = HashMap::new();
        if found.is_empty() {
            return Ok(result);
        }

        let table_layout = Arc::new(unlock!(self.table_manager).get_layout(table_name, tx.clone())?);
        let stat_info =
            unlock!(self.stat_manager).get_stat_info(table_name, table_layout.clone(), tx.clone())?;
        for (index_name, field_name) in found {
            let index_info = IndexInfo::new(
                &index_name,
                &field_name,
                &table_layout.schema(),
                tx.clone(),
                stat_info,
            )?;
            result.insert(field_name, index_info);
        }
        Ok(result)
    }
}

use super::{stat_info::StatInfo, table_manager::TableManager};
use crate::{
    query::scan::{Scan, UpdateScan as _},
    record::{layout::Layout, table_scan::TableScan},
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::debug;

/// Statistics are recomputed after this many lookups.
const REFRESH_INTERVAL: u32 = 100;

pub struct StatManager {
    table_manager: Arc<Mutex<TableManager>>,
    table_stats: HashMap<String, StatInfo>,
    num_calls: u32,
}

impl StatManager {
    pub fn new(table_manager: Arc<Mutex<TableManager>>, tx: Arc<Mutex<Transaction>>) -> Result<Self> {
        let mut sm = Self {
            table_manager,
            table_stats: HashMap::new(),
            num_calls: 0,
        };
        sm.refresh_statistics(tx)?;
        Ok(sm)
    }

    pub fn get_stat_info(
        &mut self,
        table_name: &str,
        layout: Arc<Layout>,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<StatInfo> {
        self.num_calls += 1;
        if self.num_calls > REFRESH_INTERVAL {
            self.refresh_statistics(tx.clone())?;
        }
        match self.table_stats.get(table_name) {
            Some(stat_info) => Ok(*stat_info),
            None => {
                let stat_info = Self::calc_table_stats(table_name, layout, tx)?;
                self.table_stats.insert(table_name.to_string(), stat_info);
                Ok(stat_info)
            }
        }
    }

    pub fn refresh_statistics(&mut self, tx: Arc<Mutex<Transaction>>) -> Result<()> {
        self.table_stats = HashMap::new();
        self.num_calls = 0;

        let table_manager = unlock!(self.table_manager);
        let table_catalog_layout = Arc::new(table_manager.get_layout("tblcat", tx.clone())?);
        let mut ts = TableScan::new(tx.clone(), "tblcat", table_catalog_layout)?;
        while ts.next()? {
            let table_name = ts.get_string("tblname")?;
            let layout = Arc::new(table_manager.get_layout(&table_name, tx.clone())?);
            let stat_info = Self::calc_table_stats(&table_name, layout, tx.clone())?;
            self.table_stats.insert(table_name, stat_info);
        }
        ts.close();
        debug!(tables = self.table_stats.len(), "statistics refreshed");
        Ok(())
    }

    fn calc_table_stats(
        table_name: &str,
        layout: Arc<Layout>,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<StatInfo> {
        let mut num_records = 0;
        let mut num_blocks = 0;

        let mut ts = TableScan::new(tx, table_name, layout)?;
        while ts.next()? {
            num_records += 1;
            num_blocks = ts.get_rid()?.block_num as u64 + 1;
        }
        ts.close();

        Ok(StatInfo::new(num_blocks, num_records))
    }
}

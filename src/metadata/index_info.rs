use super::stat_info::StatInfo;
use crate::{
    error::PlanError,
    index::hash::HashIndex,
    record::{
        layout::Layout,
        schema::{FieldType, Schema},
    },
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// IndexInfo describes one index: its name, the indexed field, and the
/// statistics used to estimate the cost of probing it.
#[derive(Clone)]
pub struct IndexInfo {
    index_name: String,
    field_name: String,
    tx: Arc<Mutex<Transaction>>,
    index_layout: Arc<Layout>,
    stat_info: StatInfo,
}

impl IndexInfo {
    pub fn new(
        index_name: &str,
        field_name: &str,
        table_schema: &Schema,
        tx: Arc<Mutex<Transaction>>,
        stat_info: StatInfo,
    ) -> Result<Self> {
        let unknown = || PlanError::UnknownField {
            field: field_name.to_string(),
        };
        let mut schema = Schema::default();
        schema.add_int_field("block");
        schema.add_int_field("id");
        match table_schema.field_type(field_name).ok_or_else(unknown)? {
            FieldType::Integer => schema.add_int_field("dataval"),
            FieldType::Varchar => {
                schema.add_string_field("dataval", table_schema.length(field_name).ok_or_else(unknown)?)
            }
        }

        Ok(Self {
            index_name: index_name.to_string(),
            field_name: field_name.to_string(),
            tx,
            index_layout: Arc::new(Layout::new(Arc::new(schema))?),
            stat_info,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn open(&self) -> HashIndex {
        HashIndex::new(self.tx.clone(), &self.index_name, self.index_layout.clone())
    }

    /// blocks_accessed estimates the blocks read by one index search
    pub fn blocks_accessed(&self) -> u64 {
        let block_size = unlock!(self.tx).block_size() as u64;
        let rpb = (block_size / self.index_layout.slot_size().max(1) as u64).max(1);
        let num_blocks = self.stat_info.num_records / rpb;
        HashIndex::search_cost(num_blocks, rpb)
    }

    /// records_output estimates the matches of one search key
    pub fn records_output(&self) -> u64 {
        self.stat_info.num_records / self.stat_info.distinct_values(&self.field_name).max(1)
    }

    pub fn distinct_values(&self, field_name: &str) -> u64 {
        if field_name == self.field_name {
            1
        } else {
            self.stat_info.distinct_values(field_name)
        }
    }
}

use super::index_select_scan::IndexSelectScan;
use crate::{
    metadata::index_info::IndexInfo,
    plan::{
        explain::{ExecutionChain, PlanKind},
        table_plan::TablePlan,
        Plan,
    },
    query::{constant::Constant, scan::Scan},
    record::schema::Schema,
};
use anyhow::Result;
use std::sync::Arc;

/// IndexSelectPlan selects the records of a table whose indexed field
/// equals a constant by probing the index.
pub struct IndexSelectPlan {
    plan: TablePlan,
    index_info: IndexInfo,
    value: Constant,
}

impl IndexSelectPlan {
    pub fn new(plan: TablePlan, index_info: IndexInfo, value: Constant) -> Self {
        Self {
            plan,
            index_info,
            value,
        }
    }
}

impl Plan for IndexSelectPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let table_scan = self.plan.open_table_scan()?;
        let index = self.index_info.open();
        Ok(Box::new(IndexSelectScan::new(
            table_scan,
            Box::new(index),
            self.value.clone(),
        )?))
    }

    fn blocks_accessed(&self) -> u64 {
        self.index_info
            .blocks_accessed()
            .saturating_add(self.records_output())
    }

    fn records_output(&self) -> u64 {
        self.index_info.records_output()
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        self.index_info.distinct_values(field_name)
    }

    fn schema(&self) -> Arc<Schema> {
        self.plan.schema()
    }

    fn chain(&self) -> ExecutionChain {
        ExecutionChain::unary(
            PlanKind::IndexSelect,
            self.plan.chain(),
            format!("{}={}", self.index_info.field_name(), self.value),
            self.blocks_accessed(),
        )
    }
}

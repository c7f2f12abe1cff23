use super::index_join_scan::IndexJoinScan;
use crate::{
    metadata::index_info::IndexInfo,
    plan::{
        explain::{ExecutionChain, PlanKind},
        table_plan::TablePlan,
        ArcPlan, Plan,
    },
    query::scan::Scan,
    record::schema::Schema,
};
use anyhow::Result;
use std::sync::Arc;

/// IndexJoinPlan probes an index of the inner table once per outer record.
/// The inner side must be a stored table, so it is taken as a `TablePlan`.
pub struct IndexJoinPlan {
    plan1: ArcPlan,
    plan2: TablePlan,
    index_info: IndexInfo,
    join_field: String,
    schema: Arc<Schema>,
}

impl IndexJoinPlan {
    pub fn new(plan1: ArcPlan, plan2: TablePlan, index_info: IndexInfo, join_field: &str) -> Result<Self> {
        let schema = Arc::new(Schema::union(&plan1.schema(), &plan2.schema())?);
        Ok(Self {
            plan1,
            plan2,
            index_info,
            join_field: join_field.to_string(),
            schema,
        })
    }
}

impl Plan for IndexJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let mut outer = self.plan1.open()?;
        let inner = self.plan2.open_table_scan().inspect_err(|_| outer.close())?;
        let index = self.index_info.open();
        Ok(Box::new(IndexJoinScan::new(
            outer,
            Box::new(index),
            &self.join_field,
            inner,
        )?))
    }

    fn blocks_accessed(&self) -> u64 {
        let probes = self
            .plan1
            .records_output()
            .saturating_mul(self.index_info.blocks_accessed());
        self.plan1
            .blocks_accessed()
            .saturating_add(probes)
            .saturating_add(self.records_output())
    }

    fn records_output(&self) -> u64 {
        self.plan1
            .records_output()
            .saturating_mul(self.index_info.records_output())
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        if self.plan1.schema().has_field(field_name) {
            self.plan1.distinct_values(field_name)
        } else {
            self.plan2.distinct_values(field_name)
        }
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn chain(&self) -> ExecutionChain {
        ExecutionChain::binary(
            PlanKind::IndexJoin,
            self.plan1.chain(),
            self.plan2.chain(),
            format!("{}={}", self.join_field, self.index_info.field_name()),
            self.blocks_accessed(),
        )
    }
}

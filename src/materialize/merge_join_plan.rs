use super::{merge_join_scan::MergeJoinScan, record_comparator::SortField, sort_plan::SortPlan};
use crate::{
    plan::{
        explain::{ExecutionChain, PlanKind},
        ArcPlan, Plan,
    },
    query::scan::Scan,
    record::schema::Schema,
    tx::transaction::Transaction,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// MergeJoinPlan sorts both inputs on the join fields and merges them.
pub struct MergeJoinPlan {
    plan1: ArcPlan,
    plan2: ArcPlan,
    sort1: SortPlan,
    sort2: SortPlan,
    field_name1: String,
    field_name2: String,
    schema: Arc<Schema>,
}

impl MergeJoinPlan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        plan1: ArcPlan,
        plan2: ArcPlan,
        field_name1: &str,
        field_name2: &str,
    ) -> Result<Self> {
        let sort1 = SortPlan::new(tx.clone(), plan1.clone(), vec![SortField::asc(field_name1)])?;
        let sort2 = SortPlan::new(tx, plan2.clone(), vec![SortField::asc(field_name2)])?;
        let schema = Arc::new(Schema::union(&plan1.schema(), &plan2.schema())?);
        Ok(Self {
            plan1,
            plan2,
            sort1,
            sort2,
            field_name1: field_name1.to_string(),
            field_name2: field_name2.to_string(),
            schema,
        })
    }
}

impl Plan for MergeJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let mut s1 = self.sort1.open()?;
        let s2 = self.sort2.open_sort_scan().inspect_err(|_| s1.close())?;
        Ok(Box::new(MergeJoinScan::new(
            s1,
            s2,
            &self.field_name1,
            &self.field_name2,
        )?))
    }

    fn blocks_accessed(&self) -> u64 {
        self.sort1
            .blocks_accessed()
            .saturating_add(self.sort2.blocks_accessed())
            .saturating_add(self.plan1.blocks_accessed())
            .saturating_add(self.plan2.blocks_accessed())
    }

    fn records_output(&self) -> u64 {
        let max_vals = self
            .plan1
            .distinct_values(&self.field_name1)
            .max(self.plan2.distinct_values(&self.field_name2))
            .max(1);
        self.plan1
            .records_output()
            .saturating_mul(self.plan2.records_output())
            / max_vals
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
            PlanKind::MergeJoin,
            self.plan1.chain(),
            self.plan2.chain(),
            format!("{}={}", self.field_name1, self.field_name2),
            self.blocks_accessed(),
        )
    }
}

use super::{
    explain::{ExecutionChain, PlanKind},
    ArcPlan, Plan,
};
use crate::{
    query::{predicate::Predicate, scan::Scan, select_scan::SelectScan},
    record::schema::Schema,
};
use anyhow::Result;
use std::sync::Arc;

pub struct SelectPlan {
    plan: ArcPlan,
    pred: Predicate,
}

impl SelectPlan {
    pub fn new(plan: ArcPlan, pred: Predicate) -> Self {
        Self { plan, pred }
    }
}

impl Plan for SelectPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let scan = self.plan.open()?;
        Ok(Box::new(SelectScan::new(scan, self.pred.clone())))
    }

    fn blocks_accessed(&self) -> u64 {
        self.plan.blocks_accessed()
    }

    fn records_output(&self) -> u64 {
        self.plan.records_output() / self.pred.reduction_factor(self.plan.as_ref())
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        if self.pred.equates_with_constant(field_name).is_some() {
            1
        } else if let Some(other) = self.pred.equates_with_field(field_name) {
            self.plan
                .distinct_values(field_name)
                .min(self.plan.distinct_values(other))
        } else {
            self.plan.distinct_values(field_name)
        }
    }

    fn schema(&self) -> Arc<Schema> {
        self.plan.schema()
    }

    fn chain(&self) -> ExecutionChain {
        let preds = self.pred.to_string().replace(" and ", ", ");
        ExecutionChain::unary(PlanKind::Select, self.plan.chain(), preds, self.blocks_accessed())
    }
}

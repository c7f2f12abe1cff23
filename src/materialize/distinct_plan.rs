use super::{
    materialize_plan::MaterializePlan,
    record_comparator::{RecordComparator, SortField},
    runs::{merge_pass, split_into_runs},
    temp_table::TempTable,
};
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
use tracing::trace;

/// DistinctPlan removes duplicate records by sorting on every field and
/// dropping a record equal to the one emitted before it.
pub struct DistinctPlan {
    tx: Arc<Mutex<Transaction>>,
    plan: ArcPlan,
    comp: RecordComparator,
    materialized: MaterializePlan,
}

impl DistinctPlan {
    pub fn new(tx: Arc<Mutex<Transaction>>, plan: ArcPlan) -> Result<Self> {
        Self::with_order(tx, plan, &[])
    }

    /// with_order sorts on the given fields that belong to the input first,
    /// then on the remaining fields ascending
    pub fn with_order(
        tx: Arc<Mutex<Transaction>>,
        plan: ArcPlan,
        order_by: &[SortField],
    ) -> Result<Self> {
        let schema = plan.schema();
        let mut fields: Vec<SortField> = order_by
            .iter()
            .filter(|f| schema.has_field(&f.field))
            .cloned()
            .collect();
        for field in &schema.fields {
            if !fields.iter().any(|f| &f.field == field) {
                fields.push(SortField::asc(field));
            }
        }
        let materialized = MaterializePlan::new(tx.clone(), plan.clone())?;
        Ok(Self {
            tx,
            plan,
            comp: RecordComparator::new(fields),
            materialized,
        })
    }

    fn deduplicate(&self) -> Result<TempTable> {
        let schema = self.plan.schema();
        let mut src = self.plan.open()?;
        let runs = split_into_runs(self.tx.clone(), src.as_mut(), schema.clone(), &self.comp, true);
        src.close();

        let mut runs = runs?;
        while runs.len() > 1 {
            runs = merge_pass(self.tx.clone(), runs, schema.clone(), &self.comp, true)?;
        }
        trace!(order = %self.comp, "duplicates removed");
        match runs.pop() {
            Some(run) => Ok(run),
            None => TempTable::new(self.tx.clone(), schema),
        }
    }
}

impl Plan for DistinctPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let result = self.deduplicate()?;
        Ok(Box::new(result.open()?))
    }

    fn blocks_accessed(&self) -> u64 {
        self.materialized.blocks_accessed()
    }

    fn records_output(&self) -> u64 {
        let combinations = self
            .plan
            .schema()
            .fields
            .iter()
            .fold(1u64, |acc, f| acc.saturating_mul(self.plan.distinct_values(f)));
        combinations.min(self.plan.records_output())
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        self.plan.distinct_values(field_name)
    }

    fn schema(&self) -> Arc<Schema> {
        self.plan.schema()
    }

    fn chain(&self) -> ExecutionChain {
        ExecutionChain::unary(
            PlanKind::Distinct,
            self.plan.chain(),
            self.comp.to_string(),
            self.blocks_accessed(),
        )
    }
}

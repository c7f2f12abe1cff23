use super::{
    materialize_plan::MaterializePlan,
    record_comparator::{RecordComparator, SortField},
    runs::{merge_pass, split_into_runs},
    sort_scan::SortScan,
};
use crate::{
    error::PlanError,
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

/// SortPlan is an external merge sort.
///
/// `open` splits the input into runs and merges them pairwise until at
/// most two remain; the returned [`SortScan`] merges the last two while
/// it is read.
pub struct SortPlan {
    tx: Arc<Mutex<Transaction>>,
    plan: ArcPlan,
    schema: Arc<Schema>,
    comp: RecordComparator,
    materialized: MaterializePlan,
}

impl SortPlan {
    pub fn new(tx: Arc<Mutex<Transaction>>, plan: ArcPlan, sort_fields: Vec<SortField>) -> Result<Self> {
        let schema = plan.schema();
        if let Some(missing) = sort_fields.iter().find(|f| !schema.has_field(&f.field)) {
            return Err(PlanError::UnknownField {
                field: missing.field.clone(),
            }
            .into());
        }
        let materialized = MaterializePlan::new(tx.clone(), plan.clone())?;
        Ok(Self {
            tx,
            plan,
            schema,
            comp: RecordComparator::new(sort_fields),
            materialized,
        })
    }

    pub fn sort_fields(&self) -> &[SortField] {
        self.comp.fields()
    }

    pub fn open_sort_scan(&self) -> Result<SortScan> {
        let mut src = self.plan.open()?;
        let runs = split_into_runs(
            self.tx.clone(),
            src.as_mut(),
            self.schema.clone(),
            &self.comp,
            false,
        );
        src.close();

        let mut runs = runs?;
        while runs.len() > 2 {
            runs = merge_pass(self.tx.clone(), runs, self.schema.clone(), &self.comp, false)?;
        }
        trace!(runs = runs.len(), order = %self.comp, "sort ready for final merge");
        SortScan::new(&runs, self.schema.clone(), self.comp.clone())
    }
}

impl Plan for SortPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        Ok(Box::new(self.open_sort_scan()?))
    }

    /// blocks_accessed is the size of the sorted output; the one-time cost
    /// of producing the runs is not included
    fn blocks_accessed(&self) -> u64 {
        self.materialized.blocks_accessed()
    }

    fn records_output(&self) -> u64 {
        self.plan.records_output()
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        self.plan.distinct_values(field_name)
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn chain(&self) -> ExecutionChain {
        ExecutionChain::unary(
            PlanKind::Sort,
            self.plan.chain(),
            self.comp.to_string(),
            self.blocks_accessed(),
        )
    }
}

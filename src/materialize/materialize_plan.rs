use super::temp_table::TempTable;
use crate::{
    plan::{
        explain::{ExecutionChain, PlanKind},
        ArcPlan, Plan,
    },
    query::scan::{Scan, UpdateScan},
    record::{layout::Layout, schema::Schema},
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// MaterializePlan copies the output of its child into a temp table.
pub struct MaterializePlan {
    tx: Arc<Mutex<Transaction>>,
    plan: ArcPlan,
    layout: Layout,
}

impl MaterializePlan {
    pub fn new(tx: Arc<Mutex<Transaction>>, plan: ArcPlan) -> Result<Self> {
        let layout = Layout::new(plan.schema())?;
        Ok(Self { tx, plan, layout })
    }

    /// materialize runs the child plan to completion into a new temp table
    pub fn materialize(&self) -> Result<TempTable> {
        let temp = TempTable::new(self.tx.clone(), self.plan.schema())?;
        let mut src = self.plan.open()?;
        let mut dest = temp.open().inspect_err(|_| src.close())?;
        let copied = copy_all(src.as_mut(), &mut dest, &self.plan.schema());
        src.close();
        dest.close();
        copied?;
        Ok(temp)
    }
}

fn copy_all(src: &mut dyn Scan, dest: &mut dyn UpdateScan, schema: &Schema) -> Result<()> {
    while src.next()? {
        copy_record(src, dest, schema)?;
    }
    Ok(())
}

/// copy_record inserts the current record of `src` into `dest`
pub fn copy_record(src: &mut dyn Scan, dest: &mut dyn UpdateScan, schema: &Schema) -> Result<()> {
    dest.insert()?;
    for field in &schema.fields {
        dest.set_value(field, src.get_value(field)?)?;
    }
    Ok(())
}

impl Plan for MaterializePlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let temp = self.materialize()?;
        Ok(Box::new(temp.open()?))
    }

    /// blocks_accessed is the size of the materialized table; producing the
    /// child is charged to the caller
    fn blocks_accessed(&self) -> u64 {
        let block_size = unlock!(self.tx).block_size().max(1) as u64;
        let rpb = (block_size / self.layout.slot_size().max(1) as u64).max(1);
        self.plan.records_output().div_ceil(rpb)
    }

    fn records_output(&self) -> u64 {
        self.plan.records_output()
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        self.plan.distinct_values(field_name)
    }

    fn schema(&self) -> Arc<Schema> {
        self.plan.schema()
    }

    fn chain(&self) -> ExecutionChain {
        ExecutionChain::unary(
            PlanKind::Materialize,
            self.plan.chain(),
            "",
            self.blocks_accessed(),
        )
    }
}

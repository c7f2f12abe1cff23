use super::block_join_scan::BlockJoinScan;
use crate::{
    materialize::materialize_plan::MaterializePlan,
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

/// MultibufferProductPlan is the Cartesian product that materializes its
/// right input and reads it in chunks, rescanning the left input per chunk.
pub struct MultibufferProductPlan {
    tx: Arc<Mutex<Transaction>>,
    lhs: ArcPlan,
    rhs: ArcPlan,
    materialized: MaterializePlan,
    schema: Arc<Schema>,
}

impl MultibufferProductPlan {
    pub fn new(tx: Arc<Mutex<Transaction>>, lhs: ArcPlan, rhs: ArcPlan) -> Result<Self> {
        let schema = Arc::new(Schema::union(&lhs.schema(), &rhs.schema())?);
        Ok(Self {
            materialized: MaterializePlan::new(tx.clone(), rhs.clone())?,
            tx,
            lhs,
            rhs,
            schema,
        })
    }
}

impl Plan for MultibufferProductPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let chunked = self.materialized.materialize()?;
        let rescanned = self.lhs.open()?;
        Ok(Box::new(BlockJoinScan::new(
            self.tx.clone(),
            chunked,
            rescanned,
            None,
        )?))
    }

    fn blocks_accessed(&self) -> u64 {
        self.lhs.records_output().saturating_add(
            self.lhs
                .blocks_accessed()
                .saturating_mul(self.rhs.records_output()),
        )
    }

    fn records_output(&self) -> u64 {
        self.lhs
            .records_output()
            .saturating_mul(self.rhs.records_output())
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        if self.lhs.schema().has_field(field_name) {
            self.lhs.distinct_values(field_name)
        } else {
            self.rhs.distinct_values(field_name)
        }
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn chain(&self) -> ExecutionChain {
        ExecutionChain::binary(
            PlanKind::MultibufferProduct,
            self.lhs.chain(),
            self.rhs.chain(),
            "",
            self.blocks_accessed(),
        )
    }
}

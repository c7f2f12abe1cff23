use super::block_join_scan::{BlockJoinScan, JoinCondition};
use crate::{
    materialize::materialize_plan::MaterializePlan,
    plan::{
        explain::{ExecutionChain, PlanKind},
        ArcPlan, Plan,
    },
    query::{cond_op::CondOp, scan::Scan},
    record::schema::Schema,
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// BlockJoinPlan is a block nested loop join.
///
/// Both inputs are materialized; the larger temp table is read in chunks
/// and the smaller one is rescanned once per chunk. Any comparison
/// operator is allowed.
pub struct BlockJoinPlan {
    tx: Arc<Mutex<Transaction>>,
    plan1: ArcPlan,
    plan2: ArcPlan,
    materialized1: MaterializePlan,
    materialized2: MaterializePlan,
    condition: JoinCondition,
    schema: Arc<Schema>,
}

impl BlockJoinPlan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        plan1: ArcPlan,
        plan2: ArcPlan,
        field_name1: &str,
        op: CondOp,
        field_name2: &str,
    ) -> Result<Self> {
        let schema = Arc::new(Schema::union(&plan1.schema(), &plan2.schema())?);
        Ok(Self {
            materialized1: MaterializePlan::new(tx.clone(), plan1.clone())?,
            materialized2: MaterializePlan::new(tx.clone(), plan2.clone())?,
            tx,
            plan1,
            plan2,
            condition: JoinCondition {
                lhs: field_name1.to_string(),
                op,
                rhs: field_name2.to_string(),
            },
            schema,
        })
    }
}

impl Plan for BlockJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let temp1 = self.materialized1.materialize()?;
        let temp2 = self.materialized2.materialize()?;
        let (chunked, rescanned) = if temp1.blocks()? >= temp2.blocks()? {
            (temp1, temp2)
        } else {
            (temp2, temp1)
        };
        let rescanned = Box::new(rescanned.open()?);
        Ok(Box::new(BlockJoinScan::new(
            self.tx.clone(),
            chunked,
            rescanned,
            Some(self.condition.clone()),
        )?))
    }

    /// blocks_accessed reads both inputs once and the smaller one again for
    /// every chunk of the larger one
    fn blocks_accessed(&self) -> u64 {
        let (b1, b2) = (self.plan1.blocks_accessed(), self.plan2.blocks_accessed());
        let (m1, m2) = (
            self.materialized1.blocks_accessed(),
            self.materialized2.blocks_accessed(),
        );
        let (small, large) = if b1 <= b2 { (m1, m2) } else { (m2, m1) };
        let chunk_budget = unlock!(self.tx).available_buffers().saturating_sub(2).max(1) as u64;
        let chunks = large.div_ceil(chunk_budget);
        b1.saturating_add(b2)
            .saturating_add(chunks.saturating_mul(small))
    }

    fn records_output(&self) -> u64 {
        let product = self
            .plan1
            .records_output()
            .saturating_mul(self.plan2.records_output());
        let factor = match self.condition.op {
            CondOp::Equals => self
                .plan1
                .distinct_values(&self.condition.lhs)
                .max(self.plan2.distinct_values(&self.condition.rhs)),
            CondOp::NotEquals => 1,
            _ => 3,
        };
        product / factor.max(1)
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
            PlanKind::BlockJoin,
            self.plan1.chain(),
            self.plan2.chain(),
            format!(
                "{}{}{}",
                self.condition.lhs, self.condition.op, self.condition.rhs
            ),
            self.blocks_accessed(),
        )
    }
}

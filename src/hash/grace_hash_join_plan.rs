use super::{
    hash_join_plan::HashJoinInputs, hash_join_scan::HashJoinScan,
    partition::partition_recursively,
};
use crate::{
    plan::{
        explain::{ExecutionChain, PlanKind},
        ArcPlan, Plan,
    },
    query::scan::Scan,
    record::schema::Schema,
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// GraceHashJoinPlan partitions both inputs and splits again every pair
/// whose build partition does not fit in `available - 2` buffers.
pub struct GraceHashJoinPlan {
    tx: Arc<Mutex<Transaction>>,
    inputs: HashJoinInputs,
}

impl GraceHashJoinPlan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        plan1: ArcPlan,
        plan2: ArcPlan,
        field_name1: &str,
        field_name2: &str,
    ) -> Result<Self> {
        let inputs = HashJoinInputs::new(tx.clone(), plan1, plan2, field_name1, field_name2)?;
        Ok(Self { tx, inputs })
    }
}

/// estimated_rounds predicts how many partitioning passes a build input of
/// `blocks` blocks needs before its partitions fit the budget.
/// The actual count is found at open time and may differ.
pub fn estimated_rounds(blocks: u64, available: usize) -> u64 {
    let fanout = available.saturating_sub(1).max(2) as u64;
    let budget = available.saturating_sub(2).max(1) as u64;
    let mut size = blocks.div_ceil(fanout);
    let mut rounds = 1;
    while size > budget {
        rounds += 1;
        size = size.div_ceil(fanout);
    }
    rounds
}

impl Plan for GraceHashJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let available = unlock!(self.tx).available_buffers();
        let (mut build_src, mut probe_src) = self.inputs.open_sources()?;
        let outcome = partition_recursively(
            self.tx.clone(),
            build_src.as_mut(),
            &self.inputs.build_side,
            probe_src.as_mut(),
            &self.inputs.probe_side,
            available,
        );
        build_src.close();
        probe_src.close();
        let outcome = outcome?;

        debug!(
            rounds = outcome.rounds,
            partitions = outcome.pairs.len(),
            "grace hash join partitioned"
        );
        Ok(Box::new(HashJoinScan::new(
            outcome.pairs,
            &self.inputs.build_side,
            &self.inputs.probe_side,
        )?))
    }

    /// blocks_accessed reads both inputs, then writes and rereads them once
    /// per partitioning round
    fn blocks_accessed(&self) -> u64 {
        let available = unlock!(self.tx).available_buffers();
        let build_blocks = self.inputs.build_materialized.blocks_accessed();
        let rounds = estimated_rounds(build_blocks, available);
        self.inputs.input_blocks().saturating_add(
            self.inputs
                .materialized_blocks()
                .saturating_mul(2)
                .saturating_mul(rounds),
        )
    }

    fn records_output(&self) -> u64 {
        self.inputs.records_output()
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        self.inputs.distinct_values(field_name)
    }

    fn schema(&self) -> Arc<Schema> {
        self.inputs.schema.clone()
    }

    fn chain(&self) -> ExecutionChain {
        self.inputs.chain(PlanKind::GraceHashJoin, self.blocks_accessed())
    }
}

use super::{
    hash_join_scan::HashJoinScan,
    partition::{partition_pairs, JoinSide},
};
use crate::{
    materialize::materialize_plan::MaterializePlan,
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

/// HashJoinInputs orders the inputs of a hash join: the input with fewer
/// estimated records builds the in-memory tables, the other probes them.
pub(crate) struct HashJoinInputs {
    pub build: ArcPlan,
    pub probe: ArcPlan,
    pub build_side: JoinSide,
    pub probe_side: JoinSide,
    pub build_materialized: MaterializePlan,
    pub probe_materialized: MaterializePlan,
    pub schema: Arc<Schema>,
}

impl HashJoinInputs {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        plan1: ArcPlan,
        plan2: ArcPlan,
        field_name1: &str,
        field_name2: &str,
    ) -> Result<Self> {
        let schema = Arc::new(Schema::union(&plan1.schema(), &plan2.schema())?);
        let ((build, build_field), (probe, probe_field)) =
            if plan1.records_output() <= plan2.records_output() {
                ((plan1, field_name1), (plan2, field_name2))
            } else {
                ((plan2, field_name2), (plan1, field_name1))
            };
        Ok(Self {
            build_side: JoinSide {
                schema: build.schema(),
                field: build_field.to_string(),
            },
            probe_side: JoinSide {
                schema: probe.schema(),
                field: probe_field.to_string(),
            },
            build_materialized: MaterializePlan::new(tx.clone(), build.clone())?,
            probe_materialized: MaterializePlan::new(tx, probe.clone())?,
            build,
            probe,
            schema,
        })
    }

    /// open_sources opens both inputs, closing the first if the second fails
    pub fn open_sources(&self) -> Result<(Box<dyn Scan>, Box<dyn Scan>)> {
        let mut build = self.build.open()?;
        let probe = self.probe.open().inspect_err(|_| build.close())?;
        Ok((build, probe))
    }

    pub fn input_blocks(&self) -> u64 {
        self.build
            .blocks_accessed()
            .saturating_add(self.probe.blocks_accessed())
    }

    pub fn materialized_blocks(&self) -> u64 {
        self.build_materialized
            .blocks_accessed()
            .saturating_add(self.probe_materialized.blocks_accessed())
    }

    pub fn records_output(&self) -> u64 {
        let max_vals = self
            .build
            .distinct_values(&self.build_side.field)
            .max(self.probe.distinct_values(&self.probe_side.field))
            .max(1);
        self.build
            .records_output()
            .saturating_mul(self.probe.records_output())
            / max_vals
    }

    pub fn distinct_values(&self, field_name: &str) -> u64 {
        if self.build_side.schema.has_field(field_name) {
            self.build.distinct_values(field_name)
        } else {
            self.probe.distinct_values(field_name)
        }
    }

    pub fn chain(&self, kind: PlanKind, cost: u64) -> ExecutionChain {
        ExecutionChain::binary(
            kind,
            self.build.chain(),
            self.probe.chain(),
            format!("{}={}", self.build_side.field, self.probe_side.field),
            cost,
        )
    }
}

/// HashJoinPlan partitions both inputs once into `available - 1` buckets
/// and assumes every build bucket fits in memory.
pub struct HashJoinPlan {
    tx: Arc<Mutex<Transaction>>,
    inputs: HashJoinInputs,
}

impl HashJoinPlan {
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

impl Plan for HashJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let buckets = unlock!(self.tx).available_buffers().saturating_sub(1).max(1);
        let (mut build_src, mut probe_src) = self.inputs.open_sources()?;
        let pairs = partition_pairs(
            self.tx.clone(),
            build_src.as_mut(),
            &self.inputs.build_side,
            probe_src.as_mut(),
            &self.inputs.probe_side,
            buckets,
            1,
        );
        build_src.close();
        probe_src.close();
        let pairs = pairs?;

        debug!(buckets = pairs.len(), "hash join partitioned");
        Ok(Box::new(HashJoinScan::new(
            pairs,
            &self.inputs.build_side,
            &self.inputs.probe_side,
        )?))
    }

    /// blocks_accessed charges one partitioning pass and one probe pass
    fn blocks_accessed(&self) -> u64 {
        self.inputs.input_blocks().saturating_mul(3)
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
        self.inputs.chain(PlanKind::HashJoin, self.blocks_accessed())
    }
}

use crate::{
    config::{ExecConfig, JoinMode},
    hash::{grace_hash_join_plan::GraceHashJoinPlan, hash_join_plan::HashJoinPlan},
    index::{index_join_plan::IndexJoinPlan, index_select_plan::IndexSelectPlan},
    materialize::merge_join_plan::MergeJoinPlan,
    metadata::{index_info::IndexInfo, metadata_manager::MetadataManager},
    multibuffer::{block_join_plan::BlockJoinPlan, product_plan::MultibufferProductPlan},
    plan::{explain::PlanKind, select_plan::SelectPlan, table_plan::TablePlan, ArcPlan, Plan},
    query::{cond_op::CondOp, predicate::Predicate},
    record::schema::Schema,
    tx::transaction::Transaction,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// TablePlanner builds the plans that read one table of a query, alone or
/// joined to the plan built so far.
pub struct TablePlanner {
    tx: Arc<Mutex<Transaction>>,
    table_plan: TablePlan,
    pred: Predicate,
    schema: Arc<Schema>,
    indexes: Vec<(String, IndexInfo)>,
    config: ExecConfig,
}

impl TablePlanner {
    pub fn new(
        table_name: &str,
        pred: Predicate,
        tx: Arc<Mutex<Transaction>>,
        md: &MetadataManager,
        config: ExecConfig,
    ) -> Result<Self> {
        let table_plan = TablePlan::new(tx.clone(), table_name, md)?;
        let schema = table_plan.schema();
        let mut indexes: Vec<(String, IndexInfo)> = md
            .get_index_info(table_name, tx.clone())?
            .into_iter()
            .collect();
        indexes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self {
            tx,
            table_plan,
            pred,
            schema,
            indexes,
            config,
        })
    }

    pub fn table_name(&self) -> &str {
        self.table_plan.table_name()
    }

    /// make_select_plan reads the table through an index when a field with
    /// an index is equated with a constant, then filters on the terms that
    /// mention only this table
    pub fn make_select_plan(&self) -> ArcPlan {
        let plan = self
            .make_index_select()
            .unwrap_or_else(|| Arc::new(self.table_plan.clone()));
        self.add_select_pred(plan)
    }

    /// make_join_plan joins this table to `current` with the cheapest
    /// algorithm the join term allows, or with the algorithm the join mode
    /// forces. It returns `None` when no term connects the two.
    ///
    /// The join operator enforces the most constraining join term. Only the
    /// other join terms are checked by a select on top of it.
    pub fn make_join_plan(&self, current: &ArcPlan) -> Result<Option<ArcPlan>> {
        let current_schema = current.schema();
        let Some(join_pred) = self.pred.join_sub_pred(&self.schema, &current_schema) else {
            return Ok(None);
        };

        let estimator = MultibufferProductPlan::new(
            self.tx.clone(),
            current.clone(),
            Arc::new(self.table_plan.clone()),
        )?;
        let Some(term) = join_pred.most_constraining_term(&estimator) else {
            return Ok(None);
        };
        let Some((lhs, op, rhs)) = term.field_comparison() else {
            return Ok(None);
        };
        // the current plan's field goes on the left
        let (lhs, op, rhs) = if self.schema.has_field(lhs) {
            (rhs, op.flip(), lhs)
        } else {
            (lhs, op, rhs)
        };

        let candidates = self.join_candidates(current, lhs, op, rhs)?;
        let chosen = match self.config.join_mode {
            JoinMode::Cost => cheapest(candidates),
            mode => candidates
                .into_iter()
                .find(|(kind, _)| forced_kind(mode) == *kind),
        };

        let (plan, residue) = match chosen {
            Some((kind, plan)) if kind != PlanKind::MultibufferProduct => (plan, join_pred.without(term)),
            Some((_, plan)) => (plan, Some(join_pred.clone())),
            None => {
                debug!(
                    table = self.table_name(),
                    mode = %self.config.join_mode,
                    "join mode not applicable, using product"
                );
                (self.make_product_plan(current)?, Some(join_pred.clone()))
            }
        };
        Ok(Some(match residue {
            Some(pred) => Arc::new(SelectPlan::new(plan, pred)),
            None => plan,
        }))
    }

    /// make_product_plan pairs every record of `current` with every record
    /// of this table
    pub fn make_product_plan(&self, current: &ArcPlan) -> Result<ArcPlan> {
        Ok(Arc::new(MultibufferProductPlan::new(
            self.tx.clone(),
            current.clone(),
            self.make_select_plan(),
        )?))
    }

    fn join_candidates(
        &self,
        current: &ArcPlan,
        lhs: &str,
        op: CondOp,
        rhs: &str,
    ) -> Result<Vec<(PlanKind, ArcPlan)>> {
        let tx = self.tx.clone();
        let inner = self.make_select_plan();
        let mut candidates: Vec<(PlanKind, ArcPlan)> = vec![
            (
                PlanKind::BlockJoin,
                Arc::new(BlockJoinPlan::new(tx.clone(), current.clone(), inner.clone(), lhs, op, rhs)?),
            ),
            (
                PlanKind::MultibufferProduct,
                Arc::new(MultibufferProductPlan::new(tx.clone(), current.clone(), inner.clone())?),
            ),
        ];
        if op.is_equality() {
            candidates.push((
                PlanKind::HashJoin,
                Arc::new(HashJoinPlan::new(tx.clone(), current.clone(), inner.clone(), lhs, rhs)?),
            ));
            candidates.push((
                PlanKind::GraceHashJoin,
                Arc::new(GraceHashJoinPlan::new(tx.clone(), current.clone(), inner.clone(), lhs, rhs)?),
            ));
            candidates.push((
                PlanKind::MergeJoin,
                Arc::new(MergeJoinPlan::new(tx, current.clone(), inner, lhs, rhs)?),
            ));
            if let Some(plan) = self.make_index_join(current, lhs, rhs)? {
                candidates.push((PlanKind::IndexJoin, plan));
            }
        }
        Ok(candidates)
    }

    fn make_index_select(&self) -> Option<ArcPlan> {
        self.indexes.iter().find_map(|(field, index_info)| {
            self.pred.equates_with_constant(field).map(|val| {
                Arc::new(IndexSelectPlan::new(
                    self.table_plan.clone(),
                    index_info.clone(),
                    val.clone(),
                )) as ArcPlan
            })
        })
    }

    /// make_index_join probes an index on `rhs`, a field of this table, with
    /// the `lhs` value of every record of `current`
    fn make_index_join(&self, current: &ArcPlan, lhs: &str, rhs: &str) -> Result<Option<ArcPlan>> {
        let Some((_, index_info)) = self.indexes.iter().find(|(field, _)| field == rhs) else {
            return Ok(None);
        };
        let plan: ArcPlan = Arc::new(IndexJoinPlan::new(
            current.clone(),
            self.table_plan.clone(),
            index_info.clone(),
            lhs,
        )?);
        Ok(Some(self.add_select_pred(plan)))
    }

    fn add_select_pred(&self, plan: ArcPlan) -> ArcPlan {
        match self.pred.select_sub_pred(&self.schema) {
            Some(select_pred) => Arc::new(SelectPlan::new(plan, select_pred)),
            None => plan,
        }
    }
}

/// forced_kind is the operator a join mode other than cost asks for
fn forced_kind(mode: JoinMode) -> PlanKind {
    match mode {
        JoinMode::Block => PlanKind::BlockJoin,
        JoinMode::Hash => PlanKind::GraceHashJoin,
        JoinMode::Merge => PlanKind::MergeJoin,
        JoinMode::Index => PlanKind::IndexJoin,
        JoinMode::Product | JoinMode::Cost => PlanKind::MultibufferProduct,
    }
}

/// cheapest picks the candidate with the fewest estimated block accesses.
/// The product only wins when it is the sole candidate.
fn cheapest(candidates: Vec<(PlanKind, ArcPlan)>) -> Option<(PlanKind, ArcPlan)> {
    for (kind, plan) in &candidates {
        debug!(
            kind = kind.label(),
            cost = plan.blocks_accessed(),
            records = plan.records_output(),
            "join candidate"
        );
    }
    let only_product = candidates
        .iter()
        .all(|(kind, _)| *kind == PlanKind::MultibufferProduct);
    candidates
        .into_iter()
        .filter(|(kind, _)| only_product || *kind != PlanKind::MultibufferProduct)
        .min_by_key(|(_, plan)| plan.blocks_accessed())
}

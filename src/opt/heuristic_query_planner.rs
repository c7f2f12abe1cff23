use super::table_planner::TablePlanner;
use crate::{
    config::ExecConfig,
    error::PlanError,
    materialize::{distinct_plan::DistinctPlan, group_by_plan::GroupByPlan, sort_plan::SortPlan},
    metadata::metadata_manager::MetadataManager,
    plan::{project_plan::ProjectPlan, ArcPlan},
    query::query_data::QueryData,
    tx::transaction::Transaction,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// HeuristicQueryPlanner builds a left-deep join tree greedily: it starts
/// from the table with the smallest selection and keeps adding the table
/// whose join yields the fewest records.
pub struct HeuristicQueryPlanner {
    md: Arc<MetadataManager>,
    config: ExecConfig,
}

impl HeuristicQueryPlanner {
    pub fn new(md: Arc<MetadataManager>, config: ExecConfig) -> Self {
        Self { md, config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    pub fn create_plan(&self, data: &QueryData, tx: Arc<Mutex<Transaction>>) -> Result<ArcPlan> {
        let mut planners = data
            .tables
            .iter()
            .map(|table| {
                TablePlanner::new(table, data.pred.clone(), tx.clone(), &self.md, self.config.clone())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut current = lowest_select_plan(&mut planners).ok_or(PlanError::EmptyQuery)?;
        while !planners.is_empty() {
            current = match lowest_join_plan(&mut planners, &current)? {
                Some(plan) => plan,
                None if self.config.allow_product => lowest_product_plan(&mut planners, &current)?,
                None => {
                    let table = planners
                        .first()
                        .map(|p| p.table_name().to_string())
                        .unwrap_or_default();
                    return Err(PlanError::NoJoinPossible { table }.into());
                }
            };
        }

        if !data.order_by.is_empty() {
            current = Arc::new(SortPlan::new(tx.clone(), current, data.order_by.clone())?);
        }
        if !data.group_by.is_empty() || !data.aggregates.is_empty() {
            current = Arc::new(GroupByPlan::new(
                tx.clone(),
                current,
                data.group_by.clone(),
                data.aggregates.clone(),
            )?);
        }
        if !data.fields.is_empty() {
            current = Arc::new(ProjectPlan::new(current, &data.fields)?);
        }
        if data.distinct {
            current = Arc::new(DistinctPlan::with_order(tx, current, &data.order_by)?);
        }

        info!(
            plan = %current.chain(),
            cost = current.blocks_accessed(),
            records = current.records_output(),
            "chose plan"
        );
        Ok(current)
    }
}

fn lowest_select_plan(planners: &mut Vec<TablePlanner>) -> Option<ArcPlan> {
    let (best, plan) = planners
        .iter()
        .map(|planner| planner.make_select_plan())
        .enumerate()
        .min_by_key(|(_, plan)| plan.records_output())?;
    let planner = planners.remove(best);
    debug!(table = planner.table_name(), records = plan.records_output(), "join order starts");
    Some(plan)
}

fn lowest_join_plan(planners: &mut Vec<TablePlanner>, current: &ArcPlan) -> Result<Option<ArcPlan>> {
    let mut best: Option<(usize, ArcPlan)> = None;
    for (i, planner) in planners.iter().enumerate() {
        let Some(plan) = planner.make_join_plan(current)? else {
            continue;
        };
        if best
            .as_ref()
            .map_or(true, |(_, b)| plan.records_output() < b.records_output())
        {
            best = Some((i, plan));
        }
    }
    Ok(best.map(|(i, plan)| {
        let planner = planners.remove(i);
        debug!(table = planner.table_name(), records = plan.records_output(), "joined");
        plan
    }))
}

fn lowest_product_plan(planners: &mut Vec<TablePlanner>, current: &ArcPlan) -> Result<ArcPlan> {
    let mut best: Option<(usize, ArcPlan)> = None;
    for (i, planner) in planners.iter().enumerate() {
        let plan = planner.make_product_plan(current)?;
        if best
            .as_ref()
            .map_or(true, |(_, b)| plan.records_output() < b.records_output())
        {
            best = Some((i, plan));
        }
    }
    let (i, plan) = best.ok_or(PlanError::EmptyQuery)?;
    let planner = planners.remove(i);
    debug!(table = planner.table_name(), records = plan.records_output(), "joined by product");
    Ok(plan)
}

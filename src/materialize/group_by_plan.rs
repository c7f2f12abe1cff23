use super::{
    aggregation::Aggregate, group_by_scan::GroupByScan, record_comparator::SortField,
    sort_plan::SortPlan,
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

/// GroupByPlan sorts its input on the group fields and folds every group
/// into one record of group fields followed by aggregate values.
pub struct GroupByPlan {
    plan: ArcPlan,
    sort: SortPlan,
    group_fields: Vec<String>,
    aggregates: Vec<Aggregate>,
    schema: Arc<Schema>,
}

impl GroupByPlan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        plan: ArcPlan,
        group_fields: Vec<String>,
        aggregates: Vec<Aggregate>,
    ) -> Result<Self> {
        let sort_fields = group_fields.iter().map(|f| SortField::asc(f)).collect();
        let sort = SortPlan::new(tx, plan.clone(), sort_fields)?;

        let child = plan.schema();
        let mut schema = Schema::default();
        for field in &group_fields {
            schema.add(field, &child)?;
        }
        for aggregate in &aggregates {
            let name = aggregate.output_name();
            if aggregate.is_always_integer() {
                if aggregate.field() != "*" && !child.has_field(aggregate.field()) {
                    return Err(unknown(aggregate.field()));
                }
                schema.add_int_field(name);
            } else {
                let field = aggregate.field();
                match (child.field_type(field), child.length(field)) {
                    (Some(field_type), Some(length)) => schema.add_field(name, field_type, length),
                    _ => return Err(unknown(field)),
                }
            }
        }

        Ok(Self {
            plan,
            sort,
            group_fields,
            aggregates,
            schema: Arc::new(schema),
        })
    }
}

fn unknown(field: &str) -> anyhow::Error {
    PlanError::UnknownField {
        field: field.to_string(),
    }
    .into()
}

impl Plan for GroupByPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let scan = self.sort.open()?;
        let aggregates = self.aggregates.iter().map(|a| a.create()).collect();
        Ok(Box::new(GroupByScan::new(
            scan,
            self.group_fields.clone(),
            aggregates,
        )?))
    }

    fn blocks_accessed(&self) -> u64 {
        self.sort.blocks_accessed()
    }

    /// records_output assumes every combination of group values occurs,
    /// bounded by the number of input records
    fn records_output(&self) -> u64 {
        let groups = self
            .group_fields
            .iter()
            .fold(1u64, |acc, f| acc.saturating_mul(self.plan.distinct_values(f)));
        groups.min(self.plan.records_output().max(1))
    }

    fn distinct_values(&self, field_name: &str) -> u64 {
        if self.plan.schema().has_field(field_name) {
            self.plan.distinct_values(field_name)
        } else {
            self.records_output()
        }
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn chain(&self) -> ExecutionChain {
        let mut names = self.group_fields.clone();
        names.extend(self.aggregates.iter().map(|a| a.output_name()));
        ExecutionChain::unary(
            PlanKind::GroupBy,
            self.sort.chain(),
            names.join(", "),
            self.blocks_accessed(),
        )
    }
}

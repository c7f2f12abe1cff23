use super::{
    explain::{ExecutionChain, PlanKind},
    ArcPlan, Plan,
};
use crate::{
    query::{project_scan::ProjectScan, scan::Scan},
    record::schema::Schema,
};
use anyhow::Result;
use std::sync::Arc;

pub struct ProjectPlan {
    plan: ArcPlan,
    schema: Arc<Schema>,
}

impl ProjectPlan {
    pub fn new(plan: ArcPlan, fields: &[String]) -> Result<Self> {
        let mut schema = Schema::default();
        let child = plan.schema();
        for field in fields {
            schema.add(field, &child)?;
        }
        Ok(Self {
            plan,
            schema: Arc::new(schema),
        })
    }
}

impl Plan for ProjectPlan {
    fn open(&self) -> Result<Box<dyn Scan>> {
        let scan = self.plan.open()?;
        Ok(Box::new(ProjectScan::new(scan, self.schema.fields.clone())))
    }

    fn blocks_accessed(&self) -> u64 {
        self.plan.blocks_accessed()
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
            PlanKind::Project,
            self.plan.chain(),
            self.schema.fields.join(", "),
            self.blocks_accessed(),
        )
    }
}

pub mod explain;
pub mod project_plan;
pub mod select_plan;
pub mod table_plan;

use crate::{query::scan::Scan, record::schema::Schema};
use anyhow::Result;
use explain::ExecutionChain;
use std::sync::Arc;

/// Plan is a node of the operator tree.
///
/// The estimators are computed from the estimates of the children and
/// never from running the plan; `open` builds the cursor that does.
pub trait Plan {
    fn open(&self) -> Result<Box<dyn Scan>>;
    /// estimated number of block accesses needed to produce every output record
    fn blocks_accessed(&self) -> u64;
    /// estimated number of output records
    fn records_output(&self) -> u64;
    /// estimated number of distinct values of the field in the output
    fn distinct_values(&self, field_name: &str) -> u64;
    fn schema(&self) -> Arc<Schema>;
    /// chain describes the operator tree for explain output
    fn chain(&self) -> ExecutionChain;
}

pub type ArcPlan = Arc<dyn Plan>;

pub mod cond_op;
pub mod constant;
pub mod expression;
pub mod predicate;
pub mod project_scan;
pub mod query_data;
pub mod scan;
pub mod select_scan;
pub mod term;

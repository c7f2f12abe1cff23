pub mod aggregation;
pub mod distinct_plan;
pub mod group_by_plan;
pub mod group_by_scan;
pub mod materialize_plan;
pub mod merge_join_plan;
pub mod merge_join_scan;
pub mod record_comparator;
pub mod runs;
pub mod sort_plan;
pub mod sort_scan;
pub mod temp_table;

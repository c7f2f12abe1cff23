pub mod heuristic_query_planner;
pub mod table_planner;

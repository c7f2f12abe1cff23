pub mod block_join_plan;
pub mod block_join_scan;
pub mod buffer_needs;
pub mod chunk_scan;
pub mod product_plan;

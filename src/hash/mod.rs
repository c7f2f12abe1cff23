pub mod grace_hash_join_plan;
pub mod hash_join_plan;
pub mod hash_join_scan;
pub mod partition;

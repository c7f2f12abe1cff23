pub mod buffer_list;
pub mod transaction;

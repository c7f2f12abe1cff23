pub mod layout;
pub mod record_page;
pub mod rid;
pub mod schema;
pub mod table_scan;

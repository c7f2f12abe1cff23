#[allow(clippy::module_inception)]
pub mod buffer;
pub mod buffer_manager;

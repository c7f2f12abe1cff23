use std::mem::size_of;

pub mod buffer;
pub mod config;
pub mod error;
pub mod file;
pub mod hash;
pub mod index;
pub mod macros;
pub mod materialize;
pub mod metadata;
pub mod multibuffer;
pub mod opt;
pub mod plan;
pub mod query;
pub mod record;
pub mod server;
pub mod tx;

const I32_SIZE: usize = size_of::<i32>();

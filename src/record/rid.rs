use std::fmt::Display;

/// RID identifies a record by its block number and slot within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RID {
    pub block_num: i32,
    pub slot: i32,
}

impl RID {
    pub fn new(block_num: i32, slot: i32) -> Self {
        Self { block_num, slot }
    }
}

impl Display for RID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[block {}, slot {}]", self.block_num, self.slot)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub filename: String,
    pub num: i32,
}

impl BlockId {
    pub fn new(filename: impl Into<String>, num: i32) -> BlockId {
        BlockId {
            filename: filename.into(),
            num,
        }
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[file {}, block {}]", self.filename, self.num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn should_can_new_blockid() {
        let block_id = BlockId::new("file1", 1);
        assert_eq!(block_id.to_string(), "[file file1, block 1]");
    }

    #[test]
    fn should_can_compare_blockid() {
        let block_id1 = BlockId::new("file1", 1);
        let block_id2 = BlockId::new("file1".to_string(), 1);
        assert_eq!(block_id1, block_id2);
        assert_ne!(block_id1, BlockId::new("file1", 2));

        let set: HashSet<_> = [block_id1, block_id2].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}

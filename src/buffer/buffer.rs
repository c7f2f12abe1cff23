use crate::{
    file::{block::BlockId, file_manager::FileManager, page::Page},
    unlock,
};
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

/// Buffer is one frame of the buffer pool: a page plus the block it holds.
pub struct Buffer {
    file_manager: Arc<Mutex<FileManager>>,
    contents: Page,         // buffer contents
    block: Option<BlockId>, // block to which this buffer is assigned
    pins: i32,              // number of times this buffer has been pinned
    txnum: i32,             // modifying transaction, -1 when clean
}

impl Buffer {
    pub fn new(file_manager: Arc<Mutex<FileManager>>) -> Self {
        let contents = Page::new(unlock!(file_manager).block_size);
        Self {
            file_manager,
            contents,
            block: None,
            pins: 0,
            txnum: -1,
        }
    }

    pub fn contents(&self) -> &Page {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Page {
        &mut self.contents
    }

    pub fn block(&self) -> Option<&BlockId> {
        self.block.as_ref()
    }

    pub fn set_modified(&mut self, txnum: i32) {
        self.txnum = txnum;
    }

    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    pub fn modifying_tx(&self) -> i32 {
        self.txnum
    }

    pub fn assign_to_block(&mut self, block: &BlockId) -> Result<()> {
        self.flush()?;
        unlock!(self.file_manager).read(block, &mut self.contents)?;
        self.block = Some(block.clone());
        self.pins = 0;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.txnum >= 0 {
            let block = self
                .block
                .as_ref()
                .ok_or_else(|| anyhow!("modified buffer has no block"))?;
            unlock!(self.file_manager).write(block, &self.contents)?;
            self.txnum = -1;
        }
        Ok(())
    }

    pub fn pin(&mut self) {
        self.pins += 1;
    }

    pub fn unpin(&mut self) {
        self.pins -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_can_new_buffer() {
        let tempdir = tempfile::tempdir().unwrap();
        let file_manager = Arc::new(Mutex::new(FileManager::new(tempdir.path(), 32).unwrap()));
        let buffer = Buffer::new(file_manager);
        assert_eq!(buffer.contents().contents().len(), 32);
        assert_eq!(buffer.block(), None);
        assert!(!buffer.is_pinned());
    }

    #[test]
    fn should_can_assign_to_block() {
        let tempdir = tempfile::tempdir().unwrap();
        let file_manager = Arc::new(Mutex::new(FileManager::new(tempdir.path(), 32).unwrap()));
        let mut buffer = Buffer::new(file_manager.clone());
        let block = BlockId::new("test", 0);
        buffer.assign_to_block(&block).unwrap();

        buffer.contents_mut().set_string(0, "hello").unwrap();
        buffer.set_modified(0);
        buffer.flush().unwrap();
        assert_eq!(buffer.modifying_tx(), -1);

        let mut new_buffer = Buffer::new(file_manager);
        new_buffer.assign_to_block(&block).unwrap();
        assert_eq!(new_buffer.contents().get_string(0).unwrap(), "hello");
    }
}

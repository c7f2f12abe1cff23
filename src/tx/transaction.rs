use super::buffer_list::BufferList;
use crate::{
    buffer::buffer_manager::BufferManager,
    file::{block::BlockId, file_manager::FileManager},
    unlock,
};
use anyhow::{anyhow, Result};
use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc, Mutex,
};
use tracing::{debug, info};

static NEXT_TX_NUM: AtomicI32 = AtomicI32::new(1);

/// Transaction is the storage handle every scan reads and writes through.
/// It pins blocks on behalf of its scans and reports how many buffers an
/// operator may claim. There is no logging or locking: a query runs alone.
pub struct Transaction {
    buffer_manager: Arc<Mutex<BufferManager>>,
    file_manager: Arc<Mutex<FileManager>>,
    tx_num: i32,
    buffer_list: BufferList,
    buffer_budget: Option<usize>,
}

impl Transaction {
    pub fn new(
        file_manager: Arc<Mutex<FileManager>>,
        buffer_manager: Arc<Mutex<BufferManager>>,
    ) -> Self {
        let tx_num = NEXT_TX_NUM.fetch_add(1, Ordering::SeqCst);
        debug!(tx_num, "new transaction");
        let buffer_list = BufferList::new(buffer_manager.clone());
        Self {
            buffer_manager,
            file_manager,
            tx_num,
            buffer_list,
            buffer_budget: None,
        }
    }

    pub fn tx_num(&self) -> i32 {
        self.tx_num
    }

    /// commit flushes the pages this transaction modified and releases its pins
    pub fn commit(&mut self) -> Result<()> {
        unlock!(self.buffer_manager).flush_all(self.tx_num)?;
        self.buffer_list.unpin_all();
        info!(tx_num = self.tx_num, "transaction committed");
        Ok(())
    }

    pub fn pin(&mut self, block: &BlockId) -> Result<()> {
        self.buffer_list.pin(block)
    }

    pub fn unpin(&mut self, block: &BlockId) {
        self.buffer_list.unpin(block)
    }

    pub fn get_int(&self, block: &BlockId, offset: i32) -> Result<i32> {
        let buffer = self
            .buffer_list
            .get_buffer(block)
            .ok_or_else(|| anyhow!("block {} is not pinned", block))?;
        let value = unlock!(buffer).contents().get_int(offset as usize)?;
        Ok(value)
    }

    pub fn get_string(&self, block: &BlockId, offset: i32) -> Result<String> {
        let buffer = self
            .buffer_list
            .get_buffer(block)
            .ok_or_else(|| anyhow!("block {} is not pinned", block))?;
        let value = unlock!(buffer).contents().get_string(offset as usize)?;
        Ok(value)
    }

    pub fn set_int(&mut self, block: &BlockId, offset: i32, value: i32) -> Result<()> {
        let buffer = self
            .buffer_list
            .get_buffer(block)
            .ok_or_else(|| anyhow!("block {} is not pinned", block))?;
        let mut buffer = unlock!(buffer);
        buffer.contents_mut().set_int(offset as usize, value)?;
        buffer.set_modified(self.tx_num);
        Ok(())
    }

    pub fn set_string(&mut self, block: &BlockId, offset: i32, value: &str) -> Result<()> {
        let buffer = self
            .buffer_list
            .get_buffer(block)
            .ok_or_else(|| anyhow!("block {} is not pinned", block))?;
        let mut buffer = unlock!(buffer);
        buffer.contents_mut().set_string(offset as usize, value)?;
        buffer.set_modified(self.tx_num);
        Ok(())
    }

    /// size returns the number of blocks in the file
    pub fn size(&self, filename: &str) -> Result<i32> {
        unlock!(self.file_manager).block_count(filename)
    }

    /// append adds a new block to the end of the file and returns its id
    pub fn append(&mut self, filename: &str) -> Result<BlockId> {
        unlock!(self.file_manager).append_block(filename)
    }

    pub fn block_size(&self) -> i32 {
        unlock!(self.file_manager).block_size
    }

    /// available_buffers is the number of frames an operator may still pin.
    /// A budget set with `set_buffer_budget` caps the pool's own count.
    pub fn available_buffers(&self) -> usize {
        let available = unlock!(self.buffer_manager).available();
        match self.buffer_budget {
            Some(budget) => available.min(budget),
            None => available,
        }
    }

    pub fn set_buffer_budget(&mut self, budget: Option<usize>) {
        self.buffer_budget = budget;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_transaction(dir: &std::path::Path, num_buffers: usize) -> Transaction {
        let file_manager = Arc::new(Mutex::new(FileManager::new(dir, 64).unwrap()));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(
            file_manager.clone(),
            num_buffers,
        )));
        Transaction::new(file_manager, buffer_manager)
    }

    #[test]
    fn should_cap_available_buffers_with_budget() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut tx = new_transaction(tempdir.path(), 8);
        assert_eq!(tx.available_buffers(), 8);
        tx.set_buffer_budget(Some(3));
        assert_eq!(tx.available_buffers(), 3);
        tx.set_buffer_budget(Some(20));
        assert_eq!(tx.available_buffers(), 8);
    }

    #[test]
    fn should_not_read_unpinned_block() {
        let tempdir = tempfile::tempdir().unwrap();
        let tx = new_transaction(tempdir.path(), 2);
        assert!(tx.get_int(&BlockId::new("test", 0), 0).is_err());
    }

    #[test]
    fn should_release_pins_on_commit() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut tx = new_transaction(tempdir.path(), 2);
        let block = tx.append("test").unwrap();
        tx.pin(&block).unwrap();
        tx.pin(&block).unwrap();
        assert_eq!(tx.available_buffers(), 1);
        tx.set_int(&block, 0, 9).unwrap();
        tx.commit().unwrap();
        assert_eq!(tx.available_buffers(), 2);
    }
}

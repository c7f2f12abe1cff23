use super::buffer::Buffer;
use crate::{
    file::{block::BlockId, file_manager::FileManager},
    unlock,
};
use anyhow::{bail, Result};
use std::sync::{Arc, Mutex};

/// BufferManager owns the fixed pool of page frames.
/// Execution is single threaded, so a pin that finds every frame in use
/// fails immediately instead of waiting for another client to unpin.
pub struct BufferManager {
    buffer_pool: Vec<Arc<Mutex<Buffer>>>,
    num_available: usize,
}

impl BufferManager {
    pub fn new(file_manager: Arc<Mutex<FileManager>>, num_buffers: usize) -> Self {
        let buffer_pool = (0..num_buffers)
            .map(|_| Arc::new(Mutex::new(Buffer::new(file_manager.clone()))))
            .collect();

        Self {
            buffer_pool,
            num_available: num_buffers,
        }
    }

    /// available returns the number of unpinned frames
    pub fn available(&self) -> usize {
        self.num_available
    }

    pub fn flush_all(&mut self, txnum: i32) -> Result<()> {
        for buffer in &self.buffer_pool {
            let mut buffer = unlock!(buffer);
            if buffer.modifying_tx() == txnum {
                buffer.flush()?;
            }
        }
        Ok(())
    }

    pub fn unpin(&mut self, buffer: &Arc<Mutex<Buffer>>) {
        let mut buffer = unlock!(buffer);
        buffer.unpin();
        if !buffer.is_pinned() {
            self.num_available += 1;
        }
    }

    pub fn pin(&mut self, block: &BlockId) -> Result<Arc<Mutex<Buffer>>> {
        let buffer = match self.find_existing_buffer(block) {
            Some(buffer) => buffer,
            None => {
                let Some(buffer) = self.choose_unpinned_buffer() else {
                    bail!("buffer pool is full while pinning {}", block);
                };
                unlock!(buffer).assign_to_block(block)?;
                buffer
            }
        };

        let mut frame = unlock!(buffer);
        if !frame.is_pinned() {
            self.num_available -= 1;
        }
        frame.pin();
        drop(frame);

        Ok(buffer)
    }

    fn find_existing_buffer(&self, block: &BlockId) -> Option<Arc<Mutex<Buffer>>> {
        self.buffer_pool
            .iter()
            .find(|buffer| unlock!(buffer).block() == Some(block))
            .cloned()
    }

    fn choose_unpinned_buffer(&self) -> Option<Arc<Mutex<Buffer>>> {
        self.buffer_pool
            .iter()
            .find(|buffer| !unlock!(buffer).is_pinned())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_buffer_manager(num_buffers: usize) -> (tempfile::TempDir, BufferManager) {
        let tempdir = tempfile::tempdir().unwrap();
        let file_manager = Arc::new(Mutex::new(FileManager::new(tempdir.path(), 32).unwrap()));
        (tempdir, BufferManager::new(file_manager, num_buffers))
    }

    #[test]
    fn should_can_pin() {
        let (_dir, mut buffer_manager) = new_buffer_manager(3);
        assert_eq!(buffer_manager.available(), 3);
        let block = BlockId::new("test", 0);
        let buf = buffer_manager.pin(&block).unwrap();
        assert_eq!(unlock!(buf).block(), Some(&block));
        assert_eq!(buffer_manager.available(), 2);
    }

    #[test]
    fn should_cannot_pin_when_buffer_pool_is_full() {
        let (_dir, mut buffer_manager) = new_buffer_manager(1);
        buffer_manager.pin(&BlockId::new("test", 0)).unwrap();
        assert!(buffer_manager.pin(&BlockId::new("test", 1)).is_err());
    }

    #[test]
    fn should_can_pin_same_buffer_multiple_times() {
        let (_dir, mut buffer_manager) = new_buffer_manager(3);
        let block = BlockId::new("test", 0);
        let first = buffer_manager.pin(&block).unwrap();
        let second = buffer_manager.pin(&block).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(buffer_manager.available(), 2);
    }

    #[test]
    fn should_can_unpin() {
        let (_dir, mut buffer_manager) = new_buffer_manager(3);
        let block = BlockId::new("test", 0);
        let buf = buffer_manager.pin(&block).unwrap();
        assert_eq!(buffer_manager.available(), 2);
        buffer_manager.unpin(&buf);
        assert_eq!(buffer_manager.available(), 3);
    }

    #[test]
    fn should_reuse_unpinned_frame() {
        let (_dir, mut buffer_manager) = new_buffer_manager(1);
        let buf = buffer_manager.pin(&BlockId::new("test", 0)).unwrap();
        buffer_manager.unpin(&buf);
        let buf = buffer_manager.pin(&BlockId::new("test", 1)).unwrap();
        assert_eq!(unlock!(buf).block(), Some(&BlockId::new("test", 1)));
    }
}

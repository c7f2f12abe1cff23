use crate::{
    buffer::{buffer::Buffer, buffer_manager::BufferManager},
    file::block::BlockId,
    unlock,
};
use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// BufferList tracks the frames a transaction has pinned.
/// A block pinned twice appears twice in `pins` and needs two unpins.
pub struct BufferList {
    buffers: HashMap<BlockId, Arc<Mutex<Buffer>>>,
    pins: Vec<BlockId>,
    buffer_manager: Arc<Mutex<BufferManager>>,
}

impl BufferList {
    pub fn new(buffer_manager: Arc<Mutex<BufferManager>>) -> Self {
        Self {
            buffers: HashMap::new(),
            pins: Vec::new(),
            buffer_manager,
        }
    }

    pub fn get_buffer(&self, block: &BlockId) -> Option<&Arc<Mutex<Buffer>>> {
        self.buffers.get(block)
    }

    pub fn pin(&mut self, block: &BlockId) -> Result<()> {
        let buffer = unlock!(self.buffer_manager).pin(block)?;
        self.buffers.insert(block.clone(), buffer);
        self.pins.push(block.clone());
        Ok(())
    }

    pub fn unpin(&mut self, block: &BlockId) {
        let Some(buffer) = self.buffers.get(block) else {
            return;
        };
        unlock!(self.buffer_manager).unpin(buffer);
        if let Some(pos) = self.pins.iter().position(|b| b == block) {
            self.pins.remove(pos);
        }
        if !self.pins.contains(block) {
            self.buffers.remove(block);
        }
    }

    pub fn unpin_all(&mut self) {
        let mut buffer_manager = unlock!(self.buffer_manager);
        for block in &self.pins {
            if let Some(buffer) = self.buffers.get(block) {
                buffer_manager.unpin(buffer);
            }
        }
        self.buffers.clear();
        self.pins.clear();
    }

    pub fn pinned(&self) -> usize {
        self.pins.len()
    }
}

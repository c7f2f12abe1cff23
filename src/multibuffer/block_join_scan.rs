use super::{buffer_needs::best_factor, chunk_scan::ChunkScan};
use crate::{
    materialize::temp_table::TempTable,
    query::{cond_op::CondOp, constant::Constant, scan::Scan},
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// JoinCondition compares a field of one input with a field of the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub lhs: String,
    pub op: CondOp,
    pub rhs: String,
}

/// BlockJoinScan reads a temp table in chunks that fill the available
/// buffers and rescans the other input once per chunk.
/// Without a condition it produces the product of both inputs.
///
/// Each chunk is sized when it is loaded, after the rescanned input has
/// been repositioned, so the pins that input holds are already accounted
/// for.
pub struct BlockJoinScan {
    tx: Arc<Mutex<Transaction>>,
    chunked: TempTable,
    rescanned: Box<dyn Scan>,
    condition: Option<JoinCondition>,
    chunk: Option<ChunkScan>,
    file_size: u64,
    next_block: u64,
    rescanned_valid: bool,
}

impl BlockJoinScan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        chunked: TempTable,
        mut rescanned: Box<dyn Scan>,
        condition: Option<JoinCondition>,
    ) -> Result<Self> {
        let file_size = chunked.blocks().inspect_err(|_| rescanned.close())?;
        let mut scan = Self {
            tx,
            chunked,
            rescanned,
            condition,
            chunk: None,
            file_size,
            next_block: 0,
            rescanned_valid: false,
        };
        scan.before_first().inspect_err(|_| scan.close())?;
        Ok(scan)
    }

    fn close_chunk(&mut self) {
        if let Some(mut chunk) = self.chunk.take() {
            chunk.close();
        }
    }

    /// use_next_chunk pins the next chunk with the buffers still free.
    /// The current chunk must already be closed.
    fn use_next_chunk(&mut self) -> Result<()> {
        let remaining = self.file_size - self.next_block;
        let available = unlock!(self.tx).available_buffers();
        let chunk_size = best_factor(available, remaining);
        trace!(remaining, available, chunk_size, "block join chunk");
        let end = self.next_block + chunk_size - 1;
        self.chunk = Some(ChunkScan::new(
            self.tx.clone(),
            &self.chunked.file_name(),
            self.chunked.layout(),
            self.next_block as i32,
            end as i32,
        )?);
        self.next_block = end + 1;
        Ok(())
    }

    fn is_satisfied(&mut self) -> Result<bool> {
        let Some(condition) = self.condition.clone() else {
            return Ok(true);
        };
        let lhs = self.get_value(&condition.lhs)?;
        let rhs = self.get_value(&condition.rhs)?;
        Ok(condition.op.evaluate(&lhs, &rhs))
    }
}

impl Scan for BlockJoinScan {
    fn before_first(&mut self) -> Result<()> {
        self.close_chunk();
        self.next_block = 0;
        self.rescanned_valid = false;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        loop {
            if self.rescanned_valid {
                if let Some(chunk) = self.chunk.as_mut() {
                    if chunk.next()? {
                        if self.is_satisfied()? {
                            return Ok(true);
                        }
                        continue;
                    }
                    chunk.before_first()?;
                }
                self.rescanned_valid = self.rescanned.next()?;
                continue;
            }
            self.close_chunk();
            if self.next_block >= self.file_size {
                return Ok(false);
            }
            self.rescanned.before_first()?;
            self.rescanned_valid = self.rescanned.next()?;
            if !self.rescanned_valid {
                return Ok(false);
            }
            self.use_next_chunk()?;
        }
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        match self.chunk.as_mut() {
            Some(chunk) if chunk.has_field(field_name) => chunk.get_int(field_name),
            _ => self.rescanned.get_int(field_name),
        }
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        match self.chunk.as_mut() {
            Some(chunk) if chunk.has_field(field_name) => chunk.get_string(field_name),
            _ => self.rescanned.get_string(field_name),
        }
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        match self.chunk.as_mut() {
            Some(chunk) if chunk.has_field(field_name) => chunk.get_value(field_name),
            _ => self.rescanned.get_value(field_name),
        }
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.chunked.layout().schema().has_field(field_name) || self.rescanned.has_field(field_name)
    }

    fn close(&mut self) {
        self.close_chunk();
        self.rescanned.close();
    }
}

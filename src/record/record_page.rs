use super::layout::Layout;
use crate::{
    error::PlanError, file::block::BlockId, record::schema::FieldType, tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecordType {
    Empty,
    Used,
}

impl From<RecordType> for i32 {
    fn from(val: RecordType) -> Self {
        match val {
            RecordType::Empty => 0,
            RecordType::Used => 1,
        }
    }
}

/// RecordPage manages the slots of one pinned block.
/// Every slot holds one record: a used/empty flag followed by the fields
/// at the offsets given by the layout.
///
/// ```text
///                                  block
/// ┏━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
///                       slot 0                               slot 1 ...
/// ┏━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━┓┏━━━━━━┻━━━━━━━━━┓
/// ┌───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┐
/// │ 0 │ 0 │ 0 │ 1 │ 0 │ 0 │ 0 │ 5 │ h │ e │ l │ l │ o │...│...│...│...│
/// └───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┘
/// ┗━━━━━━━┳━━━━━━━┻━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━┛
///      used flag               varchar(5)
/// ```
pub struct RecordPage {
    tx: Arc<Mutex<Transaction>>,
    block: BlockId,
    layout: Arc<Layout>,
}

impl RecordPage {
    /// new pins the block for as long as the page is in use
    pub fn new(tx: Arc<Mutex<Transaction>>, block: BlockId, layout: Arc<Layout>) -> Result<Self> {
        unlock!(tx).pin(&block)?;
        Ok(Self { tx, block, layout })
    }

    pub fn block(&self) -> &BlockId {
        &self.block
    }

    pub fn get_int(&self, slot: i32, field_name: &str) -> Result<i32> {
        let field_pos = self.field_pos(slot, field_name)?;
        unlock!(self.tx).get_int(&self.block, field_pos)
    }

    pub fn get_string(&self, slot: i32, field_name: &str) -> Result<String> {
        let field_pos = self.field_pos(slot, field_name)?;
        unlock!(self.tx).get_string(&self.block, field_pos)
    }

    pub fn set_int(&mut self, slot: i32, field_name: &str, value: i32) -> Result<()> {
        let field_pos = self.field_pos(slot, field_name)?;
        unlock!(self.tx).set_int(&self.block, field_pos, value)
    }

    pub fn set_string(&mut self, slot: i32, field_name: &str, value: &str) -> Result<()> {
        let field_pos = self.field_pos(slot, field_name)?;
        unlock!(self.tx).set_string(&self.block, field_pos, value)
    }

    pub fn delete(&mut self, slot: i32) -> Result<()> {
        self.set_record_type(slot, RecordType::Empty)
    }

    /// format marks every slot of a fresh block empty and zeroes its fields
    pub fn format(&mut self) -> Result<()> {
        let schema = self.layout.schema();
        let mut tx = unlock!(self.tx);
        let block_size = tx.block_size();
        let mut slot = 0;
        while self.offset(slot + 1) <= block_size {
            tx.set_int(&self.block, self.offset(slot), RecordType::Empty.into())?;
            for field_name in &schema.fields {
                let field_pos = self.field_pos(slot, field_name)?;
                match schema.field_type(field_name) {
                    Some(FieldType::Integer) => tx.set_int(&self.block, field_pos, 0)?,
                    Some(FieldType::Varchar) => tx.set_string(&self.block, field_pos, "")?,
                    None => {}
                }
            }
            slot += 1;
        }
        Ok(())
    }

    /// next_after returns the first used slot after `slot`
    pub fn next_after(&self, slot: i32) -> Result<Option<i32>> {
        self.search_after(slot, RecordType::Used)
    }

    /// insert_after claims the first empty slot after `slot`
    pub fn insert_after(&mut self, slot: i32) -> Result<Option<i32>> {
        let new_slot = self.search_after(slot, RecordType::Empty)?;
        if let Some(new_slot) = new_slot {
            self.set_record_type(new_slot, RecordType::Used)?;
        }
        Ok(new_slot)
    }

    pub fn close(&mut self) {
        unlock!(self.tx).unpin(&self.block);
    }

    fn set_record_type(&self, slot: i32, record_type: RecordType) -> Result<()> {
        unlock!(self.tx).set_int(&self.block, self.offset(slot), record_type.into())
    }

    fn search_after(&self, slot: i32, record_type: RecordType) -> Result<Option<i32>> {
        let tx = unlock!(self.tx);
        let block_size = tx.block_size();
        let mut slot = slot + 1;
        while self.offset(slot + 1) <= block_size {
            let flag = tx.get_int(&self.block, self.offset(slot))?;
            let found = if flag == 0 {
                RecordType::Empty
            } else {
                RecordType::Used
            };
            if found == record_type {
                return Ok(Some(slot));
            }
            slot += 1;
        }
        Ok(None)
    }

    fn field_pos(&self, slot: i32, field_name: &str) -> Result<i32> {
        let offset = self
            .layout
            .offset(field_name)
            .ok_or_else(|| PlanError::UnknownField {
                field: field_name.to_string(),
            })?;
        Ok(self.offset(slot) + offset)
    }

    fn offset(&self, slot: i32) -> i32 {
        self.layout.slot_size() * slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::schema::Schema, server::db::TinyExec};
    use tempfile::tempdir;

    fn new_layout() -> Arc<Layout> {
        let mut schema = Schema::default();
        schema.add_int_field("id");
        schema.add_string_field("name", 8);
        Arc::new(Layout::new(Arc::new(schema)).unwrap())
    }

    #[test]
    fn should_can_format() {
        let layout = new_layout();
        // 4 bytes flag, 4 bytes id, 4 + 8 bytes name
        assert_eq!(layout.slot_size(), 20);

        let db_dir = tempdir().unwrap();
        let db = TinyExec::new(db_dir.path().join("db"), 128, 8).unwrap();
        let tx = db.new_tx();
        let block = unlock!(tx).append("testfile").unwrap();
        let mut rp = RecordPage::new(tx.clone(), block, layout).unwrap();
        rp.format().unwrap();

        assert_eq!(rp.get_int(0, "id").unwrap(), 0);
        assert_eq!(rp.get_string(0, "name").unwrap(), "");
        assert_eq!(rp.next_after(-1).unwrap(), None);
    }

    #[test]
    fn should_can_insert_and_delete() {
        let db_dir = tempdir().unwrap();
        let db = TinyExec::new(db_dir.path().join("db"), 128, 8).unwrap();
        let tx = db.new_tx();
        let block = unlock!(tx).append("testfile").unwrap();
        let mut rp = RecordPage::new(tx.clone(), block, new_layout()).unwrap();
        rp.format().unwrap();

        let slot = rp.insert_after(-1).unwrap().unwrap();
        rp.set_int(slot, "id", 1).unwrap();
        rp.set_string(slot, "name", "hello").unwrap();
        assert_eq!(rp.get_int(slot, "id").unwrap(), 1);
        assert_eq!(rp.get_string(slot, "name").unwrap(), "hello");
        assert_eq!(rp.next_after(-1).unwrap(), Some(slot));

        rp.delete(slot).unwrap();
        assert_eq!(rp.next_after(-1).unwrap(), None);
    }

    #[test]
    fn should_fill_block_and_stop() {
        let db_dir = tempdir().unwrap();
        let db = TinyExec::new(db_dir.path().join("db"), 128, 8).unwrap();
        let tx = db.new_tx();
        let block = unlock!(tx).append("testfile").unwrap();
        let mut rp = RecordPage::new(tx.clone(), block, new_layout()).unwrap();
        rp.format().unwrap();

        // 128 / 20 slots fit in one block
        let mut slot = -1;
        for _ in 0..6 {
            slot = rp.insert_after(slot).unwrap().unwrap();
        }
        assert_eq!(rp.insert_after(slot).unwrap(), None);
    }
}

use super::{layout::Layout, record_page::RecordPage, rid::RID, schema::FieldType};
use crate::{
    error::PlanError,
    file::block::BlockId,
    query::{
        constant::Constant,
        scan::{Scan, UpdateScan},
    },
    tx::transaction::Transaction,
    unlock,
};
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

/// TableScan walks the slots of a table file block by block.
/// It keeps at most one block pinned.
pub struct TableScan {
    tx: Arc<Mutex<Transaction>>,
    layout: Arc<Layout>,
    rp: Option<RecordPage>,
    file_name: String,
    current_slot: i32,
}

impl TableScan {
    pub fn new(tx: Arc<Mutex<Transaction>>, table_name: &str, layout: Arc<Layout>) -> Result<Self> {
        let file_name = format!("{}.tbl", table_name);
        let mut scan = Self {
            tx: tx.clone(),
            layout,
            rp: None,
            file_name,
            current_slot: -1,
        };

        let size = unlock!(tx).size(&scan.file_name)?;
        if size == 0 {
            scan.move_to_new_block()?;
        } else {
            scan.move_to_block(0)?;
        }
        Ok(scan)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn record_page(&self) -> Result<&RecordPage> {
        self.rp
            .as_ref()
            .ok_or_else(|| anyhow!("scan on {} is closed", self.file_name))
    }

    fn record_page_mut(&mut self) -> Result<&mut RecordPage> {
        let file_name = &self.file_name;
        self.rp
            .as_mut()
            .ok_or_else(|| anyhow!("scan on {} is closed", file_name))
    }

    fn move_to_new_block(&mut self) -> Result<()> {
        self.close();
        let block = unlock!(self.tx).append(&self.file_name)?;
        let mut rp = RecordPage::new(self.tx.clone(), block, self.layout.clone())?;
        rp.format()?;
        self.rp = Some(rp);
        self.current_slot = -1;
        Ok(())
    }

    fn move_to_block(&mut self, block_num: i32) -> Result<()> {
        self.close();
        let block = BlockId::new(self.file_name.as_str(), block_num);
        self.rp = Some(RecordPage::new(self.tx.clone(), block, self.layout.clone())?);
        self.current_slot = -1;
        Ok(())
    }

    fn at_last_block(&self) -> Result<bool> {
        let block_num = self.record_page()?.block().num;
        let size = unlock!(self.tx).size(&self.file_name)?;
        Ok(block_num == size - 1)
    }
}

impl Scan for TableScan {
    fn before_first(&mut self) -> Result<()> {
        self.move_to_block(0)
    }

    fn next(&mut self) -> Result<bool> {
        loop {
            if let Some(slot) = self.record_page()?.next_after(self.current_slot)? {
                self.current_slot = slot;
                return Ok(true);
            }
            if self.at_last_block()? {
                return Ok(false);
            }
            let next_block = self.record_page()?.block().num + 1;
            self.move_to_block(next_block)?;
        }
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        self.record_page()?.get_int(self.current_slot, field_name)
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        self.record_page()?.get_string(self.current_slot, field_name)
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        let field_type = self.layout.schema().field_type(field_name);
        match field_type {
            Some(FieldType::Integer) => Ok(Constant::Int(self.get_int(field_name)?)),
            Some(FieldType::Varchar) => Ok(Constant::String(self.get_string(field_name)?)),
            None => Err(PlanError::UnknownField {
                field: field_name.to_string(),
            }
            .into()),
        }
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.layout.schema().has_field(field_name)
    }

    fn close(&mut self) {
        if let Some(mut rp) = self.rp.take() {
            rp.close();
        }
    }
}

impl UpdateScan for TableScan {
    fn set_value(&mut self, field_name: &str, val: Constant) -> Result<()> {
        match val {
            Constant::Int(i) => self.set_int(field_name, i),
            Constant::String(s) => self.set_string(field_name, &s),
        }
    }

    fn set_int(&mut self, field_name: &str, val: i32) -> Result<()> {
        let slot = self.current_slot;
        self.record_page_mut()?.set_int(slot, field_name, val)
    }

    fn set_string(&mut self, field_name: &str, val: &str) -> Result<()> {
        let slot = self.current_slot;
        self.record_page_mut()?.set_string(slot, field_name, val)
    }

    fn delete(&mut self) -> Result<()> {
        let slot = self.current_slot;
        self.record_page_mut()?.delete(slot)
    }

    /// insert moves to a newly claimed slot, appending a block when the
    /// table is full
    fn insert(&mut self) -> Result<()> {
        loop {
            let slot = self.current_slot;
            if let Some(slot) = self.record_page_mut()?.insert_after(slot)? {
                self.current_slot = slot;
                return Ok(());
            }
            if self.at_last_block()? {
                self.move_to_new_block()?;
            } else {
                let next_block = self.record_page()?.block().num + 1;
                self.move_to_block(next_block)?;
            }
        }
    }

    fn get_rid(&self) -> Result<RID> {
        Ok(RID::new(self.record_page()?.block().num, self.current_slot))
    }

    fn move_to_rid(&mut self, rid: RID) -> Result<()> {
        self.close();
        let block = BlockId::new(self.file_name.as_str(), rid.block_num);
        self.rp = Some(RecordPage::new(self.tx.clone(), block, self.layout.clone())?);
        self.current_slot = rid.slot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::schema::Schema, server::db::TinyExec};
    use tempfile::tempdir;

    #[test]
    fn should_insert_scan_and_delete() {
        let db_dir = tempdir().unwrap();
        let db = TinyExec::new(db_dir.path().join("db"), 128, 8).unwrap();
        let tx = db.new_tx();

        let mut schema = Schema::default();
        schema.add_int_field("a");
        schema.add_string_field("b", 9);
        let layout = Arc::new(Layout::new(Arc::new(schema)).unwrap());

        let mut scan = TableScan::new(tx.clone(), "t", layout.clone()).unwrap();
        for i in 0..50 {
            scan.insert().unwrap();
            scan.set_int("a", i).unwrap();
            scan.set_string("b", &format!("rec{}", i)).unwrap();
        }

        scan.before_first().unwrap();
        let mut count = 0;
        while scan.next().unwrap() {
            let a = scan.get_int("a").unwrap();
            assert_eq!(scan.get_string("b").unwrap(), format!("rec{}", a));
            if a % 2 == 0 {
                scan.delete().unwrap();
            }
            count += 1;
        }
        assert_eq!(count, 50);

        scan.before_first().unwrap();
        let mut remaining = vec![];
        while scan.next().unwrap() {
            remaining.push(scan.get_int("a").unwrap());
        }
        assert_eq!(remaining, (0..50).filter(|i| i % 2 == 1).collect::<Vec<_>>());
        scan.close();
        assert_eq!(unlock!(tx).available_buffers(), 8);
    }

    #[test]
    fn should_move_to_rid() {
        let db_dir = tempdir().unwrap();
        let db = TinyExec::new(db_dir.path().join("db"), 128, 8).unwrap();
        let tx = db.new_tx();

        let mut schema = Schema::default();
        schema.add_int_field("a");
        let layout = Arc::new(Layout::new(Arc::new(schema)).unwrap());

        let mut scan = TableScan::new(tx, "t", layout).unwrap();
        let mut rids = vec![];
        for i in 0..40 {
            scan.insert().unwrap();
            scan.set_int("a", i * 10).unwrap();
            rids.push(scan.get_rid().unwrap());
        }
        assert!(rids.last().unwrap().block_num > 0);

        scan.move_to_rid(rids[25]).unwrap();
        assert_eq!(scan.get_int("a").unwrap(), 250);
        assert_eq!(scan.get_value("a").unwrap(), Constant::Int(250));
        scan.close();
    }
}

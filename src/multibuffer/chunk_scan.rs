use crate::{
    error::PlanError,
    file::block::BlockId,
    query::{constant::Constant, scan::Scan},
    record::{layout::Layout, record_page::RecordPage, schema::FieldType},
    tx::transaction::Transaction,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// ChunkScan keeps a contiguous run of blocks of a table pinned and reads
/// their records in order.
pub struct ChunkScan {
    pages: Vec<RecordPage>,
    layout: Arc<Layout>,
    current: usize,
    current_slot: i32,
}

impl ChunkScan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        file_name: &str,
        layout: Arc<Layout>,
        start_block: i32,
        end_block: i32,
    ) -> Result<Self> {
        let mut pages = Vec::with_capacity((end_block - start_block + 1).max(0) as usize);
        for block_num in start_block..=end_block {
            let block = BlockId::new(file_name, block_num);
            match RecordPage::new(tx.clone(), block, layout.clone()) {
                Ok(page) => pages.push(page),
                Err(e) => {
                    for page in pages.iter_mut() {
                        page.close();
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self {
            pages,
            layout,
            current: 0,
            current_slot: -1,
        })
    }

    fn page(&self) -> Result<&RecordPage> {
        self.pages
            .get(self.current)
            .ok_or_else(|| anyhow::anyhow!("chunk scan is past its last block"))
    }
}

impl Scan for ChunkScan {
    fn before_first(&mut self) -> Result<()> {
        self.current = 0;
        self.current_slot = -1;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        while let Some(page) = self.pages.get(self.current) {
            if let Some(slot) = page.next_after(self.current_slot)? {
                self.current_slot = slot;
                return Ok(true);
            }
            self.current += 1;
            self.current_slot = -1;
        }
        Ok(false)
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        self.page()?.get_int(self.current_slot, field_name)
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        self.page()?.get_string(self.current_slot, field_name)
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        match self.layout.schema().field_type(field_name) {
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
        for page in self.pages.iter_mut() {
            page.close();
        }
        self.pages.clear();
    }
}

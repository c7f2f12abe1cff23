use super::Index;
use crate::{
    query::{
        constant::Constant,
        scan::{Scan as _, UpdateScan as _},
    },
    record::{layout::Layout, rid::RID, table_scan::TableScan},
    tx::transaction::Transaction,
};
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

const NUM_BUCKETS: u64 = 100;

/// HashIndex is a static hash index: every bucket is a table of
/// `(block, id, dataval)` records named after the index and the bucket.
pub struct HashIndex {
    tx: Arc<Mutex<Transaction>>,
    index_name: String,
    layout: Arc<Layout>,
    search_key: Option<Constant>,
    table_scan: Option<TableScan>,
}

impl HashIndex {
    pub fn new(tx: Arc<Mutex<Transaction>>, index_name: &str, layout: Arc<Layout>) -> Self {
        Self {
            tx,
            index_name: index_name.to_string(),
            layout,
            search_key: None,
            table_scan: None,
        }
    }

    /// search_cost is the number of blocks of a single bucket
    pub fn search_cost(num_blocks: u64, _rpb: u64) -> u64 {
        num_blocks / NUM_BUCKETS
    }

    /// bucket_table names the table holding every entry whose key hashes
    /// to the same bucket as `key`
    fn bucket_table(&self, key: &Constant) -> String {
        format!("{}{}", self.index_name, key.hash_code() % NUM_BUCKETS)
    }

    fn table_scan(&mut self) -> Result<&mut TableScan> {
        self.table_scan
            .as_mut()
            .ok_or_else(|| anyhow!("index {} is not positioned", self.index_name))
    }
}

impl Index for HashIndex {
    fn before_first(&mut self, search_key: Constant) -> Result<()> {
        self.close();
        let table_name = self.bucket_table(&search_key);
        let table_scan = TableScan::new(self.tx.clone(), &table_name, self.layout.clone())?;
        self.search_key = Some(search_key);
        self.table_scan = Some(table_scan);
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        let (Some(table_scan), Some(search_key)) =
            (self.table_scan.as_mut(), self.search_key.as_ref())
        else {
            return Ok(false);
        };

        while table_scan.next()? {
            if table_scan.get_value("dataval")? == *search_key {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_data_rid(&mut self) -> Result<RID> {
        let table_scan = self.table_scan()?;
        let block_num = table_scan.get_int("block")?;
        let id = table_scan.get_int("id")?;
        Ok(RID::new(block_num, id))
    }

    fn insert(&mut self, data_value: Constant, data_rid: RID) -> Result<()> {
        self.before_first(data_value.clone())?;
        let table_scan = self.table_scan()?;
        table_scan.insert()?;
        table_scan.set_int("block", data_rid.block_num)?;
        table_scan.set_int("id", data_rid.slot)?;
        table_scan.set_value("dataval", data_value)?;
        self.close();
        Ok(())
    }

    fn delete(&mut self, data_value: Constant, data_rid: RID) -> Result<()> {
        self.before_first(data_value)?;
        while self.next()? {
            if self.get_data_rid()? == data_rid {
                self.table_scan()?.delete()?;
                break;
            }
        }
        self.close();
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut table_scan) = self.table_scan.take() {
            table_scan.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buffer::buffer_manager::BufferManager, file::file_manager::FileManager,
        record::schema::Schema,
    };

    fn entries(index: &mut HashIndex, key: i32) -> Vec<RID> {
        let mut rids = vec![];
        index.before_first(Constant::Int(key)).unwrap();
        while index.next().unwrap() {
            rids.push(index.get_data_rid().unwrap());
        }
        index.close();
        rids
    }

    #[test]
    fn should_find_only_matching_entries() {
        let tempdir = tempfile::tempdir().unwrap();
        let file_manager = Arc::new(Mutex::new(FileManager::new(tempdir.path(), 400).unwrap()));
        let buffer_manager = Arc::new(Mutex::new(BufferManager::new(file_manager.clone(), 8)));
        let tx = Arc::new(Mutex::new(Transaction::new(file_manager, buffer_manager)));

        let mut schema = Schema::default();
        schema.add_int_field("block");
        schema.add_int_field("id");
        schema.add_int_field("dataval");
        let layout = Arc::new(Layout::new(Arc::new(schema)).unwrap());
        let mut index = HashIndex::new(tx.clone(), "idx", layout);

        index.insert(Constant::Int(7), RID::new(0, 1)).unwrap();
        index.insert(Constant::Int(7), RID::new(2, 3)).unwrap();
        index.insert(Constant::Int(107), RID::new(4, 5)).unwrap();

        assert_eq!(entries(&mut index, 7), vec![RID::new(0, 1), RID::new(2, 3)]);
        assert_eq!(entries(&mut index, 107), vec![RID::new(4, 5)]);
        assert!(entries(&mut index, 8).is_empty());

        index.delete(Constant::Int(7), RID::new(0, 1)).unwrap();
        assert_eq!(entries(&mut index, 7), vec![RID::new(2, 3)]);
        assert_eq!(HashIndex::search_cost(1000, 10), 10);
        tx.lock().unwrap().commit().unwrap();
    }
}

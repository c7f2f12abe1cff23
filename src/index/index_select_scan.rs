use super::Index;
use crate::{
    query::{
        constant::Constant,
        scan::{Scan, UpdateScan as _},
    },
    record::table_scan::TableScan,
};
use anyhow::Result;

pub struct IndexSelectScan {
    table_scan: TableScan,
    index: Box<dyn Index>,
    value: Constant,
}

impl IndexSelectScan {
    pub fn new(table_scan: TableScan, index: Box<dyn Index>, value: Constant) -> Result<Self> {
        let mut scan = Self {
            table_scan,
            index,
            value,
        };
        scan.before_first()?;
        Ok(scan)
    }
}

impl Scan for IndexSelectScan {
    fn before_first(&mut self) -> Result<()> {
        self.index.before_first(self.value.clone())
    }

    fn next(&mut self) -> Result<bool> {
        if !self.index.next()? {
            return Ok(false);
        }
        let rid = self.index.get_data_rid()?;
        self.table_scan.move_to_rid(rid)?;
        Ok(true)
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        self.table_scan.get_int(field_name)
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        self.table_scan.get_string(field_name)
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        self.table_scan.get_value(field_name)
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.table_scan.has_field(field_name)
    }

    fn close(&mut self) {
        self.index.close();
        self.table_scan.close();
    }
}

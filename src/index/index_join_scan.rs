use super::Index;
use crate::{
    query::{
        constant::Constant,
        scan::{Scan, UpdateScan as _},
    },
    record::table_scan::TableScan,
};
use anyhow::Result;

/// IndexJoinScan positions the inner table on every record whose indexed
/// field matches the join field of the current outer record.
pub struct IndexJoinScan {
    lhs: Box<dyn Scan>,
    index: Box<dyn Index>,
    join_field: String,
    rhs: TableScan,
    outer_valid: bool,
}

impl IndexJoinScan {
    pub fn new(
        lhs: Box<dyn Scan>,
        index: Box<dyn Index>,
        join_field: &str,
        rhs: TableScan,
    ) -> Result<Self> {
        let mut scan = Self {
            lhs,
            index,
            join_field: join_field.to_string(),
            rhs,
            outer_valid: false,
        };
        scan.before_first().inspect_err(|_| scan.close())?;
        Ok(scan)
    }

    fn reset_index(&mut self) -> Result<()> {
        let search_key = self.lhs.get_value(&self.join_field)?;
        self.index.before_first(search_key)
    }
}

impl Scan for IndexJoinScan {
    fn before_first(&mut self) -> Result<()> {
        self.lhs.before_first()?;
        self.outer_valid = self.lhs.next()?;
        if self.outer_valid {
            self.reset_index()?;
        }
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        while self.outer_valid {
            if self.index.next()? {
                let rid = self.index.get_data_rid()?;
                self.rhs.move_to_rid(rid)?;
                return Ok(true);
            }
            self.outer_valid = self.lhs.next()?;
            if self.outer_valid {
                self.reset_index()?;
            }
        }
        Ok(false)
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        if self.rhs.has_field(field_name) {
            self.rhs.get_int(field_name)
        } else {
            self.lhs.get_int(field_name)
        }
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        if self.rhs.has_field(field_name) {
            self.rhs.get_string(field_name)
        } else {
            self.lhs.get_string(field_name)
        }
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        if self.rhs.has_field(field_name) {
            self.rhs.get_value(field_name)
        } else {
            self.lhs.get_value(field_name)
        }
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.rhs.has_field(field_name) || self.lhs.has_field(field_name)
    }

    fn close(&mut self) {
        self.lhs.close();
        self.index.close();
        self.rhs.close();
    }
}

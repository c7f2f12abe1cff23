use super::sort_scan::SortScan;
use crate::query::{constant::Constant, scan::Scan};
use anyhow::Result;

/// MergeJoinScan joins two scans sorted on their join fields.
/// Records of the right side that share a join value are replayed for every
/// matching record of the left side.
pub struct MergeJoinScan {
    s1: Box<dyn Scan>,
    s2: SortScan,
    field_name1: String,
    field_name2: String,
    join_val: Option<Constant>,
}

impl MergeJoinScan {
    pub fn new(s1: Box<dyn Scan>, s2: SortScan, field_name1: &str, field_name2: &str) -> Result<Self> {
        let mut scan = Self {
            s1,
            s2,
            field_name1: field_name1.to_string(),
            field_name2: field_name2.to_string(),
            join_val: None,
        };
        scan.before_first().inspect_err(|_| scan.close())?;
        Ok(scan)
    }
}

impl Scan for MergeJoinScan {
    fn before_first(&mut self) -> Result<()> {
        self.s1.before_first()?;
        self.s2.before_first()?;
        self.join_val = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        let mut has_more2 = self.s2.next()?;
        if has_more2
            && self.join_val.is_some()
            && self.join_val == Some(self.s2.get_value(&self.field_name2)?)
        {
            return Ok(true);
        }

        let mut has_more1 = self.s1.next()?;
        if has_more1
            && self.join_val.is_some()
            && self.join_val == Some(self.s1.get_value(&self.field_name1)?)
        {
            self.s2.restore_position()?;
            return Ok(true);
        }

        while has_more1 && has_more2 {
            let val1 = self.s1.get_value(&self.field_name1)?;
            let val2 = self.s2.get_value(&self.field_name2)?;
            if val1 < val2 {
                has_more1 = self.s1.next()?;
            } else if val1 > val2 {
                has_more2 = self.s2.next()?;
            } else {
                self.s2.save_position()?;
                self.join_val = Some(val2);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        if self.s1.has_field(field_name) {
            self.s1.get_int(field_name)
        } else {
            self.s2.get_int(field_name)
        }
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        if self.s1.has_field(field_name) {
            self.s1.get_string(field_name)
        } else {
            self.s2.get_string(field_name)
        }
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        if self.s1.has_field(field_name) {
            self.s1.get_value(field_name)
        } else {
            self.s2.get_value(field_name)
        }
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.s1.has_field(field_name) || self.s2.has_field(field_name)
    }

    fn close(&mut self) {
        self.s1.close();
        self.s2.close();
    }
}

use super::{constant::Constant, predicate::Predicate, scan::Scan};
use anyhow::Result;

/// SelectScan passes through the records of its child that satisfy the predicate.
pub struct SelectScan {
    scan: Box<dyn Scan>,
    pred: Predicate,
}

impl SelectScan {
    pub fn new(scan: Box<dyn Scan>, pred: Predicate) -> SelectScan {
        SelectScan { scan, pred }
    }
}

impl Scan for SelectScan {
    fn before_first(&mut self) -> Result<()> {
        self.scan.before_first()
    }

    fn next(&mut self) -> Result<bool> {
        while self.scan.next()? {
            if self.pred.is_satisfied(self.scan.as_mut())? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        self.scan.get_int(field_name)
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        self.scan.get_string(field_name)
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        self.scan.get_value(field_name)
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.scan.has_field(field_name)
    }

    fn close(&mut self) {
        self.scan.close();
    }
}

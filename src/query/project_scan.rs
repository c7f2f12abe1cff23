use super::{constant::Constant, scan::Scan};
use crate::error::PlanError;
use anyhow::Result;

/// ProjectScan hides every field of its child except the projected ones.
pub struct ProjectScan {
    scan: Box<dyn Scan>,
    fields: Vec<String>,
}

impl ProjectScan {
    pub fn new(scan: Box<dyn Scan>, fields: Vec<String>) -> ProjectScan {
        ProjectScan { scan, fields }
    }

    fn check(&self, field_name: &str) -> Result<()> {
        if self.has_field(field_name) {
            Ok(())
        } else {
            Err(PlanError::UnknownField {
                field: field_name.to_string(),
            }
            .into())
        }
    }
}

impl Scan for ProjectScan {
    fn before_first(&mut self) -> Result<()> {
        self.scan.before_first()
    }

    fn next(&mut self) -> Result<bool> {
        self.scan.next()
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        self.check(field_name)?;
        self.scan.get_int(field_name)
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        self.check(field_name)?;
        self.scan.get_string(field_name)
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        self.check(field_name)?;
        self.scan.get_value(field_name)
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.fields.iter().any(|f| f == field_name)
    }

    fn close(&mut self) {
        self.scan.close();
    }
}

use crate::{
    error::PlanError,
    query::scan::{Scan as _, UpdateScan as _},
    record::{
        layout::Layout,
        schema::{FieldType, Schema},
        table_scan::TableScan,
    },
    tx::transaction::Transaction,
};
use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Longest table, field or index name the catalog stores.
pub const MAX_NAME: i32 = 16;

pub struct TableManager {
    /// one record per table: name and slot size
    table_catalog_layout: Arc<Layout>,
    /// one record per field: table, name, type code, length and offset
    field_catalog_layout: Arc<Layout>,
}

impl TableManager {
    pub fn new(is_new: bool, tx: Arc<Mutex<Transaction>>) -> Result<Self> {
        let mut tcs = Schema::default();
        tcs.add_string_field("tblname", MAX_NAME);
        tcs.add_int_field("slotsize");
        let table_catalog_layout = Arc::new(Layout::new(Arc::new(tcs))?);

        let mut fcs = Schema::default();
        fcs.add_string_field("tblname", MAX_NAME);
        fcs.add_string_field("fldname", MAX_NAME);
        fcs.add_int_field("type");
        fcs.add_int_field("length");
        fcs.add_int_field("offset");
        let field_catalog_layout = Arc::new(Layout::new(Arc::new(fcs))?);

        let mut tm = Self {
            table_catalog_layout,
            field_catalog_layout,
        };

        if is_new {
            tm.create_table("tblcat", tm.table_catalog_layout.schema(), tx.clone())?;
            tm.create_table("fldcat", tm.field_catalog_layout.schema(), tx)?;
        }

        Ok(tm)
    }

    pub fn create_table(
        &mut self,
        table_name: &str,
        schema: Arc<Schema>,
        tx: Arc<Mutex<Transaction>>,
    ) -> Result<()> {
        let layout = Layout::new(schema.clone())?;
        let mut tcat = TableScan::new(tx.clone(), "tblcat", self.table_catalog_layout.clone())?;
        tcat.insert()?;
        tcat.set_string("tblname", table_name)?;
        tcat.set_int("slotsize", layout.slot_size())?;
        tcat.close();

        let mut fcat = TableScan::new(tx, "fldcat", self.field_catalog_layout.clone())?;
        for field_name in schema.fields.iter() {
            let unknown = || PlanError::UnknownField {
                field: field_name.clone(),
            };
            let field_type = schema.field_type(field_name).ok_or_else(unknown)?;
            fcat.insert()?;
            fcat.set_string("tblname", table_name)?;
            fcat.set_string("fldname", field_name)?;
            fcat.set_int("type", field_type.into())?;
            fcat.set_int("length", schema.length(field_name).ok_or_else(unknown)?)?;
            fcat.set_int("offset", layout.offset(field_name).ok_or_else(unknown)?)?;
        }
        fcat.close();

        Ok(())
    }

    /// get_layout reads the layout of a table back from the catalog
    pub fn get_layout(&self, table_name: &str, tx: Arc<Mutex<Transaction>>) -> Result<Layout> {
        let mut size = None;
        let mut tcat = TableScan::new(tx.clone(), "tblcat", self.table_catalog_layout.clone())?;
        while tcat.next()? {
            if tcat.get_string("tblname")? == table_name {
                size = Some(tcat.get_int("slotsize")?);
                break;
            }
        }
        tcat.close();

        let Some(size) = size else {
            return Err(PlanError::UnknownTable {
                table: table_name.to_string(),
            }
            .into());
        };

        let mut schema = Schema::default();
        let mut offsets = HashMap::new();
        let mut fcat = TableScan::new(tx, "fldcat", self.field_catalog_layout.clone())?;
        while fcat.next()? {
            if fcat.get_string("tblname")? == table_name {
                let field_name = fcat.get_string("fldname")?;
                let field_type = FieldType::try_from(fcat.get_int("type")?)?;
                let length = fcat.get_int("length")?;
                let offset = fcat.get_int("offset")?;
                schema.add_field(field_name.as_str(), field_type, length);
                offsets.insert(field_name, offset);
            }
        }
        fcat.close();

        Ok(Layout::from_metadata(Arc::new(schema), offsets, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{server::db::TinyExec, unlock};
    use tempfile::tempdir;

    #[test]
    fn should_can_get_layout() -> Result<()> {
        let test_directory = tempdir()?;
        let db = TinyExec::new(test_directory.path().join("db"), 400, 8)?;
        let tx = db.new_tx();

        let table_manager = TableManager::new(false, tx.clone())?;
        let table_catalog_layout = Arc::new(table_manager.get_layout("tblcat", tx.clone())?);

        let mut ts = TableScan::new(tx.clone(), "tblcat", table_catalog_layout)?;
        for want in [("tblcat", 28), ("fldcat", 56)] {
            ts.next()?;
            assert_eq!(ts.get_string("tblname")?, want.0);
            assert_eq!(ts.get_int("slotsize")?, want.1);
        }
        ts.close();

        let layout = table_manager.get_layout("fldcat", tx.clone())?;
        let mut ts = TableScan::new(tx.clone(), "fldcat", Arc::new(layout))?;
        let wants = [
            ("tblcat", "tblname", FieldType::Varchar, 16, 4),
            ("tblcat", "slotsize", FieldType::Integer, 0, 24),
            ("fldcat", "tblname", FieldType::Varchar, 16, 4),
            ("fldcat", "fldname", FieldType::Varchar, 16, 24),
            ("fldcat", "type", FieldType::Integer, 0, 44),
            ("fldcat", "length", FieldType::Integer, 0, 48),
            ("fldcat", "offset", FieldType::Integer, 0, 52),
        ];
        for want in wants {
            ts.next()?;
            assert_eq!(ts.get_string("tblname")?, want.0);
            assert_eq!(ts.get_string("fldname")?, want.1);
            assert_eq!(ts.get_int("type")?, i32::from(want.2));
            assert_eq!(ts.get_int("length")?, want.3);
            assert_eq!(ts.get_int("offset")?, want.4);
        }
        ts.close();
        unlock!(tx).commit()?;
        Ok(())
    }

    #[test]
    fn should_reject_unknown_table() -> Result<()> {
        let test_directory = tempdir()?;
        let db = TinyExec::new(test_directory.path().join("db"), 400, 8)?;
        let tx = db.new_tx();
        let table_manager = TableManager::new(false, tx.clone())?;

        let err = table_manager.get_layout("nope", tx).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlanError>(),
            Some(&PlanError::UnknownTable {
                table: "nope".into()
            })
        );
        Ok(())
    }
}

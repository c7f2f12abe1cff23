use super::schema::{FieldType, Schema};
use crate::{error::PlanError, file::page::Page, I32_SIZE};
use anyhow::Result;
use std::{collections::HashMap, sync::Arc};

/// Layout places the fields of a schema inside a fixed-length slot.
/// Each slot starts with a 4 byte used/empty flag.
#[derive(Debug, Clone)]
pub struct Layout {
    schema: Arc<Schema>,
    offsets: HashMap<String, i32>,
    slot_size: i32,
}

impl Layout {
    pub fn new(schema: Arc<Schema>) -> Result<Self> {
        let mut pos = I32_SIZE as i32;
        let mut offsets = HashMap::new();
        for field in &schema.fields {
            offsets.insert(field.clone(), pos);
            pos += Self::length_in_bytes(&schema, field)?;
        }
        Ok(Self {
            schema,
            offsets,
            slot_size: pos,
        })
    }

    /// from_metadata rebuilds a layout read back from the catalog
    pub fn from_metadata(schema: Arc<Schema>, offsets: HashMap<String, i32>, slot_size: i32) -> Self {
        Self {
            schema,
            offsets,
            slot_size,
        }
    }

    pub fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    pub fn offset(&self, field_name: &str) -> Option<i32> {
        self.offsets.get(field_name).copied()
    }

    pub fn slot_size(&self) -> i32 {
        self.slot_size
    }

    fn length_in_bytes(schema: &Schema, field_name: &str) -> Result<i32> {
        let unknown = || PlanError::UnknownField {
            field: field_name.to_string(),
        };
        match schema.field_type(field_name).ok_or_else(unknown)? {
            FieldType::Integer => Ok(I32_SIZE as i32),
            FieldType::Varchar => Ok(Page::max_length(
                schema.length(field_name).ok_or_else(unknown)?,
            )),
        }
    }
}

use crate::error::PlanError;
use anyhow::{anyhow, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Varchar,
}

/// Type codes stored in the field catalog
impl From<FieldType> for i32 {
    fn from(value: FieldType) -> i32 {
        match value {
            FieldType::Integer => 4,
            FieldType::Varchar => 12,
        }
    }
}

impl TryFrom<i32> for FieldType {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<FieldType> {
        match value {
            4 => Ok(FieldType::Integer),
            12 => Ok(FieldType::Varchar),
            _ => Err(anyhow!("unknown field type code {}", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub field_type: FieldType,
    pub length: i32,
}

/// Schema is the ordered set of fields of a record, with their types and
/// lengths. Field names are unique.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Schema {
    pub fields: Vec<String>,
    info: HashMap<String, FieldInfo>,
}

impl Schema {
    /// add_field adds a field, replacing the type and length of a field with
    /// the same name
    pub fn add_field(&mut self, field_name: impl Into<String>, field_type: FieldType, length: i32) {
        let field_name = field_name.into();
        if !self.info.contains_key(&field_name) {
            self.fields.push(field_name.clone());
        }
        self.info.insert(field_name, FieldInfo { field_type, length });
    }

    pub fn add_int_field(&mut self, field_name: impl Into<String>) {
        self.add_field(field_name, FieldType::Integer, 0);
    }

    /// add_string_field adds a varchar field holding at most `length` bytes
    pub fn add_string_field(&mut self, field_name: impl Into<String>, length: i32) {
        self.add_field(field_name, FieldType::Varchar, length);
    }

    /// add copies one field definition from another schema
    pub fn add(&mut self, field_name: &str, schema: &Schema) -> Result<()> {
        let info = schema
            .info
            .get(field_name)
            .ok_or_else(|| PlanError::UnknownField {
                field: field_name.to_string(),
            })?;
        self.add_field(field_name, info.field_type, info.length);
        Ok(())
    }

    pub fn add_all(&mut self, schema: &Schema) -> Result<()> {
        for field in &schema.fields {
            self.add(field, schema)?;
        }
        Ok(())
    }

    /// union merges two schemas; a field present in both is rejected
    pub fn union(left: &Schema, right: &Schema) -> Result<Schema> {
        if let Some(field) = right.fields.iter().find(|f| left.has_field(f)) {
            return Err(PlanError::DuplicateField {
                field: field.clone(),
            }
            .into());
        }
        let mut schema = left.clone();
        schema.add_all(right)?;
        Ok(schema)
    }

    pub fn has_field(&self, field_name: &str) -> bool {
        self.info.contains_key(field_name)
    }

    pub fn field_type(&self, field_name: &str) -> Option<FieldType> {
        self.info.get(field_name).map(|info| info.field_type)
    }

    pub fn length(&self, field_name: &str) -> Option<i32> {
        self.info.get(field_name).map(|info| info.length)
    }
}

use super::partition::{JoinSide, PartitionPair};
use crate::{
    error::PlanError,
    materialize::runs::read_record,
    query::{constant::Constant, scan::Scan},
    record::{schema::Schema, table_scan::TableScan},
};
use anyhow::{bail, Result};
use std::{collections::HashMap, sync::Arc};

/// HashJoinScan joins partition pairs one at a time: the build partition is
/// loaded into an in-memory hash table and the probe partition is streamed
/// against it.
pub struct HashJoinScan {
    pairs: Vec<PartitionPair>,
    build_schema: Arc<Schema>,
    build_field: String,
    probe_schema: Arc<Schema>,
    probe_field: String,
    next_pair: usize,
    table: HashMap<Constant, Vec<Vec<Constant>>>,
    probe: Option<TableScan>,
    probe_key: Option<Constant>,
    matched: usize,
}

impl HashJoinScan {
    pub fn new(pairs: Vec<PartitionPair>, build: &JoinSide, probe: &JoinSide) -> Result<Self> {
        let mut scan = Self {
            pairs,
            build_schema: build.schema.clone(),
            build_field: build.field.clone(),
            probe_schema: probe.schema.clone(),
            probe_field: probe.field.clone(),
            next_pair: 0,
            table: HashMap::new(),
            probe: None,
            probe_key: None,
            matched: 0,
        };
        scan.before_first()?;
        Ok(scan)
    }

    fn load_next_pair(&mut self) -> Result<bool> {
        if let Some(mut probe) = self.probe.take() {
            probe.close();
        }
        self.table.clear();
        let Some(pair) = self.pairs.get(self.next_pair).cloned() else {
            return Ok(false);
        };
        self.next_pair += 1;

        let mut build = pair.build.table().open()?;
        let loaded = load_build(&mut build, &self.build_field, &self.build_schema, &mut self.table);
        build.close();
        loaded?;
        self.probe = Some(pair.probe.table().open()?);
        Ok(true)
    }

    fn current_build(&self) -> Option<&Vec<Constant>> {
        let key = self.probe_key.as_ref()?;
        self.table.get(key)?.get(self.matched.checked_sub(1)?)
    }
}

/// load_build reads a build partition into the in-memory join table
fn load_build(
    build: &mut TableScan,
    field: &str,
    schema: &Schema,
    table: &mut HashMap<Constant, Vec<Vec<Constant>>>,
) -> Result<()> {
    while build.next()? {
        let key = build.get_value(field)?;
        let record = read_record(build, schema)?;
        table.entry(key).or_default().push(record);
    }
    Ok(())
}

impl Scan for HashJoinScan {
    fn before_first(&mut self) -> Result<()> {
        if let Some(mut probe) = self.probe.take() {
            probe.close();
        }
        self.table.clear();
        self.next_pair = 0;
        self.probe_key = None;
        self.matched = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        loop {
            if let Some(key) = &self.probe_key {
                let candidates = self.table.get(key).map_or(0, |records| records.len());
                if self.matched < candidates {
                    self.matched += 1;
                    return Ok(true);
                }
                self.probe_key = None;
            }

            if let Some(probe) = self.probe.as_mut() {
                if probe.next()? {
                    self.probe_key = Some(probe.get_value(&self.probe_field)?);
                    self.matched = 0;
                    continue;
                }
            }

            if !self.load_next_pair()? {
                return Ok(false);
            }
        }
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        match self.get_value(field_name)? {
            Constant::Int(i) => Ok(i),
            Constant::String(_) => bail!("field {} is not an integer", field_name),
        }
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        match self.get_value(field_name)? {
            Constant::String(s) => Ok(s),
            Constant::Int(_) => bail!("field {} is not a string", field_name),
        }
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        if let Some(pos) = self.build_schema.fields.iter().position(|f| f == field_name) {
            return match self.current_build() {
                Some(record) => Ok(record[pos].clone()),
                None => bail!("hash join scan is not positioned on a record"),
            };
        }
        match self.probe.as_mut() {
            Some(probe) if probe.has_field(field_name) => probe.get_value(field_name),
            Some(_) => Err(PlanError::UnknownField {
                field: field_name.to_string(),
            }
            .into()),
            None => bail!("hash join scan is not positioned on a record"),
        }
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.build_schema.has_field(field_name) || self.probe_schema.has_field(field_name)
    }

    fn close(&mut self) {
        if let Some(mut probe) = self.probe.take() {
            probe.close();
        }
        self.table.clear();
    }
}

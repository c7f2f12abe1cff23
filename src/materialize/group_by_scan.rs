use super::aggregation::AggregationFn;
use crate::{
    error::PlanError,
    query::{constant::Constant, scan::Scan},
};
use anyhow::{bail, Result};

/// GroupByScan reads a scan sorted on the group fields and emits one record
/// per group.
pub struct GroupByScan {
    scan: Box<dyn Scan>,
    group_fields: Vec<String>,
    aggregates: Vec<Box<dyn AggregationFn>>,
    group_val: Option<Vec<Constant>>,
    more_groups: bool,
}

impl GroupByScan {
    pub fn new(
        scan: Box<dyn Scan>,
        group_fields: Vec<String>,
        aggregates: Vec<Box<dyn AggregationFn>>,
    ) -> Result<Self> {
        let mut scan = Self {
            scan,
            group_fields,
            aggregates,
            group_val: None,
            more_groups: false,
        };
        scan.before_first().inspect_err(|_| scan.close())?;
        Ok(scan)
    }

    fn group_key(&mut self) -> Result<Vec<Constant>> {
        let mut key = Vec::with_capacity(self.group_fields.len());
        for field in &self.group_fields {
            key.push(self.scan.get_value(field)?);
        }
        Ok(key)
    }
}

impl Scan for GroupByScan {
    fn before_first(&mut self) -> Result<()> {
        self.scan.before_first()?;
        self.group_val = None;
        self.more_groups = self.scan.next()?;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if !self.more_groups {
            return Ok(false);
        }
        for aggregate in self.aggregates.iter_mut() {
            aggregate.process_first(self.scan.as_mut())?;
        }
        let group_val = self.group_key()?;
        loop {
            self.more_groups = self.scan.next()?;
            if !self.more_groups || self.group_key()? != group_val {
                break;
            }
            for aggregate in self.aggregates.iter_mut() {
                aggregate.process_next(self.scan.as_mut())?;
            }
        }
        self.group_val = Some(group_val);
        Ok(true)
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
        if let Some(pos) = self.group_fields.iter().position(|f| f == field_name) {
            if let Some(val) = self.group_val.as_ref().and_then(|vals| vals.get(pos)) {
                return Ok(val.clone());
            }
            bail!("group by scan is not positioned on a group");
        }
        self.aggregates
            .iter()
            .find(|aggregate| aggregate.field_name() == field_name)
            .map(|aggregate| aggregate.value())
            .ok_or_else(|| {
                PlanError::UnknownField {
                    field: field_name.to_string(),
                }
                .into()
            })
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.group_fields.iter().any(|f| f == field_name)
            || self.aggregates.iter().any(|a| a.field_name() == field_name)
    }

    fn close(&mut self) {
        self.scan.close();
    }
}

use super::predicate::Predicate;
use crate::materialize::{aggregation::Aggregate, record_comparator::SortField};
use std::fmt::Display;

/// QueryData describes a parsed query.
///
/// An empty `fields` list selects every field of the final plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryData {
    pub fields: Vec<String>,
    pub tables: Vec<String>,
    pub pred: Predicate,
    pub order_by: Vec<SortField>,
    pub group_by: Vec<String>,
    pub aggregates: Vec<Aggregate>,
    pub distinct: bool,
}

impl QueryData {
    pub fn new(fields: Vec<String>, tables: Vec<String>, pred: Predicate) -> QueryData {
        QueryData {
            fields,
            tables,
            pred,
            ..Default::default()
        }
    }

    pub fn order_by(mut self, order_by: Vec<SortField>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn group_by(mut self, group_by: Vec<String>, aggregates: Vec<Aggregate>) -> Self {
        self.group_by = group_by;
        self.aggregates = aggregates;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

fn write_list<T: Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for QueryData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.fields.is_empty() {
            write!(f, "*")?;
        } else {
            write_list(f, &self.fields)?;
        }
        write!(f, " FROM ")?;
        write_list(f, &self.tables)?;
        if !self.pred.is_empty() {
            write!(f, " WHERE {}", self.pred)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            write_list(f, &self.order_by)?;
        }
        Ok(())
    }
}

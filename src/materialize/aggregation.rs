use crate::query::{constant::Constant, scan::Scan};
use anyhow::{anyhow, Result};
use std::{collections::HashSet, fmt::Display};

/// AggregationFn folds the records of one group into a single value.
pub trait AggregationFn {
    /// process_first resets the state from the first record of a group
    fn process_first(&mut self, scan: &mut dyn Scan) -> Result<()>;
    fn process_next(&mut self, scan: &mut dyn Scan) -> Result<()>;
    /// field_name is the name of the output field
    fn field_name(&self) -> &str;
    fn value(&self) -> Constant;
    /// is_always_integer reports whether the result is an integer whatever
    /// the type of the aggregated field
    fn is_always_integer(&self) -> bool;
}

/// Aggregate names an aggregation over a field of the grouped input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    Count { field: String, distinct: bool },
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

impl Aggregate {
    pub fn count(field: &str) -> Self {
        Aggregate::Count {
            field: field.to_string(),
            distinct: false,
        }
    }

    pub fn count_distinct(field: &str) -> Self {
        Aggregate::Count {
            field: field.to_string(),
            distinct: true,
        }
    }

    /// field is the aggregated input field; `*` for `count(*)`
    pub fn field(&self) -> &str {
        match self {
            Aggregate::Count { field, .. } => field,
            Aggregate::Sum(field)
            | Aggregate::Avg(field)
            | Aggregate::Min(field)
            | Aggregate::Max(field) => field,
        }
    }

    pub fn output_name(&self) -> String {
        match self {
            Aggregate::Count {
                field,
                distinct: false,
            } => format!("countof{}", field),
            Aggregate::Count {
                field,
                distinct: true,
            } => format!("countdistinctof{}", field),
            Aggregate::Sum(field) => format!("sumof{}", field),
            Aggregate::Avg(field) => format!("avgof{}", field),
            Aggregate::Min(field) => format!("minof{}", field),
            Aggregate::Max(field) => format!("maxof{}", field),
        }
    }

    pub fn is_always_integer(&self) -> bool {
        !matches!(self, Aggregate::Min(_) | Aggregate::Max(_))
    }

    pub fn create(&self) -> Box<dyn AggregationFn> {
        let name = self.output_name();
        let field = self.field().to_string();
        match self {
            Aggregate::Count { distinct, .. } => Box::new(CountFn {
                field,
                name,
                distinct: *distinct,
                count: 0,
                seen: HashSet::new(),
            }),
            Aggregate::Sum(_) => Box::new(SumFn { field, name, sum: 0 }),
            Aggregate::Avg(_) => Box::new(AvgFn {
                field,
                name,
                sum: 0,
                count: 0,
            }),
            Aggregate::Min(_) => Box::new(ExtremeFn {
                field,
                name,
                keep_max: false,
                val: None,
            }),
            Aggregate::Max(_) => Box::new(ExtremeFn {
                field,
                name,
                keep_max: true,
                val: None,
            }),
        }
    }
}

impl Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output_name())
    }
}

struct CountFn {
    field: String,
    name: String,
    distinct: bool,
    count: i32,
    seen: HashSet<Constant>,
}

impl CountFn {
    fn add(&mut self, scan: &mut dyn Scan) -> Result<()> {
        if self.distinct && self.field != "*" {
            self.seen.insert(scan.get_value(&self.field)?);
            self.count = self.seen.len() as i32;
        } else {
            self.count += 1;
        }
        Ok(())
    }
}

impl AggregationFn for CountFn {
    fn process_first(&mut self, scan: &mut dyn Scan) -> Result<()> {
        self.count = 0;
        self.seen.clear();
        self.add(scan)
    }

    fn process_next(&mut self, scan: &mut dyn Scan) -> Result<()> {
        self.add(scan)
    }

    fn field_name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Constant {
        Constant::Int(self.count)
    }

    fn is_always_integer(&self) -> bool {
        true
    }
}

struct SumFn {
    field: String,
    name: String,
    sum: i32,
}

impl AggregationFn for SumFn {
    fn process_first(&mut self, scan: &mut dyn Scan) -> Result<()> {
        self.sum = scan.get_int(&self.field)?;
        Ok(())
    }

    fn process_next(&mut self, scan: &mut dyn Scan) -> Result<()> {
        let val = scan.get_int(&self.field)?;
        self.sum = self
            .sum
            .checked_add(val)
            .ok_or_else(|| anyhow!("sum of {} overflows an integer", self.field))?;
        Ok(())
    }

    fn field_name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Constant {
        Constant::Int(self.sum)
    }

    fn is_always_integer(&self) -> bool {
        true
    }
}

struct AvgFn {
    field: String,
    name: String,
    sum: i64,
    count: i64,
}

impl AggregationFn for AvgFn {
    fn process_first(&mut self, scan: &mut dyn Scan) -> Result<()> {
        self.sum = scan.get_int(&self.field)? as i64;
        self.count = 1;
        Ok(())
    }

    fn process_next(&mut self, scan: &mut dyn Scan) -> Result<()> {
        let val = scan.get_int(&self.field)? as i64;
        self.sum = self
            .sum
            .checked_add(val)
            .ok_or_else(|| anyhow!("average of {} overflows", self.field))?;
        self.count += 1;
        Ok(())
    }

    fn field_name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Constant {
        // integer division; the mean of i32 values always fits an i32
        Constant::Int((self.sum / self.count.max(1)) as i32)
    }

    fn is_always_integer(&self) -> bool {
        true
    }
}

/// ExtremeFn keeps the minimum or the maximum value of a field.
struct ExtremeFn {
    field: String,
    name: String,
    keep_max: bool,
    val: Option<Constant>,
}

impl AggregationFn for ExtremeFn {
    fn process_first(&mut self, scan: &mut dyn Scan) -> Result<()> {
        self.val = Some(scan.get_value(&self.field)?);
        Ok(())
    }

    fn process_next(&mut self, scan: &mut dyn Scan) -> Result<()> {
        let new_val = scan.get_value(&self.field)?;
        let replace = match &self.val {
            None => true,
            Some(val) if self.keep_max => new_val > *val,
            Some(val) => new_val < *val,
        };
        if replace {
            self.val = Some(new_val);
        }
        Ok(())
    }

    fn field_name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Constant {
        self.val.clone().unwrap_or(Constant::Int(0))
    }

    fn is_always_integer(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_name_aggregates_after_their_field() {
        assert_eq!(Aggregate::count("*").output_name(), "countof*");
        assert_eq!(Aggregate::count_distinct("sname").output_name(), "countdistinctofsname");
        assert_eq!(Aggregate::Sum("gradyear".into()).output_name(), "sumofgradyear");
        assert_eq!(Aggregate::Avg("gradyear".into()).output_name(), "avgofgradyear");
        assert_eq!(Aggregate::Min("sname".into()).output_name(), "minofsname");
        assert_eq!(Aggregate::Max("sname".into()).output_name(), "maxofsname");
    }

    /// Ints is a one-field scan over a list of integers
    struct Ints {
        vals: Vec<i32>,
        pos: Option<usize>,
    }

    impl Ints {
        fn new(vals: &[i32]) -> Self {
            Self {
                vals: vals.to_vec(),
                pos: None,
            }
        }
    }

    impl Scan for Ints {
        fn before_first(&mut self) -> Result<()> {
            self.pos = None;
            Ok(())
        }
        fn next(&mut self) -> Result<bool> {
            let pos = self.pos.map_or(0, |p| p + 1);
            self.pos = Some(pos);
            Ok(pos < self.vals.len())
        }
        fn get_int(&mut self, _field_name: &str) -> Result<i32> {
            self.pos
                .and_then(|p| self.vals.get(p).copied())
                .ok_or_else(|| anyhow!("not positioned"))
        }
        fn get_string(&mut self, field_name: &str) -> Result<String> {
            Ok(self.get_int(field_name)?.to_string())
        }
        fn get_value(&mut self, field_name: &str) -> Result<Constant> {
            Ok(Constant::Int(self.get_int(field_name)?))
        }
        fn has_field(&self, field_name: &str) -> bool {
            field_name == "n"
        }
        fn close(&mut self) {}
    }

    fn fold(aggregate: Aggregate, vals: &[i32]) -> Result<Constant> {
        let mut scan = Ints::new(vals);
        let mut f = aggregate.create();
        scan.next()?;
        f.process_first(&mut scan)?;
        while scan.next()? {
            f.process_next(&mut scan)?;
        }
        Ok(f.value())
    }

    #[test]
    fn should_fold_integer_aggregates() {
        let vals = [3, 9, 4, 9];
        assert_eq!(fold(Aggregate::Sum("n".into()), &vals).unwrap(), Constant::Int(25));
        assert_eq!(fold(Aggregate::Avg("n".into()), &vals).unwrap(), Constant::Int(6));
        assert_eq!(fold(Aggregate::count_distinct("n"), &vals).unwrap(), Constant::Int(3));
        assert_eq!(fold(Aggregate::Min("n".into()), &vals).unwrap(), Constant::Int(3));
        assert_eq!(fold(Aggregate::Max("n".into()), &vals).unwrap(), Constant::Int(9));
    }

    #[test]
    fn should_reject_sum_overflow() {
        let err = fold(Aggregate::Sum("n".into()), &[i32::MAX, 1]).unwrap_err();
        assert!(err.to_string().contains("overflows"), "{}", err);
    }

    #[test]
    fn should_average_extreme_values() {
        let avg = fold(Aggregate::Avg("n".into()), &[i32::MAX, i32::MAX, i32::MAX]).unwrap();
        assert_eq!(avg, Constant::Int(i32::MAX));
    }

    #[test]
    fn should_only_min_and_max_follow_the_field_type() {
        assert!(Aggregate::count("sid").is_always_integer());
        assert!(Aggregate::Avg("sid".into()).create().is_always_integer());
        assert!(!Aggregate::Min("sname".into()).is_always_integer());
        assert!(!Aggregate::Max("sname".into()).create().is_always_integer());
    }
}

use crate::query::scan::Scan;
use anyhow::Result;
use std::{cmp::Ordering, fmt::Display};

/// SortField is one key of an ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub ascending: bool,
}

impl SortField {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: true,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: false,
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "{} {}", self.field, direction)
    }
}

/// RecordComparator orders records by a list of sort fields.
/// The first field that differs decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordComparator {
    fields: Vec<SortField>,
}

impl RecordComparator {
    pub fn new(fields: Vec<SortField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn compare(&self, s1: &mut dyn Scan, s2: &mut dyn Scan) -> Result<Ordering> {
        for sort_field in &self.fields {
            let val1 = s1.get_value(&sort_field.field)?;
            let val2 = s2.get_value(&sort_field.field)?;
            let ordering = Self::directed(val1.cmp(&val2), sort_field.ascending);
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    fn directed(ordering: Ordering, ascending: bool) -> Ordering {
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

impl Display for RecordComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self.fields.iter().map(|f| f.to_string()).collect();
        write!(f, "{}", fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::constant::Constant;
    use anyhow::anyhow;

    /// Student is a scan positioned on a single record
    struct Student(i32, &'static str);

    impl Scan for Student {
        fn before_first(&mut self) -> Result<()> {
            Ok(())
        }
        fn next(&mut self) -> Result<bool> {
            Ok(false)
        }
        fn get_int(&mut self, _field_name: &str) -> Result<i32> {
            Ok(self.0)
        }
        fn get_string(&mut self, _field_name: &str) -> Result<String> {
            Ok(self.1.to_string())
        }
        fn get_value(&mut self, field_name: &str) -> Result<Constant> {
            match field_name {
                "majorid" => Ok(Constant::Int(self.0)),
                "sname" => Ok(Constant::from(self.1)),
                _ => Err(anyhow!("no field {}", field_name)),
            }
        }
        fn has_field(&self, field_name: &str) -> bool {
            matches!(field_name, "majorid" | "sname")
        }
        fn close(&mut self) {}
    }

    #[test]
    fn should_compare_by_first_differing_key() -> Result<()> {
        let comp = RecordComparator::new(vec![SortField::desc("majorid"), SortField::asc("sname")]);
        let mut amy = Student(10, "amy");
        let mut bob = Student(10, "bob");
        let mut kim = Student(30, "kim");

        assert_eq!(comp.compare(&mut amy, &mut bob)?, Ordering::Less);
        assert_eq!(comp.compare(&mut kim, &mut amy)?, Ordering::Less);
        assert_eq!(comp.compare(&mut bob, &mut Student(10, "bob"))?, Ordering::Equal);
        assert_eq!(comp.to_string(), "majorid DESC, sname ASC");
        Ok(())
    }

    #[test]
    fn should_fail_on_a_missing_field() {
        let comp = RecordComparator::new(vec![SortField::asc("gradyear")]);
        assert!(comp.compare(&mut Student(10, "amy"), &mut Student(20, "bob")).is_err());
    }
}

use super::{constant::Constant, scan::Scan, term::Term};
use crate::{plan::Plan, record::schema::Schema};
use anyhow::Result;
use std::fmt::Display;

/// Predicate is a conjunction of terms. The empty predicate is always true.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn new(term: Term) -> Self {
        Self { terms: vec![term] }
    }

    pub fn from_terms(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn conjoin_with(&mut self, pred: &Self) {
        self.terms.extend(pred.terms.iter().cloned());
    }

    pub fn is_satisfied(&self, scan: &mut dyn Scan) -> Result<bool> {
        for term in self.terms.iter() {
            if !term.is_satisfied(scan)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn reduction_factor(&self, plan: &dyn Plan) -> u64 {
        self.terms
            .iter()
            .fold(1u64, |factor, term| factor.saturating_mul(term.reduction_factor(plan)))
    }

    /// select_sub_pred keeps the terms that mention only fields of `schema`
    pub fn select_sub_pred(&self, schema: &Schema) -> Option<Predicate> {
        let terms: Vec<Term> = self
            .terms
            .iter()
            .filter(|term| term.applies_to(schema))
            .cloned()
            .collect();

        (!terms.is_empty()).then_some(Predicate { terms })
    }

    /// join_sub_pred keeps the terms that need fields of both schemas
    pub fn join_sub_pred(&self, schema1: &Schema, schema2: &Schema) -> Option<Predicate> {
        let mut schema = schema1.clone();
        for field in &schema2.fields {
            if let (Some(field_type), Some(length)) = (schema2.field_type(field), schema2.length(field)) {
                schema.add_field(field.as_str(), field_type, length);
            }
        }

        let terms: Vec<Term> = self
            .terms
            .iter()
            .filter(|term| {
                !term.applies_to(schema1) && !term.applies_to(schema2) && term.applies_to(&schema)
            })
            .cloned()
            .collect();

        (!terms.is_empty()).then_some(Predicate { terms })
    }

    /// without drops every copy of `term`. It returns `None` when nothing is
    /// left.
    pub fn without(&self, term: &Term) -> Option<Predicate> {
        let terms: Vec<Term> = self.terms.iter().filter(|t| *t != term).cloned().collect();
        (!terms.is_empty()).then_some(Predicate { terms })
    }

    pub fn equates_with_constant(&self, field_name: &str) -> Option<&Constant> {
        self.terms
            .iter()
            .find_map(|term| term.equates_with_constant(field_name))
    }

    pub fn equates_with_field(&self, field_name: &str) -> Option<&str> {
        self.terms
            .iter()
            .find_map(|term| term.equates_with_field(field_name))
    }

    /// most_constraining_term returns the field comparison with the largest
    /// reduction factor, the first one on ties
    pub fn most_constraining_term(&self, plan: &dyn Plan) -> Option<&Term> {
        let mut best: Option<(&Term, u64)> = None;
        for term in self.terms.iter().filter(|t| t.field_comparison().is_some()) {
            let factor = term.reduction_factor(plan);
            if best.map_or(true, |(_, f)| factor > f) {
                best = Some((term, factor));
            }
        }
        best.map(|(term, _)| term)
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut terms = self.terms.iter();
        if let Some(term) = terms.next() {
            write!(f, "{}", term)?;
            for term in terms {
                write!(f, " and {}", term)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{cond_op::CondOp, expression::Expression};

    fn schema(fields: &[&str]) -> Schema {
        let mut schema = Schema::default();
        for field in fields {
            schema.add_int_field(*field);
        }
        schema
    }

    fn pred() -> Predicate {
        let mut pred = Predicate::new(Term::new(
            "majorid".into(),
            CondOp::Equals,
            "did".into(),
        ));
        pred.conjoin_with(&Predicate::new(Term::new(
            "gradyear".into(),
            CondOp::MoreThan,
            Constant::Int(2020).into(),
        )));
        pred.conjoin_with(&Predicate::new(Term::new(
            "did".into(),
            CondOp::Equals,
            Constant::Int(10).into(),
        )));
        pred
    }

    #[test]
    fn should_split_select_and_join_terms() {
        let pred = pred();
        let student = schema(&["sid", "majorid", "gradyear"]);
        let dept = schema(&["did"]);

        let select = pred.select_sub_pred(&student).unwrap();
        assert_eq!(select.to_string(), "gradyear>2020");
        let join = pred.join_sub_pred(&student, &dept).unwrap();
        assert_eq!(join.to_string(), "majorid=did");
        assert!(pred.join_sub_pred(&student, &schema(&["cid"])).is_none());
    }

    #[test]
    fn should_equate_only_with_equality() {
        let pred = pred();
        assert_eq!(pred.equates_with_constant("did"), Some(&Constant::Int(10)));
        assert_eq!(pred.equates_with_constant("gradyear"), None);
        assert_eq!(pred.equates_with_field("did"), Some("majorid"));
        assert_eq!(pred.equates_with_field("majorid"), Some("did"));
    }

    #[test]
    fn should_drop_the_enforced_term() {
        let pred = pred();
        let join = Term::new("majorid".into(), CondOp::Equals, "did".into());
        let rest = pred.without(&join).unwrap();
        assert_eq!(rest.to_string(), "gradyear>2020 and did=10");

        let only = Predicate::new(join.clone());
        assert!(only.without(&join).is_none());
        let flipped = Term::new("did".into(), CondOp::Equals, "majorid".into());
        assert_eq!(only.without(&flipped), Some(only.clone()));
    }

    #[test]
    fn should_display_conjunction() {
        let pred = Predicate::from_terms(vec![
            Term::new(Expression::from("a"), CondOp::NotEquals, Expression::from("b")),
            Term::new(Expression::from("c"), CondOp::LessThanOrEquals, Constant::from("x").into()),
        ]);
        assert_eq!(pred.to_string(), "a<>b and c<='x'");
    }
}

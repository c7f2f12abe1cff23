use super::{cond_op::CondOp, constant::Constant, expression::Expression, scan::Scan};
use crate::{plan::Plan, record::schema::Schema};
use anyhow::Result;
use std::fmt::Display;

/// Term compares two expressions with a conditional operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    lhs: Expression,
    op: CondOp,
    rhs: Expression,
}

impl Term {
    pub fn new(lhs: Expression, op: CondOp, rhs: Expression) -> Self {
        Self { lhs, op, rhs }
    }

    pub fn lhs(&self) -> &Expression {
        &self.lhs
    }

    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }

    pub fn op(&self) -> CondOp {
        self.op
    }

    pub fn is_satisfied(&self, scan: &mut dyn Scan) -> Result<bool> {
        let lhs_value = self.lhs.evaluate(scan)?;
        let rhs_value = self.rhs.evaluate(scan)?;
        Ok(self.op.evaluate(&lhs_value, &rhs_value))
    }

    /// reduction_factor estimates by how much the term divides the number
    /// of records of the plan
    pub fn reduction_factor(&self, plan: &dyn Plan) -> u64 {
        match self.op {
            CondOp::NotEquals => return 1,
            CondOp::Equals => {}
            _ => return 3,
        }
        match (&self.lhs, &self.rhs) {
            (Expression::FieldName(l), Expression::FieldName(r)) => {
                plan.distinct_values(l).max(plan.distinct_values(r))
            }
            (Expression::FieldName(l), _) => plan.distinct_values(l),
            (_, Expression::FieldName(r)) => plan.distinct_values(r),
            (Expression::Value(l), Expression::Value(r)) => {
                if l == r {
                    1
                } else {
                    u64::MAX
                }
            }
        }
        .max(1)
    }

    /// equates_with_constant returns `c` when the term is `field = c`
    pub fn equates_with_constant(&self, field_name: &str) -> Option<&Constant> {
        if !self.op.is_equality() {
            return None;
        }
        match (&self.lhs, &self.rhs) {
            (Expression::FieldName(l), Expression::Value(v)) if l == field_name => Some(v),
            (Expression::Value(v), Expression::FieldName(r)) if r == field_name => Some(v),
            _ => None,
        }
    }

    /// equates_with_field returns `other` when the term is `field = other`
    pub fn equates_with_field(&self, field_name: &str) -> Option<&str> {
        if !self.op.is_equality() {
            return None;
        }
        match (&self.lhs, &self.rhs) {
            (Expression::FieldName(l), Expression::FieldName(r)) if l == field_name => Some(r),
            (Expression::FieldName(l), Expression::FieldName(r)) if r == field_name => Some(l),
            _ => None,
        }
    }

    /// field_comparison returns both field names when the term compares two fields
    pub fn field_comparison(&self) -> Option<(&str, CondOp, &str)> {
        match (&self.lhs, &self.rhs) {
            (Expression::FieldName(l), Expression::FieldName(r)) => Some((l, self.op, r)),
            _ => None,
        }
    }

    pub fn applies_to(&self, schema: &Schema) -> bool {
        self.lhs.applies_to(schema) && self.rhs.applies_to(schema)
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.lhs, self.op, self.rhs)
    }
}

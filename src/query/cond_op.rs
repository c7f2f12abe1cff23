use super::constant::Constant;
use crate::error::PlanError;
use std::{fmt::Display, str::FromStr};

/// CondOp is the comparison operator of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondOp {
    Equals,
    LessThan,
    LessThanOrEquals,
    MoreThan,
    MoreThanOrEquals,
    NotEquals,
}

impl CondOp {
    /// flip returns the operator that keeps the comparison true when its
    /// operands are swapped, so `a > b` becomes `b < a`
    pub fn flip(self) -> Self {
        match self {
            CondOp::LessThan => CondOp::MoreThan,
            CondOp::LessThanOrEquals => CondOp::MoreThanOrEquals,
            CondOp::MoreThan => CondOp::LessThan,
            CondOp::MoreThanOrEquals => CondOp::LessThanOrEquals,
            op => op,
        }
    }

    pub fn evaluate(self, lhs: &Constant, rhs: &Constant) -> bool {
        match self {
            CondOp::Equals => lhs == rhs,
            CondOp::LessThan => lhs < rhs,
            CondOp::LessThanOrEquals => lhs <= rhs,
            CondOp::MoreThan => lhs > rhs,
            CondOp::MoreThanOrEquals => lhs >= rhs,
            CondOp::NotEquals => lhs != rhs,
        }
    }

    pub fn is_equality(self) -> bool {
        self == CondOp::Equals
    }
}

impl FromStr for CondOp {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CondOp::Equals),
            "<" => Ok(CondOp::LessThan),
            "<=" => Ok(CondOp::LessThanOrEquals),
            ">" => Ok(CondOp::MoreThan),
            ">=" => Ok(CondOp::MoreThanOrEquals),
            "<>" | "!=" => Ok(CondOp::NotEquals),
            _ => Err(PlanError::MalformedOperator { op: s.to_string() }),
        }
    }
}

impl Display for CondOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            CondOp::Equals => "=",
            CondOp::LessThan => "<",
            CondOp::LessThanOrEquals => "<=",
            CondOp::MoreThan => ">",
            CondOp::MoreThanOrEquals => ">=",
            CondOp::NotEquals => "<>",
        };
        write!(f, "{}", op)
    }
}

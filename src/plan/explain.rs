use std::fmt::Display;

/// PlanKind tags every operator that can appear in an execution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    Table,
    Select,
    IndexSelect,
    Project,
    MultibufferProduct,
    BlockJoin,
    HashJoin,
    GraceHashJoin,
    MergeJoin,
    IndexJoin,
    Materialize,
    Sort,
    GroupBy,
    Distinct,
}

impl PlanKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlanKind::Table => "TABLE",
            PlanKind::Select => "SELECT",
            PlanKind::IndexSelect => "INDEXSELECT",
            PlanKind::Project => "PROJECT",
            PlanKind::MultibufferProduct => "MULTIBUFFERPRODUCT",
            PlanKind::BlockJoin => "BLOCKJOIN",
            PlanKind::HashJoin => "HASHJOIN",
            PlanKind::GraceHashJoin => "GRACEHASHJOIN",
            PlanKind::MergeJoin => "MERGEJOIN",
            PlanKind::IndexJoin => "INDEXJOIN",
            PlanKind::Materialize => "MATERIALIZE",
            PlanKind::Sort => "SORT",
            PlanKind::GroupBy => "GROUP",
            PlanKind::Distinct => "DISTINCT",
        }
    }
}

/// ExecutionChain is a printable description of a plan tree.
///
/// Tables print as `name_tbl`, unary operators as `child.LABEL(detail)`
/// and binary operators as `[left LABEL(detail) right]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionChain {
    kind: PlanKind,
    detail: String,
    children: Vec<ExecutionChain>,
    cost: u64,
}

impl ExecutionChain {
    pub fn table(table_name: &str, cost: u64) -> Self {
        Self {
            kind: PlanKind::Table,
            detail: table_name.to_string(),
            children: vec![],
            cost,
        }
    }

    pub fn unary(kind: PlanKind, child: ExecutionChain, detail: impl Into<String>, cost: u64) -> Self {
        Self {
            kind,
            detail: detail.into(),
            children: vec![child],
            cost,
        }
    }

    pub fn binary(
        kind: PlanKind,
        left: ExecutionChain,
        right: ExecutionChain,
        detail: impl Into<String>,
        cost: u64,
    ) -> Self {
        Self {
            kind,
            detail: detail.into(),
            children: vec![left, right],
            cost,
        }
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn children(&self) -> &[ExecutionChain] {
        &self.children
    }

    /// cost is the blocks accessed by the described plan
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// contains reports whether an operator of the kind appears in the tree
    pub fn contains(&self, kind: PlanKind) -> bool {
        self.kind == kind || self.children.iter().any(|c| c.contains(kind))
    }
}

impl Display for ExecutionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let detail = if self.detail.is_empty() {
            String::new()
        } else {
            format!("({})", self.detail)
        };
        match self.children.as_slice() {
            [] => write!(f, "{}_tbl", self.detail),
            [child] => write!(f, "{}.{}{}", child, self.kind.label(), detail),
            [left, right, ..] => write!(f, "[{} {}{} {}]", left, self.kind.label(), detail, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_join_chain() {
        let student = ExecutionChain::table("student", 3);
        let dept = ExecutionChain::table("dept", 1);
        let join = ExecutionChain::binary(PlanKind::GraceHashJoin, student, dept, "majorid=did", 12);
        let select = ExecutionChain::unary(PlanKind::Select, join, "gradyear=2020", 12);
        let project = ExecutionChain::unary(PlanKind::Project, select, "sname, dname", 12);

        assert_eq!(
            project.to_string(),
            "[student_tbl GRACEHASHJOIN(majorid=did) dept_tbl].SELECT(gradyear=2020).PROJECT(sname, dname)"
        );
        assert_eq!(project.cost(), 12);
        assert!(project.contains(PlanKind::GraceHashJoin));
        assert!(!project.contains(PlanKind::MergeJoin));
    }

    #[test]
    fn should_display_product_without_detail() {
        let product = ExecutionChain::binary(
            PlanKind::MultibufferProduct,
            ExecutionChain::table("a", 1),
            ExecutionChain::table("b", 1),
            "",
            2,
        );
        assert_eq!(product.to_string(), "[a_tbl MULTIBUFFERPRODUCT b_tbl]");
    }
}

//! Parsed form of a JSONPath query.

use std::fmt;

use serde_json::Value;

/// A parsed JSONPath query: the root `$` followed by zero or more steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Steps applied left to right, starting from the document root.
    pub steps: Vec<Step>,
}

impl Path {
    /// Creates a path from its steps.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// `true` for the bare root query `$`.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// `true` when the path can select at most one value.
    ///
    /// Only member names and single indexes are definite; wildcards, slices,
    /// descendants and filters may select many values.
    pub fn is_definite(&self) -> bool {
        self.steps
            .iter()
            .all(|step| matches!(step, Step::Member(_) | Step::Index(_)))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        self.steps.iter().try_for_each(|step| write!(f, "{step}"))
    }
}

/// One selection step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name` or `['name']`
    Member(String),
    /// `[3]`, `[-1]`
    Index(i64),
    /// `[start:end:step]`, every part optional
    Slice {
        /// First index (inclusive).
        start: Option<i64>,
        /// Last index (exclusive).
        end: Option<i64>,
        /// Stride, defaults to 1.
        step: Option<i64>,
    },
    /// `.*` or `[*]`
    Wildcard,
    /// `..name`
    DescendantMember(String),
    /// `..*`
    DescendantAll,
    /// `[?expr]`
    Filter(Expr),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Member(name) => write!(f, "['{name}']"),
            Step::Index(index) => write!(f, "[{index}]"),
            Step::Slice { start, end, step } => {
                f.write_str("[")?;
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(end) = end {
                    write!(f, "{end}")?;
                }
                if let Some(step) = step {
                    write!(f, ":{step}")?;
                }
                f.write_str("]")
            }
            Step::Wildcard => f.write_str("[*]"),
            Step::DescendantMember(name) => write!(f, "..['{name}']"),
            Step::DescendantAll => f.write_str("..*"),
            Step::Filter(expr) => write!(f, "[?{expr}]"),
        }
    }
}

/// Boolean expression inside a filter step, evaluated per candidate element.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `lhs op rhs`
    Compare {
        /// Left operand.
        lhs: Operand,
        /// Comparison operator.
        op: CompareOp,
        /// Right operand.
        rhs: Operand,
    },
    /// `a && b`
    And(Box<Expr>, Box<Expr>),
    /// `a || b`
    Or(Box<Expr>, Box<Expr>),
    /// `!a`
    Not(Box<Expr>),
    /// `@.field`, true when the field exists
    Exists(RelativePath),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Expr::And(a, b) => write!(f, "({a} && {b})"),
            Expr::Or(a, b) => write!(f, "({a} || {b})"),
            Expr::Not(inner) => write!(f, "!{inner}"),
            Expr::Exists(path) => write!(f, "{path}"),
        }
    }
}

/// Operand of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A path relative to the current element.
    Current(RelativePath),
    /// A JSON literal: string, number, boolean or null.
    Literal(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Current(path) => write!(f, "{path}"),
            Operand::Literal(value) => write!(f, "{value}"),
        }
    }
}

/// Member names below the current element `@`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelativePath {
    /// Member names, outermost first.
    pub members: Vec<String>,
}

impl RelativePath {
    /// Follows the members from `current`.
    pub fn resolve<'a>(&self, current: &'a Value) -> Option<&'a Value> {
        self.members
            .iter()
            .try_fold(current, |value, member| value.as_object()?.get(member))
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("@")?;
        self.members
            .iter()
            .try_for_each(|member| write!(f, ".{member}"))
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    pub(crate) const ALL: [(&'static str, CompareOp); 6] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ];

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

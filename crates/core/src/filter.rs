//! The backend-independent filter AST.

use crate::error::FilterError;
use crate::validate::validate;
use crate::value::FilterValue;

/// Filter operator.
///
/// This is a closed set: every backend translator dispatches over it with an
/// exhaustive `match`, so adding an operator fails to compile until each
/// target has decided how to represent (or reject) it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Like,
    Contains,
    And,
    Or,
    Not,
}

impl FilterOp {
    /// Lowercase operator name for error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Like => "like",
            Self::Contains => "contains",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }

    /// Whether this operator combines sub-filters rather than testing a field.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Not)
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One node of a metadata-filter tree.
///
/// Leaves carry an operator, a field name, and a value; `And`/`Or`/`Not`
/// carry children only. Trees are immutable once built; translators only
/// read them, and every translation of the same tree yields the same output.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    op: FilterOp,
    field: Option<String>,
    value: Option<FilterValue>,
    children: Vec<Filter>,
}

impl Filter {
    /// General node constructor for callers that assemble trees dynamically,
    /// e.g. from a deserialized query description. The fluent constructors
    /// below are preferred; trees built here still go through [`Filter::err`]
    /// before translation.
    #[must_use]
    pub const fn new(
        op: FilterOp,
        field: Option<String>,
        value: Option<FilterValue>,
        children: Vec<Self>,
    ) -> Self {
        Self { op, field, value, children }
    }

    fn leaf(op: FilterOp, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self { op, field: Some(field.into()), value: Some(value.into()), children: Vec::new() }
    }

    fn logical(op: FilterOp, children: Vec<Self>) -> Self {
        Self { op, field: None, value: None, children }
    }

    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(FilterOp::Eq, field, value)
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(FilterOp::Ne, field, value)
    }

    /// `field > value` (numeric)
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(FilterOp::Gt, field, value)
    }

    /// `field >= value` (numeric)
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(FilterOp::Gte, field, value)
    }

    /// `field < value` (numeric)
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(FilterOp::Lt, field, value)
    }

    /// `field <= value` (numeric)
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(FilterOp::Lte, field, value)
    }

    /// `field LIKE pattern`
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::leaf(FilterOp::Like, field, pattern.into())
    }

    /// Array field contains `value`.
    pub fn contains(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(FilterOp::Contains, field, value)
    }

    /// `field` is one of `values`.
    pub fn is_in<V: Into<FilterValue>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::leaf(FilterOp::In, field, FilterValue::from(values))
    }

    /// `field` is none of `values`.
    pub fn not_in<V: Into<FilterValue>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::leaf(FilterOp::Nin, field, FilterValue::from(values))
    }

    /// All of `children` hold.
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::logical(FilterOp::And, children)
    }

    /// At least one of `children` holds.
    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        Self::logical(FilterOp::Or, children)
    }

    /// `child` does not hold.
    #[must_use]
    pub fn not(child: Self) -> Self {
        Self::logical(FilterOp::Not, vec![child])
    }

    #[must_use]
    pub const fn op(&self) -> FilterOp {
        self.op
    }

    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    #[must_use]
    pub const fn value(&self) -> Option<&FilterValue> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// First structural problem found in this tree, if any.
    ///
    /// Providers call this before translating; translation must not proceed
    /// past a failed validation.
    ///
    /// # Errors
    /// `FilterError::InvalidQuery` describing the first violation.
    pub fn err(&self) -> Result<(), FilterError> {
        validate(self)
    }
}

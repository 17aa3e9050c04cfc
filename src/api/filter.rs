//! Filter types and query-string generation for the REST API.
//!
//! The content service speaks a PostgREST-style API: simple predicates are
//! query parameters (`status=eq.published`), and logical combinations use
//! the `or=(...)`/`and=(...)` parameter forms.

/// A filter condition for querying rows.
///
/// Filters can be combined using `And`/`Or` to build compound conditions.
///
/// # Example
///
/// ```
/// use inshad_lib::api::Filter;
///
/// // Simple equality filter
/// let filter = Filter::eq("status", "published");
///
/// // Combined search predicate
/// let filter = Filter::or([
///     Filter::ilike("title", "*dawn*"),
///     Filter::ilike("poet", "*dawn*"),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Equality: `field=eq.value`
    Eq(String, String),
    /// Not equal: `field=neq.value`
    Neq(String, String),
    /// Greater than: `field=gt.value`
    Gt(String, String),
    /// Greater than or equal: `field=gte.value`
    Gte(String, String),
    /// Less than: `field=lt.value`
    Lt(String, String),
    /// Less than or equal: `field=lte.value`
    Lte(String, String),
    /// Case-insensitive pattern match: `field=ilike.pattern` (`*` wildcard)
    Ilike(String, String),
    /// Membership: `field=in.(a,b,c)`
    In(String, Vec<String>),
    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
}

impl Filter {
    /// Creates an equality filter: `field=eq.value`.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// Creates a not-equal filter: `field=neq.value`.
    pub fn neq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Neq(field.into(), value.into())
    }

    /// Creates a greater-than filter: `field=gt.value`.
    pub fn gt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    /// Creates a greater-than-or-equal filter: `field=gte.value`.
    pub fn gte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Gte(field.into(), value.into())
    }

    /// Creates a less-than filter: `field=lt.value`.
    pub fn lt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    /// Creates a less-than-or-equal filter: `field=lte.value`.
    pub fn lte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Lte(field.into(), value.into())
    }

    /// Creates a case-insensitive pattern filter: `field=ilike.pattern`.
    ///
    /// The pattern uses `*` as the wildcard.
    pub fn ilike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Ilike(field.into(), pattern.into())
    }

    /// Creates a membership filter: `field=in.(a,b,c)`.
    pub fn is_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Combines filters with logical AND.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Combines filters with logical OR.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Renders this filter as request query pairs.
    ///
    /// Simple predicates and top-level ANDs become one pair per predicate
    /// (the service ANDs parameters together); an OR becomes a single
    /// `or=(...)` pair.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        match self {
            Filter::And(filters) => filters.iter().flat_map(Filter::to_query_pairs).collect(),
            Filter::Or(filters) => vec![("or".to_string(), render_group(filters))],
            Filter::Eq(f, v) => vec![(f.clone(), format!("eq.{}", v))],
            Filter::Neq(f, v) => vec![(f.clone(), format!("neq.{}", v))],
            Filter::Gt(f, v) => vec![(f.clone(), format!("gt.{}", v))],
            Filter::Gte(f, v) => vec![(f.clone(), format!("gte.{}", v))],
            Filter::Lt(f, v) => vec![(f.clone(), format!("lt.{}", v))],
            Filter::Lte(f, v) => vec![(f.clone(), format!("lte.{}", v))],
            Filter::Ilike(f, p) => vec![(f.clone(), format!("ilike.{}", p))],
            Filter::In(f, values) => vec![(f.clone(), format!("in.({})", values.join(",")))],
        }
    }
}

/// Renders a filter in operand position, i.e. nested inside `or=`/`and=`.
fn render_operand(filter: &Filter) -> String {
    match filter {
        Filter::Eq(f, v) => format!("{}.eq.{}", f, v),
        Filter::Neq(f, v) => format!("{}.neq.{}", f, v),
        Filter::Gt(f, v) => format!("{}.gt.{}", f, v),
        Filter::Gte(f, v) => format!("{}.gte.{}", f, v),
        Filter::Lt(f, v) => format!("{}.lt.{}", f, v),
        Filter::Lte(f, v) => format!("{}.lte.{}", f, v),
        Filter::Ilike(f, p) => format!("{}.ilike.{}", f, p),
        Filter::In(f, values) => format!("{}.in.({})", f, values.join(",")),
        Filter::And(filters) => format!("and{}", render_group(filters)),
        Filter::Or(filters) => format!("or{}", render_group(filters)),
    }
}

fn render_group(filters: &[Filter]) -> String {
    let parts: Vec<String> = filters.iter().map(render_operand).collect();
    format!("({})", parts.join(","))
}

//! Sort order for listing endpoints.

/// Sort direction applied to `posting_date` on listing queries.
///
/// Anything other than `asc`/`desc` falls back to the default (descending)
/// rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Parse from a query parameter, returning the default if invalid.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Self::Ascending,
            "desc" | "descending" => Self::Descending,
            _ => Self::Descending,
        }
    }

    /// Parse from an optional query parameter.
    pub fn from_param(param: Option<&str>) -> Self {
        param.map(Self::from_str_or_default).unwrap_or_default()
    }
}

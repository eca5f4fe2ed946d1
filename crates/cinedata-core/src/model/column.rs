use serde::{Deserialize, Serialize};
use std::fmt;

/// The storage class inferred for a loaded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// Classify a single non-null value.
    #[must_use]
    pub fn of_value(value: &str) -> Self {
        if value.parse::<i64>().is_ok() {
            Self::Integer
        } else if value.parse::<f64>().is_ok_and(f64::is_finite) {
            Self::Real
        } else {
            Self::Text
        }
    }

    /// Widen `self` so it can also hold values of `other`.
    #[must_use]
    pub const fn widen(self, other: Self) -> Self {
        match (self, other) {
            (Self::Text, _) | (_, Self::Text) => Self::Text,
            (Self::Real, _) | (_, Self::Real) => Self::Real,
            (Self::Integer, Self::Integer) => Self::Integer,
        }
    }

    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// A named column with the type inferred from its values.
///
/// Columns start out untyped; [`ColumnDef::observe`] widens the type as
/// non-null values are seen. A column that never sees a value stores TEXT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    observed: Option<ColumnType>,
}

impl ColumnDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observed: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.observed = Some(column_type);
        self
    }

    /// Account for one value of this column.
    pub fn observe(&mut self, value: Option<&str>) {
        let Some(value) = value else { return };
        // Once TEXT, nothing can widen further.
        if self.observed == Some(ColumnType::Text) {
            return;
        }
        let seen = ColumnType::of_value(value);
        self.observed = Some(self.observed.map_or(seen, |t| t.widen(seen)));
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.observed.unwrap_or(ColumnType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[Option<&str>]) -> ColumnType {
        let mut column = ColumnDef::new("c");
        for value in values {
            column.observe(*value);
        }
        column.column_type()
    }

    #[test]
    fn test_of_value() {
        assert_eq!(ColumnType::of_value("1994"), ColumnType::Integer);
        assert_eq!(ColumnType::of_value("-3"), ColumnType::Integer);
        assert_eq!(ColumnType::of_value("7.5"), ColumnType::Real);
        assert_eq!(ColumnType::of_value("tt0000001"), ColumnType::Text);
        assert_eq!(ColumnType::of_value("inf"), ColumnType::Text);
        assert_eq!(ColumnType::of_value("NaN"), ColumnType::Text);
    }

    #[test]
    fn test_integer_column_with_nulls() {
        assert_eq!(infer(&[Some("2000"), None, Some("2001")]), ColumnType::Integer);
    }

    #[test]
    fn test_integer_widens_to_real() {
        assert_eq!(infer(&[Some("5"), Some("6.1")]), ColumnType::Real);
    }

    #[test]
    fn test_any_text_makes_text() {
        assert_eq!(infer(&[Some("5"), Some("Drama"), Some("6.1")]), ColumnType::Text);
    }

    #[test]
    fn test_all_null_column_is_text() {
        assert_eq!(infer(&[None, None]), ColumnType::Text);
        assert_eq!(infer(&[]), ColumnType::Text);
    }
}

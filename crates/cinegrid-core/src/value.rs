//! Typed values carried by controls and grid cells.
//!
//! A [`Value`] is one of six kinds. Grid cells remember the kind of the value
//! they hold so that text typed into the cell can be read back as the same
//! kind later on.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Date format used for display and parsing.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-time format used for display and parsing.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Date,
    DateTime,
    Float,
    Int,
    Str,
}

impl ValueKind {
    /// Lower-case name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Float => "float",
            Self::Int => "int",
            Self::Str => "str",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed control or cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Float(f64),
    Int(i64),
    Str(String),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Date(_) => ValueKind::Date,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::Str(_) => ValueKind::Str,
        }
    }

    /// The text a native control displays for this value.
    pub fn display_text(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Date(v) => v.format(DATE_FORMAT).to_string(),
            Self::DateTime(v) => v.format(DATETIME_FORMAT).to_string(),
            Self::Float(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Str(v) => v.clone(),
        }
    }

    /// Parse display text back into a value of the given kind.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self> {
        let err = || Error::ValueParse {
            text: text.to_string(),
            kind,
        };
        let trimmed = text.trim();

        match kind {
            ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(Self::Bool(true)),
                "false" | "0" | "no" | "n" => Ok(Self::Bool(false)),
                _ => Err(err()),
            },
            ValueKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(Self::Date)
                .map_err(|_| err()),
            ValueKind::DateTime => NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
                .map(Self::DateTime)
                .map_err(|_| err()),
            ValueKind::Float => trimmed.parse().map(Self::Float).map_err(|_| err()),
            ValueKind::Int => trimmed.parse().map(Self::Int).map_err(|_| err()),
            ValueKind::Str => Ok(Self::Str(text.to_string())),
        }
    }

    /// Returns the string slice for `Str` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean for `Bool` values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer for `Int` values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float for `Float` values, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

/// Opaque data a client attaches to a cell or combo item.
///
/// Cloning shares the payload.
#[derive(Clone, Default)]
pub struct UserData(Option<Arc<dyn Any + Send + Sync>>);

impl UserData {
    /// Wrap a payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// No payload.
    pub fn none() -> Self {
        Self(None)
    }

    /// Whether a payload is attached.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the payload as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("UserData(..)"),
            None => f.write_str("UserData(None)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_variant() {
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::from(3).kind(), ValueKind::Int);
        assert_eq!(Value::from(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::from("a").kind(), ValueKind::Str);

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::from(date).kind(), ValueKind::Date);
        let dt = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(Value::from(dt).kind(), ValueKind::DateTime);
    }

    #[test]
    fn test_parse_as_existing_kind() {
        assert_eq!(Value::parse(ValueKind::Int, " 42 ").unwrap(), Value::Int(42));
        assert_eq!(Value::parse(ValueKind::Bool, "Yes").unwrap(), Value::Bool(true));
        assert_eq!(
            Value::parse(ValueKind::Date, "2023-12-01").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap())
        );
        assert_eq!(
            Value::parse(ValueKind::Str, " keep spaces ").unwrap(),
            Value::Str(" keep spaces ".to_string())
        );
    }

    #[test]
    fn test_parse_failure_reports_kind() {
        match Value::parse(ValueKind::Int, "twelve") {
            Err(Error::ValueParse { text, kind }) => {
                assert_eq!(text, "twelve");
                assert_eq!(kind, ValueKind::Int);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_display_text_parses_back() {
        let dt = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let value = Value::from(dt);
        assert_eq!(value.display_text(), "2020-01-02 03:04:05");
        assert_eq!(
            Value::parse(ValueKind::DateTime, &value.display_text()).unwrap(),
            value
        );
    }

    #[test]
    fn test_user_data_downcast() {
        let data = UserData::new(String::from("/videos/clip.mp4"));
        assert_eq!(
            data.downcast_ref::<String>().map(String::as_str),
            Some("/videos/clip.mp4")
        );
        assert!(data.downcast_ref::<i32>().is_none());
        assert!(UserData::none().is_none());
    }
}

//! Cell values exchanged between models, column adapters and views.
//!
//! [`CellValue`] is the value that flows through `value_at`/`set_value_at` and
//! that the change journal remembers as an original. [`ValueKind`] describes
//! what a column holds so setters can reject mismatched input up front.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The kind of value a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    /// Any kind is accepted; no checking is done.
    #[default]
    Any,
    /// Boolean values.
    Bool,
    /// Integer values.
    Int,
    /// Floating point values. Integers are accepted and widened.
    Float,
    /// String values.
    String,
    /// Application-defined values carried in [`CellValue::Custom`].
    Custom,
}

impl ValueKind {
    /// A short, human-readable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Any => "any",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Custom => "custom",
        }
    }

    /// Returns `true` if a value of this kind may be stored in a column of `self`.
    ///
    /// [`CellValue::None`] is accepted by every column; clearing a cell is
    /// always a legal edit as far as typing is concerned.
    pub fn accepts(&self, value: &CellValue) -> bool {
        match (self, value.kind()) {
            (ValueKind::Any, _) | (_, None) => true,
            (ValueKind::Float, Some(ValueKind::Int)) => true,
            (expected, Some(found)) => *expected == found,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value.
///
/// Custom values are shared, and two custom values are equal only when they
/// are the same allocation. Everything else compares structurally.
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::CellValue;
///
/// let value = CellValue::from("Hello");
/// assert_eq!(value.as_string(), Some("Hello"));
///
/// let value = CellValue::new(42u32);
/// assert_eq!(value.downcast::<u32>(), Some(&42));
/// ```
#[derive(Clone, Default)]
pub enum CellValue {
    /// No value.
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Application-defined value (type-erased).
    Custom(Rc<dyn Any>),
}

impl CellValue {
    /// Creates a new custom value from any type.
    pub fn new<T: Any>(value: T) -> Self {
        CellValue::Custom(Rc::new(value))
    }

    /// Returns `true` if this is `CellValue::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, CellValue::None)
    }

    /// Returns `true` if this contains some value.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// The kind of this value, or `None` for [`CellValue::None`].
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            CellValue::None => None,
            CellValue::Bool(_) => Some(ValueKind::Bool),
            CellValue::Int(_) => Some(ValueKind::Int),
            CellValue::Float(_) => Some(ValueKind::Float),
            CellValue::String(_) => Some(ValueKind::String),
            CellValue::Custom(_) => Some(ValueKind::Custom),
        }
    }

    /// Name of this value's kind, `"none"` for [`CellValue::None`].
    pub fn kind_name(&self) -> &'static str {
        self.kind().map_or("none", |kind| kind.name())
    }

    /// Attempts to get the value as a string slice.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an owned string.
    pub fn into_string(self) -> Option<String> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(n) => Some(*n),
            CellValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to downcast a custom value to the specified type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            CellValue::Custom(data) => data.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::None, CellValue::None) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => a == b,
            (CellValue::String(a), CellValue::String(b)) => a == b,
            (CellValue::Custom(a), CellValue::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::None => f.write_str("None"),
            CellValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            CellValue::Int(n) => f.debug_tuple("Int").field(n).finish(),
            CellValue::Float(n) => f.debug_tuple("Float").field(n).finish(),
            CellValue::String(s) => f.debug_tuple("String").field(s).finish(),
            CellValue::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::None => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
            CellValue::Custom(_) => f.write_str("<custom>"),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::String(s.clone())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::None,
        }
    }
}

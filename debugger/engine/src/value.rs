use crate::environment::Environment;
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use scriptdbg_syntax::ast::Function;
use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::{Arc, PoisonError, RwLock},
};

pub type Array = Arc<RwLock<Vec<Value>>>;
pub type Object = Arc<RwLock<LinkedHashMap<String, Value>>>;

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Array),
    Object(Object),
    Function(Arc<Closure>),
}

pub struct Closure {
    pub name: String,
    pub function: Arc<Function>,
    pub environment: Arc<Environment>,
    /// Arrow functions capture `this` when they are created.
    pub captured_this: Option<Value>,
}
impl Debug for Closure {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        // The environment may contain this closure.
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("is_arrow", &self.captured_this.is_some())
            .finish_non_exhaustive()
    }
}

impl Value {
    #[must_use]
    pub fn array(items: Vec<Self>) -> Self {
        Self::Array(Arc::new(RwLock::new(items)))
    }
    #[must_use]
    pub fn object(properties: LinkedHashMap<String, Self>) -> Self {
        Self::Object(Arc::new(RwLock::new(properties)))
    }

    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(value) => Some(Self::Bool(*value)),
            serde_json::Value::Number(number) => number.as_f64().map(Self::Number),
            serde_json::Value::String(string) => Some(Self::String(string.clone())),
            // Regular expression and bigint literals
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(number) => *number != 0.0 && !number.is_nan(),
            Self::String(string) => !string.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }
    #[must_use]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    #[must_use]
    pub const fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(value) => f64::from(u8::from(*value)),
            Self::Number(number) => *number,
            Self::String(string) => {
                let trimmed = string.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Array(_) | Self::Object(_) | Self::Function(_) => f64::NAN,
        }
    }

    /// The string conversion scripts observe, e.g., when concatenating.
    #[must_use]
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(number) => format_number(*number),
            Self::String(string) => string.clone(),
            Self::Array(items) => read(items)
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .join(","),
            Self::Object(_) => "[object Object]".to_string(),
            Self::Function(closure) => format!("function {}() {{ [code] }}", closure.name),
        }
    }

    /// How the debugger shows a value to the operator.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_nested(2)
    }
    fn render_nested(&self, depth: usize) -> String {
        match self {
            Self::String(string) => {
                serde_json::to_string(string).unwrap_or_else(|_| format!("{string:?}"))
            }
            Self::Array(_) | Self::Object(_) if depth == 0 => match self {
                Self::Array(_) => "[…]".to_string(),
                _ => "{…}".to_string(),
            },
            Self::Array(items) => format!(
                "[{}]",
                read(items)
                    .iter()
                    .map(|item| item.render_nested(depth - 1))
                    .join(", "),
            ),
            Self::Object(properties) => {
                let properties = read(properties);
                if properties.is_empty() {
                    return "{}".to_string();
                }
                format!(
                    "{{ {} }}",
                    properties
                        .iter()
                        .map(|(key, value)| format!("{key}: {}", value.render_nested(depth - 1)))
                        .join(", "),
                )
            }
            Self::Function(closure) => {
                let parameters = closure.function.params.iter().map(|it| &it.name).join(", ");
                if closure.captured_this.is_some() {
                    format!("({parameters}) => …")
                } else {
                    format!("function {}({parameters})", closure.name)
                }
            }
            _ => self.to_js_string(),
        }
    }

    /// The own properties of an object, in insertion order.
    #[must_use]
    pub fn properties(&self) -> Option<Vec<(String, Self)>> {
        match self {
            Self::Object(properties) => Some(
                read(properties)
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    #[must_use]
    pub fn strict_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
    #[must_use]
    pub fn loose_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            #[allow(clippy::float_cmp)]
            (Self::Number(_) | Self::String(_) | Self::Bool(_), Self::Number(_) | Self::Bool(_))
            | (Self::Number(_) | Self::Bool(_), Self::String(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self.strict_equals(other),
        }
    }
}
impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[must_use]
pub fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_infinite() {
        let sign = if number < 0.0 { "-" } else { "" };
        format!("{sign}Infinity")
    } else if number == 0.0 {
        "0".to_string()
    } else {
        number.to_string()
    }
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}
pub(crate) fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_format_like_scripts_expect() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn rendering() {
        let mut properties = LinkedHashMap::new();
        properties.insert("name".to_string(), Value::from("Ada"));
        properties.insert(
            "scores".to_string(),
            Value::array(vec![Value::from(1.0), Value::Null]),
        );
        let object = Value::object(properties);
        assert_eq!(object.render(), r#"{ name: "Ada", scores: [1, null] }"#);
        assert_eq!(object.to_js_string(), "[object Object]");
        assert_eq!(Value::array(vec![]).render(), "[]");

        let nested = Value::array(vec![Value::array(vec![Value::array(vec![])])]);
        assert_eq!(nested.render(), "[[[…]]]");
    }

    #[test]
    fn equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(Value::from("1").loose_equals(&Value::from(1.0)));
        assert!(!Value::from("1").strict_equals(&Value::from(1.0)));
        assert!(Value::from(true).loose_equals(&Value::from(1.0)));
        let array = Value::array(vec![]);
        assert!(array.strict_equals(&array.clone()));
        assert!(!array.strict_equals(&Value::array(vec![])));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from(0.0).is_truthy());
        assert!(!Value::from(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }
}

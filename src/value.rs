use core::fmt::{self, Display, Formatter};

/// A loosely typed configuration value, as assigned to node properties or passed to node methods.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	Text(String),
	List(Vec<Value>),
	/// Ordered key/value pairs.
	Map(Vec<(String, Value)>),
}

impl Value {
	/// Truthiness in the DOM's sense.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(value) => *value,
			Value::Number(value) => *value != 0.0 && !value.is_nan(),
			Value::Text(value) => !value.is_empty(),
			Value::List(_) | Value::Map(_) => true,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Looks up `key` in a [`Value::Map`].
	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		match self {
			Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
			_ => None,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::Bool(value) => write!(f, "{}", value),
			Value::Number(value) => write!(f, "{}", value),
			Value::Text(value) => f.write_str(value),
			Value::List(values) => {
				for (i, value) in values.iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					write!(f, "{}", value)?;
				}
				Ok(())
			}
			Value::Map(_) => f.write_str("[object Object]"),
		}
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Text(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Text(value)
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Number(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Number(value.into())
	}
}

impl From<Vec<Value>> for Value {
	fn from(values: Vec<Value>) -> Self {
		Value::List(values)
	}
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Value {
	fn from(entries: [(K, V); N]) -> Self {
		Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

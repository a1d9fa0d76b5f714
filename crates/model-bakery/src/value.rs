//! Attribute values and constructed instances.
//!
//! [`Value`] is the dynamic representation of one attribute value. It covers
//! every builtin [`Kind`](crate::schema::Kind) plus related instances, so the
//! engine can pass generated and caller-supplied values through a single type.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::schema::ModelId;

/// In-memory file content produced for file and image attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
	/// File name.
	pub name: String,
	/// Raw bytes.
	pub content: Vec<u8>,
}

impl FileContent {
	/// Creates file content.
	pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
		Self {
			name: name.into(),
			content: content.into(),
		}
	}
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Absent / SQL NULL.
	Null,
	/// Boolean.
	Bool(bool),
	/// Signed integer.
	Int(i64),
	/// Floating point number.
	Float(f64),
	/// Fixed point number.
	Decimal(Decimal),
	/// Text.
	Text(String),
	/// Raw bytes.
	Bytes(Vec<u8>),
	/// Calendar date.
	Date(NaiveDate),
	/// Timestamp in UTC.
	DateTime(DateTime<Utc>),
	/// Time of day.
	Time(NaiveTime),
	/// Interval.
	Duration(TimeDelta),
	/// UUID.
	Uuid(Uuid),
	/// Structured JSON document.
	Json(serde_json::Value),
	/// File content.
	File(FileContent),
	/// Ordered list of values (arrays and many-valued relations).
	List(Vec<Value>),
	/// A related instance.
	Instance(Box<Instance>),
}

impl Value {
	/// Returns true for [`Value::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Returns the text content, if this is a text value.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the integer content, if this is an integer value.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	/// Returns the numeric content as a float for integer and float values.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Float(f) => Some(*f),
			Value::Int(i) => Some(*i as f64),
			_ => None,
		}
	}

	/// Returns the boolean content, if this is a boolean value.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Returns the related instance, if this is an instance value.
	pub fn as_instance(&self) -> Option<&Instance> {
		match self {
			Value::Instance(instance) => Some(instance),
			_ => None,
		}
	}

	/// Returns the list content, if this is a list value.
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	/// Short name of the variant, used in error messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Decimal(_) => "decimal",
			Value::Text(_) => "text",
			Value::Bytes(_) => "bytes",
			Value::Date(_) => "date",
			Value::DateTime(_) => "datetime",
			Value::Time(_) => "time",
			Value::Duration(_) => "duration",
			Value::Uuid(_) => "uuid",
			Value::Json(_) => "json",
			Value::File(_) => "file",
			Value::List(_) => "list",
			Value::Instance(_) => "instance",
		}
	}

	/// Converts a list of instance values into instances.
	///
	/// Returns `None` when this is not a list or an item is not an instance.
	pub fn into_instances(self) -> Option<Vec<Instance>> {
		match self {
			Value::List(items) => items
				.into_iter()
				.map(|item| match item {
					Value::Instance(instance) => Some(*instance),
					_ => None,
				})
				.collect(),
			_ => None,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "null"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Int(i) => write!(f, "{i}"),
			Value::Float(x) => write!(f, "{x}"),
			Value::Decimal(d) => write!(f, "{d}"),
			Value::Text(s) => write!(f, "{s}"),
			Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
			Value::Date(d) => write!(f, "{d}"),
			Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
			Value::Time(t) => write!(f, "{t}"),
			Value::Duration(d) => write!(f, "{}ms", d.num_milliseconds()),
			Value::Uuid(u) => write!(f, "{u}"),
			Value::Json(j) => write!(f, "{j}"),
			Value::File(file) => write!(f, "{}", file.name),
			Value::List(items) => write!(f, "<list of {}>", items.len()),
			Value::Instance(instance) => write!(f, "{instance}"),
		}
	}
}

macro_rules! impl_from_value {
	($($ty:ty => $variant:ident),* $(,)?) => {
		$(
			impl From<$ty> for Value {
				fn from(value: $ty) -> Self {
					Value::$variant(value.into())
				}
			}
		)*
	};
}

impl_from_value! {
	bool => Bool,
	i64 => Int,
	i32 => Int,
	i16 => Int,
	u32 => Int,
	f64 => Float,
	f32 => Float,
	Decimal => Decimal,
	String => Text,
	&str => Text,
	Vec<u8> => Bytes,
	NaiveDate => Date,
	DateTime<Utc> => DateTime,
	NaiveTime => Time,
	TimeDelta => Duration,
	Uuid => Uuid,
	serde_json::Value => Json,
	FileContent => File,
	Vec<Value> => List,
}

impl From<Instance> for Value {
	fn from(instance: Instance) -> Self {
		Value::Instance(Box::new(instance))
	}
}

impl From<Vec<Instance>> for Value {
	fn from(instances: Vec<Instance>) -> Self {
		Value::List(instances.into_iter().map(Value::from).collect())
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// A constructed value of a model.
///
/// An instance is a mapping from attribute name to value plus, once
/// persisted, an identity token assigned by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
	model: ModelId,
	pk: Option<Value>,
	values: IndexMap<String, Value>,
}

impl Instance {
	/// Creates an unpersisted instance.
	pub fn new(model: ModelId, values: IndexMap<String, Value>) -> Self {
		Self {
			model,
			pk: None,
			values,
		}
	}

	/// Sets the identity token.
	pub fn with_pk(mut self, pk: impl Into<Value>) -> Self {
		self.pk = Some(pk.into());
		self
	}

	/// Model this instance belongs to.
	pub fn model(&self) -> &ModelId {
		&self.model
	}

	/// Identity token, present once persisted.
	pub fn pk(&self) -> Option<&Value> {
		self.pk.as_ref()
	}

	/// Returns true when the repository assigned an identity token.
	pub fn is_persisted(&self) -> bool {
		self.pk.is_some()
	}

	/// Returns the value of an attribute.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}

	/// Returns a text attribute.
	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	/// Returns a related instance stored under `name`.
	pub fn related(&self, name: &str) -> Option<&Instance> {
		self.get(name).and_then(Value::as_instance)
	}

	/// Sets an attribute value.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
		self.values.insert(name.into(), value.into());
	}

	/// All attribute values in assignment order.
	pub fn values(&self) -> &IndexMap<String, Value> {
		&self.values
	}

	/// Consumes the instance and returns its attribute values.
	pub fn into_values(self) -> IndexMap<String, Value> {
		self.values
	}
}

impl fmt::Display for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.pk {
			Some(pk) => write!(f, "{} object ({pk})", self.model),
			None => write!(f, "{} object (unsaved)", self.model),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Value::from("text"), "text")]
	#[case(Value::from(10), "int")]
	#[case(Value::from(1.5), "float")]
	#[case(Value::from(None::<i64>), "null")]
	#[case(Value::from(vec![Value::Int(1)]), "list")]
	fn test_value_conversions(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(value.type_name(), expected);
	}

	#[rstest]
	fn test_into_instances_rejects_scalars() {
		let model = ModelId::new("generic", "Dog");
		let list = Value::List(vec![
			Value::from(Instance::new(model, IndexMap::new())),
			Value::Int(3),
		]);
		assert!(list.into_instances().is_none());
	}

	#[rstest]
	fn test_instance_persistence_state() {
		let model = ModelId::new("generic", "Person");
		let mut instance = Instance::new(model, IndexMap::new());
		instance.set("name", "Mike");
		assert!(!instance.is_persisted());
		assert_eq!(instance.to_string(), "generic.Person object (unsaved)");

		let saved = instance.with_pk(1);
		assert!(saved.is_persisted());
		assert_eq!(saved.get_str("name"), Some("Mike"));
		assert_eq!(saved.to_string(), "generic.Person object (1)");
	}
}

//! Attribute overrides passed to `make`/`prepare`.
//!
//! Keys containing [`LOOKUP_SEP`] are relation-path overrides
//! (`owner__name`) scoped to the relation named by their leading segment.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{BakeryError, BakeryResult};
use crate::stepper::Stepper;
use crate::value::{FileContent, Instance, Value};

/// Separator of relation-path override keys.
pub const LOOKUP_SEP: &str = "__";

/// Zero-argument callable evaluated once per constructed instance.
pub type LazyValue = Arc<dyn Fn() -> Value + Send + Sync>;

/// One override value.
#[derive(Clone)]
pub enum AttrValue {
	/// Literal value, used as-is.
	Value(Value),
	/// Callable invoked for every constructed instance.
	Lazy(LazyValue),
	/// Stepper advanced once per constructed instance.
	Stepper(Stepper),
}

impl AttrValue {
	/// Wraps a callable.
	pub fn lazy<F>(f: F) -> Self
	where
		F: Fn() -> Value + Send + Sync + 'static,
	{
		AttrValue::Lazy(Arc::new(f))
	}

	/// Produces the concrete value for one instance.
	///
	/// # Errors
	///
	/// Returns [`BakeryError::IteratorExhausted`] when a stepper has no
	/// values left.
	pub fn resolve(&self, attr: &str) -> BakeryResult<Value> {
		match self {
			AttrValue::Value(value) => Ok(value.clone()),
			AttrValue::Lazy(f) => Ok(f()),
			AttrValue::Stepper(stepper) => stepper
				.next_value()
				.ok_or_else(|| BakeryError::IteratorExhausted(attr.to_string())),
		}
	}

	/// Returns the literal value, if this is one.
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			AttrValue::Value(value) => Some(value),
			_ => None,
		}
	}

	/// Returns true for steppers.
	pub fn is_stepper(&self) -> bool {
		matches!(self, AttrValue::Stepper(_))
	}
}

impl fmt::Debug for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
			AttrValue::Lazy(_) => f.write_str("Lazy(..)"),
			AttrValue::Stepper(stepper) => f.debug_tuple("Stepper").field(stepper).finish(),
		}
	}
}

impl From<Stepper> for AttrValue {
	fn from(stepper: Stepper) -> Self {
		AttrValue::Stepper(stepper)
	}
}

macro_rules! impl_from_attr_value {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for AttrValue {
				fn from(value: $ty) -> Self {
					AttrValue::Value(value.into())
				}
			}
		)*
	};
}

impl_from_attr_value!(
	Value,
	bool,
	i64,
	i32,
	i16,
	u32,
	f64,
	f32,
	Decimal,
	String,
	&str,
	Vec<u8>,
	NaiveDate,
	DateTime<Utc>,
	NaiveTime,
	TimeDelta,
	Uuid,
	serde_json::Value,
	FileContent,
	Vec<Value>,
	Instance,
	Vec<Instance>,
);

/// Ordered override mapping.
#[derive(Debug, Clone, Default)]
pub struct Attrs {
	entries: IndexMap<String, AttrValue>,
}

impl Attrs {
	/// Creates an empty mapping.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an override, builder style.
	pub fn set(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.insert(name, value);
		self
	}

	/// Adds an override.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
		self.entries.insert(name.into(), value.into());
	}

	/// Returns an override.
	pub fn get(&self, name: &str) -> Option<&AttrValue> {
		self.entries.get(name)
	}

	/// Removes an override, keeping the order of the rest.
	pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
		self.entries.shift_remove(name)
	}

	/// Returns true when the name is overridden.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	/// Overridden names in order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// Entries in order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Number of overrides.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true when there are no overrides.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Merges `other` over this mapping.
	pub fn merge(&mut self, other: Attrs) {
		self.entries.extend(other.entries);
	}

	/// Splits direct overrides from relation-path overrides.
	pub fn split_related(self) -> (Attrs, Attrs) {
		let (related, direct): (IndexMap<_, _>, IndexMap<_, _>) = self
			.entries
			.into_iter()
			.partition(|(k, _)| k.contains(LOOKUP_SEP));
		(Attrs { entries: direct }, Attrs { entries: related })
	}

	/// Leading relation names of relation-path overrides.
	pub fn related_names(&self) -> IndexSet<String> {
		self.entries
			.keys()
			.filter_map(|k| k.split_once(LOOKUP_SEP).map(|(head, _)| head.to_string()))
			.collect()
	}

	/// Overrides scoped to `relation`, with the `relation__` prefix removed.
	pub fn scoped_to(&self, relation: &str) -> Attrs {
		let prefix = format!("{relation}{LOOKUP_SEP}");
		let entries = self
			.entries
			.iter()
			.filter_map(|(k, v)| {
				k.strip_prefix(&prefix)
					.map(|rest| (rest.to_string(), v.clone()))
			})
			.collect();
		Attrs { entries }
	}

	/// Like [`Attrs::scoped_to`], but removes the scoped overrides from this
	/// mapping.
	pub fn take_scoped(&mut self, relation: &str) -> Attrs {
		let scoped = self.scoped_to(relation);
		let prefix = format!("{relation}{LOOKUP_SEP}");
		self.entries.retain(|k, _| !k.starts_with(&prefix));
		scoped
	}
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attrs {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self {
			entries: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}

impl IntoIterator for Attrs {
	type Item = (String, AttrValue);
	type IntoIter = indexmap::map::IntoIter<String, AttrValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

/// Controls filling of attributes that are skipped by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FillOptional {
	/// Leave optional attributes to the persistence layer.
	#[default]
	None,
	/// Fill every optional attribute.
	All,
	/// Fill the named optional attributes.
	Fields(Vec<String>),
}

impl FillOptional {
	/// Returns true when the named attribute should be filled.
	pub fn includes(&self, name: &str) -> bool {
		match self {
			FillOptional::None => false,
			FillOptional::All => true,
			FillOptional::Fields(fields) => fields.iter().any(|f| f == name),
		}
	}

	/// Names that must exist on the model.
	pub fn named_fields(&self) -> &[String] {
		match self {
			FillOptional::Fields(fields) => fields,
			_ => &[],
		}
	}
}

impl From<bool> for FillOptional {
	fn from(fill: bool) -> Self {
		if fill {
			FillOptional::All
		} else {
			FillOptional::None
		}
	}
}

impl<S: Into<String>> From<Vec<S>> for FillOptional {
	fn from(fields: Vec<S>) -> Self {
		FillOptional::Fields(fields.into_iter().map(Into::into).collect())
	}
}

/// Builds an [`Attrs`] mapping from `name => value` pairs.
///
/// ```
/// use model_bakery::attrs;
///
/// let attrs = attrs! { "name" => "Mike", "age" => 10 };
/// assert_eq!(attrs.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
	() => {
		$crate::attrs::Attrs::new()
	};
	($($name:expr => $value:expr),+ $(,)?) => {{
		let mut attrs = $crate::attrs::Attrs::new();
		$(attrs.insert($name, $value);)+
		attrs
	}};
}

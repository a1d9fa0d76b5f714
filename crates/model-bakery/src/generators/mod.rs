//! Generator registry.
//!
//! A [`Generator`] produces one value for an attribute. Generators are
//! resolved in layers, highest precedence first:
//!
//! 1. per-builder overrides on a [`Baker`](crate::baker::Baker)
//! 2. process-wide overrides registered with [`add`]
//! 3. overrides configured through
//!    [`BakerySettings::custom_fields_gen`](crate::settings::BakerySettings)
//! 4. the builtin default mapping
//!
//! The process-wide table is last-writer-wins and is never torn down
//! automatically. Tests that register overrides remove them again (or use
//! [`snapshot`]/[`restore`]).
//!
//! Generators can also be published under a path in the named catalog
//! ([`register_named`]) so configuration can refer to them by name.

pub mod gis;
pub mod random_gen;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use crate::attrs::{AttrValue, Attrs};
use crate::bakery::{Bakery, MakeOptions, PrepareOptions, single};
use crate::error::{BakeryError, BakeryResult};
use crate::repository::SaveOptions;
use crate::resolver::ModelRef;
use crate::schema::{Field, IpProtocol, Kind, ModelId};
use crate::value::{Instance, Value};

use random_gen::{MAX_INT, MAX_LENGTH};

/// Generator function signature.
pub type GenerateFn = dyn Fn(&mut GeneratorCall<'_>) -> BakeryResult<Value> + Send + Sync;

/// Extracts a `(name, value)` argument binding from a field descriptor.
pub type Extractor = dyn Fn(&Field<'_>) -> (String, Value) + Send + Sync;

/// Keyword argument carrying the target model of relation generators.
pub const MODEL_ARG: &str = "_model";

/// An argument a generator needs before it is invoked.
#[derive(Clone)]
pub enum Requirement {
	/// Read the same-named property off the field descriptor.
	Property(String),
	/// Compute a binding from the field descriptor.
	Extract(Arc<Extractor>),
}

impl fmt::Debug for Requirement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Requirement::Property(name) => f.debug_tuple("Property").field(name).finish(),
			Requirement::Extract(_) => f.write_str("Extract(..)"),
		}
	}
}

/// A value generator with its declared requirements.
#[derive(Clone)]
pub struct Generator {
	run: Arc<GenerateFn>,
	prepare: Option<Arc<GenerateFn>>,
	required: Vec<Requirement>,
}

impl Generator {
	/// Creates a generator from a function receiving the call context.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&mut GeneratorCall<'_>) -> BakeryResult<Value> + Send + Sync + 'static,
	{
		Self {
			run: Arc::new(f),
			prepare: None,
			required: Vec::new(),
		}
	}

	/// Creates a generator from an argument-less function.
	pub fn from_fn<F, V>(f: F) -> Self
	where
		F: Fn() -> V + Send + Sync + 'static,
		V: Into<Value>,
	{
		Self::new(move |_| Ok(f().into()))
	}

	/// Creates a generator always producing the same value.
	pub fn constant(value: impl Into<Value>) -> Self {
		let value = value.into();
		Self::new(move |_| Ok(value.clone()))
	}

	/// Requires the named descriptor property as a keyword argument.
	pub fn require(mut self, property: impl Into<String>) -> Self {
		self.required.push(Requirement::Property(property.into()));
		self
	}

	/// Requires a binding computed from the descriptor.
	pub fn require_with<F>(mut self, extractor: F) -> Self
	where
		F: Fn(&Field<'_>) -> (String, Value) + Send + Sync + 'static,
	{
		self.required.push(Requirement::Extract(Arc::new(extractor)));
		self
	}

	/// Sets the variant used when the instance is not persisted.
	pub fn with_prepare<F>(mut self, f: F) -> Self
	where
		F: Fn(&mut GeneratorCall<'_>) -> BakeryResult<Value> + Send + Sync + 'static,
	{
		self.prepare = Some(Arc::new(f));
		self
	}

	/// Declared requirements.
	pub fn required(&self) -> &[Requirement] {
		&self.required
	}

	/// Returns true if a prepare variant is declared.
	pub fn has_prepare(&self) -> bool {
		self.prepare.is_some()
	}

	/// Produces a value, using the prepare variant when not committing.
	pub fn generate(&self, call: &mut GeneratorCall<'_>) -> BakeryResult<Value> {
		match &self.prepare {
			Some(prepare) if !call.commit() => prepare(call),
			_ => (self.run)(call),
		}
	}
}

impl fmt::Debug for Generator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Generator")
			.field("required", &self.required)
			.field("has_prepare", &self.has_prepare())
			.finish()
	}
}

/// Context handed to a generator invocation.
pub struct GeneratorCall<'a> {
	bakery: &'a Bakery,
	depth: usize,
	commit: bool,
	kwargs: Attrs,
}

impl<'a> GeneratorCall<'a> {
	pub(crate) fn new(bakery: &'a Bakery, depth: usize, commit: bool, kwargs: Attrs) -> Self {
		Self {
			bakery,
			depth,
			commit,
			kwargs,
		}
	}

	/// Bakery the value is generated for.
	pub fn bakery(&self) -> &'a Bakery {
		self.bakery
	}

	/// Whether the instance being built will be persisted.
	pub fn commit(&self) -> bool {
		self.commit
	}

	/// Keyword arguments: requirement bindings and scoped relation overrides.
	pub fn kwargs(&self) -> &Attrs {
		&self.kwargs
	}

	/// Literal keyword argument.
	pub fn arg(&self, name: &str) -> Option<&Value> {
		self.kwargs.get(name).and_then(AttrValue::as_value)
	}

	/// Non-negative integer keyword argument.
	pub fn arg_usize(&self, name: &str) -> Option<usize> {
		self.arg(name)
			.and_then(Value::as_i64)
			.and_then(|n| usize::try_from(n).ok())
	}

	/// Removes and returns all keyword arguments.
	pub fn take_kwargs(&mut self) -> Attrs {
		std::mem::take(&mut self.kwargs)
	}

	/// Removes the target model argument of a relation generator.
	///
	/// # Errors
	///
	/// Returns [`BakeryError::InvalidRequirement`] if the argument is missing.
	pub fn take_model(&mut self) -> BakeryResult<ModelRef> {
		match self.kwargs.remove(MODEL_ARG) {
			Some(AttrValue::Value(Value::Text(model))) => Ok(ModelRef::from(model)),
			_ => Err(BakeryError::InvalidRequirement(MODEL_ARG.to_string())),
		}
	}

	/// Builds and persists a related instance one level deeper.
	pub fn make(&self, model: impl Into<ModelRef>, attrs: Attrs) -> BakeryResult<Instance> {
		self.bakery
			.make_nested(self.depth + 1, model.into(), MakeOptions::new(), attrs)
			.and_then(single)
	}

	/// Builds `quantity` persisted related instances one level deeper.
	pub fn make_many(
		&self,
		model: impl Into<ModelRef>,
		quantity: usize,
		attrs: Attrs,
	) -> BakeryResult<Vec<Instance>> {
		self.bakery.make_nested(
			self.depth + 1,
			model.into(),
			MakeOptions::new().with_quantity(quantity),
			attrs,
		)
	}

	/// Builds an unpersisted related instance one level deeper.
	pub fn prepare(&self, model: impl Into<ModelRef>, attrs: Attrs) -> BakeryResult<Instance> {
		self.bakery
			.prepare_nested(self.depth + 1, model.into(), PrepareOptions::new(), attrs)
			.and_then(single)
	}
}

static USER_MAPPING: Lazy<RwLock<HashMap<Kind, Generator>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

static NAMED_GENERATORS: Lazy<RwLock<HashMap<String, Generator>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

static DEFAULT_MAPPING: Lazy<HashMap<Kind, Generator>> = Lazy::new(default_mapping);

/// Registers a process-wide generator for a kind, or removes it with `None`.
///
/// # Example
///
/// ```
/// use model_bakery::generators::{self, Generator};
/// use model_bakery::schema::Kind;
///
/// generators::add("tests.fields.CustomField", Generator::constant("value"));
/// assert!(generators::get(&Kind::parse("tests.fields.CustomField")).is_some());
/// generators::add("tests.fields.CustomField", None);
/// ```
pub fn add(kind: impl Into<Kind>, generator: impl Into<Option<Generator>>) {
	let kind = kind.into();
	match generator.into() {
		Some(generator) => {
			if USER_MAPPING.write().insert(kind.clone(), generator).is_some() {
				tracing::warn!(kind = %kind, "replacing registered generator");
			}
		}
		None => {
			USER_MAPPING.write().remove(&kind);
		}
	}
}

/// Registers the generator published under `path` for a kind.
///
/// # Errors
///
/// Returns [`BakeryError::GeneratorNotFound`] if no generator is published
/// under `path`.
pub fn add_path(kind: impl Into<Kind>, path: &str) -> BakeryResult<()> {
	let generator = named(path).ok_or_else(|| BakeryError::GeneratorNotFound(path.to_string()))?;
	add(kind, generator);
	Ok(())
}

/// Returns the process-wide override for a kind.
///
/// Only the override layer is consulted; builtin defaults are not returned.
pub fn get(kind: &Kind) -> Option<Generator> {
	USER_MAPPING.read().get(kind).cloned()
}

/// Removes the process-wide override for a kind.
pub fn remove(kind: &Kind) -> Option<Generator> {
	USER_MAPPING.write().remove(kind)
}

/// Removes every process-wide override.
///
/// This is primarily useful for testing.
pub fn clear() {
	USER_MAPPING.write().clear();
}

/// Copy of the process-wide override table.
pub fn snapshot() -> HashMap<Kind, Generator> {
	USER_MAPPING.read().clone()
}

/// Replaces the process-wide override table with a snapshot.
pub fn restore(snapshot: HashMap<Kind, Generator>) {
	*USER_MAPPING.write() = snapshot;
}

/// Publishes a generator under a path in the named catalog.
pub fn register_named(path: impl Into<String>, generator: Generator) {
	NAMED_GENERATORS.write().insert(path.into(), generator);
}

/// Returns the generator published under a path.
pub fn named(path: &str) -> Option<Generator> {
	NAMED_GENERATORS.read().get(path).cloned()
}

/// Builtin generator for a kind.
pub fn default_generator(kind: &Kind) -> Option<Generator> {
	DEFAULT_MAPPING.get(kind).cloned()
}

/// Generator drawing from a fixed set of allowed values.
pub fn choice_generator(values: Vec<Value>) -> Generator {
	Generator::new(move |_| Ok(random_gen::gen_from_list(&values).unwrap_or(Value::Null)))
}

/// Generator for an IP address family.
pub fn ip_generator(protocol: IpProtocol) -> Generator {
	match protocol {
		IpProtocol::Both => Generator::from_fn(random_gen::gen_ipv46),
		IpProtocol::Ipv4 => Generator::from_fn(random_gen::gen_ipv4),
		IpProtocol::Ipv6 => Generator::from_fn(random_gen::gen_ipv6),
	}
}

fn max_length(call: &GeneratorCall<'_>) -> usize {
	call.arg_usize("max_length").unwrap_or(MAX_LENGTH)
}

fn target_model(field: &Field<'_>) -> (String, Value) {
	let model = field
		.target()
		.map(|target| Value::Text(target.qualified()))
		.unwrap_or(Value::Null);
	(MODEL_ARG.to_string(), model)
}

fn related_generator() -> Generator {
	Generator::new(|call| {
		let model = call.take_model()?;
		let attrs = call.take_kwargs();
		call.make(model, attrs).map(Value::from)
	})
	.require_with(target_model)
	.with_prepare(|call| {
		let model = call.take_model()?;
		let attrs = call.take_kwargs();
		call.prepare(model, attrs).map(Value::from)
	})
}

fn many_generator() -> Generator {
	Generator::new(|call| {
		let model = call.take_model()?;
		let attrs = call.take_kwargs();
		let quantity = call.bakery().settings().max_many_quantity;
		call.make_many(model, quantity, attrs).map(Value::from)
	})
	.require_with(target_model)
}

fn content_type(call: &mut GeneratorCall<'_>, commit: bool) -> BakeryResult<Value> {
	let bakery = call.bakery();
	let content_type_model = bakery.get_model(bakery.settings().content_type_model.as_str())?;
	let models: Vec<ModelId> = bakery
		.schema()
		.models_by_namespace()
		.into_values()
		.flat_map(IndexMap::into_values)
		.collect();
	let target = models
		.choose(&mut rand::thread_rng())
		.ok_or_else(|| BakeryError::Repository("no models are registered".to_string()))?;

	let mut lookup = IndexMap::new();
	lookup.insert("app_label".to_string(), Value::from(target.namespace()));
	lookup.insert("model".to_string(), Value::from(target.name().to_lowercase()));

	let repository = bakery.repository();
	if let Some(existing) = repository.filter(&content_type_model, &lookup)?.into_iter().next() {
		return Ok(existing.into());
	}
	let instance = if commit {
		repository.create(&content_type_model, lookup, &SaveOptions::new())?
	} else {
		repository.instantiate_unpersisted(&content_type_model, lookup)?
	};
	Ok(instance.into())
}

fn default_mapping() -> HashMap<Kind, Generator> {
	use random_gen::*;

	let integer = || Generator::from_fn(|| gen_integer(-MAX_INT, MAX_INT));
	let positive = || Generator::from_fn(|| gen_integer(0, MAX_INT));
	let string = || Generator::new(|call| Ok(gen_string(max_length(call)).into())).require("max_length");
	let email = || Generator::from_fn(gen_email);
	let text = || Generator::from_fn(gen_text);

	let mut mapping = HashMap::new();
	mapping.insert(Kind::Boolean, Generator::from_fn(gen_boolean));
	mapping.insert(Kind::NullBoolean, Generator::from_fn(gen_boolean));
	mapping.insert(Kind::SmallInteger, integer());
	mapping.insert(Kind::Integer, integer());
	mapping.insert(Kind::BigInteger, integer());
	mapping.insert(Kind::PositiveSmallInteger, positive());
	mapping.insert(Kind::PositiveInteger, positive());
	mapping.insert(Kind::PositiveBigInteger, positive());
	mapping.insert(Kind::Float, Generator::from_fn(gen_float));
	mapping.insert(
		Kind::Decimal,
		Generator::new(|call| {
			let max_digits = call.arg_usize("max_digits").unwrap_or(10) as u32;
			let places = call.arg_usize("decimal_places").unwrap_or(0) as u32;
			Ok(gen_decimal(max_digits, places).into())
		})
		.require("max_digits")
		.require("decimal_places"),
	);
	mapping.insert(Kind::Char, string());
	mapping.insert(Kind::CiChar, string());
	mapping.insert(Kind::Text, text());
	mapping.insert(Kind::CiText, text());
	mapping.insert(
		Kind::Slug,
		Generator::new(|call| Ok(gen_slug(max_length(call)).into())).require("max_length"),
	);
	mapping.insert(Kind::Email, email());
	mapping.insert(Kind::CiEmail, email());
	mapping.insert(Kind::Url, Generator::from_fn(gen_url));
	mapping.insert(Kind::Uuid, Generator::from_fn(gen_uuid));
	mapping.insert(Kind::Binary, Generator::from_fn(|| gen_byte_string(16)));
	mapping.insert(Kind::Date, Generator::from_fn(gen_date));
	mapping.insert(Kind::DateTime, Generator::from_fn(gen_datetime));
	mapping.insert(Kind::Time, Generator::from_fn(gen_time));
	mapping.insert(Kind::Duration, Generator::from_fn(gen_interval));
	mapping.insert(Kind::IpAddress, Generator::from_fn(gen_ipv4));
	mapping.insert(Kind::File, Generator::from_fn(gen_file));
	mapping.insert(Kind::Image, Generator::from_fn(gen_image));
	mapping.insert(Kind::Json, Generator::from_fn(|| serde_json::json!({})));
	mapping.insert(Kind::HStore, Generator::from_fn(|| serde_json::json!({})));
	mapping.insert(Kind::Array, Generator::from_fn(Vec::<Value>::new));
	mapping.insert(Kind::Geometry, Generator::from_fn(gis::gen_point));
	mapping.insert(Kind::Point, Generator::from_fn(gis::gen_point));
	mapping.insert(Kind::LineString, Generator::from_fn(gis::gen_line_string));
	mapping.insert(Kind::Polygon, Generator::from_fn(gis::gen_polygon));
	mapping.insert(Kind::MultiPoint, Generator::from_fn(gis::gen_multi_point));
	mapping.insert(
		Kind::MultiLineString,
		Generator::from_fn(gis::gen_multi_line_string),
	);
	mapping.insert(Kind::MultiPolygon, Generator::from_fn(gis::gen_multi_polygon));
	mapping.insert(
		Kind::GeometryCollection,
		Generator::from_fn(gis::gen_geometry_collection),
	);
	mapping.insert(Kind::ForeignKey, related_generator());
	mapping.insert(Kind::OneToOne, related_generator());
	mapping.insert(Kind::ManyToMany, many_generator());
	mapping.insert(
		Kind::ContentType,
		Generator::new(|call| content_type(call, true)).with_prepare(|call| content_type(call, false)),
	);
	mapping
}

//! Instance builder.
//!
//! A [`Baker`] builds instances of one model. Every `make`/`prepare` runs the
//! same pipeline:
//!
//! 1. partition the overrides into direct and relation-path (`owner__name`)
//!    overrides, and validate `fill_optional`
//! 2. resolve each forward field in schema order: skip it, take its
//!    override (calling lazy values and advancing steppers), or generate it
//! 3. assemble the attribute map and, when committing, create the row
//! 4. wire reverse overrides, many-valued relations and reverse
//!    relation-path overrides against the persisted row
//! 5. optionally re-fetch the row
//!
//! Attribute generation follows [`Baker::generate_value`].

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::attrs::{Attrs, FillOptional};
use crate::bakery::{Bakery, MakeOptions, single};
use crate::error::{BakeryError, BakeryResult};
use crate::generators::{self, Generator, GeneratorCall, Requirement};
use crate::repository::SaveOptions;
use crate::resolver::ModelRef;
use crate::schema::{
	AttributeDescriptor, Field, IpProtocol, Kind, ModelId, RelationDescriptor, RelationKind,
	Through, flatten_choices,
};
use crate::value::{Instance, Value};

/// Capability interface of an instance builder.
///
/// [`Baker`] is the default implementation; a custom builder factory
/// registered in [`custom`](crate::custom) can supply another.
pub trait ModelBuilder {
	/// Builds and persists one instance.
	fn make(&self, request: BuildRequest) -> BakeryResult<Instance>;

	/// Builds one instance without persisting it.
	fn prepare(&self, request: BuildRequest) -> BakeryResult<Instance>;
}

/// Options fixed when a builder is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BakerOptions {
	/// Build many-valued relations that are not overridden.
	pub make_m2m: bool,
	/// Generate file-kind attributes.
	pub create_files: bool,
	/// Relation nesting depth of this builder.
	pub depth: usize,
}

/// Arguments of one `make`/`prepare` invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
	/// Attribute overrides.
	pub attrs: Attrs,
	/// Optional attributes to fill anyway.
	pub fill_optional: FillOptional,
	/// Options forwarded to [`Repository::create`](crate::repository::Repository::create).
	pub save_options: SaveOptions,
	/// Re-fetch the row after it is created.
	pub refresh_after_create: bool,
	/// Re-fetch the row through a named manager.
	pub from_manager: Option<String>,
	/// Persist related instances while preparing.
	pub save_related: bool,
}

impl BuildRequest {
	/// Creates a request with the given overrides.
	pub fn new(attrs: Attrs) -> Self {
		Self {
			attrs,
			..Self::default()
		}
	}

	/// Sets `fill_optional`.
	pub fn with_fill_optional(mut self, fill_optional: impl Into<FillOptional>) -> Self {
		self.fill_optional = fill_optional.into();
		self
	}

	/// Sets `save_related`.
	pub fn with_save_related(mut self, save_related: bool) -> Self {
		self.save_related = save_related;
		self
	}
}

impl From<Attrs> for BuildRequest {
	fn from(attrs: Attrs) -> Self {
		Self::new(attrs)
	}
}

/// Default instance builder.
pub struct Baker {
	bakery: Bakery,
	model: ModelId,
	options: BakerOptions,
	attr_mapping: HashMap<String, Generator>,
	type_mapping: HashMap<Kind, Generator>,
}

/// Per-invocation state.
struct Pass<'a> {
	direct: Attrs,
	related: Attrs,
	related_names: IndexSet<String>,
	fill_optional: &'a FillOptional,
}

impl Pass<'_> {
	fn fill(&self, name: &str) -> bool {
		self.fill_optional.includes(name)
	}
}

impl Baker {
	/// Creates a builder for a model.
	///
	/// # Errors
	///
	/// Fails when the model reference cannot be resolved.
	pub fn new(bakery: &Bakery, model: impl Into<ModelRef>) -> BakeryResult<Self> {
		let model = bakery.get_model(model)?;
		Ok(Self {
			bakery: bakery.clone(),
			model,
			options: BakerOptions::default(),
			attr_mapping: HashMap::new(),
			type_mapping: HashMap::new(),
		})
	}

	/// Sets the builder options.
	pub fn with_options(mut self, options: BakerOptions) -> Self {
		self.options = options;
		self
	}

	/// Builds many-valued relations that are not overridden.
	pub fn make_m2m(mut self, make_m2m: bool) -> Self {
		self.options.make_m2m = make_m2m;
		self
	}

	/// Generates file-kind attributes.
	pub fn create_files(mut self, create_files: bool) -> Self {
		self.options.create_files = create_files;
		self
	}

	/// Uses `generator` for the named attribute.
	pub fn with_attr_generator(mut self, name: impl Into<String>, generator: Generator) -> Self {
		self.attr_mapping.insert(name.into(), generator);
		self
	}

	/// Uses `generator` for every attribute of a kind, ahead of the
	/// process-wide table.
	pub fn with_kind_generator(mut self, kind: impl Into<Kind>, generator: Generator) -> Self {
		self.type_mapping.insert(kind.into(), generator);
		self
	}

	/// Model built by this builder.
	pub fn model(&self) -> &ModelId {
		&self.model
	}

	/// Builder options.
	pub fn options(&self) -> BakerOptions {
		self.options
	}

	/// Produces a value for one field.
	///
	/// Generators are resolved in this order:
	///
	/// 1. the per-attribute mapping of this builder
	/// 2. a choice generator over the field's flattened choices
	/// 3. the content-type generator for relations to the content-type model
	/// 4. the kind mapping of this builder, the process-wide overrides, the
	///    settings mapping and the builtin defaults
	/// 5. an IP generator selected by the field's `protocol` hint
	///
	/// Required arguments are bound from the descriptor, and relation-path
	/// overrides scoped to the field are passed along.
	///
	/// # Errors
	///
	/// Returns [`BakeryError::UnsupportedAttributeKind`] when no generator
	/// applies, and propagates generator failures.
	pub fn generate_value(
		&self,
		field: Field<'_>,
		commit: bool,
		related: &Attrs,
	) -> BakeryResult<Value> {
		let generator = self.resolve_generator(&field)?;
		let mut kwargs = Attrs::new();
		for requirement in generator.required() {
			match requirement {
				Requirement::Property(property) => {
					kwargs.insert(property.clone(), field.property(property)?);
				}
				Requirement::Extract(extract) => {
					let (name, value) = extract(&field);
					if name.is_empty() {
						return Err(BakeryError::InvalidRequirement(field.name().to_string()));
					}
					kwargs.insert(name, value);
				}
			}
		}
		kwargs.merge(related.scoped_to(field.name()));

		tracing::trace!(
			model = %self.model,
			field = field.name(),
			kind = %field.kind(),
			commit,
			"generating value"
		);
		let mut call = GeneratorCall::new(&self.bakery, self.options.depth, commit, kwargs);
		generator.generate(&mut call)
	}

	fn resolve_generator(&self, field: &Field<'_>) -> BakeryResult<Generator> {
		let name = field.name();
		if let Some(generator) = self.attr_mapping.get(name) {
			return Ok(generator.clone());
		}
		if let Some(choices) = field.choices().filter(|choices| !choices.is_empty()) {
			return Ok(generators::choice_generator(flatten_choices(choices)));
		}
		let kind = match field {
			Field::Relation(rel)
				if rel.is_single_valued()
					&& rel.target.qualified() == self.bakery.settings().content_type_model =>
			{
				Kind::ContentType
			}
			_ => field.kind(),
		};
		if let Some(generator) = self.kind_generator(&kind) {
			return Ok(generator);
		}
		if kind == Kind::GenericIpAddress {
			let protocol = field
				.property("protocol")?
				.as_str()
				.and_then(IpProtocol::parse)
				.unwrap_or_default();
			return Ok(generators::ip_generator(protocol));
		}
		Err(BakeryError::UnsupportedAttributeKind {
			field: name.to_string(),
			kind: kind.to_string(),
		})
	}

	fn kind_generator(&self, kind: &Kind) -> Option<Generator> {
		self.type_mapping
			.get(kind)
			.cloned()
			.or_else(|| generators::get(kind))
			.or_else(|| self.bakery.settings_generator(kind))
			.or_else(|| generators::default_generator(kind))
	}

	fn skip_field(&self, field: &Field<'_>, pass: &Pass<'_>) -> bool {
		let name = field.name();
		let kind = field.kind();

		if kind.is_file() && !self.options.create_files {
			return true;
		}
		if matches!(field, Field::Relation(rel) if rel.parent_link) {
			return true;
		}
		if kind.is_auto() || matches!(kind, Kind::GenericRelation | Kind::OrderWrt) {
			return true;
		}

		let overridden = pass.direct.contains(name);
		let in_related = pass.related_names.contains(name);
		let fill = pass.fill(name);
		if !overridden
			&& !in_related
			&& !self.attr_mapping.contains_key(name)
			&& !fill
			&& (field.has_default() || (field.blank() && !kind.is_boolean()))
		{
			return true;
		}
		!overridden && !in_related && field.nullable() && !fill
	}

	fn check_fill_optional(
		&self,
		fill_optional: &FillOptional,
		attributes: &[AttributeDescriptor],
		relations: &[RelationDescriptor],
	) -> BakeryResult<()> {
		let wrong: Vec<String> = fill_optional
			.named_fields()
			.iter()
			.filter(|name| {
				!attributes.iter().any(|attr| &attr.name == *name)
					&& !relations
						.iter()
						.any(|rel| !rel.is_reverse() && &rel.name == *name)
			})
			.cloned()
			.collect();
		if wrong.is_empty() {
			Ok(())
		} else {
			Err(BakeryError::InvalidFillOptional {
				fields: wrong,
				model: self.model.name().to_string(),
			})
		}
	}

	fn many_value(
		&self,
		field: Field<'_>,
		pass: &Pass<'_>,
		commit: bool,
	) -> BakeryResult<Vec<Instance>> {
		let name = field.name();
		if !pass.related_names.contains(name)
			&& (!self.options.make_m2m || (field.nullable() && !pass.fill(name)))
		{
			return Ok(Vec::new());
		}
		let value = self.generate_value(field, commit, &pass.related)?;
		into_instances(name, value)
	}

	fn build(&self, request: BuildRequest, commit: bool) -> BakeryResult<Instance> {
		let schema = self.bakery.schema();
		let attributes = schema.attributes(&self.model)?;
		let relations = schema.relations(&self.model)?;

		let BuildRequest {
			attrs,
			fill_optional,
			save_options,
			refresh_after_create,
			from_manager,
			save_related,
		} = request;
		self.check_fill_optional(&fill_optional, &attributes, &relations)?;

		let (direct, related) = attrs.split_related();
		let related_names = related.related_names();
		let mut pass = Pass {
			direct,
			related,
			related_names,
			fill_optional: &fill_optional,
		};
		let commit_related = commit || save_related;

		let fields = attributes
			.iter()
			.map(Field::Attribute)
			.chain(
				relations
					.iter()
					.filter(|rel| rel.is_single_valued())
					.map(Field::Relation),
			)
			.chain(
				relations
					.iter()
					.filter(|rel| matches!(rel.kind, RelationKind::ManyToMany | RelationKind::Generic))
					.map(Field::Relation),
			);

		let mut values: IndexMap<String, Value> = IndexMap::new();
		let mut many: Vec<(&RelationDescriptor, Vec<Instance>)> = Vec::new();

		for field in fields {
			let name = field.name();
			if self.skip_field(&field, &pass) {
				tracing::debug!(model = %self.model, field = name, "skipping field");
				continue;
			}

			if let Field::Relation(rel) = field
				&& rel.kind == RelationKind::ManyToMany
			{
				let resolved = match pass.direct.remove(name) {
					Some(value) => into_instances(name, value.resolve(name)?)?,
					None if !commit => continue,
					None => self.many_value(field, &pass, commit_related)?,
				};
				many.push((rel, resolved));
				continue;
			}

			let value = match pass.direct.remove(name) {
				Some(value) => value.resolve(name)?,
				None => {
					if matches!(field, Field::Relation(_))
						&& pass.direct.contains(&format!("{name}_id"))
					{
						continue;
					}
					if matches!(field, Field::Relation(_)) {
						tracing::debug!(model = %self.model, field = name, "building related instance");
					}
					self.generate_value(field, commit_related, &pass.related)?
				}
			};
			values.insert(name.to_string(), value);
		}

		// Remaining overrides were skipped or name no forward field. Reverse
		// relations are deferred until the row exists.
		let mut reverse: Vec<(String, Vec<Instance>)> = Vec::new();
		for (name, value) in std::mem::take(&mut pass.direct) {
			let resolved = value.resolve(&name)?;
			if relations.iter().any(|rel| rel.is_reverse() && rel.name == name) {
				reverse.push((name.clone(), into_instances(&name, resolved)?));
			} else {
				values.insert(name, resolved);
			}
		}

		let repository = self.bakery.repository();
		if !commit {
			return repository.instantiate_unpersisted(&self.model, values);
		}

		let mut instance = repository.create(&self.model, values, &save_options)?;
		tracing::debug!(model = %self.model, pk = ?instance.pk(), "created instance");

		for (relation, related_values) in &reverse {
			repository.assign_relation(&instance, relation, related_values, true)?;
		}
		self.wire_many(&instance, many)?;

		if let Some(manager) = from_manager {
			let pk = identity(&instance)?;
			instance = repository.fetch_by_identity(&self.model, &pk, Some(manager.as_str()))?;
		}

		for rel in relations
			.iter()
			.filter(|rel| rel.is_reverse() && pass.related_names.contains(&rel.name))
		{
			self.make_reverse_related(&instance, rel, &pass.related)?;
		}

		if refresh_after_create {
			let pk = identity(&instance)?;
			instance = repository.fetch_by_identity(&self.model, &pk, None)?;
		}
		Ok(instance)
	}

	fn wire_many(
		&self,
		instance: &Instance,
		many: Vec<(&RelationDescriptor, Vec<Instance>)>,
	) -> BakeryResult<()> {
		let repository = self.bakery.repository();
		for (rel, values) in many {
			if values.is_empty() {
				continue;
			}
			let values = values
				.into_iter()
				.map(|value| {
					if value.is_persisted() {
						Ok(value)
					} else {
						repository.save(value)
					}
				})
				.collect::<BakeryResult<Vec<_>>>()?;
			tracing::debug!(
				model = %self.model,
				relation = %rel.name,
				count = values.len(),
				"wiring many-valued relation"
			);

			match &rel.through {
				Some(through) if !through.auto_created => {
					let (source, target) = self.through_fields(through, rel)?;
					for value in values {
						let attrs = Attrs::new()
							.set(source.clone(), instance.clone())
							.set(target.clone(), value);
						self.bakery
							.make_nested(
								self.options.depth + 1,
								ModelRef::from(&through.model),
								MakeOptions::new(),
								attrs,
							)
							.and_then(single)?;
					}
				}
				_ => repository.assign_relation(instance, &rel.name, &values, false)?,
			}
		}
		Ok(())
	}

	/// Foreign keys of a junction model pointing at the owner and the target.
	fn through_fields(
		&self,
		through: &Through,
		rel: &RelationDescriptor,
	) -> BakeryResult<(String, String)> {
		if let (Some(source), Some(target)) = (&through.source_field, &through.target_field) {
			return Ok((source.clone(), target.clone()));
		}
		let keys: Vec<RelationDescriptor> = self
			.bakery
			.schema()
			.relations(&through.model)?
			.into_iter()
			.filter(RelationDescriptor::is_single_valued)
			.collect();
		let missing = |target: &ModelId| BakeryError::Repository(format!(
			"{} has no foreign key to {target}",
			through.model
		));

		let source = match &through.source_field {
			Some(source) => source.clone(),
			None => keys
				.iter()
				.find(|key| key.target == self.model)
				.map(|key| key.name.clone())
				.ok_or_else(|| missing(&self.model))?,
		};
		let target = match &through.target_field {
			Some(target) => target.clone(),
			None => keys
				.iter()
				.find(|key| key.target == rel.target && key.name != source)
				.map(|key| key.name.clone())
				.ok_or_else(|| missing(&rel.target))?,
		};
		Ok((source, target))
	}

	fn make_reverse_related(
		&self,
		instance: &Instance,
		rel: &RelationDescriptor,
		related: &Attrs,
	) -> BakeryResult<()> {
		let RelationKind::ReverseForeignKey { field } = &rel.kind else {
			return Ok(());
		};
		tracing::debug!(model = %self.model, relation = %rel.name, "building reverse related instance");
		let mut attrs = related.scoped_to(&rel.name);
		attrs.insert(field.clone(), instance.clone());
		self.bakery
			.make_nested(
				self.options.depth + 1,
				ModelRef::from(&rel.target),
				MakeOptions::new(),
				attrs,
			)
			.map(|_| ())
	}
}

impl ModelBuilder for Baker {
	fn make(&self, request: BuildRequest) -> BakeryResult<Instance> {
		self.build(request, true)
	}

	fn prepare(&self, request: BuildRequest) -> BakeryResult<Instance> {
		self.build(request, false)
	}
}

fn identity(instance: &Instance) -> BakeryResult<Value> {
	instance
		.pk()
		.cloned()
		.ok_or_else(|| BakeryError::Repository(format!("{instance} was not assigned an identity")))
}

fn into_instances(name: &str, value: Value) -> BakeryResult<Vec<Instance>> {
	match value {
		Value::Null => Ok(Vec::new()),
		value => value.into_instances().ok_or_else(|| BakeryError::InvalidOverride {
			attr: name.to_string(),
			expected: "a list of instances".to_string(),
		}),
	}
}

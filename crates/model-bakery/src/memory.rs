//! In-memory schema provider and repository.
//!
//! [`SchemaRegistry`] holds model definitions declared in code and derives
//! reverse one-to-many relations from the foreign keys pointing at each
//! model. [`InMemoryRepository`] stores rows per model, assigns integer
//! identities to auto primary keys and enforces the constraints a real
//! persistence layer would (required columns, saved related rows).
//!
//! Both are complete collaborators: they back the crate's own tests and can
//! back application tests that do not need a database.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{BakeryError, BakeryResult};
use crate::repository::{Repository, SaveOptions};
use crate::schema::{
	AttributeDescriptor, Kind, ModelId, RelationDescriptor, RelationKind, SchemaProvider,
};
use crate::value::{Instance, Value};

/// Definition of one model.
#[derive(Debug, Clone)]
pub struct ModelDef {
	id: ModelId,
	attributes: Vec<AttributeDescriptor>,
	relations: Vec<RelationDescriptor>,
	managers: Vec<String>,
}

impl ModelDef {
	/// Creates a model with an auto-incrementing `id` primary key.
	pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: ModelId::new(namespace, name),
			attributes: vec![AttributeDescriptor::new("id", Kind::AutoField).primary_key()],
			relations: Vec::new(),
			managers: Vec::new(),
		}
	}

	/// Adds an attribute. Declaring a primary key replaces the auto `id`.
	pub fn attribute(mut self, attribute: AttributeDescriptor) -> Self {
		if attribute.primary_key {
			self.attributes
				.retain(|attr| !(attr.primary_key && attr.kind.is_auto()));
		}
		self.attributes.push(attribute);
		self
	}

	/// Adds a relation.
	pub fn relation(mut self, relation: RelationDescriptor) -> Self {
		self.relations.push(relation);
		self
	}

	/// Declares a named manager rows can be fetched through.
	pub fn manager(mut self, name: impl Into<String>) -> Self {
		self.managers.push(name.into());
		self
	}

	/// Model identity.
	pub fn id(&self) -> &ModelId {
		&self.id
	}

	/// Primary key attribute.
	pub fn primary_key(&self) -> Option<&AttributeDescriptor> {
		self.attributes.iter().find(|attr| attr.primary_key)
	}
}

/// Schema provider backed by model definitions.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
	models: RwLock<IndexMap<ModelId, ModelDef>>,
}

impl SchemaRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a model, builder style.
	pub fn with_model(self, model: ModelDef) -> Self {
		self.register(model);
		self
	}

	/// Registers a model and returns its identity.
	pub fn register(&self, model: ModelDef) -> ModelId {
		let id = model.id.clone();
		self.models.write().insert(id.clone(), model);
		id
	}

	/// Returns a model definition.
	pub fn model(&self, id: &ModelId) -> Option<ModelDef> {
		self.models.read().get(id).cloned()
	}

	fn require(&self, id: &ModelId) -> BakeryResult<ModelDef> {
		self.model(id)
			.ok_or_else(|| BakeryError::ModelNotFound(id.qualified()))
	}
}

impl SchemaProvider for SchemaRegistry {
	fn attributes(&self, model: &ModelId) -> BakeryResult<Vec<AttributeDescriptor>> {
		Ok(self.require(model)?.attributes)
	}

	fn relations(&self, model: &ModelId) -> BakeryResult<Vec<RelationDescriptor>> {
		let mut relations = self.require(model)?.relations;
		let models = self.models.read();
		for other in models.values() {
			for rel in &other.relations {
				if rel.kind != RelationKind::ForeignKey || rel.target != *model {
					continue;
				}
				let declared = relations.iter().any(|existing| {
					existing.target == other.id
						&& matches!(&existing.kind, RelationKind::ReverseForeignKey { field } if *field == rel.name)
				});
				if !declared {
					let accessor = format!("{}_set", other.id.name().to_lowercase());
					relations.push(RelationDescriptor::reverse(
						accessor,
						other.id.clone(),
						rel.name.clone(),
					));
				}
			}
		}
		Ok(relations)
	}

	fn find_model(&self, namespace: &str, name: &str) -> Option<ModelId> {
		self.models
			.read()
			.keys()
			.find(|id| id.namespace() == namespace && id.name().eq_ignore_ascii_case(name))
			.cloned()
	}

	fn models_by_namespace(&self) -> IndexMap<String, IndexMap<String, ModelId>> {
		let mut grouped: IndexMap<String, IndexMap<String, ModelId>> = IndexMap::new();
		for id in self.models.read().keys() {
			grouped
				.entry(id.namespace().to_string())
				.or_default()
				.insert(id.name().to_string(), id.clone());
		}
		grouped
	}
}

/// Notification recorded whenever relation values are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationEvent {
	/// Model owning the relation.
	pub model: ModelId,
	/// Relation name.
	pub relation: String,
	/// Number of values assigned.
	pub count: usize,
	/// Whether previous values were replaced.
	pub replaced: bool,
}

type LinkKey = (ModelId, String, String);

#[derive(Debug, Default)]
struct Store {
	rows: HashMap<ModelId, IndexMap<String, Instance>>,
	next_id: HashMap<ModelId, i64>,
	links: HashMap<LinkKey, Vec<Instance>>,
	relation_events: Vec<RelationEvent>,
	save_options: Vec<SaveOptions>,
	creates: usize,
	fetches: usize,
}

/// Repository keeping rows in memory.
pub struct InMemoryRepository {
	schema: Arc<SchemaRegistry>,
	store: RwLock<Store>,
}

fn pk_key(pk: &Value) -> String {
	pk.to_string()
}

fn same_value(stored: Option<&Value>, expected: &Value) -> bool {
	match (stored, expected) {
		(Some(Value::Instance(a)), Value::Instance(b)) => a.model() == b.model() && a.pk() == b.pk(),
		(Some(Value::Instance(a)), pk) => a.pk() == Some(pk),
		(Some(value), expected) => value == expected,
		(None, Value::Null) => true,
		(None, _) => false,
	}
}

impl InMemoryRepository {
	/// Creates an empty repository over a schema.
	pub fn new(schema: Arc<SchemaRegistry>) -> Self {
		Self {
			schema,
			store: RwLock::new(Store::default()),
		}
	}

	/// All rows of a model, in insertion order.
	pub fn all(&self, model: &ModelId) -> Vec<Instance> {
		self.store
			.read()
			.rows
			.get(model)
			.map(|rows| rows.values().cloned().collect())
			.unwrap_or_default()
	}

	/// Values of a relation on a persisted instance.
	///
	/// # Errors
	///
	/// Fails for unpersisted instances, which cannot own relation rows.
	pub fn related(&self, instance: &Instance, relation: &str) -> BakeryResult<Vec<Instance>> {
		let pk = instance.pk().ok_or_else(|| {
			BakeryError::Repository(format!(
				"\"{instance}\" needs to have a value for its primary key before \
				 the relationship '{relation}' can be used."
			))
		})?;
		let rel = self.find_relation(instance.model(), relation)?;
		let store = self.store.read();
		match &rel.kind {
			RelationKind::ReverseForeignKey { field } => Ok(store
				.rows
				.get(&rel.target)
				.map(|rows| {
					rows.values()
						.filter(|row| same_value(row.get(field), &Value::from(instance.clone())))
						.cloned()
						.collect()
				})
				.unwrap_or_default()),
			_ => {
				let key = (instance.model().clone(), pk_key(pk), relation.to_string());
				Ok(store.links.get(&key).cloned().unwrap_or_default())
			}
		}
	}

	/// Relation assignments observed so far.
	pub fn relation_events(&self) -> Vec<RelationEvent> {
		self.store.read().relation_events.clone()
	}

	/// Save options passed to the latest create call.
	pub fn last_save_options(&self) -> Option<SaveOptions> {
		self.store.read().save_options.last().cloned()
	}

	/// Number of rows created.
	pub fn create_count(&self) -> usize {
		self.store.read().creates
	}

	/// Number of fetch-by-identity calls.
	pub fn fetch_count(&self) -> usize {
		self.store.read().fetches
	}

	/// Removes every row, as a fresh database would.
	pub fn flush(&self) {
		let mut store = self.store.write();
		store.rows.clear();
		store.links.clear();
		store.next_id.clear();
	}

	fn find_relation(&self, model: &ModelId, relation: &str) -> BakeryResult<RelationDescriptor> {
		self.schema
			.relations(model)?
			.into_iter()
			.find(|rel| rel.name == relation)
			.ok_or_else(|| {
				BakeryError::Repository(format!("{model} has no relation named '{relation}'"))
			})
	}

	fn row(&self, model: &ModelId, pk: &Value) -> Option<Instance> {
		self.store
			.read()
			.rows
			.get(model)
			.and_then(|rows| rows.get(&pk_key(pk)))
			.cloned()
	}

	fn collect_values(
		&self,
		model: &ModelId,
		mut attrs: IndexMap<String, Value>,
	) -> BakeryResult<IndexMap<String, Value>> {
		let def = self.schema.require(model)?;
		let mut values = IndexMap::new();

		for attr in &def.attributes {
			match attrs.shift_remove(&attr.name) {
				Some(value) => {
					values.insert(attr.name.clone(), value);
				}
				None if attr.kind.is_auto() => {}
				None => {
					let value = match &attr.default {
						Some(default) => default.clone(),
						None if attr.nullable => Value::Null,
						None if attr.kind.is_text() || attr.kind.is_file() => Value::from(""),
						None => Value::Null,
					};
					values.insert(attr.name.clone(), value);
				}
			}
		}

		for rel in def.relations.iter().filter(|rel| rel.is_single_valued()) {
			let id_key = format!("{}_id", rel.name);
			let value = match (attrs.shift_remove(&rel.name), attrs.shift_remove(&id_key)) {
				(Some(value @ (Value::Instance(_) | Value::Null)), _) => value,
				(Some(other), _) => {
					return Err(BakeryError::Repository(format!(
						"{model}.{} must be a {} instance, got {}",
						rel.name,
						rel.target,
						other.type_name()
					)));
				}
				(None, Some(Value::Null)) | (None, None) => Value::Null,
				(None, Some(pk)) => self.row(&rel.target, &pk).map(Value::from).ok_or_else(|| {
					BakeryError::Repository(format!("{} matching query does not exist ({pk})", rel.target))
				})?,
			};
			values.insert(rel.name.clone(), value);
		}

		if let Some(unexpected) = attrs.keys().next() {
			return Err(BakeryError::Repository(format!(
				"{model}() got an unexpected keyword argument '{unexpected}'"
			)));
		}
		Ok(values)
	}

	fn check_constraints(&self, def: &ModelDef, values: &IndexMap<String, Value>) -> BakeryResult<()> {
		for attr in &def.attributes {
			let missing = values.get(&attr.name).is_none_or(Value::is_null);
			if missing && !attr.nullable && !attr.kind.is_auto() {
				return Err(BakeryError::Repository(format!(
					"NOT NULL constraint failed: {}.{}",
					def.id, attr.name
				)));
			}
		}
		for rel in def.relations.iter().filter(|rel| rel.is_single_valued()) {
			match values.get(&rel.name) {
				Some(Value::Instance(related)) if !related.is_persisted() => {
					return Err(BakeryError::Repository(format!(
						"save() prohibited to prevent data loss due to unsaved related object '{}'.",
						rel.name
					)));
				}
				Some(Value::Instance(_)) => {}
				_ if rel.nullable => {}
				_ => {
					return Err(BakeryError::Repository(format!(
						"NOT NULL constraint failed: {}.{}",
						def.id, rel.name
					)));
				}
			}
		}
		Ok(())
	}

	fn insert(&self, def: &ModelDef, mut values: IndexMap<String, Value>) -> BakeryResult<Instance> {
		self.check_constraints(def, &values)?;
		let mut store = self.store.write();
		let pk = match def.primary_key() {
			Some(pk_attr) if pk_attr.kind.is_auto() => {
				let next = store.next_id.entry(def.id.clone()).or_insert(0);
				*next += 1;
				let pk = Value::Int(*next);
				values.shift_insert(0, pk_attr.name.clone(), pk.clone());
				pk
			}
			Some(pk_attr) => values.get(&pk_attr.name).cloned().unwrap_or(Value::Null),
			None => {
				return Err(BakeryError::Repository(format!(
					"{} has no primary key",
					def.id
				)));
			}
		};
		let instance = Instance::new(def.id.clone(), values).with_pk(pk.clone());
		store
			.rows
			.entry(def.id.clone())
			.or_default()
			.insert(pk_key(&pk), instance.clone());
		store.creates += 1;
		Ok(instance)
	}
}

impl Repository for InMemoryRepository {
	fn create(
		&self,
		model: &ModelId,
		attrs: IndexMap<String, Value>,
		options: &SaveOptions,
	) -> BakeryResult<Instance> {
		let def = self.schema.require(model)?;
		let values = self.collect_values(model, attrs)?;
		let instance = self.insert(&def, values)?;
		self.store.write().save_options.push(options.clone());
		tracing::debug!(model = %model, pk = ?instance.pk(), "created row");
		Ok(instance)
	}

	fn instantiate_unpersisted(
		&self,
		model: &ModelId,
		attrs: IndexMap<String, Value>,
	) -> BakeryResult<Instance> {
		let values = self.collect_values(model, attrs)?;
		Ok(Instance::new(model.clone(), values))
	}

	fn save(&self, instance: Instance) -> BakeryResult<Instance> {
		let def = self.schema.require(instance.model())?;
		match instance.pk().cloned() {
			Some(pk) => {
				self.check_constraints(&def, instance.values())?;
				self.store
					.write()
					.rows
					.entry(def.id.clone())
					.or_default()
					.insert(pk_key(&pk), instance.clone());
				Ok(instance)
			}
			None => self.insert(&def, instance.into_values()),
		}
	}

	fn assign_relation(
		&self,
		instance: &Instance,
		relation: &str,
		values: &[Instance],
		replace_existing: bool,
	) -> BakeryResult<()> {
		let pk = instance.pk().cloned().ok_or_else(|| {
			BakeryError::Repository(format!(
				"\"{instance}\" needs to have a value for its primary key before \
				 the relationship '{relation}' can be used."
			))
		})?;
		let rel = self.find_relation(instance.model(), relation)?;
		match &rel.kind {
			RelationKind::ManyToMany => {
				if let Some(unsaved) = values.iter().find(|value| !value.is_persisted()) {
					return Err(BakeryError::Repository(format!(
						"\"{unsaved}\" needs to be saved before it can be related"
					)));
				}
				let key = (instance.model().clone(), pk_key(&pk), relation.to_string());
				let mut store = self.store.write();
				let linked = store.links.entry(key).or_default();
				if replace_existing {
					linked.clear();
				}
				linked.extend(values.iter().cloned());
			}
			RelationKind::ReverseForeignKey { field } => {
				for value in values {
					let mut row = value.clone();
					row.set(field.clone(), instance.clone());
					self.save(row)?;
				}
			}
			other => {
				return Err(BakeryError::Repository(format!(
					"cannot assign values to {relation} ({other:?})"
				)));
			}
		}
		self.store.write().relation_events.push(RelationEvent {
			model: instance.model().clone(),
			relation: relation.to_string(),
			count: values.len(),
			replaced: replace_existing,
		});
		Ok(())
	}

	fn fetch_by_identity(
		&self,
		model: &ModelId,
		pk: &Value,
		manager: Option<&str>,
	) -> BakeryResult<Instance> {
		let def = self.schema.require(model)?;
		if let Some(manager) = manager
			&& !def.managers.iter().any(|name| name == manager)
		{
			return Err(BakeryError::Repository(format!(
				"{model} has no manager named '{manager}'"
			)));
		}
		self.store.write().fetches += 1;
		self.row(model, pk).ok_or_else(|| {
			BakeryError::Repository(format!("{model} matching query does not exist ({pk})"))
		})
	}

	fn filter(&self, model: &ModelId, attrs: &IndexMap<String, Value>) -> BakeryResult<Vec<Instance>> {
		self.schema.require(model)?;
		Ok(self
			.all(model)
			.into_iter()
			.filter(|row| {
				attrs
					.iter()
					.all(|(name, expected)| same_value(row.get(name), expected))
			})
			.collect())
	}

	fn count(&self, model: &ModelId) -> BakeryResult<usize> {
		Ok(self
			.store
			.read()
			.rows
			.get(model)
			.map_or(0, IndexMap::len))
	}
}

//! Model resolution.
//!
//! Resolves a [`ModelRef`] to a [`ModelId`]. Bare names are looked up
//! case-insensitively in an index built once from every namespace known
//! to the schema provider.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{BakeryError, BakeryResult};
use crate::schema::{ModelId, SchemaProvider};

/// Reference to a model: a resolved identity or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
	/// Already-resolved model, returned unchanged.
	Id(ModelId),
	/// `"namespace.Name"` or bare `"Name"`.
	Name(String),
}

impl From<ModelId> for ModelRef {
	fn from(id: ModelId) -> Self {
		ModelRef::Id(id)
	}
}

impl From<&ModelId> for ModelRef {
	fn from(id: &ModelId) -> Self {
		ModelRef::Id(id.clone())
	}
}

impl From<&str> for ModelRef {
	fn from(name: &str) -> Self {
		ModelRef::Name(name.to_string())
	}
}

impl From<String> for ModelRef {
	fn from(name: String) -> Self {
		ModelRef::Name(name)
	}
}

#[derive(Debug, Default)]
struct NameIndex {
	unique: HashMap<String, ModelId>,
	ambiguous: HashMap<String, BTreeSet<String>>,
}

/// Resolves model references against a schema provider.
pub struct ModelResolver {
	schema: Arc<dyn SchemaProvider>,
	index: OnceCell<NameIndex>,
}

impl ModelResolver {
	/// Creates a resolver. The bare-name index is built on first use.
	pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
		Self {
			schema,
			index: OnceCell::new(),
		}
	}

	/// Resolves a model reference.
	///
	/// # Errors
	///
	/// Returns [`BakeryError::ModelNotFound`] when nothing matches and
	/// [`BakeryError::AmbiguousModelName`] when a bare name exists in more
	/// than one namespace.
	///
	/// # Example
	///
	/// ```ignore
	/// let resolver = ModelResolver::new(schema);
	/// let person = resolver.get_model("generic.Person")?;
	/// assert_eq!(resolver.get_model("person")?, person);
	/// ```
	pub fn get_model(&self, model: impl Into<ModelRef>) -> BakeryResult<ModelId> {
		match model.into() {
			ModelRef::Id(id) => Ok(id),
			ModelRef::Name(name) => match name.split_once('.') {
				Some((namespace, bare)) => self
					.schema
					.find_model(namespace, bare)
					.ok_or_else(|| BakeryError::ModelNotFound(name.clone())),
				None => self.get_unique(&name),
			},
		}
	}

	fn get_unique(&self, name: &str) -> BakeryResult<ModelId> {
		let index = self.index.get_or_init(|| self.build_index());
		let key = name.to_lowercase();
		if let Some(namespaces) = index.ambiguous.get(&key) {
			tracing::debug!(model = name, ?namespaces, "ambiguous model name");
			return Err(BakeryError::AmbiguousModelName(name.to_string()));
		}
		index
			.unique
			.get(&key)
			.cloned()
			.ok_or_else(|| BakeryError::ModelNotFound(name.to_string()))
	}

	fn build_index(&self) -> NameIndex {
		let mut index = NameIndex::default();
		for (namespace, models) in self.schema.models_by_namespace() {
			for (name, model) in models {
				let key = name.to_lowercase();
				if let Some(namespaces) = index.ambiguous.get_mut(&key) {
					namespaces.insert(namespace.clone());
				} else if let Some(existing) = index.unique.remove(&key) {
					index.ambiguous.insert(
						key,
						BTreeSet::from([existing.namespace().to_string(), namespace.clone()]),
					);
				} else {
					index.unique.insert(key, model);
				}
			}
		}
		tracing::debug!(
			unique = index.unique.len(),
			ambiguous = index.ambiguous.len(),
			"built model name index"
		);
		index
	}
}

//! Recipes: reusable attribute templates bound to a model.
//!
//! A [`Recipe`] maps attribute names to template values. Building a recipe
//! resolves the template into overrides and hands them to the bakery, so
//! skip rules, relation wiring and errors are the same as for
//! [`Bakery::make`].
//!
//! Template values are literals, lazy values or steppers
//! ([`RecipeAttr::Attr`]), references to another recipe building a foreign
//! key ([`foreign_key`]), or lists of recipes building a related set
//! ([`related`]).
//!
//! Each recipe keeps a private cursor per stepper attribute, so repeated
//! builds consume consecutive values. The cursors restart when the model's
//! row count drops back to zero, as it does when a fresh database is used.
//!
//! ```ignore
//! let person = Recipe::new("generic.Person").set("name", "John Doe");
//! let dog = Recipe::new("generic.Dog")
//!     .set("breed", "Pug")
//!     .set("owner", foreign_key(&person));
//! let rex = dog.make(&bakery, attrs! { "owner__name" => "Bob" })?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::attrs::{AttrValue, Attrs};
use crate::bakery::{Baked, Bakery, MakeOptions, PrepareOptions, check_quantity};
use crate::error::{BakeryError, BakeryResult};
use crate::resolver::ModelRef;
use crate::stepper::Stepper;
use crate::value::{FileContent, Instance, Value};

/// Reference to a recipe, either direct or by registered name.
///
/// Names are resolved against the bakery's [`RecipeRegistry`] when the
/// referencing recipe is built, so recipes can refer to each other before
/// they are registered.
#[derive(Clone)]
pub enum RecipeRef {
	/// Direct reference.
	Recipe(Box<Recipe>),
	/// Registered name.
	Named(String),
}

impl RecipeRef {
	fn resolve(&self, bakery: &Bakery) -> BakeryResult<Recipe> {
		match self {
			RecipeRef::Recipe(recipe) => Ok(recipe.as_ref().clone()),
			RecipeRef::Named(name) => bakery.recipes().get(name),
		}
	}
}

impl fmt::Debug for RecipeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RecipeRef::Recipe(recipe) => f.debug_tuple("Recipe").field(&recipe.model).finish(),
			RecipeRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
		}
	}
}

impl From<Recipe> for RecipeRef {
	fn from(recipe: Recipe) -> Self {
		RecipeRef::Recipe(Box::new(recipe))
	}
}

impl From<&Recipe> for RecipeRef {
	fn from(recipe: &Recipe) -> Self {
		RecipeRef::Recipe(Box::new(recipe.clone()))
	}
}

impl From<&str> for RecipeRef {
	fn from(name: &str) -> Self {
		RecipeRef::Named(name.to_string())
	}
}

impl From<String> for RecipeRef {
	fn from(name: String) -> Self {
		RecipeRef::Named(name)
	}
}

/// One template value.
#[derive(Clone, Debug)]
pub enum RecipeAttr {
	/// Literal, lazy value or stepper.
	Attr(AttrValue),
	/// Foreign key built from another recipe.
	ForeignKey(RecipeRef),
	/// Related set built from other recipes.
	Related(Vec<RecipeRef>),
}

/// Foreign key template built from `recipe`.
///
/// The referenced recipe is persisted when the parent is made, and only
/// prepared when the parent is prepared without `save_related`.
pub fn foreign_key(recipe: impl Into<RecipeRef>) -> RecipeAttr {
	RecipeAttr::ForeignKey(recipe.into())
}

/// Related-set template building one instance per recipe.
pub fn related<I, R>(recipes: I) -> RecipeAttr
where
	I: IntoIterator<Item = R>,
	R: Into<RecipeRef>,
{
	RecipeAttr::Related(recipes.into_iter().map(Into::into).collect())
}

macro_rules! impl_from_recipe_attr {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for RecipeAttr {
				fn from(value: $ty) -> Self {
					RecipeAttr::Attr(value.into())
				}
			}
		)*
	};
}

impl_from_recipe_attr!(
	AttrValue,
	Stepper,
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

#[derive(Debug, Default)]
struct RecipeState {
	cursors: HashMap<String, Stepper>,
	last_rows: Option<usize>,
}

/// Attribute template bound to a model.
///
/// Clones share the stepper cursors. [`Recipe::extend`] creates a recipe
/// with cursors of its own.
#[derive(Clone)]
pub struct Recipe {
	model: ModelRef,
	mapping: Arc<IndexMap<String, RecipeAttr>>,
	state: Arc<Mutex<RecipeState>>,
}

impl Recipe {
	/// Creates an empty recipe for a model.
	pub fn new(model: impl Into<ModelRef>) -> Self {
		Self {
			model: model.into(),
			mapping: Arc::new(IndexMap::new()),
			state: Arc::default(),
		}
	}

	/// Adds a template value, builder style.
	pub fn set(mut self, name: impl Into<String>, value: impl Into<RecipeAttr>) -> Self {
		Arc::make_mut(&mut self.mapping).insert(name.into(), value.into());
		self.state = Arc::default();
		self
	}

	/// New recipe with `attrs` merged over this recipe's template.
	///
	/// This recipe is left unchanged.
	pub fn extend(&self, attrs: Attrs) -> Recipe {
		let mut mapping = self.mapping.as_ref().clone();
		for (name, value) in attrs {
			mapping.insert(name, RecipeAttr::Attr(value));
		}
		Self {
			model: self.model.clone(),
			mapping: Arc::new(mapping),
			state: Arc::default(),
		}
	}

	/// Model the recipe builds.
	pub fn model(&self) -> &ModelRef {
		&self.model
	}

	/// Template value of an attribute.
	pub fn get(&self, name: &str) -> Option<&RecipeAttr> {
		self.mapping.get(name)
	}

	/// Builds and persists one instance.
	pub fn make(&self, bakery: &Bakery, attrs: Attrs) -> BakeryResult<Instance> {
		let attrs = self.mapping(bakery, attrs, true)?;
		let instance = bakery.make(self.model.clone(), attrs)?;
		self.record_rows(bakery)?;
		Ok(instance)
	}

	/// Builds and persists instances with explicit options.
	pub fn make_with(&self, bakery: &Bakery, options: MakeOptions, attrs: Attrs) -> BakeryResult<Baked> {
		check_quantity(options.quantity())?;
		let attrs = self.mapping(bakery, attrs, true)?;
		let baked = bakery.make_with(self.model.clone(), options, attrs)?;
		self.record_rows(bakery)?;
		Ok(baked)
	}

	/// Builds one instance without persisting it.
	pub fn prepare(&self, bakery: &Bakery, attrs: Attrs) -> BakeryResult<Instance> {
		let attrs = self.mapping(bakery, attrs, false)?;
		bakery.prepare(self.model.clone(), attrs)
	}

	/// Builds instances without persisting them, with explicit options.
	pub fn prepare_with(
		&self,
		bakery: &Bakery,
		options: PrepareOptions,
		attrs: Attrs,
	) -> BakeryResult<Baked> {
		check_quantity(options.quantity())?;
		let attrs = self.mapping(bakery, attrs, options.save_related())?;
		bakery.prepare_with(self.model.clone(), options, attrs)
	}

	fn mapping(&self, bakery: &Bakery, attrs: Attrs, save_related: bool) -> BakeryResult<Attrs> {
		let (direct, mut related) = attrs.split_related();
		let restart = self.observe_rows(bakery)?;

		let mut resolved = Attrs::new();
		for (name, template) in self.mapping.iter() {
			if direct.contains(name) {
				continue;
			}
			match template {
				RecipeAttr::Attr(AttrValue::Stepper(stepper)) => {
					resolved.insert(name.clone(), self.cursor(name, stepper, restart));
				}
				RecipeAttr::Attr(value) => resolved.insert(name.clone(), value.clone()),
				RecipeAttr::ForeignKey(reference) => {
					let recipe = reference.resolve(bakery)?;
					let scoped = related.take_scoped(name);
					let instance = if save_related {
						recipe.make(bakery, scoped)?
					} else {
						recipe.prepare(bakery, scoped)?
					};
					resolved.insert(name.clone(), instance);
				}
				RecipeAttr::Related(references) => {
					let instances = references
						.iter()
						.map(|reference| reference.resolve(bakery)?.make(bakery, Attrs::new()))
						.collect::<BakeryResult<Vec<_>>>()?;
					resolved.insert(name.clone(), instances);
				}
			}
		}
		resolved.merge(direct);
		resolved.merge(related);
		Ok(resolved)
	}

	fn has_steppers(&self) -> bool {
		self.mapping
			.values()
			.any(|template| matches!(template, RecipeAttr::Attr(AttrValue::Stepper(_))))
	}

	fn rows(&self, bakery: &Bakery) -> BakeryResult<usize> {
		let model = bakery.get_model(self.model.clone())?;
		bakery.repository().count(&model)
	}

	/// Reports whether the model's rows were removed since the last make.
	fn observe_rows(&self, bakery: &Bakery) -> BakeryResult<bool> {
		if !self.has_steppers() {
			return Ok(false);
		}
		let rows = self.rows(bakery)?;
		let mut state = self.state.lock();
		let restart = rows == 0 && state.last_rows.is_some_and(|last| last > 0);
		if restart {
			state.last_rows = Some(0);
		}
		Ok(restart)
	}

	fn record_rows(&self, bakery: &Bakery) -> BakeryResult<()> {
		if self.has_steppers() {
			let rows = self.rows(bakery)?;
			self.state.lock().last_rows = Some(rows);
		}
		Ok(())
	}

	fn cursor(&self, name: &str, template: &Stepper, restart: bool) -> Stepper {
		let mut state = self.state.lock();
		if restart || !state.cursors.contains_key(name) {
			tracing::debug!(attr = name, restart, "starting recipe stepper");
			state.cursors.insert(name.to_string(), template.fork());
		}
		state
			.cursors
			.get(name)
			.cloned()
			.unwrap_or_else(|| template.fork())
	}
}

impl fmt::Debug for Recipe {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Recipe")
			.field("model", &self.model)
			.field("attrs", &self.mapping.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Recipes registered by name.
#[derive(Debug, Default)]
pub struct RecipeRegistry {
	recipes: RwLock<IndexMap<String, Recipe>>,
}

impl RecipeRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a recipe, replacing any previous one with the same name.
	pub fn register(&self, name: impl Into<String>, recipe: Recipe) {
		let name = name.into();
		if self.recipes.write().insert(name.clone(), recipe).is_some() {
			tracing::warn!(name = %name, "replacing registered recipe");
		}
	}

	/// Returns a registered recipe. The returned recipe shares its cursors
	/// with the registered one.
	///
	/// # Errors
	///
	/// Returns [`BakeryError::RecipeNotFound`] for unknown names.
	pub fn get(&self, name: &str) -> BakeryResult<Recipe> {
		self.recipes
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| BakeryError::RecipeNotFound(name.to_string()))
	}

	/// Checks if a recipe is registered.
	pub fn has(&self, name: &str) -> bool {
		self.recipes.read().contains_key(name)
	}

	/// Registered names in registration order.
	pub fn names(&self) -> Vec<String> {
		self.recipes.read().keys().cloned().collect()
	}

	/// Returns the number of registered recipes.
	pub fn len(&self) -> usize {
		self.recipes.read().len()
	}

	/// Returns true if no recipes are registered.
	pub fn is_empty(&self) -> bool {
		self.recipes.read().is_empty()
	}

	/// Removes every recipe.
	pub fn clear(&self) {
		self.recipes.write().clear();
	}
}

//! The bakery context and its `make`/`prepare` entry points.
//!
//! A [`Bakery`] ties the two collaborators (schema provider and repository)
//! to the resolver, the settings, the recipe registry and the builder
//! factory. It is cheap to clone; clones share all state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::attrs::{Attrs, FillOptional};
use crate::baker::{BakerOptions, Baker, BuildRequest, ModelBuilder};
use crate::custom::{self, BuilderFactory};
use crate::error::{BakeryError, BakeryResult};
use crate::generators::{self, Generator};
use crate::recipe::{Recipe, RecipeRegistry};
use crate::repository::{Repository, SaveOptions};
use crate::resolver::{ModelRef, ModelResolver};
use crate::schema::{Kind, ModelId, SchemaProvider};
use crate::settings::BakerySettings;
use crate::value::Instance;

/// Options of a persisting build.
#[derive(Debug, Clone, Default)]
pub struct MakeOptions {
	quantity: Option<usize>,
	make_m2m: bool,
	create_files: Option<bool>,
	fill_optional: FillOptional,
	save_options: SaveOptions,
	refresh_after_create: bool,
	from_manager: Option<String>,
}

impl MakeOptions {
	/// Builds one instance with default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds `quantity` instances.
	pub fn with_quantity(mut self, quantity: usize) -> Self {
		self.quantity = Some(quantity);
		self
	}

	/// Builds many-valued relations that are not overridden.
	pub fn with_make_m2m(mut self, make_m2m: bool) -> Self {
		self.make_m2m = make_m2m;
		self
	}

	/// Generates file-kind attributes, overriding the settings default.
	pub fn with_create_files(mut self, create_files: bool) -> Self {
		self.create_files = Some(create_files);
		self
	}

	/// Fills optional attributes.
	pub fn with_fill_optional(mut self, fill_optional: impl Into<FillOptional>) -> Self {
		self.fill_optional = fill_optional.into();
		self
	}

	/// Options forwarded to the repository's create operation.
	pub fn with_save_options(mut self, save_options: SaveOptions) -> Self {
		self.save_options = save_options;
		self
	}

	/// Re-fetches each row after it is created.
	pub fn with_refresh_after_create(mut self, refresh: bool) -> Self {
		self.refresh_after_create = refresh;
		self
	}

	/// Re-fetches each row through a named manager.
	pub fn with_from_manager(mut self, manager: impl Into<String>) -> Self {
		self.from_manager = Some(manager.into());
		self
	}

	/// Requested quantity, if any.
	pub fn quantity(&self) -> Option<usize> {
		self.quantity
	}
}

/// Options of a non-persisting build.
#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
	quantity: Option<usize>,
	save_related: bool,
	fill_optional: FillOptional,
	create_files: Option<bool>,
}

impl PrepareOptions {
	/// Builds one instance with default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds `quantity` instances.
	pub fn with_quantity(mut self, quantity: usize) -> Self {
		self.quantity = Some(quantity);
		self
	}

	/// Persists single-valued related instances.
	pub fn with_save_related(mut self, save_related: bool) -> Self {
		self.save_related = save_related;
		self
	}

	/// Fills optional attributes.
	pub fn with_fill_optional(mut self, fill_optional: impl Into<FillOptional>) -> Self {
		self.fill_optional = fill_optional.into();
		self
	}

	/// Generates file-kind attributes, overriding the settings default.
	pub fn with_create_files(mut self, create_files: bool) -> Self {
		self.create_files = Some(create_files);
		self
	}

	/// Whether related instances are persisted.
	pub fn save_related(&self) -> bool {
		self.save_related
	}

	/// Requested quantity, if any.
	pub fn quantity(&self) -> Option<usize> {
		self.quantity
	}
}

/// Result of a build: one instance, or a batch when a quantity was given.
#[derive(Debug, Clone, PartialEq)]
pub enum Baked {
	/// Built without a quantity.
	One(Instance),
	/// Built with a quantity.
	Many(Vec<Instance>),
}

impl Baked {
	/// The single instance, `None` for a batch.
	pub fn into_one(self) -> Option<Instance> {
		match self {
			Baked::One(instance) => Some(instance),
			Baked::Many(_) => None,
		}
	}

	/// All instances in build order.
	pub fn into_vec(self) -> Vec<Instance> {
		match self {
			Baked::One(instance) => vec![instance],
			Baked::Many(instances) => instances,
		}
	}

	/// Number of instances.
	pub fn len(&self) -> usize {
		match self {
			Baked::One(_) => 1,
			Baked::Many(instances) => instances.len(),
		}
	}

	/// Returns true for an empty batch.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

pub(crate) fn single(mut instances: Vec<Instance>) -> BakeryResult<Instance> {
	match instances.len() {
		1 => Ok(instances.remove(0)),
		n => Err(BakeryError::InvalidQuantity(format!(
			"expected one instance, built {n}"
		))),
	}
}

struct BakeryInner {
	schema: Arc<dyn SchemaProvider>,
	repository: Arc<dyn Repository>,
	resolver: ModelResolver,
	settings: BakerySettings,
	settings_mapping: HashMap<Kind, Generator>,
	builder: Option<Arc<dyn BuilderFactory>>,
	recipes: RecipeRegistry,
}

/// Entry point for building instances.
///
/// # Example
///
/// ```ignore
/// let bakery = Bakery::new(schema, repository);
/// let person = bakery.make("generic.Person", attrs! { "name" => "Mike" })?;
/// let dogs = bakery
///     .make_with("Dog", MakeOptions::new().with_quantity(3), attrs! {})?
///     .into_vec();
/// ```
#[derive(Clone)]
pub struct Bakery {
	inner: Arc<BakeryInner>,
}

/// Configures a [`Bakery`].
pub struct BakeryBuilder {
	schema: Arc<dyn SchemaProvider>,
	repository: Arc<dyn Repository>,
	settings: BakerySettings,
	builder: Option<Arc<dyn BuilderFactory>>,
}

impl BakeryBuilder {
	/// Applies settings.
	pub fn with_settings(mut self, settings: BakerySettings) -> Self {
		self.settings = settings;
		self
	}

	/// Replaces the default builder. Takes precedence over
	/// [`BakerySettings::custom_builder`].
	pub fn with_custom_builder(mut self, factory: impl BuilderFactory + 'static) -> Self {
		self.builder = Some(Arc::new(factory));
		self
	}

	/// Resolves the settings and creates the bakery.
	///
	/// # Errors
	///
	/// Returns [`BakeryError::CustomBuilderNotFound`] or
	/// [`BakeryError::InvalidCustomBuilder`] for a bad custom builder, and
	/// [`BakeryError::GeneratorNotFound`] when `custom_fields_gen` names an
	/// unpublished generator.
	pub fn build(self) -> BakeryResult<Bakery> {
		let builder = match (self.builder, &self.settings.custom_builder) {
			(Some(factory), _) => {
				custom::validate("<explicit>", factory.as_ref())?;
				Some(factory)
			}
			(None, Some(name)) => Some(custom::resolve_builder(name)?),
			(None, None) => None,
		};

		let mut settings_mapping = HashMap::new();
		for (kind_name, path) in &self.settings.custom_fields_gen {
			let kind = Kind::parse(kind_name);
			if matches!(kind, Kind::Custom(_)) {
				tracing::warn!(kind = %kind_name, "custom_fields_gen names a kind outside the builtin set");
			}
			let generator =
				generators::named(path).ok_or_else(|| BakeryError::GeneratorNotFound(path.clone()))?;
			settings_mapping.insert(kind, generator);
		}

		Ok(Bakery {
			inner: Arc::new(BakeryInner {
				resolver: ModelResolver::new(Arc::clone(&self.schema)),
				schema: self.schema,
				repository: self.repository,
				settings: self.settings,
				settings_mapping,
				builder,
				recipes: RecipeRegistry::new(),
			}),
		})
	}
}

impl Bakery {
	/// Creates a bakery with default settings.
	pub fn new(schema: Arc<dyn SchemaProvider>, repository: Arc<dyn Repository>) -> Self {
		Self {
			inner: Arc::new(BakeryInner {
				resolver: ModelResolver::new(Arc::clone(&schema)),
				schema,
				repository,
				settings: BakerySettings::default(),
				settings_mapping: HashMap::new(),
				builder: None,
				recipes: RecipeRegistry::new(),
			}),
		}
	}

	/// Starts configuring a bakery.
	pub fn builder(schema: Arc<dyn SchemaProvider>, repository: Arc<dyn Repository>) -> BakeryBuilder {
		BakeryBuilder {
			schema,
			repository,
			settings: BakerySettings::default(),
			builder: None,
		}
	}

	/// Schema provider.
	pub fn schema(&self) -> &dyn SchemaProvider {
		self.inner.schema.as_ref()
	}

	/// Repository.
	pub fn repository(&self) -> &dyn Repository {
		self.inner.repository.as_ref()
	}

	/// Settings applied at construction.
	pub fn settings(&self) -> &BakerySettings {
		&self.inner.settings
	}

	/// Model resolver.
	pub fn resolver(&self) -> &ModelResolver {
		&self.inner.resolver
	}

	/// Resolves a model reference.
	pub fn get_model(&self, model: impl Into<ModelRef>) -> BakeryResult<ModelId> {
		self.inner.resolver.get_model(model)
	}

	/// Recipes registered on this bakery.
	pub fn recipes(&self) -> &RecipeRegistry {
		&self.inner.recipes
	}

	/// Registers a recipe under a name such as `"generic.person"`.
	pub fn register_recipe(&self, name: impl Into<String>, recipe: Recipe) {
		self.inner.recipes.register(name, recipe);
	}

	pub(crate) fn settings_generator(&self, kind: &Kind) -> Option<Generator> {
		self.inner.settings_mapping.get(kind).cloned()
	}

	/// Builds and persists one instance.
	///
	/// # Errors
	///
	/// Propagates resolution, generation and repository failures.
	pub fn make(&self, model: impl Into<ModelRef>, attrs: Attrs) -> BakeryResult<Instance> {
		self.make_nested(0, model.into(), MakeOptions::new(), attrs)
			.and_then(single)
	}

	/// Builds and persists instances with explicit options.
	///
	/// # Errors
	///
	/// Returns [`BakeryError::InvalidQuantity`] for a zero quantity before
	/// anything is built.
	pub fn make_with(
		&self,
		model: impl Into<ModelRef>,
		options: MakeOptions,
		attrs: Attrs,
	) -> BakeryResult<Baked> {
		let batch = options.quantity.is_some();
		let instances = self.make_nested(0, model.into(), options, attrs)?;
		if batch {
			Ok(Baked::Many(instances))
		} else {
			single(instances).map(Baked::One)
		}
	}

	/// Builds one instance without persisting it.
	pub fn prepare(&self, model: impl Into<ModelRef>, attrs: Attrs) -> BakeryResult<Instance> {
		self.prepare_nested(0, model.into(), PrepareOptions::new(), attrs)
			.and_then(single)
	}

	/// Builds instances without persisting them, with explicit options.
	pub fn prepare_with(
		&self,
		model: impl Into<ModelRef>,
		options: PrepareOptions,
		attrs: Attrs,
	) -> BakeryResult<Baked> {
		let batch = options.quantity.is_some();
		let instances = self.prepare_nested(0, model.into(), options, attrs)?;
		if batch {
			Ok(Baked::Many(instances))
		} else {
			single(instances).map(Baked::One)
		}
	}

	/// Builds and persists one instance from a registered recipe.
	pub fn make_recipe(&self, name: &str, attrs: Attrs) -> BakeryResult<Instance> {
		self.recipes().get(name)?.make(self, attrs)
	}

	/// Builds and persists instances from a registered recipe.
	pub fn make_recipe_with(
		&self,
		name: &str,
		options: MakeOptions,
		attrs: Attrs,
	) -> BakeryResult<Baked> {
		self.recipes().get(name)?.make_with(self, options, attrs)
	}

	/// Builds one unpersisted instance from a registered recipe.
	pub fn prepare_recipe(&self, name: &str, attrs: Attrs) -> BakeryResult<Instance> {
		self.recipes().get(name)?.prepare(self, attrs)
	}

	/// Builds unpersisted instances from a registered recipe.
	pub fn prepare_recipe_with(
		&self,
		name: &str,
		options: PrepareOptions,
		attrs: Attrs,
	) -> BakeryResult<Baked> {
		self.recipes().get(name)?.prepare_with(self, options, attrs)
	}

	pub(crate) fn make_nested(
		&self,
		depth: usize,
		model: ModelRef,
		options: MakeOptions,
		attrs: Attrs,
	) -> BakeryResult<Vec<Instance>> {
		let quantity = check_quantity(options.quantity)?;
		let model = self.get_model(model)?;
		let builder = self.builder_for(
			&model,
			BakerOptions {
				make_m2m: options.make_m2m,
				create_files: options.create_files.unwrap_or(self.settings().create_files),
				depth,
			},
		)?;
		let request = BuildRequest {
			attrs,
			fill_optional: options.fill_optional,
			save_options: options.save_options,
			refresh_after_create: options.refresh_after_create,
			from_manager: options.from_manager,
			save_related: true,
		};
		(0..quantity).map(|_| builder.make(request.clone())).collect()
	}

	pub(crate) fn prepare_nested(
		&self,
		depth: usize,
		model: ModelRef,
		options: PrepareOptions,
		attrs: Attrs,
	) -> BakeryResult<Vec<Instance>> {
		let quantity = check_quantity(options.quantity)?;
		let model = self.get_model(model)?;
		let builder = self.builder_for(
			&model,
			BakerOptions {
				make_m2m: false,
				create_files: options.create_files.unwrap_or(self.settings().create_files),
				depth,
			},
		)?;
		let request = BuildRequest {
			attrs,
			fill_optional: options.fill_optional,
			save_related: options.save_related,
			..BuildRequest::default()
		};
		(0..quantity).map(|_| builder.prepare(request.clone())).collect()
	}

	fn builder_for(&self, model: &ModelId, options: BakerOptions) -> BakeryResult<Box<dyn ModelBuilder>> {
		let limit = self.settings().max_recursion_depth;
		if options.depth > limit {
			return Err(BakeryError::RecursionLimitExceeded {
				model: model.qualified(),
				depth: options.depth,
			});
		}
		tracing::debug!(model = %model, depth = options.depth, "creating builder");
		match &self.inner.builder {
			Some(factory) => factory.create(self, model.clone(), options),
			None => Ok(Box::new(Baker::new(self, model)?.with_options(options))),
		}
	}
}

pub(crate) fn check_quantity(quantity: Option<usize>) -> BakeryResult<usize> {
	match quantity {
		None => Ok(1),
		Some(0) => Err(BakeryError::InvalidQuantity(
			"quantity must be a positive integer".to_string(),
		)),
		Some(n) => Ok(n),
	}
}

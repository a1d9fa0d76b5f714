//! Test-data generation for schema-described models.
//!
//! This crate builds valid model instances for tests. Callers give only the
//! attribute values a test cares about and the bakery fills in everything
//! else, creating related instances along the way:
//!
//! - **Generator Registry**: Per-kind value generators with process-wide
//!   overrides and a named catalog
//! - **Model Resolver**: Qualified or bare model names to model identities
//! - **Instance Builder**: `make` (persisted) and `prepare` (unpersisted)
//!   with relation wiring, quantities and fill-optional control
//! - **Recipes**: Reusable attribute templates with steppers and
//!   recipe-built relations
//!
//! # Features
//!
//! - `toml` - Load [`BakerySettings`] from TOML files (enabled by default)
//!
//! # Quick Start
//!
//! ```ignore
//! use model_bakery::prelude::*;
//! use std::sync::Arc;
//!
//! let schema = Arc::new(SchemaRegistry::new().with_model(
//!     ModelDef::new("generic", "Person")
//!         .attribute(AttributeDescriptor::new("name", Kind::Char).max_length(30))
//!         .attribute(AttributeDescriptor::new("age", Kind::Integer)),
//! ));
//! let repository = Arc::new(InMemoryRepository::new(Arc::clone(&schema)));
//! let bakery = Bakery::new(schema, repository);
//!
//! // Only `name` is fixed, `age` is generated
//! let person = bakery.make("generic.Person", attrs! { "name" => "Ada" })?;
//! assert!(person.is_persisted());
//!
//! // Five unpersisted people
//! let people = bakery.prepare_with(
//!     "Person",
//!     PrepareOptions::new().with_quantity(5),
//!     Attrs::new(),
//! )?;
//! ```
//!
//! ## Using Recipes
//!
//! ```ignore
//! let adult = Recipe::new("generic.Person")
//!     .set("name", seq("Person ")?)
//!     .set("age", 42);
//! bakery.register_recipe("generic.adult", adult);
//!
//! let first = bakery.make_recipe("generic.adult", Attrs::new())?;
//! assert_eq!(first.get_str("name"), Some("Person 1"));
//! ```
//!
//! # Architecture
//!
//! - [`SchemaProvider`](schema::SchemaProvider) - Model metadata source
//! - [`Repository`](repository::Repository) - Persistence backend
//! - [`Bakery`](bakery::Bakery) - Entry point holding schema, repository,
//!   settings and recipes
//! - [`Baker`](baker::Baker) - Default per-model builder, replaceable via
//!   [`BuilderFactory`](custom::BuilderFactory)
//! - [`Generator`](generators::Generator) - One attribute value source
//! - [`Recipe`](recipe::Recipe) - Attribute template
//!
//! [`memory`] provides an in-process schema registry and repository, used
//! by the crate's own tests and handy for unit tests that need no database.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attrs;
pub mod baker;
pub mod bakery;
pub mod custom;
pub mod error;
pub mod generators;
pub mod memory;
pub mod prelude;
pub mod recipe;
pub mod repository;
pub mod resolver;
pub mod schema;
pub mod settings;
pub mod stepper;
pub mod value;

// Re-export commonly used types at crate root
pub use attrs::{AttrValue, Attrs, FillOptional};
pub use bakery::{Baked, Bakery, BakeryBuilder, MakeOptions, PrepareOptions};
pub use error::{BakeryError, BakeryResult};
pub use recipe::{Recipe, foreign_key, related};
pub use settings::BakerySettings;
pub use stepper::{Stepper, cycle, iterate, seq, seq_by};
pub use value::{Instance, Value};

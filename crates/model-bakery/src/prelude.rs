//! Convenience re-exports for common usage.
//!
//! ```ignore
//! use model_bakery::prelude::*;
//! ```

// Error types
pub use crate::error::{BakeryError, BakeryResult};

// Building
pub use crate::attrs;
pub use crate::attrs::{AttrValue, Attrs, FillOptional};
pub use crate::baker::{Baker, BakerOptions, BuildRequest, ModelBuilder};
pub use crate::bakery::{Baked, Bakery, BakeryBuilder, MakeOptions, PrepareOptions};
pub use crate::custom::{BuilderFactory, BuilderOp, register_builder};
pub use crate::repository::{Repository, SaveOptions};
pub use crate::resolver::{ModelRef, ModelResolver};
pub use crate::settings::BakerySettings;

// Generators
pub use crate::generators::{Generator, GeneratorCall, Requirement};

// Recipes
pub use crate::recipe::{Recipe, RecipeAttr, RecipeRef, foreign_key, related};
pub use crate::stepper::{Stepper, cycle, iterate, seq, seq_by};

// Schema and values
pub use crate::memory::{InMemoryRepository, ModelDef, SchemaRegistry};
pub use crate::schema::{
	AttributeDescriptor, Choice, Field, IpProtocol, Kind, ModelId, RelationDescriptor,
	RelationKind, SchemaProvider, Through,
};
pub use crate::value::{FileContent, Instance, Value};

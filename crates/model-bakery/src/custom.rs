//! Custom builder factories.
//!
//! A [`BuilderFactory`] replaces the default [`Baker`](crate::baker::Baker)
//! for every build of a bakery. Factories are either passed directly to
//! [`BakeryBuilder::with_custom_builder`](crate::bakery::BakeryBuilder::with_custom_builder)
//! or registered here under a name that
//! [`BakerySettings::custom_builder`](crate::settings::BakerySettings::custom_builder)
//! refers to. Either way they are resolved once, when the bakery is built.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::baker::{BakerOptions, ModelBuilder};
use crate::bakery::Bakery;
use crate::error::{BakeryError, BakeryResult};
use crate::schema::ModelId;

/// Operation a builder supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderOp {
	/// Persisting build.
	Make,
	/// Non-persisting build.
	Prepare,
}

impl BuilderOp {
	/// Operation name.
	pub fn as_str(&self) -> &'static str {
		match self {
			BuilderOp::Make => "make",
			BuilderOp::Prepare => "prepare",
		}
	}
}

const REQUIRED_OPS: [BuilderOp; 2] = [BuilderOp::Make, BuilderOp::Prepare];

/// Creates instance builders.
pub trait BuilderFactory: Send + Sync {
	/// Creates a builder for one model.
	fn create(
		&self,
		bakery: &Bakery,
		model: ModelId,
		options: BakerOptions,
	) -> BakeryResult<Box<dyn ModelBuilder>>;

	/// Operations the created builders support. Both are required.
	fn operations(&self) -> &[BuilderOp] {
		&REQUIRED_OPS
	}
}

impl<F> BuilderFactory for F
where
	F: Fn(&Bakery, ModelId, BakerOptions) -> BakeryResult<Box<dyn ModelBuilder>> + Send + Sync,
{
	fn create(
		&self,
		bakery: &Bakery,
		model: ModelId,
		options: BakerOptions,
	) -> BakeryResult<Box<dyn ModelBuilder>> {
		self(bakery, model, options)
	}
}

static BUILDERS: Lazy<RwLock<HashMap<String, Arc<dyn BuilderFactory>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a factory under a name.
pub fn register_builder(name: impl Into<String>, factory: impl BuilderFactory + 'static) {
	let name = name.into();
	if BUILDERS.write().insert(name.clone(), Arc::new(factory)).is_some() {
		tracing::warn!(name = %name, "replacing registered custom builder");
	}
}

/// Removes a registered factory.
pub fn unregister_builder(name: &str) -> bool {
	BUILDERS.write().remove(name).is_some()
}

/// Returns true if a factory is registered under the name.
pub fn has_builder(name: &str) -> bool {
	BUILDERS.read().contains_key(name)
}

/// Looks up and validates a registered factory.
///
/// # Errors
///
/// Returns [`BakeryError::CustomBuilderNotFound`] when nothing is registered
/// under the name and [`BakeryError::InvalidCustomBuilder`] when the factory
/// does not support both operations.
pub fn resolve_builder(name: &str) -> BakeryResult<Arc<dyn BuilderFactory>> {
	let factory = BUILDERS
		.read()
		.get(name)
		.cloned()
		.ok_or_else(|| BakeryError::CustomBuilderNotFound(name.to_string()))?;
	validate(name, factory.as_ref())?;
	Ok(factory)
}

pub(crate) fn validate(name: &str, factory: &dyn BuilderFactory) -> BakeryResult<()> {
	let supported = factory.operations();
	match REQUIRED_OPS.iter().find(|op| !supported.contains(*op)) {
		Some(missing) => Err(BakeryError::InvalidCustomBuilder {
			name: name.to_string(),
			missing: missing.as_str().to_string(),
		}),
		None => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::baker::Baker;
	use rstest::rstest;
	use serial_test::serial;

	struct MakeOnly;

	impl BuilderFactory for MakeOnly {
		fn create(
			&self,
			bakery: &Bakery,
			model: ModelId,
			options: BakerOptions,
		) -> BakeryResult<Box<dyn ModelBuilder>> {
			Ok(Box::new(Baker::new(bakery, model)?.with_options(options)))
		}

		fn operations(&self) -> &[BuilderOp] {
			&[BuilderOp::Make]
		}
	}

	fn baker_factory(
		bakery: &Bakery,
		model: ModelId,
		options: BakerOptions,
	) -> BakeryResult<Box<dyn ModelBuilder>> {
		Ok(Box::new(Baker::new(bakery, model)?.with_options(options)))
	}

	#[rstest]
	#[serial(builders)]
	fn test_resolve_registered_builder() {
		register_builder("tests.custom.baker", baker_factory);
		assert!(resolve_builder("tests.custom.baker").is_ok());
		assert!(unregister_builder("tests.custom.baker"));
		assert!(!has_builder("tests.custom.baker"));
	}

	#[rstest]
	#[serial(builders)]
	fn test_missing_builder() {
		let error = resolve_builder("tests.custom.missing").err().unwrap();
		assert_eq!(
			error.to_string(),
			"Could not find custom builder 'tests.custom.missing'"
		);
	}

	#[rstest]
	#[serial(builders)]
	fn test_builder_without_prepare() {
		register_builder("tests.custom.make_only", MakeOnly);
		let error = resolve_builder("tests.custom.make_only").err().unwrap();
		assert!(matches!(
			error,
			BakeryError::InvalidCustomBuilder { ref missing, .. } if missing == "prepare"
		));
		unregister_builder("tests.custom.make_only");
	}
}

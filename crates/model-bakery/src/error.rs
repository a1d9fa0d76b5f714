//! Error types for fixture construction.
//!
//! Every failure is fail-fast: errors propagate unchanged to the caller and
//! nothing is retried.

use thiserror::Error;

/// Errors that can occur while resolving models, generating values or
/// building instances.
#[derive(Debug, Error)]
pub enum BakeryError {
	/// The identifier does not resolve to any known model.
	#[error("Could not find model '{0}'.")]
	ModelNotFound(String),

	/// A bare model name exists in more than one namespace.
	#[error("{0} is a model in more than one app. Use the form \"app.model\".")]
	AmbiguousModelName(String),

	/// No generator is registered for the attribute's kind.
	#[error("{field}: {kind} is not supported by bakery.")]
	UnsupportedAttributeKind {
		/// Attribute being generated.
		field: String,
		/// Kind that has no generator.
		kind: String,
	},

	/// The requested repeat count is not a positive integer.
	#[error("Invalid quantity: {0}")]
	InvalidQuantity(String),

	/// A stepper override was advanced past its last value.
	#[error("{0} iterator is empty.")]
	IteratorExhausted(String),

	/// The configured custom builder name is not registered.
	#[error("Could not find custom builder '{0}'")]
	CustomBuilderNotFound(String),

	/// The configured custom builder lacks a required capability.
	#[error("Custom builder classes must have a \"{missing}\" function ({name})")]
	InvalidCustomBuilder {
		/// Registered builder name.
		name: String,
		/// Missing operation.
		missing: String,
	},

	/// No recipe is registered under the name.
	#[error("Could not find recipe '{0}'")]
	RecipeNotFound(String),

	/// `_fill_optional` names attributes the model does not have.
	#[error("_fill_optional field(s) {fields:?} are not related to model {model}")]
	InvalidFillOptional {
		/// Offending attribute names.
		fields: Vec<String>,
		/// Model being built.
		model: String,
	},

	/// A generator requirement names a property the descriptor lacks.
	#[error("'{field}' has no property '{property}'")]
	UnknownFieldProperty {
		/// Attribute being generated.
		field: String,
		/// Requested property.
		property: String,
	},

	/// A generator requirement produced an unusable binding.
	#[error("Required value '{0}' is of wrong type")]
	InvalidRequirement(String),

	/// An override value has the wrong shape for its attribute.
	#[error("Invalid value for '{attr}': expected {expected}")]
	InvalidOverride {
		/// Attribute name.
		attr: String,
		/// Expected shape.
		expected: String,
	},

	/// A sequence start value cannot be advanced by the increment.
	#[error("Invalid sequence: {0}")]
	InvalidSequence(String),

	/// Relation construction nested deeper than the configured limit.
	#[error("Recursion limit exceeded while building {model} (depth {depth})")]
	RecursionLimitExceeded {
		/// Model that would have been built.
		model: String,
		/// Depth reached.
		depth: usize,
	},

	/// A generator path is not present in the generator catalog.
	#[error("Could not find generator '{0}'")]
	GeneratorNotFound(String),

	/// The repository collaborator failed.
	#[error("Repository error: {0}")]
	Repository(String),

	/// Settings could not be applied.
	#[error("Settings error: {0}")]
	Settings(String),

	/// TOML settings could not be parsed.
	#[cfg(feature = "toml")]
	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	/// JSON settings could not be parsed.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Result type alias for bakery operations.
pub type BakeryResult<T> = Result<T, BakeryError>;

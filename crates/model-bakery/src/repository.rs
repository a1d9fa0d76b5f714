//! Persistence collaborator interface.

use indexmap::IndexMap;

use crate::error::BakeryResult;
use crate::schema::ModelId;
use crate::value::{Instance, Value};

/// Extra arguments forwarded to [`Repository::create`].
///
/// The engine does not interpret them; they are handed to the persistence
/// layer unchanged (e.g. a target database alias).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOptions {
	options: IndexMap<String, Value>,
}

impl SaveOptions {
	/// Creates empty save options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an option.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.options.insert(name.into(), value.into());
		self
	}

	/// Returns an option.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.options.get(name)
	}

	/// Returns true when no options are set.
	pub fn is_empty(&self) -> bool {
		self.options.is_empty()
	}
}

/// Persistence collaborator.
///
/// Every operation is synchronous. Errors are passed through to the caller
/// unchanged.
pub trait Repository: Send + Sync {
	/// Persists a new row and returns it with an identity token.
	fn create(
		&self,
		model: &ModelId,
		attrs: IndexMap<String, Value>,
		options: &SaveOptions,
	) -> BakeryResult<Instance>;

	/// Builds an in-memory instance without persisting it.
	fn instantiate_unpersisted(
		&self,
		model: &ModelId,
		attrs: IndexMap<String, Value>,
	) -> BakeryResult<Instance>;

	/// Persists an instance that has no identity token yet.
	fn save(&self, instance: Instance) -> BakeryResult<Instance>;

	/// Assigns the values of a many-valued or reverse relation.
	///
	/// With `replace_existing`, previously related values are cleared first.
	fn assign_relation(
		&self,
		instance: &Instance,
		relation: &str,
		values: &[Instance],
		replace_existing: bool,
	) -> BakeryResult<()>;

	/// Fetches a persisted row by identity token.
	///
	/// `manager` names an alternate manager to fetch through.
	fn fetch_by_identity(
		&self,
		model: &ModelId,
		pk: &Value,
		manager: Option<&str>,
	) -> BakeryResult<Instance>;

	/// Rows whose attributes equal every given value.
	fn filter(&self, model: &ModelId, attrs: &IndexMap<String, Value>) -> BakeryResult<Vec<Instance>>;

	/// Number of persisted rows of a model.
	fn count(&self, model: &ModelId) -> BakeryResult<usize>;
}

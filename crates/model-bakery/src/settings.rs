//! Bakery settings.
//!
//! Settings are layered, lowest precedence first: [`BakerySettings::default`],
//! a TOML document, then `BAKERY_*` environment variables. They are applied
//! once when a [`Bakery`](crate::bakery::Bakery) is built.
//!
//! ## Example
//!
//! ```toml
//! custom_builder = "tenant"
//! max_many_quantity = 3
//!
//! [custom_fields_gen]
//! "tests.fields.CustomField" = "tests.generators.gen_value"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{BakeryError, BakeryResult};

/// Prefix of environment variables read by [`BakerySettings::from_env`].
pub const ENV_PREFIX: &str = "BAKERY_";

const KNOWN_KEYS: &[&str] = &[
	"custom_builder",
	"custom_fields_gen",
	"max_many_quantity",
	"max_recursion_depth",
	"content_type_model",
	"create_files",
];

/// Process-wide bakery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakerySettings {
	/// Name of a registered custom builder factory replacing the default
	/// builder.
	pub custom_builder: Option<String>,
	/// Kind name to named generator path.
	pub custom_fields_gen: IndexMap<String, String>,
	/// Number of instances built for a many-valued relation.
	pub max_many_quantity: usize,
	/// Nesting cap for relation construction.
	pub max_recursion_depth: usize,
	/// Model treated as the content-type marker.
	pub content_type_model: String,
	/// Generate file-kind attributes by default.
	pub create_files: bool,
}

impl Default for BakerySettings {
	fn default() -> Self {
		Self {
			custom_builder: None,
			custom_fields_gen: IndexMap::new(),
			max_many_quantity: 5,
			max_recursion_depth: 16,
			content_type_model: "contenttypes.ContentType".to_string(),
			create_files: false,
		}
	}
}

impl BakerySettings {
	/// Default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Names the custom builder factory.
	pub fn with_custom_builder(mut self, name: impl Into<String>) -> Self {
		self.custom_builder = Some(name.into());
		self
	}

	/// Maps a kind to a named generator.
	pub fn with_fields_gen(mut self, kind: impl Into<String>, path: impl Into<String>) -> Self {
		self.custom_fields_gen.insert(kind.into(), path.into());
		self
	}

	/// Sets the many-valued relation quantity.
	pub fn with_max_many_quantity(mut self, quantity: usize) -> Self {
		self.max_many_quantity = quantity;
		self
	}

	/// Sets the recursion cap.
	pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
		self.max_recursion_depth = depth;
		self
	}

	/// Sets the content-type marker model.
	pub fn with_content_type_model(mut self, model: impl Into<String>) -> Self {
		self.content_type_model = model.into();
		self
	}

	/// Enables file generation by default.
	pub fn with_create_files(mut self, create_files: bool) -> Self {
		self.create_files = create_files;
		self
	}

	/// Parses settings from a TOML document. Missing keys keep their defaults.
	#[cfg(feature = "toml")]
	pub fn from_toml_str(content: &str) -> BakeryResult<Self> {
		Ok(toml::from_str(content)?)
	}

	/// Reads settings from a TOML file.
	#[cfg(feature = "toml")]
	pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> BakeryResult<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Default settings overlaid with `BAKERY_*` environment variables.
	pub fn from_env() -> BakeryResult<Self> {
		Self::default().with_env()
	}

	/// Overlays `BAKERY_*` environment variables.
	pub fn with_env(self) -> BakeryResult<Self> {
		self.with_vars(std::env::vars())
	}

	/// Default settings overlaid with explicit variables.
	pub fn from_vars<I, K, V>(vars: I) -> BakeryResult<Self>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self::default().with_vars(vars)
	}

	/// Overlays variables named like environment variables (`BAKERY_*`).
	///
	/// Variables outside the prefix are ignored.
	pub fn with_vars<I, K, V>(self, vars: I) -> BakeryResult<Self>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let overlay = EnvSource::new().with_prefix(ENV_PREFIX).parse(vars)?;
		if overlay.is_empty() {
			return Ok(self);
		}
		let mut merged = serde_json::to_value(&self)?;
		if let JsonValue::Object(map) = &mut merged {
			for (key, value) in overlay {
				if !KNOWN_KEYS.contains(&key.as_str()) {
					tracing::warn!(key = %key, "ignoring unknown bakery setting");
					continue;
				}
				map.insert(key, value);
			}
		}
		serde_json::from_value(merged).map_err(|e| BakeryError::Settings(e.to_string()))
	}
}

/// Environment variable settings source.
///
/// Keys are stripped of the prefix and lowercased. Integer and boolean
/// values are parsed; `custom_fields_gen` takes `Kind=path` pairs separated
/// by commas.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
	prefix: Option<String>,
}

impl EnvSource {
	/// Creates a source reading every variable.
	pub fn new() -> Self {
		Self::default()
	}

	/// Only reads variables starting with `prefix`.
	///
	/// # Examples
	///
	/// ```
	/// use model_bakery::settings::EnvSource;
	///
	/// let source = EnvSource::new().with_prefix("BAKERY_");
	/// let values = source.parse([("BAKERY_MAX_MANY_QUANTITY", "3")]).unwrap();
	/// assert_eq!(values["max_many_quantity"], 3);
	/// ```
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	/// Reads the process environment.
	pub fn load(&self) -> BakeryResult<IndexMap<String, JsonValue>> {
		self.parse(std::env::vars())
	}

	/// Parses explicit variables.
	pub fn parse<I, K, V>(&self, vars: I) -> BakeryResult<IndexMap<String, JsonValue>>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut config = IndexMap::new();
		for (key, value) in vars {
			let key: String = key.into();
			let value: String = value.into();
			let clean_key = match &self.prefix {
				Some(prefix) => match key.strip_prefix(prefix.as_str()) {
					Some(rest) => rest,
					None => continue,
				},
				None => key.as_str(),
			};
			let lower_key = clean_key.to_lowercase();

			let parsed = if lower_key == "custom_fields_gen" {
				parse_pairs(&value)?
			} else if lower_key == "custom_builder" || lower_key == "content_type_model" {
				JsonValue::String(value)
			} else if let Ok(num) = value.parse::<i64>() {
				JsonValue::Number(num.into())
			} else {
				match value.trim().to_lowercase().as_str() {
					"true" | "yes" | "on" => JsonValue::Bool(true),
					"false" | "no" | "off" => JsonValue::Bool(false),
					_ => JsonValue::String(value),
				}
			};
			config.insert(lower_key, parsed);
		}
		Ok(config)
	}
}

fn parse_pairs(value: &str) -> BakeryResult<JsonValue> {
	let mut map = serde_json::Map::new();
	for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
		let (kind, path) = pair.split_once('=').ok_or_else(|| {
			BakeryError::Settings(format!("expected Kind=path in custom_fields_gen, got '{pair}'"))
		})?;
		map.insert(
			kind.trim().to_string(),
			JsonValue::String(path.trim().to_string()),
		);
	}
	Ok(JsonValue::Object(map))
}

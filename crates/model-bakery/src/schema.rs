//! Model schema descriptors and the schema provider interface.
//!
//! The engine never inspects model types directly. A [`SchemaProvider`]
//! enumerates each model's [`AttributeDescriptor`]s and
//! [`RelationDescriptor`]s, and every generator lookup is keyed by the
//! descriptor's [`Kind`] tag.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BakeryError, BakeryResult};
use crate::value::Value;

/// Identity of a model: namespace (application label) plus model name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId {
	namespace: String,
	name: String,
}

impl ModelId {
	/// Creates a model identity.
	pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			name: name.into(),
		}
	}

	/// Parses a `"namespace.Name"` identifier.
	pub fn parse(qualified: &str) -> Option<Self> {
		let (namespace, name) = qualified.split_once('.')?;
		if namespace.is_empty() || name.is_empty() {
			return None;
		}
		Some(Self::new(namespace, name))
	}

	/// Namespace (application label).
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Bare model name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// `"namespace.Name"` form.
	pub fn qualified(&self) -> String {
		format!("{}.{}", self.namespace, self.name)
	}
}

impl fmt::Display for ModelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.namespace, self.name)
	}
}

/// Type tag of an attribute, used as the generator registry key.
///
/// Builtin kinds mirror the usual relational field types. Kinds defined by
/// applications are carried as [`Kind::Custom`] with a fully-qualified path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Kind {
	AutoField,
	BigAutoField,
	SmallAutoField,
	Boolean,
	NullBoolean,
	SmallInteger,
	Integer,
	BigInteger,
	PositiveSmallInteger,
	PositiveInteger,
	PositiveBigInteger,
	Float,
	Decimal,
	Char,
	Text,
	Slug,
	Email,
	Url,
	Uuid,
	Binary,
	Date,
	DateTime,
	Time,
	Duration,
	IpAddress,
	GenericIpAddress,
	File,
	Image,
	Json,
	Array,
	HStore,
	CiChar,
	CiEmail,
	CiText,
	Geometry,
	Point,
	LineString,
	Polygon,
	MultiPoint,
	MultiLineString,
	MultiPolygon,
	GeometryCollection,
	ForeignKey,
	OneToOne,
	ManyToMany,
	GenericRelation,
	OrderWrt,
	/// Generator tag for relations pointing at the content-type model.
	ContentType,
	/// Application-defined kind, keyed by its fully-qualified path.
	Custom(String),
}

const KIND_NAMES: &[(&str, Kind)] = &[
	("AutoField", Kind::AutoField),
	("BigAutoField", Kind::BigAutoField),
	("SmallAutoField", Kind::SmallAutoField),
	("BooleanField", Kind::Boolean),
	("NullBooleanField", Kind::NullBoolean),
	("SmallIntegerField", Kind::SmallInteger),
	("IntegerField", Kind::Integer),
	("BigIntegerField", Kind::BigInteger),
	("PositiveSmallIntegerField", Kind::PositiveSmallInteger),
	("PositiveIntegerField", Kind::PositiveInteger),
	("PositiveBigIntegerField", Kind::PositiveBigInteger),
	("FloatField", Kind::Float),
	("DecimalField", Kind::Decimal),
	("CharField", Kind::Char),
	("TextField", Kind::Text),
	("SlugField", Kind::Slug),
	("EmailField", Kind::Email),
	("URLField", Kind::Url),
	("UUIDField", Kind::Uuid),
	("BinaryField", Kind::Binary),
	("DateField", Kind::Date),
	("DateTimeField", Kind::DateTime),
	("TimeField", Kind::Time),
	("DurationField", Kind::Duration),
	("IPAddressField", Kind::IpAddress),
	("GenericIPAddressField", Kind::GenericIpAddress),
	("FileField", Kind::File),
	("ImageField", Kind::Image),
	("JSONField", Kind::Json),
	("ArrayField", Kind::Array),
	("HStoreField", Kind::HStore),
	("CICharField", Kind::CiChar),
	("CIEmailField", Kind::CiEmail),
	("CITextField", Kind::CiText),
	("GeometryField", Kind::Geometry),
	("PointField", Kind::Point),
	("LineStringField", Kind::LineString),
	("PolygonField", Kind::Polygon),
	("MultiPointField", Kind::MultiPoint),
	("MultiLineStringField", Kind::MultiLineString),
	("MultiPolygonField", Kind::MultiPolygon),
	("GeometryCollectionField", Kind::GeometryCollection),
	("ForeignKey", Kind::ForeignKey),
	("OneToOneField", Kind::OneToOne),
	("ManyToManyField", Kind::ManyToMany),
	("GenericRelation", Kind::GenericRelation),
	("OrderWrt", Kind::OrderWrt),
	("ContentType", Kind::ContentType),
];

impl Kind {
	/// Parses a kind name such as `"CharField"`.
	///
	/// Names that are not builtin become [`Kind::Custom`].
	pub fn parse(name: &str) -> Self {
		KIND_NAMES
			.iter()
			.find(|(known, _)| *known == name)
			.map(|(_, kind)| kind.clone())
			.unwrap_or_else(|| Kind::Custom(name.to_string()))
	}

	/// Canonical name of the kind.
	pub fn as_str(&self) -> &str {
		if let Kind::Custom(path) = self {
			return path;
		}
		KIND_NAMES
			.iter()
			.find(|(_, kind)| kind == self)
			.map(|(name, _)| *name)
			.unwrap_or("Unknown")
	}

	/// Synthetic identity kinds, assigned by the persistence layer.
	pub fn is_auto(&self) -> bool {
		matches!(
			self,
			Kind::AutoField | Kind::BigAutoField | Kind::SmallAutoField
		)
	}

	/// Boolean kinds.
	pub fn is_boolean(&self) -> bool {
		matches!(self, Kind::Boolean | Kind::NullBoolean)
	}

	/// File-like kinds.
	pub fn is_file(&self) -> bool {
		matches!(self, Kind::File | Kind::Image)
	}

	/// Kinds stored as text, whose empty value is `""`.
	pub fn is_text(&self) -> bool {
		matches!(
			self,
			Kind::Char
				| Kind::Text | Kind::Slug
				| Kind::Email | Kind::Url
				| Kind::CiChar | Kind::CiEmail
				| Kind::CiText | Kind::IpAddress
				| Kind::GenericIpAddress
		)
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<&str> for Kind {
	fn from(name: &str) -> Self {
		Kind::parse(name)
	}
}

impl From<String> for Kind {
	fn from(name: String) -> Self {
		Kind::parse(&name)
	}
}

/// IP address family hint for generic IP attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpProtocol {
	/// Either family.
	#[default]
	Both,
	/// IPv4 only.
	Ipv4,
	/// IPv6 only.
	Ipv6,
}

impl IpProtocol {
	/// Parses a protocol hint, case-insensitively.
	pub fn parse(hint: &str) -> Option<Self> {
		match hint.to_ascii_lowercase().as_str() {
			"both" => Some(Self::Both),
			"ipv4" => Some(Self::Ipv4),
			"ipv6" => Some(Self::Ipv6),
			_ => None,
		}
	}

	/// Canonical name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Both => "both",
			Self::Ipv4 => "ipv4",
			Self::Ipv6 => "ipv6",
		}
	}
}

/// One entry of an enumerated `choices` constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
	/// A literal value with its label.
	Option(Value, String),
	/// A named group of options, flattened one level by generators.
	Group(String, Vec<(Value, String)>),
}

/// Flattens choice groups one level and returns the allowed values.
pub fn flatten_choices(choices: &[Choice]) -> Vec<Value> {
	let mut values = Vec::new();
	for choice in choices {
		match choice {
			Choice::Option(value, _) => values.push(value.clone()),
			Choice::Group(_, options) => {
				values.extend(options.iter().map(|(value, _)| value.clone()))
			}
		}
	}
	values
}

/// Metadata for one scalar or file attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
	/// Attribute name, unique within the model.
	pub name: String,
	/// Generator registry key.
	pub kind: Kind,
	/// Accepts NULL.
	pub nullable: bool,
	/// Accepts an empty value on human entry.
	pub blank: bool,
	/// Value filled in by the persistence layer when left unset.
	pub default: Option<Value>,
	/// Part of the identity.
	pub primary_key: bool,
	/// Enumerated allowed values.
	pub choices: Option<Vec<Choice>>,
	/// Kind-specific constraint metadata (`max_length`, `max_digits`, ...).
	pub constraints: IndexMap<String, Value>,
}

impl AttributeDescriptor {
	/// Creates a required attribute with no default.
	pub fn new(name: impl Into<String>, kind: impl Into<Kind>) -> Self {
		Self {
			name: name.into(),
			kind: kind.into(),
			nullable: false,
			blank: false,
			default: None,
			primary_key: false,
			choices: None,
			constraints: IndexMap::new(),
		}
	}

	/// Marks the attribute nullable.
	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	/// Marks the attribute as allowing blank entry.
	pub fn blank(mut self) -> Self {
		self.blank = true;
		self
	}

	/// Declares a framework default.
	pub fn default_value(mut self, value: impl Into<Value>) -> Self {
		self.default = Some(value.into());
		self
	}

	/// Marks the attribute as the primary key.
	pub fn primary_key(mut self) -> Self {
		self.primary_key = true;
		self
	}

	/// Declares enumerated allowed values.
	pub fn choices(mut self, choices: Vec<Choice>) -> Self {
		self.choices = Some(choices);
		self
	}

	/// Declares the maximum length of a text attribute.
	pub fn max_length(self, max_length: usize) -> Self {
		self.constraint("max_length", Value::Int(max_length as i64))
	}

	/// Declares decimal precision and scale.
	pub fn decimal(self, max_digits: u32, decimal_places: u32) -> Self {
		self.constraint("max_digits", max_digits)
			.constraint("decimal_places", decimal_places)
	}

	/// Declares the IP family hint.
	pub fn protocol(self, protocol: IpProtocol) -> Self {
		self.constraint("protocol", protocol.as_str())
	}

	/// Declares arbitrary constraint metadata.
	pub fn constraint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.constraints.insert(name.into(), value.into());
		self
	}

	/// True if unpopulated values are filled by the persistence layer.
	pub fn has_framework_default(&self) -> bool {
		self.default.is_some()
	}
}

/// How a relation references its target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
	/// Single-valued foreign key.
	ForeignKey,
	/// Single-valued one-to-one link.
	OneToOne,
	/// Many-valued relation owned by this model.
	ManyToMany,
	/// Reverse side of a foreign key on the target model.
	ReverseForeignKey {
		/// Foreign key on the target pointing back at this model.
		field: String,
	},
	/// Generic (polymorphic) reverse relation bookkeeping.
	Generic,
}

/// Junction model mediating a many-valued relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Through {
	/// Junction model.
	pub model: ModelId,
	/// Junction generated by the framework; wired with bulk assignment.
	pub auto_created: bool,
	/// Foreign key on the junction pointing at the owning model.
	pub source_field: Option<String>,
	/// Foreign key on the junction pointing at the related model.
	pub target_field: Option<String>,
}

impl Through {
	/// Explicit junction model whose foreign keys are discovered by target.
	pub fn model(model: ModelId) -> Self {
		Self {
			model,
			auto_created: false,
			source_field: None,
			target_field: None,
		}
	}

	/// Names the junction's foreign keys explicitly.
	pub fn fields(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
		self.source_field = Some(source.into());
		self.target_field = Some(target.into());
		self
	}
}

/// Metadata for a reference from one model to another.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
	/// Attribute name on the owning model (accessor name for reverse relations).
	pub name: String,
	/// Relation kind.
	pub kind: RelationKind,
	/// Referenced model.
	pub target: ModelId,
	/// Accepts NULL (single-valued) or may stay empty (many-valued).
	pub nullable: bool,
	/// Accepts an empty value on human entry.
	pub blank: bool,
	/// One-to-one link to the parent in an inheritance hierarchy.
	pub parent_link: bool,
	/// Junction model for many-valued relations.
	pub through: Option<Through>,
}

impl RelationDescriptor {
	/// Creates a relation of the given kind.
	pub fn new(name: impl Into<String>, kind: RelationKind, target: ModelId) -> Self {
		Self {
			name: name.into(),
			kind,
			target,
			nullable: false,
			blank: false,
			parent_link: false,
			through: None,
		}
	}

	/// Required foreign key.
	pub fn foreign_key(name: impl Into<String>, target: ModelId) -> Self {
		Self::new(name, RelationKind::ForeignKey, target)
	}

	/// One-to-one link.
	pub fn one_to_one(name: impl Into<String>, target: ModelId) -> Self {
		Self::new(name, RelationKind::OneToOne, target)
	}

	/// Many-to-many relation.
	pub fn many_to_many(name: impl Into<String>, target: ModelId) -> Self {
		Self::new(name, RelationKind::ManyToMany, target)
	}

	/// Reverse side of `field` on `target`.
	pub fn reverse(name: impl Into<String>, target: ModelId, field: impl Into<String>) -> Self {
		Self::new(
			name,
			RelationKind::ReverseForeignKey {
				field: field.into(),
			},
			target,
		)
	}

	/// Marks the relation nullable (and blank, as optional relations are).
	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self.blank = true;
		self
	}

	/// Marks a one-to-one as the inheritance parent link.
	pub fn parent_link(mut self) -> Self {
		self.parent_link = true;
		self
	}

	/// Sets the junction model.
	pub fn through(mut self, through: Through) -> Self {
		self.through = Some(through);
		self
	}

	/// Forward single-valued relation stored on the owning row.
	pub fn is_single_valued(&self) -> bool {
		matches!(self.kind, RelationKind::ForeignKey | RelationKind::OneToOne)
	}

	/// Reverse one-to-many relation.
	pub fn is_reverse(&self) -> bool {
		matches!(self.kind, RelationKind::ReverseForeignKey { .. })
	}

	/// Registry key for the relation, `None` for reverse relations.
	pub fn kind_tag(&self) -> Option<Kind> {
		match self.kind {
			RelationKind::ForeignKey => Some(Kind::ForeignKey),
			RelationKind::OneToOne => Some(Kind::OneToOne),
			RelationKind::ManyToMany => Some(Kind::ManyToMany),
			RelationKind::Generic => Some(Kind::GenericRelation),
			RelationKind::ReverseForeignKey { .. } => None,
		}
	}
}

/// A forward field of a model: an attribute or an owned relation.
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
	/// Scalar or file attribute.
	Attribute(&'a AttributeDescriptor),
	/// Forward relation.
	Relation(&'a RelationDescriptor),
}

impl<'a> Field<'a> {
	/// Field name.
	pub fn name(&self) -> &'a str {
		match self {
			Field::Attribute(attr) => &attr.name,
			Field::Relation(rel) => &rel.name,
		}
	}

	/// Registry key.
	pub fn kind(&self) -> Kind {
		match self {
			Field::Attribute(attr) => attr.kind.clone(),
			Field::Relation(rel) => rel.kind_tag().unwrap_or(Kind::ForeignKey),
		}
	}

	/// Accepts NULL.
	pub fn nullable(&self) -> bool {
		match self {
			Field::Attribute(attr) => attr.nullable,
			Field::Relation(rel) => rel.nullable,
		}
	}

	/// Accepts blank entry.
	pub fn blank(&self) -> bool {
		match self {
			Field::Attribute(attr) => attr.blank,
			Field::Relation(rel) => rel.blank,
		}
	}

	/// Declares a framework default.
	pub fn has_default(&self) -> bool {
		match self {
			Field::Attribute(attr) => attr.has_framework_default(),
			Field::Relation(_) => false,
		}
	}

	/// Enumerated allowed values.
	pub fn choices(&self) -> Option<&'a [Choice]> {
		match self {
			Field::Attribute(attr) => attr.choices.as_deref(),
			Field::Relation(_) => None,
		}
	}

	/// Referenced model for relations.
	pub fn target(&self) -> Option<&'a ModelId> {
		match self {
			Field::Attribute(_) => None,
			Field::Relation(rel) => Some(&rel.target),
		}
	}

	/// Many-valued relation.
	pub fn is_many_valued(&self) -> bool {
		matches!(self, Field::Relation(rel) if rel.kind == RelationKind::ManyToMany)
	}

	/// Reads a named property off the descriptor, for generator requirements.
	///
	/// Well-known properties that are not declared read as [`Value::Null`].
	///
	/// # Errors
	///
	/// Returns [`BakeryError::UnknownFieldProperty`] for names the
	/// descriptor does not have.
	pub fn property(&self, property: &str) -> BakeryResult<Value> {
		let value = match (self, property) {
			(_, "name") => Some(Value::from(self.name())),
			(_, "null") => Some(Value::Bool(self.nullable())),
			(_, "blank") => Some(Value::Bool(self.blank())),
			(Field::Attribute(attr), "default") => Some(attr.default.clone().unwrap_or(Value::Null)),
			(Field::Attribute(attr), "primary_key") => Some(Value::Bool(attr.primary_key)),
			(Field::Attribute(attr), name) => attr.constraints.get(name).cloned().or_else(|| {
				matches!(
					name,
					"max_length" | "max_digits" | "decimal_places" | "protocol"
				)
				.then_some(Value::Null)
			}),
			(Field::Relation(rel), "model" | "target") => Some(Value::Text(rel.target.qualified())),
			(Field::Relation(rel), "parent_link") => Some(Value::Bool(rel.parent_link)),
			(Field::Relation(_), _) => None,
		};
		value.ok_or_else(|| BakeryError::UnknownFieldProperty {
			field: self.name().to_string(),
			property: property.to_string(),
		})
	}
}

/// Schema introspection collaborator.
///
/// Implementations expose the attributes and relations of every known
/// model. The engine treats returned descriptors as read-only.
pub trait SchemaProvider: Send + Sync {
	/// Scalar and file attributes of a model, in schema order.
	fn attributes(&self, model: &ModelId) -> BakeryResult<Vec<AttributeDescriptor>>;

	/// Relations of a model (forward and reverse), in schema order.
	fn relations(&self, model: &ModelId) -> BakeryResult<Vec<RelationDescriptor>>;

	/// Looks a model up by namespace and exact name.
	fn find_model(&self, namespace: &str, name: &str) -> Option<ModelId>;

	/// All models grouped by namespace, keyed by bare model name.
	fn models_by_namespace(&self) -> IndexMap<String, IndexMap<String, ModelId>>;
}

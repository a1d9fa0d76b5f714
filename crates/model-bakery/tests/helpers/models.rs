//! Generic test models shared by the integration tests.
//!
//! The schema mirrors a small application: people with dogs and homes,
//! classrooms and stores with many-valued relations, a school with an
//! explicit junction model, and models exercising defaults, nullable and
//! blank attributes, files, custom kinds and content types.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use model_bakery::memory::{InMemoryRepository, ModelDef, SchemaRegistry};
use model_bakery::schema::{
	AttributeDescriptor, Choice, IpProtocol, Kind, ModelId, RelationDescriptor, RelationKind,
	Through,
};
use model_bakery::{Bakery, BakeryResult, BakerySettings, Value};
use rust_decimal::Decimal;

pub const CUSTOM_WITH_GENERATOR: &str = "tests.fields.CustomFieldWithGenerator";
pub const CUSTOM_WITHOUT_GENERATOR: &str = "tests.fields.CustomFieldWithoutGenerator";

pub fn generic(name: &str) -> ModelId {
	ModelId::new("generic", name)
}

pub fn content_type() -> ModelId {
	ModelId::new("contenttypes", "ContentType")
}

fn text(name: &str, max_length: usize) -> AttributeDescriptor {
	AttributeDescriptor::new(name, Kind::Char).max_length(max_length)
}

fn choice(value: &str, label: &str) -> Choice {
	Choice::Option(Value::from(value), label.to_string())
}

fn group(label: &str, options: &[(&str, &str)]) -> Choice {
	Choice::Group(
		label.to_string(),
		options
			.iter()
			.map(|(value, label)| (Value::from(*value), label.to_string()))
			.collect(),
	)
}

fn person() -> ModelDef {
	ModelDef::new("generic", "Person")
		.attribute(text("gender", 1).choices(vec![
			choice("M", "male"),
			choice("F", "female"),
			choice("N", "non-binary"),
		]))
		.attribute(AttributeDescriptor::new("happy", Kind::Boolean).default_value(true))
		.attribute(AttributeDescriptor::new("unhappy", Kind::Boolean).default_value(false))
		.attribute(text("name", 30))
		.attribute(AttributeDescriptor::new("nickname", Kind::Slug).max_length(36))
		.attribute(AttributeDescriptor::new("age", Kind::Integer))
		.attribute(AttributeDescriptor::new("bio", Kind::Text))
		.attribute(AttributeDescriptor::new("birthday", Kind::Date))
		.attribute(AttributeDescriptor::new("birth_time", Kind::Time))
		.attribute(AttributeDescriptor::new("appointment", Kind::DateTime))
		.attribute(AttributeDescriptor::new("blog", Kind::Url))
		.attribute(text("occupation", 10).choices(vec![
			group(
				"Service Industry",
				&[("waitress", "Waitress"), ("bartender", "Bartender")],
			),
			group("Education", &[("teacher", "Teacher"), ("principal", "Principal")]),
		]))
		.attribute(AttributeDescriptor::new("uuid", Kind::Uuid))
		.attribute(AttributeDescriptor::new("name_hash", Kind::Binary).max_length(16))
		.attribute(AttributeDescriptor::new("wanted_games_qtd", Kind::BigInteger))
		.attribute(AttributeDescriptor::new("duration_of_sleep", Kind::Duration))
		.attribute(AttributeDescriptor::new("email", Kind::Email))
		.attribute(AttributeDescriptor::new("data", Kind::Json))
		.attribute(AttributeDescriptor::new("acquaintances", Kind::Array))
		.attribute(AttributeDescriptor::new("location", Kind::Point))
		.manager("adults")
}

fn dog() -> ModelDef {
	ModelDef::new("generic", "Dog")
		.relation(RelationDescriptor::foreign_key("owner", generic("Person")))
		.attribute(text("breed", 50))
		.attribute(AttributeDescriptor::new("_order", Kind::OrderWrt).default_value(0))
		.relation(RelationDescriptor::many_to_many("friends_with", generic("Dog")))
}

fn school() -> ModelDef {
	ModelDef::new("generic", "School")
		.attribute(text("name", 10))
		.relation(
			RelationDescriptor::many_to_many("students", generic("Person"))
				.through(Through::model(generic("SchoolEnrollment"))),
		)
}

fn school_enrollment() -> ModelDef {
	ModelDef::new("generic", "SchoolEnrollment")
		.attribute(
			AttributeDescriptor::new("start_date", Kind::Date)
				.default_value(NaiveDate::from_ymd_opt(2014, 7, 21).unwrap()),
		)
		.relation(RelationDescriptor::foreign_key("school", generic("School")))
		.relation(RelationDescriptor::foreign_key("student", generic("Person")))
}

fn defaults() -> ModelDef {
	ModelDef::new("generic", "DummyDefaultFieldsModel")
		.attribute(AttributeDescriptor::new("default_id", Kind::AutoField).primary_key())
		.attribute(text("default_char_field", 50).default_value("default"))
		.attribute(AttributeDescriptor::new("default_text_field", Kind::Text).default_value("default"))
		.attribute(AttributeDescriptor::new("default_int_field", Kind::Integer).default_value(123))
		.attribute(AttributeDescriptor::new("default_float_field", Kind::Float).default_value(123.0))
		.attribute(
			AttributeDescriptor::new("default_decimal_field", Kind::Decimal)
				.decimal(5, 2)
				.default_value(Decimal::ZERO),
		)
		.attribute(
			AttributeDescriptor::new("default_date_field", Kind::Date)
				.default_value(NaiveDate::from_ymd_opt(2012, 1, 1).unwrap()),
		)
		.attribute(
			AttributeDescriptor::new("default_date_time_field", Kind::DateTime)
				.default_value(Utc.with_ymd_and_hms(2012, 1, 1, 0, 0, 0).single().unwrap()),
		)
		.attribute(
			AttributeDescriptor::new("default_time_field", Kind::Time)
				.default_value(NaiveTime::MIN),
		)
		.attribute(AttributeDescriptor::new("default_email_field", Kind::Email).default_value("foo@bar.org"))
		.attribute(AttributeDescriptor::new("default_slug_field", Kind::Slug).default_value("a-slug"))
}

/// Schema with every generic test model.
pub fn schema() -> SchemaRegistry {
	SchemaRegistry::new()
		.with_model(
			ModelDef::new("contenttypes", "ContentType")
				.attribute(text("app_label", 100))
				.attribute(text("model", 100)),
		)
		.with_model(ModelDef::new("generic", "Profile").attribute(AttributeDescriptor::new("email", Kind::Email)))
		.with_model(
			ModelDef::new("generic", "User")
				.relation(RelationDescriptor::foreign_key("profile", generic("Profile")).nullable()),
		)
		.with_model(
			ModelDef::new("generic", "PaymentBill")
				.relation(RelationDescriptor::foreign_key("user", generic("User")))
				.attribute(AttributeDescriptor::new("value", Kind::Float)),
		)
		.with_model(person())
		.with_model(dog())
		.with_model(
			ModelDef::new("generic", "GuardDog")
				.relation(RelationDescriptor::one_to_one("dog_ptr", generic("Dog")).parent_link().nullable())
				.attribute(text("call_sign", 20)),
		)
		.with_model(
			ModelDef::new("generic", "Home")
				.attribute(text("address", 200))
				.relation(RelationDescriptor::foreign_key("owner", generic("Person")))
				.relation(RelationDescriptor::many_to_many("dogs", generic("Dog"))),
		)
		.with_model(
			ModelDef::new("generic", "LonelyPerson")
				.relation(RelationDescriptor::one_to_one("only_friend", generic("Person"))),
		)
		.with_model(
			ModelDef::new("generic", "Classroom")
				.relation(RelationDescriptor::many_to_many("students", generic("Person")).nullable())
				.attribute(AttributeDescriptor::new("active", Kind::NullBoolean).nullable()),
		)
		.with_model(
			ModelDef::new("generic", "Store")
				.relation(RelationDescriptor::many_to_many("customers", generic("Person")))
				.relation(RelationDescriptor::many_to_many("employees", generic("Person")))
				.relation(RelationDescriptor::many_to_many("suppliers", generic("Person")).nullable()),
		)
		.with_model(
			ModelDef::new("generic", "DummyBlankFieldsModel")
				.attribute(text("blank_char_field", 50).blank())
				.attribute(AttributeDescriptor::new("blank_text_field", Kind::Text).max_length(300).blank()),
		)
		.with_model(
			ModelDef::new("generic", "DummyNullFieldsModel")
				.relation(
					RelationDescriptor::foreign_key("null_foreign_key", generic("DummyBlankFieldsModel"))
						.nullable(),
				)
				.attribute(AttributeDescriptor::new("null_integer_field", Kind::Integer).nullable()),
		)
		.with_model(defaults())
		.with_model(
			ModelDef::new("generic", "DummyDecimalModel")
				.attribute(AttributeDescriptor::new("decimal_field", Kind::Decimal).decimal(1, 0)),
		)
		.with_model(
			ModelDef::new("generic", "DummyFileFieldModel")
				.attribute(AttributeDescriptor::new("file_field", Kind::File)),
		)
		.with_model(
			ModelDef::new("generic", "DummyGenericIPAddressFieldModel")
				.attribute(AttributeDescriptor::new("ipv4_field", Kind::GenericIpAddress).protocol(IpProtocol::Ipv4))
				.attribute(AttributeDescriptor::new("ipv6_field", Kind::GenericIpAddress).protocol(IpProtocol::Ipv6))
				.attribute(AttributeDescriptor::new("ipv46_field", Kind::GenericIpAddress).protocol(IpProtocol::Both)),
		)
		.with_model(
			ModelDef::new("generic", "DummyGenericForeignKeyModel")
				.relation(RelationDescriptor::foreign_key("content_type", content_type()))
				.attribute(AttributeDescriptor::new("object_id", Kind::PositiveInteger)),
		)
		.with_model(ModelDef::new("generic", "DummyGenericRelationModel").relation(
			RelationDescriptor::new(
				"relation",
				RelationKind::Generic,
				generic("DummyGenericForeignKeyModel"),
			),
		))
		.with_model(school())
		.with_model(school_enrollment())
		.with_model(ModelDef::new("generic", "Movie").attribute(text("title", 30)).relation(
			RelationDescriptor::reverse("cast_members", generic("CastMember"), "movie"),
		))
		.with_model(
			ModelDef::new("generic", "CastMember")
				.relation(RelationDescriptor::foreign_key("movie", generic("Movie")))
				.relation(RelationDescriptor::foreign_key("person", generic("Person"))),
		)
		.with_model(
			ModelDef::new("generic", "CustomFieldWithGeneratorModel")
				.attribute(AttributeDescriptor::new("custom_value", CUSTOM_WITH_GENERATOR)),
		)
		.with_model(
			ModelDef::new("generic", "CustomFieldWithoutGeneratorModel")
				.attribute(AttributeDescriptor::new("custom_value", CUSTOM_WITHOUT_GENERATOR)),
		)
		.with_model(ModelDef::new("generic", "Ambiguous").attribute(text("name", 20)))
		.with_model(ModelDef::new("ambiguous", "Ambiguous").attribute(text("name", 20)))
}

/// Schema, repository and bakery over the generic models.
pub struct TestEnv {
	pub schema: Arc<SchemaRegistry>,
	pub repository: Arc<InMemoryRepository>,
	pub bakery: Bakery,
}

impl TestEnv {
	pub fn count(&self, model: &str) -> usize {
		self.repository.all(&generic(model)).len()
	}
}

pub fn env() -> TestEnv {
	env_with(BakerySettings::default()).unwrap()
}

pub fn env_with(settings: BakerySettings) -> BakeryResult<TestEnv> {
	let schema = Arc::new(schema());
	let repository = Arc::new(InMemoryRepository::new(Arc::clone(&schema)));
	let bakery = Bakery::builder(schema.clone(), repository.clone())
		.with_settings(settings)
		.build()?;
	Ok(TestEnv {
		schema,
		repository,
		bakery,
	})
}

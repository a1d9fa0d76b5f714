//! Integration tests for attribute value generation.

#[path = "helpers/models.rs"]
mod models;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use model_bakery::generators;
use model_bakery::prelude::*;
use models::{CUSTOM_WITH_GENERATOR, TestEnv, env, env_with};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use serial_test::serial;

#[fixture]
fn test_env() -> TestEnv {
	env()
}

#[rstest]
fn test_fills_every_attribute_kind(test_env: TestEnv) {
	let person = test_env.bakery.make("generic.Person", Attrs::new()).unwrap();

	assert!(matches!(person.get("name"), Some(Value::Text(name)) if name.chars().count() == 30));
	assert!(matches!(person.get("nickname"), Some(Value::Text(slug)) if slug.len() == 36));
	assert!(matches!(person.get("age"), Some(Value::Int(_))));
	assert!(matches!(person.get("bio"), Some(Value::Text(_))));
	assert!(matches!(person.get("birthday"), Some(Value::Date(_))));
	assert!(matches!(person.get("birth_time"), Some(Value::Time(_))));
	assert!(matches!(person.get("appointment"), Some(Value::DateTime(_))));
	assert!(matches!(person.get("blog"), Some(Value::Text(url)) if url.starts_with("http://")));
	assert!(matches!(person.get("uuid"), Some(Value::Uuid(_))));
	assert!(matches!(person.get("name_hash"), Some(Value::Bytes(bytes)) if !bytes.is_empty()));
	assert!(matches!(person.get("wanted_games_qtd"), Some(Value::Int(_))));
	assert!(matches!(person.get("duration_of_sleep"), Some(Value::Duration(_))));
	assert!(matches!(person.get("email"), Some(Value::Text(email)) if email.contains('@')));
	assert!(matches!(person.get("data"), Some(Value::Json(_))));
	assert!(matches!(person.get("acquaintances"), Some(Value::List(_))));
	assert!(matches!(person.get("location"), Some(Value::Text(point)) if point.starts_with("POINT")));
}

#[rstest]
fn test_decimal_respects_precision(test_env: TestEnv) {
	for _ in 0..10 {
		let dummy = test_env
			.bakery
			.make("generic.DummyDecimalModel", Attrs::new())
			.unwrap();
		let Some(Value::Decimal(value)) = dummy.get("decimal_field") else {
			panic!("decimal_field was not generated");
		};
		assert!(value.abs() < Decimal::from(10));
		assert_eq!(value.scale(), 0);
	}
}

#[rstest]
fn test_defaults_are_left_to_repository(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make("generic.DummyDefaultFieldsModel", Attrs::new())
		.unwrap();

	assert_eq!(dummy.get("default_id"), Some(&Value::Int(1)));
	assert_eq!(dummy.get_str("default_char_field"), Some("default"));
	assert_eq!(dummy.get("default_int_field"), Some(&Value::Int(123)));
	assert_eq!(dummy.get_str("default_slug_field"), Some("a-slug"));
}

#[rstest]
fn test_fill_optional_overrides_defaults(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make_with(
			"generic.DummyDefaultFieldsModel",
			MakeOptions::new().with_fill_optional(vec!["default_char_field"]),
			Attrs::new(),
		)
		.unwrap()
		.into_one()
		.unwrap();

	assert_ne!(dummy.get_str("default_char_field"), Some("default"));
	assert_eq!(dummy.get_str("default_text_field"), Some("default"));
}

#[rstest]
fn test_blank_attributes_are_skipped(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make("generic.DummyBlankFieldsModel", Attrs::new())
		.unwrap();
	assert_eq!(dummy.get_str("blank_char_field"), Some(""));
	assert_eq!(dummy.get_str("blank_text_field"), Some(""));
}

#[rstest]
fn test_nullable_attributes_are_skipped(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make("generic.DummyNullFieldsModel", Attrs::new())
		.unwrap();
	assert_eq!(dummy.get("null_integer_field"), Some(&Value::Null));
	assert_eq!(dummy.get("null_foreign_key"), Some(&Value::Null));
	assert_eq!(test_env.count("DummyBlankFieldsModel"), 0);
}

#[rstest]
fn test_fill_all_optional(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make_with(
			"generic.DummyNullFieldsModel",
			MakeOptions::new().with_fill_optional(true),
			Attrs::new(),
		)
		.unwrap()
		.into_one()
		.unwrap();

	assert!(matches!(dummy.get("null_integer_field"), Some(Value::Int(_))));
	assert!(dummy.related("null_foreign_key").unwrap().is_persisted());
}

#[rstest]
fn test_fill_optional_names_fields(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make_with(
			"generic.DummyBlankFieldsModel",
			MakeOptions::new().with_fill_optional(vec!["blank_char_field"]),
			Attrs::new(),
		)
		.unwrap()
		.into_one()
		.unwrap();

	assert_eq!(dummy.get_str("blank_char_field").map(str::len), Some(50));
	assert_eq!(dummy.get_str("blank_text_field"), Some(""));
}

#[rstest]
fn test_filled_null_boolean_is_never_null(test_env: TestEnv) {
	for _ in 0..60 {
		let classroom = test_env
			.bakery
			.make_with(
				"generic.Classroom",
				MakeOptions::new().with_fill_optional(vec!["active"]),
				Attrs::new(),
			)
			.unwrap()
			.into_one()
			.unwrap();

		assert!(matches!(classroom.get("active"), Some(Value::Bool(_))));
	}
}

#[rstest]
fn test_generic_ip_protocol_hints(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make("generic.DummyGenericIPAddressFieldModel", Attrs::new())
		.unwrap();

	assert!(dummy.get_str("ipv4_field").unwrap().parse::<Ipv4Addr>().is_ok());
	assert!(dummy.get_str("ipv6_field").unwrap().parse::<Ipv6Addr>().is_ok());
	assert!(dummy.get_str("ipv46_field").unwrap().parse::<IpAddr>().is_ok());
}

#[rstest]
fn test_files_are_not_created_by_default(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make("generic.DummyFileFieldModel", Attrs::new())
		.unwrap();
	assert_eq!(dummy.get_str("file_field"), Some(""));
}

#[rstest]
fn test_create_files_option(test_env: TestEnv) {
	let dummy = test_env
		.bakery
		.make_with(
			"generic.DummyFileFieldModel",
			MakeOptions::new().with_create_files(true),
			Attrs::new(),
		)
		.unwrap()
		.into_one()
		.unwrap();
	assert!(matches!(dummy.get("file_field"), Some(Value::File(file)) if file.name == "mock_file.txt"));
}

#[rstest]
fn test_create_files_setting() {
	let test_env = env_with(BakerySettings::default().with_create_files(true)).unwrap();
	let dummy = test_env
		.bakery
		.make("generic.DummyFileFieldModel", Attrs::new())
		.unwrap();
	assert!(matches!(dummy.get("file_field"), Some(Value::File(_))));
}

#[rstest]
#[serial(generators)]
fn test_process_wide_generator_for_custom_kind(test_env: TestEnv) {
	generators::add(CUSTOM_WITH_GENERATOR, Generator::constant("custom"));
	let result = test_env
		.bakery
		.make("generic.CustomFieldWithGeneratorModel", Attrs::new());
	generators::add(CUSTOM_WITH_GENERATOR, None);

	assert_eq!(result.unwrap().get_str("custom_value"), Some("custom"));
}

#[rstest]
#[serial(generators)]
fn test_process_wide_generator_overrides_builtin(test_env: TestEnv) {
	let saved = generators::snapshot();
	generators::add(Kind::Integer, Generator::constant(7));
	let result = test_env.bakery.make("generic.Person", Attrs::new());
	generators::restore(saved);

	assert_eq!(result.unwrap().get("age"), Some(&Value::Int(7)));
	assert!(generators::get(&Kind::Integer).is_none());
}

#[rstest]
#[serial(generators)]
fn test_generator_receives_required_properties(test_env: TestEnv) {
	generators::add(
		Kind::Char,
		Generator::new(|call| {
			let max_length = call.arg_usize("max_length").unwrap_or_default();
			Ok(Value::from("x".repeat(max_length)))
		})
		.require("max_length"),
	);
	let result = test_env.bakery.make("generic.Person", Attrs::new());
	generators::add(Kind::Char, None);

	assert_eq!(result.unwrap().get_str("name"), Some("x".repeat(30).as_str()));
}

#[rstest]
#[serial(generators)]
fn test_generator_by_path(test_env: TestEnv) {
	generators::register_named(
		"tests.generators.gen_value_with_path",
		Generator::constant("from path"),
	);
	generators::add_path(CUSTOM_WITH_GENERATOR, "tests.generators.gen_value_with_path").unwrap();
	let result = test_env
		.bakery
		.make("generic.CustomFieldWithGeneratorModel", Attrs::new());
	generators::add(CUSTOM_WITH_GENERATOR, None);

	assert_eq!(result.unwrap().get_str("custom_value"), Some("from path"));
	let error = generators::add_path(CUSTOM_WITH_GENERATOR, "tests.generators.missing").unwrap_err();
	assert_eq!(error.to_string(), "Could not find generator 'tests.generators.missing'");
}

#[rstest]
#[serial(generators)]
fn test_settings_generator_mapping() {
	generators::register_named("tests.generators.gen_value", Generator::constant("from settings"));
	let settings = BakerySettings::default()
		.with_fields_gen(CUSTOM_WITH_GENERATOR, "tests.generators.gen_value");
	let test_env = env_with(settings).unwrap();

	let instance = test_env
		.bakery
		.make("generic.CustomFieldWithGeneratorModel", Attrs::new())
		.unwrap();
	assert_eq!(instance.get_str("custom_value"), Some("from settings"));
}

#[rstest]
fn test_settings_generator_must_exist() {
	let settings = BakerySettings::default()
		.with_fields_gen(CUSTOM_WITH_GENERATOR, "tests.generators.not_registered");
	let error = env_with(settings).err().unwrap();
	assert!(matches!(error, BakeryError::GeneratorNotFound(path) if path == "tests.generators.not_registered"));
}

#[rstest]
#[serial(generators)]
fn test_prepare_variant_used_when_not_committing(test_env: TestEnv) {
	generators::add(
		CUSTOM_WITH_GENERATOR,
		Generator::constant("made").with_prepare(|_| Ok(Value::from("prepared"))),
	);
	let made = test_env
		.bakery
		.make("generic.CustomFieldWithGeneratorModel", Attrs::new());
	let prepared = test_env
		.bakery
		.prepare("generic.CustomFieldWithGeneratorModel", Attrs::new());
	generators::add(CUSTOM_WITH_GENERATOR, None);

	assert_eq!(made.unwrap().get_str("custom_value"), Some("made"));
	assert_eq!(prepared.unwrap().get_str("custom_value"), Some("prepared"));
}

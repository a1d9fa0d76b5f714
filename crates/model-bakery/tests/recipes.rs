//! Integration tests for recipes.

#[path = "helpers/models.rs"]
mod models;

use chrono::{NaiveDate, TimeDelta};
use model_bakery::prelude::*;
use models::{TestEnv, env, generic};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

fn person_recipe() -> Recipe {
	Recipe::new("generic.Person")
		.set("name", "John Doe")
		.set("nickname", "joe")
		.set("age", 18)
		.set("bio", "Someone in the crowd")
		.set("blog", "http://joe.blogspot.com")
		.set("wanted_games_qtd", 4)
}

fn dog_recipe() -> Recipe {
	Recipe::new("generic.Dog")
		.set("breed", "Pug")
		.set("owner", foreign_key(person_recipe()))
}

#[fixture]
fn test_env() -> TestEnv {
	let test_env = env();
	test_env.bakery.register_recipe("generic.person", person_recipe());
	test_env.bakery.register_recipe("generic.dog", dog_recipe());
	test_env
		.bakery
		.register_recipe("generic.serial_person", Recipe::new("generic.Person").set("name", seq("joe").unwrap()));
	test_env
}

#[rstest]
fn test_make_recipe_uses_template(test_env: TestEnv) {
	let person = test_env
		.bakery
		.make_recipe("generic.person", Attrs::new())
		.unwrap();

	assert!(person.is_persisted());
	assert_eq!(person.get_str("name"), Some("John Doe"));
	assert_eq!(person.get("age"), Some(&Value::Int(18)));
	assert!(["M", "F", "N"].contains(&person.get_str("gender").unwrap()));
}

#[rstest]
fn test_prepare_recipe_does_not_persist(test_env: TestEnv) {
	let person = test_env
		.bakery
		.prepare_recipe("generic.person", Attrs::new())
		.unwrap();

	assert!(!person.is_persisted());
	assert_eq!(person.get_str("nickname"), Some("joe"));
	assert_eq!(test_env.count("Person"), 0);
}

#[rstest]
fn test_overrides_win_over_template(test_env: TestEnv) {
	let person = test_env
		.bakery
		.make_recipe("generic.person", attrs! { "name" => "Jane", "age" => 30 })
		.unwrap();

	assert_eq!(person.get_str("name"), Some("Jane"));
	assert_eq!(person.get("age"), Some(&Value::Int(30)));
	assert_eq!(person.get_str("nickname"), Some("joe"));
}

#[rstest]
fn test_make_recipe_with_quantity(test_env: TestEnv) {
	let people = test_env
		.bakery
		.make_recipe_with(
			"generic.person",
			MakeOptions::new().with_quantity(3),
			Attrs::new(),
		)
		.unwrap()
		.into_vec();

	assert_eq!(people.len(), 3);
	assert!(people.iter().all(|person| person.get_str("name") == Some("John Doe")));
	assert_eq!(test_env.count("Person"), 3);
}

#[rstest]
fn test_prepare_recipe_with_quantity(test_env: TestEnv) {
	let people = test_env
		.bakery
		.prepare_recipe_with(
			"generic.person",
			PrepareOptions::new().with_quantity(2),
			Attrs::new(),
		)
		.unwrap();
	assert_eq!(people.len(), 2);
	assert_eq!(test_env.count("Person"), 0);
}

#[rstest]
fn test_unknown_recipe(test_env: TestEnv) {
	let error = test_env
		.bakery
		.make_recipe("generic.unknown", Attrs::new())
		.unwrap_err();
	assert_eq!(error.to_string(), "Could not find recipe 'generic.unknown'");
}

#[rstest]
fn test_sequence_continues_across_builds(test_env: TestEnv) {
	let names: Vec<String> = (0..3)
		.map(|_| {
			test_env
				.bakery
				.make_recipe("generic.serial_person", Attrs::new())
				.unwrap()
				.get_str("name")
				.unwrap()
				.to_string()
		})
		.collect();
	assert_eq!(names, vec!["joe1", "joe2", "joe3"]);
}

#[rstest]
fn test_sequence_advances_per_instance(test_env: TestEnv) {
	let people = test_env
		.bakery
		.make_recipe_with(
			"generic.serial_person",
			MakeOptions::new().with_quantity(3),
			Attrs::new(),
		)
		.unwrap()
		.into_vec();

	let names: Vec<_> = people.iter().filter_map(|person| person.get_str("name")).collect();
	assert_eq!(names, vec!["joe1", "joe2", "joe3"]);
}

#[rstest]
fn test_sequence_restarts_on_empty_table(test_env: TestEnv) {
	for _ in 0..2 {
		test_env
			.bakery
			.make_recipe("generic.serial_person", Attrs::new())
			.unwrap();
	}
	test_env.repository.flush();

	let person = test_env
		.bakery
		.make_recipe("generic.serial_person", Attrs::new())
		.unwrap();
	assert_eq!(person.get_str("name"), Some("joe1"));
}

#[rstest]
fn test_sequence_is_monotonic_under_prepare(test_env: TestEnv) {
	let first = test_env
		.bakery
		.prepare_recipe("generic.serial_person", Attrs::new())
		.unwrap();
	let second = test_env
		.bakery
		.prepare_recipe("generic.serial_person", Attrs::new())
		.unwrap();
	assert_eq!(first.get_str("name"), Some("joe1"));
	assert_eq!(second.get_str("name"), Some("joe2"));
}

#[rstest]
fn test_prepare_after_flush_keeps_advancing(test_env: TestEnv) {
	test_env
		.bakery
		.make_recipe("generic.serial_person", Attrs::new())
		.unwrap();
	test_env.repository.flush();

	let first = test_env
		.bakery
		.prepare_recipe("generic.serial_person", Attrs::new())
		.unwrap();
	let second = test_env
		.bakery
		.prepare_recipe("generic.serial_person", Attrs::new())
		.unwrap();
	assert_eq!(first.get_str("name"), Some("joe1"));
	assert_eq!(second.get_str("name"), Some("joe2"));
}

#[rstest]
fn test_invalid_quantity_builds_no_related_rows(test_env: TestEnv) {
	let error = test_env
		.bakery
		.make_recipe_with("generic.dog", MakeOptions::new().with_quantity(0), Attrs::new())
		.unwrap_err();
	assert!(matches!(error, BakeryError::InvalidQuantity(_)));

	let error = test_env
		.bakery
		.prepare_recipe_with(
			"generic.dog",
			PrepareOptions::new().with_quantity(0).with_save_related(true),
			Attrs::new(),
		)
		.unwrap_err();
	assert!(matches!(error, BakeryError::InvalidQuantity(_)));

	assert_eq!(test_env.count("Person"), 0);
	assert_eq!(test_env.count("Dog"), 0);
}

#[rstest]
fn test_numeric_sequences(test_env: TestEnv) {
	let recipe = Recipe::new("generic.DummyDefaultFieldsModel")
		.set("default_int_field", seq(10).unwrap())
		.set("default_decimal_field", seq(Decimal::new(201, 1)).unwrap())
		.set("default_float_field", seq_by(1.5, 2.0).unwrap());

	let first = recipe.make(&test_env.bakery, Attrs::new()).unwrap();
	let second = recipe.make(&test_env.bakery, Attrs::new()).unwrap();

	assert_eq!(first.get("default_int_field"), Some(&Value::Int(11)));
	assert_eq!(second.get("default_int_field"), Some(&Value::Int(12)));
	assert_eq!(
		first.get("default_decimal_field"),
		Some(&Value::Decimal(Decimal::new(211, 1)))
	);
	assert_eq!(second.get("default_float_field"), Some(&Value::Float(5.5)));
}

#[rstest]
fn test_date_sequence_keeps_shape(test_env: TestEnv) {
	let start = NaiveDate::from_ymd_opt(2014, 7, 21).unwrap();
	let recipe = Recipe::new("generic.DummyDefaultFieldsModel")
		.set("default_date_field", seq_by(start, TimeDelta::days(1)).unwrap());

	let dummy = recipe.make(&test_env.bakery, Attrs::new()).unwrap();
	assert_eq!(
		dummy.get("default_date_field"),
		Some(&Value::Date(NaiveDate::from_ymd_opt(2014, 7, 22).unwrap()))
	);
}

#[rstest]
fn test_cycle_in_recipe(test_env: TestEnv) {
	let recipe = Recipe::new("generic.Dog")
		.set("breed", cycle(["Pug", "Basset"]));
	let dogs = recipe
		.make_with(&test_env.bakery, MakeOptions::new().with_quantity(3), Attrs::new())
		.unwrap()
		.into_vec();

	let breeds: Vec<_> = dogs.iter().filter_map(|dog| dog.get_str("breed")).collect();
	assert_eq!(breeds, vec!["Pug", "Basset", "Pug"]);
}

#[rstest]
fn test_lazy_value_in_recipe(test_env: TestEnv) {
	let recipe = Recipe::new("generic.Person")
		.set("name", AttrValue::lazy(|| Value::from("computed")));
	let person = recipe.make(&test_env.bakery, Attrs::new()).unwrap();
	assert_eq!(person.get_str("name"), Some("computed"));
}

#[rstest]
fn test_foreign_key_recipe_is_made(test_env: TestEnv) {
	let dog = test_env.bakery.make_recipe("generic.dog", Attrs::new()).unwrap();

	let owner = dog.related("owner").unwrap();
	assert!(owner.is_persisted());
	assert_eq!(owner.get_str("name"), Some("John Doe"));
	assert_eq!(dog.get_str("breed"), Some("Pug"));
}

#[rstest]
fn test_foreign_key_recipe_is_prepared(test_env: TestEnv) {
	let dog = test_env
		.bakery
		.prepare_recipe("generic.dog", Attrs::new())
		.unwrap();

	assert!(!dog.related("owner").unwrap().is_persisted());
	assert_eq!(test_env.count("Person"), 0);
}

#[rstest]
fn test_foreign_key_recipe_saved_with_save_related(test_env: TestEnv) {
	let dog = test_env
		.bakery
		.prepare_recipe_with(
			"generic.dog",
			PrepareOptions::new().with_save_related(true),
			Attrs::new(),
		)
		.unwrap()
		.into_one()
		.unwrap();

	assert!(!dog.is_persisted());
	assert!(dog.related("owner").unwrap().is_persisted());
}

#[rstest]
fn test_foreign_key_by_recipe_name(test_env: TestEnv) {
	let other_dog = Recipe::new("generic.Dog")
		.set("breed", "Basset")
		.set("owner", foreign_key("generic.person"));
	let dog = other_dog.make(&test_env.bakery, Attrs::new()).unwrap();
	assert_eq!(dog.related("owner").unwrap().get_str("name"), Some("John Doe"));

	let broken = Recipe::new("generic.Dog").set("owner", foreign_key("generic.nobody"));
	let error = broken.make(&test_env.bakery, Attrs::new()).unwrap_err();
	assert!(matches!(error, BakeryError::RecipeNotFound(name) if name == "generic.nobody"));
}

#[rstest]
fn test_foreign_key_relation_path_override(test_env: TestEnv) {
	let dog = test_env
		.bakery
		.make_recipe("generic.dog", attrs! { "owner__name" => "Bob", "breed" => "Basset" })
		.unwrap();

	let owner = dog.related("owner").unwrap();
	assert_eq!(owner.get_str("name"), Some("Bob"));
	assert_eq!(owner.get_str("nickname"), Some("joe"));
	assert_eq!(dog.get_str("breed"), Some("Basset"));
}

#[rstest]
fn test_foreign_key_direct_override(test_env: TestEnv) {
	let person = test_env.bakery.make("generic.Person", Attrs::new()).unwrap();
	let dog = test_env
		.bakery
		.make_recipe("generic.dog", attrs! { "owner" => person.clone() })
		.unwrap();

	assert_eq!(dog.related("owner").unwrap().pk(), person.pk());
	assert_eq!(test_env.count("Person"), 1);
}

#[rstest]
fn test_related_builds_reverse_rows(test_env: TestEnv) {
	let dog_lady = Recipe::new("generic.Person").set(
		"dog_set",
		related([RecipeRef::from("generic.dog"), RecipeRef::from(dog_recipe())]),
	);
	let lady = dog_lady.make(&test_env.bakery, Attrs::new()).unwrap();

	let dogs = test_env.repository.related(&lady, "dog_set").unwrap();
	assert_eq!(dogs.len(), 2);
}

#[rstest]
fn test_related_builds_many_to_many(test_env: TestEnv) {
	let dog = dog_recipe();
	let dog_with_friends = dog
		.extend(Attrs::new())
		.set("friends_with", related([&dog, &dog]));
	let rex = dog_with_friends.make(&test_env.bakery, Attrs::new()).unwrap();

	let friends = test_env.repository.related(&rex, "friends_with").unwrap();
	assert_eq!(friends.len(), 2);
	assert_eq!(test_env.count("Dog"), 3);
}

#[rstest]
fn test_related_through_declared_reverse_accessor(test_env: TestEnv) {
	let cast_member = Recipe::new("generic.CastMember").set("person", foreign_key(person_recipe()));
	let movie_with_cast = Recipe::new("generic.Movie")
		.set("cast_members", related([&cast_member, &cast_member]));

	let movie = movie_with_cast.make(&test_env.bakery, Attrs::new()).unwrap();
	let cast = test_env.repository.related(&movie, "cast_members").unwrap();
	assert_eq!(cast.len(), 2);
	assert!(cast.iter().all(|member| member.related("person").unwrap().get_str("name") == Some("John Doe")));
}

#[rstest]
fn test_extend_overrides_template(test_env: TestEnv) {
	let dog = dog_recipe();
	let extended = dog.extend(attrs! { "breed" => "Super basset" });

	let super_dog = extended.make(&test_env.bakery, Attrs::new()).unwrap();
	let pug = dog.make(&test_env.bakery, Attrs::new()).unwrap();

	assert_eq!(super_dog.get_str("breed"), Some("Super basset"));
	assert_eq!(super_dog.related("owner").unwrap().get_str("name"), Some("John Doe"));
	assert_eq!(pug.get_str("breed"), Some("Pug"));
	assert_eq!(extended.model(), &ModelRef::from("generic.Dog"));
}

#[rstest]
fn test_recipe_with_resolved_model(test_env: TestEnv) {
	let recipe = Recipe::new(generic("Dog")).set("breed", "Pug");
	let dog = recipe.make(&test_env.bakery, Attrs::new()).unwrap();
	assert_eq!(dog.model(), &generic("Dog"));
}

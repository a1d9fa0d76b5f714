//! Stateless random value generators for the builtin kinds.
//!
//! Each function produces one value and is safe to call from any thread.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use fake::Fake;
use fake::faker::internet::en::{IPv4, IPv6, SafeEmail};
use rand::Rng;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::value::{FileContent, Value};

/// Length used when a text attribute declares no maximum.
pub const MAX_LENGTH: usize = 300;

/// Bound of generated integers.
pub const MAX_INT: i64 = 10_000;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SLUG_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

fn random_chars(alphabet: &[u8], length: usize) -> String {
	let mut rng = rand::thread_rng();
	(0..length)
		.map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
		.collect()
}

/// Picks one of the given values, `None` if empty.
pub fn gen_from_list(values: &[Value]) -> Option<Value> {
	values.choose(&mut rand::thread_rng()).cloned()
}

/// Random integer in `min..=max`.
pub fn gen_integer(min: i64, max: i64) -> i64 {
	rand::thread_rng().gen_range(min..=max)
}

/// Random float in `-MAX_INT..MAX_INT`.
pub fn gen_float() -> f64 {
	let bound = MAX_INT as f64;
	rand::thread_rng().gen_range(-bound..bound)
}

/// Random decimal with the given precision and scale.
pub fn gen_decimal(max_digits: u32, decimal_places: u32) -> Decimal {
	let digits = |count: u32| -> String {
		let mut rng = rand::thread_rng();
		(0..count)
			.map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
			.collect()
	};
	let mantissa = format!(
		"{}{}",
		digits(max_digits.saturating_sub(decimal_places)),
		digits(decimal_places)
	);
	let mantissa = if mantissa.is_empty() {
		"0".to_string()
	} else {
		mantissa
	};
	// Mantissas beyond 28 digits do not fit a Decimal.
	let mantissa = &mantissa[..mantissa.len().min(28)];
	let scale = decimal_places.min(mantissa.len() as u32);
	mantissa
		.parse::<i128>()
		.ok()
		.and_then(|m| Decimal::try_from_i128_with_scale(m, scale).ok())
		.unwrap_or_default()
}

/// Random ASCII letters, exactly `max_length` long.
pub fn gen_string(max_length: usize) -> String {
	random_chars(LETTERS, max_length)
}

/// Random slug, exactly `max_length` long.
pub fn gen_slug(max_length: usize) -> String {
	random_chars(SLUG_CHARS, max_length)
}

/// Random text of [`MAX_LENGTH`] characters.
pub fn gen_text() -> String {
	gen_string(MAX_LENGTH)
}

/// Random boolean.
pub fn gen_boolean() -> bool {
	rand::thread_rng().gen_bool(0.5)
}

/// Current date.
pub fn gen_date() -> NaiveDate {
	Utc::now().date_naive()
}

/// Current timestamp.
pub fn gen_datetime() -> DateTime<Utc> {
	Utc::now()
}

/// Current time of day.
pub fn gen_time() -> NaiveTime {
	Utc::now().time()
}

/// Random interval below [`MAX_INT`] milliseconds.
pub fn gen_interval() -> TimeDelta {
	TimeDelta::milliseconds(gen_integer(0, MAX_INT))
}

/// Random safe email address.
pub fn gen_email() -> String {
	SafeEmail().fake()
}

/// Random URL.
pub fn gen_url() -> String {
	format!("http://www.{}.com/", gen_string(30).to_lowercase())
}

/// Random IPv4 address.
pub fn gen_ipv4() -> String {
	IPv4().fake()
}

/// Random IPv6 address.
pub fn gen_ipv6() -> String {
	IPv6().fake()
}

/// Random IPv4 or IPv6 address.
pub fn gen_ipv46() -> String {
	if gen_boolean() { gen_ipv4() } else { gen_ipv6() }
}

/// Random bytes.
pub fn gen_byte_string(length: usize) -> Vec<u8> {
	let mut rng = rand::thread_rng();
	(0..length).map(|_| rng.gen_range(0..=u8::MAX)).collect()
}

/// Random version 4 UUID.
pub fn gen_uuid() -> Uuid {
	Uuid::new_v4()
}

/// Placeholder file content.
pub fn gen_file() -> FileContent {
	FileContent::new("mock_file.txt", b"mock file content".to_vec())
}

/// Placeholder JPEG content.
pub fn gen_image() -> FileContent {
	const JPEG: &[u8] = &[
		0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
		0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
	];
	FileContent::new("mock-img.jpeg", JPEG.to_vec())
}

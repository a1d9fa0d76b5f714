//! Steppers: explicit, statefully-advancing value sources.
//!
//! A [`Stepper`] is distinguished from ordinary list values: only steppers
//! are advanced by the builder, once per constructed instance. Clones share
//! the same position. [`Stepper::fork`] creates an independent cursor that
//! replays the stream from its first value, which is how recipes keep a
//! private stream per attribute.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveTime, TimeDelta};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::{BakeryError, BakeryResult};
use crate::value::Value;

type ValueIter = Box<dyn Iterator<Item = Value> + Send>;
type Source = Arc<dyn Fn() -> ValueIter + Send + Sync>;

struct Cursor {
	values: ValueIter,
	position: usize,
}

/// Shared, replayable value stream.
///
/// Each cursor pulls from its own iterator built from the source, so no
/// produced value is retained once consumed.
#[derive(Clone)]
pub struct Stepper {
	source: Source,
	cursor: Arc<Mutex<Cursor>>,
}

impl Stepper {
	/// Creates a stepper from a function building the value stream.
	///
	/// The function is called again for every [`fork`](Self::fork).
	pub fn new<F, I>(source: F) -> Self
	where
		F: Fn() -> I + Send + Sync + 'static,
		I: IntoIterator<Item = Value>,
		I::IntoIter: Send + 'static,
	{
		let source: Source = Arc::new(move || -> ValueIter { Box::new(source().into_iter()) });
		Self::from_source(source)
	}

	fn from_source(source: Source) -> Self {
		let values = source();
		Self {
			source,
			cursor: Arc::new(Mutex::new(Cursor {
				values,
				position: 0,
			})),
		}
	}

	/// Advances the stepper and returns the next value.
	pub fn next_value(&self) -> Option<Value> {
		let mut cursor = self.cursor.lock();
		let value = cursor.values.next()?;
		cursor.position += 1;
		Some(value)
	}

	/// Creates an independent cursor positioned at the first value.
	pub fn fork(&self) -> Self {
		Self::from_source(Arc::clone(&self.source))
	}

	/// Number of values consumed through this cursor.
	pub fn position(&self) -> usize {
		self.cursor.lock().position
	}
}

impl Iterator for Stepper {
	type Item = Value;

	fn next(&mut self) -> Option<Value> {
		self.next_value()
	}
}

impl fmt::Debug for Stepper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Stepper")
			.field("position", &self.position())
			.finish()
	}
}

/// Stepper over a finite list of values.
pub fn iterate<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Stepper {
	let values: Vec<Value> = values.into_iter().map(Into::into).collect();
	Stepper::new(move || values.clone())
}

/// Stepper repeating a list of values forever.
pub fn cycle<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Stepper {
	let values: Vec<Value> = values.into_iter().map(Into::into).collect();
	Stepper::new(move || values.clone().into_iter().cycle())
}

/// Sequence starting after `start` with an increment of one.
///
/// See [`seq_by`].
pub fn seq(start: impl Into<Value>) -> BakeryResult<Stepper> {
	seq_by(start, 1)
}

/// Sequence yielding `start + increment * n` for `n = 1, 2, 3, ...`.
///
/// Text starts get the number appended (`"joe"` yields `joe1`, `joe2`).
/// Date, datetime and time starts take a duration increment and keep their
/// shape, so a date sequence never gains a time of day.
///
/// # Errors
///
/// Returns [`BakeryError::InvalidSequence`] when the start and increment
/// cannot be combined.
pub fn seq_by(start: impl Into<Value>, increment: impl Into<Value>) -> BakeryResult<Stepper> {
	let start = start.into();
	let increment = increment.into();
	let step = Step::new(&start, &increment)?;
	let step = Arc::new(step);
	Ok(Stepper::new(move || {
		let step = Arc::clone(&step);
		(1_i64..).map_while(move |n| step.nth(n))
	}))
}

enum Step {
	Int(i64, i64),
	Float(f64, f64),
	Decimal(Decimal, Decimal),
	Text(String, i64),
	Temporal(Value, TimeDelta),
}

impl Step {
	fn new(start: &Value, increment: &Value) -> BakeryResult<Self> {
		let step = match (start, increment) {
			(Value::Int(s), Value::Int(i)) => Step::Int(*s, *i),
			(Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
				Step::Float(start.as_f64().unwrap_or_default(), increment.as_f64().unwrap_or_default())
			}
			(Value::Decimal(s), Value::Decimal(i)) => Step::Decimal(*s, *i),
			(Value::Decimal(s), Value::Int(i)) => Step::Decimal(*s, Decimal::from(*i)),
			(Value::Decimal(s), Value::Float(i)) => Step::Decimal(
				*s,
				Decimal::try_from(*i).map_err(|e| BakeryError::InvalidSequence(e.to_string()))?,
			),
			(Value::Text(s), Value::Int(i)) => Step::Text(s.clone(), *i),
			(Value::Date(_) | Value::DateTime(_) | Value::Time(_), Value::Duration(d)) => {
				Step::Temporal(start.clone(), *d)
			}
			_ => {
				return Err(BakeryError::InvalidSequence(format!(
					"cannot advance {} by {}",
					start.type_name(),
					increment.type_name()
				)));
			}
		};
		Ok(step)
	}

	fn nth(&self, n: i64) -> Option<Value> {
		match self {
			Step::Int(start, inc) => inc
				.checked_mul(n)
				.and_then(|delta| start.checked_add(delta))
				.map(Value::Int),
			Step::Float(start, inc) => Some(Value::Float(start + inc * n as f64)),
			Step::Decimal(start, inc) => inc
				.checked_mul(Decimal::from(n))
				.and_then(|delta| start.checked_add(delta))
				.map(Value::Decimal),
			Step::Text(start, inc) => Some(Value::Text(format!("{start}{}", inc * n))),
			Step::Temporal(start, inc) => {
				let delta = inc.checked_mul(i32::try_from(n).ok()?)?;
				match start {
					Value::Date(date) => date
						.and_time(NaiveTime::MIN)
						.checked_add_signed(delta)
						.map(|dt| Value::Date(dt.date())),
					Value::DateTime(dt) => dt.checked_add_signed(delta).map(Value::DateTime),
					Value::Time(time) => Some(Value::Time(time.overflowing_add_signed(delta).0)),
					_ => None,
				}
			}
		}
	}
}

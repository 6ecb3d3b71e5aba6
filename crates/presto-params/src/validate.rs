//! Validation and coercion of decoded values against a [`FieldSchema`].
//!
//! Takes the untyped output of a decoder (`None` for absent,
//! `Some(Value)` for present) and produces either the fully typed value or
//! a list of positioned [`FieldError`]s. Every independent failure inside
//! one composite value is collected; validation never stops at the first
//! problem within a body or parameter.

use serde_json::{Map, Number, Value};

use crate::error::{FieldError, LocItem};
use crate::schema::{FieldKind, FieldSchema, Shape};
use crate::style::Location;

/// How string values coerce during validation.
///
/// Parameters and form fields arrive as wire text: `"42"` coerces to an
/// integer and an empty string means "no value". JSON bodies are already
/// typed: strings stay strings and empty strings are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionMode {
	Wire,
	Json,
}

/// What an absent required value should be reported as.
#[derive(Debug, Clone, Copy)]
pub enum ValueContext {
	Parameter(Location),
	Body,
}

impl ValueContext {
	fn missing_error(&self, loc: Vec<LocItem>) -> FieldError {
		match self {
			Self::Parameter(location) => FieldError::new(
				loc,
				format!("Missing required {location} parameter"),
				"value_error",
			),
			Self::Body => FieldError::missing_value(loc),
		}
	}
}

/// Validate a decoded value, applying required/default semantics.
pub fn validate(
	schema: &FieldSchema,
	value: Option<Value>,
	loc: &[LocItem],
	mode: CoercionMode,
	context: ValueContext,
) -> Result<Value, Vec<FieldError>> {
	match value {
		Some(value) => validate_present(schema, value, loc, mode),
		None => match &schema.default {
			Some(default) => Ok(default.clone()),
			None => Err(vec![context.missing_error(loc.to_vec())]),
		},
	}
}

fn none_not_allowed(loc: &[LocItem]) -> Vec<FieldError> {
	vec![FieldError::new(
		loc.to_vec(),
		"none is not an allowed value",
		"type_error.none.not_allowed",
	)]
}

fn type_error(loc: &[LocItem], msg: &str, kind: &str) -> Vec<FieldError> {
	vec![FieldError::new(loc.to_vec(), msg, kind)]
}

fn validate_present(
	schema: &FieldSchema,
	value: Value,
	loc: &[LocItem],
	mode: CoercionMode,
) -> Result<Value, Vec<FieldError>> {
	// Wire text has no null literal: an empty scalar serialization stands
	// for "no value" and is rejected here, not in the decoder.
	let empty_wire_scalar = mode == CoercionMode::Wire
		&& schema.shape() == Shape::Scalar
		&& matches!(&value, Value::String(s) if s.is_empty());
	let value = if empty_wire_scalar { Value::Null } else { value };

	if value.is_null() {
		return if schema.nullable {
			Ok(Value::Null)
		} else {
			Err(none_not_allowed(loc))
		};
	}

	let coerced = match &schema.kind {
		FieldKind::String => coerce_string(value, loc)?,
		FieldKind::Integer => coerce_integer(value, loc, mode)?,
		FieldKind::Number => coerce_number(value, loc, mode)?,
		FieldKind::Boolean => coerce_boolean(value, loc, mode)?,
		FieldKind::Array { items } => {
			return validate_array(items, value, loc, mode);
		}
		FieldKind::Object { fields, .. } => {
			return validate_object(fields, value, loc, mode);
		}
	};

	if let Some(allowed) = &schema.enum_values
		&& !allowed.contains(&coerced)
	{
		let permitted = allowed
			.iter()
			.map(Value::to_string)
			.collect::<Vec<_>>()
			.join(", ");
		return Err(type_error(
			loc,
			&format!("value is not a valid enumeration member; permitted: {permitted}"),
			"value_error.const",
		));
	}

	Ok(coerced)
}

fn coerce_string(value: Value, loc: &[LocItem]) -> Result<Value, Vec<FieldError>> {
	match value {
		Value::String(_) => Ok(value),
		_ => Err(type_error(loc, "str type expected", "type_error.str")),
	}
}

fn coerce_integer(
	value: Value,
	loc: &[LocItem],
	mode: CoercionMode,
) -> Result<Value, Vec<FieldError>> {
	let invalid = || type_error(loc, "value is not a valid integer", "type_error.integer");
	match value {
		Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
		Value::String(s) if mode == CoercionMode::Wire => s
			.trim()
			.parse::<i64>()
			.map(|n| Value::Number(n.into()))
			.map_err(|_| invalid()),
		_ => Err(invalid()),
	}
}

fn coerce_number(
	value: Value,
	loc: &[LocItem],
	mode: CoercionMode,
) -> Result<Value, Vec<FieldError>> {
	let invalid = || type_error(loc, "value is not a valid float", "type_error.float");
	match value {
		Value::Number(_) => Ok(value),
		Value::String(ref s) if mode == CoercionMode::Wire => {
			let parsed = s.trim().parse::<f64>().map_err(|_| invalid())?;
			Number::from_f64(parsed)
				.map(Value::Number)
				.ok_or_else(invalid)
		}
		_ => Err(invalid()),
	}
}

fn coerce_boolean(
	value: Value,
	loc: &[LocItem],
	mode: CoercionMode,
) -> Result<Value, Vec<FieldError>> {
	let invalid = || {
		type_error(
			loc,
			"value could not be parsed to a boolean",
			"type_error.bool",
		)
	};
	match value {
		Value::Bool(_) => Ok(value),
		Value::String(ref s) if mode == CoercionMode::Wire => {
			match s.to_ascii_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
				"false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
				_ => Err(invalid()),
			}
		}
		_ => Err(invalid()),
	}
}

fn validate_array(
	items: &FieldSchema,
	value: Value,
	loc: &[LocItem],
	mode: CoercionMode,
) -> Result<Value, Vec<FieldError>> {
	let Value::Array(values) = value else {
		return Err(type_error(loc, "value is not a valid list", "type_error.list"));
	};

	let mut out = Vec::with_capacity(values.len());
	let mut errors = Vec::new();
	for (index, item) in values.into_iter().enumerate() {
		let mut item_loc = loc.to_vec();
		item_loc.push(LocItem::Index(index));
		match validate_present(items, item, &item_loc, mode) {
			Ok(item) => out.push(item),
			Err(item_errors) => errors.extend(item_errors),
		}
	}
	if errors.is_empty() {
		Ok(Value::Array(out))
	} else {
		Err(errors)
	}
}

fn validate_object(
	fields: &[crate::schema::ObjectField],
	value: Value,
	loc: &[LocItem],
	mode: CoercionMode,
) -> Result<Value, Vec<FieldError>> {
	let Value::Object(mut map) = value else {
		return Err(type_error(loc, "value is not a valid dict", "type_error.dict"));
	};

	// free-form dictionary: nothing declared to validate against
	if fields.is_empty() {
		return Ok(Value::Object(map));
	}

	let mut out = Map::new();
	let mut errors = Vec::new();
	for field in fields {
		let mut field_loc = loc.to_vec();
		field_loc.push(LocItem::Key(field.name.clone()));
		match map.remove(&field.name) {
			Some(value) => match validate_present(&field.schema, value, &field_loc, mode) {
				Ok(value) => {
					out.insert(field.name.clone(), value);
				}
				Err(field_errors) => errors.extend(field_errors),
			},
			None => {
				if let Some(default) = &field.schema.default {
					out.insert(field.name.clone(), default.clone());
				} else if field.required {
					errors.push(FieldError::missing_value(field_loc));
				}
				// optional without default: simply omitted
			}
		}
	}
	if errors.is_empty() {
		Ok(Value::Object(out))
	} else {
		Err(errors)
	}
}

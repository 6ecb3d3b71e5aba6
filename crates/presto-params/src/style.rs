//! OpenAPI serialization-style decoders.
//!
//! Pure, stateless functions converting raw wire text into an untyped
//! scalar, list or mapping, per the OpenAPI 3 serialization rules. Each
//! decoder is parameterized by `(style, explode, shape)`; absent input
//! decodes to `None`, present input to `Some(value)`, malformed input to
//! [`InvalidSerialization`].
//!
//! Decoders never reject syntactically valid empty input: an empty string
//! is a legal serialization, and whether the target type accepts it is the
//! validator's decision.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::InvalidSerialization;
use crate::schema::Shape;

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
	Query,
	Header,
	Cookie,
	Path,
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Query => "query",
			Self::Header => "header",
			Self::Cookie => "cookie",
			Self::Path => "path",
		};
		write!(f, "{name}")
	}
}

/// OpenAPI serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
	Form,
	Simple,
	Label,
	Matrix,
	SpaceDelimited,
	PipeDelimited,
	DeepObject,
}

impl fmt::Display for Style {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Form => "form",
			Self::Simple => "simple",
			Self::Label => "label",
			Self::Matrix => "matrix",
			Self::SpaceDelimited => "spaceDelimited",
			Self::PipeDelimited => "pipeDelimited",
			Self::DeepObject => "deepObject",
		};
		write!(f, "{name}")
	}
}

/// Decoder output: absent, or a decoded untyped value.
pub type DecodeResult = Result<Option<Value>, InvalidSerialization>;

fn scalar(raw: &str) -> Option<Value> {
	Some(Value::String(raw.to_string()))
}

fn sequence<'a>(items: impl IntoIterator<Item = &'a str>) -> Option<Value> {
	Some(Value::Array(
		items
			.into_iter()
			.map(|item| Value::String(item.to_string()))
			.collect(),
	))
}

fn mapping(pairs: impl IntoIterator<Item = (String, String)>) -> Option<Value> {
	let mut map = Map::new();
	for (key, value) in pairs {
		map.insert(key, Value::String(value));
	}
	Some(Value::Object(map))
}

/// Split one `key=value` element; missing `=` is malformed.
fn split_key_value(element: &str) -> Result<(String, String), InvalidSerialization> {
	let mut parts = element.splitn(2, '=');
	let key = parts.next().unwrap_or_default();
	let value = parts.next().ok_or_else(|| {
		InvalidSerialization::new(format!(
			"invalid serialized mapping: expected key=value pairs, got '{element}'"
		))
	})?;
	Ok((key.to_string(), value.to_string()))
}

/// Pair up an alternating `k1,v1,k2,v2` element list; odd length is
/// malformed.
fn pairs_from_alternating(
	elements: &[&str],
) -> Result<Vec<(String, String)>, InvalidSerialization> {
	if elements.len() % 2 != 0 {
		return Err(InvalidSerialization::new(
			"invalid serialized mapping: odd number of elements",
		));
	}
	Ok(elements
		.chunks(2)
		.map(|pair| (pair[0].to_string(), pair[1].to_string()))
		.collect())
}

fn mapping_from_elements(elements: &[&str], explode: bool) -> DecodeResult {
	if explode {
		let mut pairs = Vec::with_capacity(elements.len());
		for element in elements {
			pairs.push(split_key_value(element)?);
		}
		Ok(mapping(pairs))
	} else {
		Ok(mapping(pairs_from_alternating(elements)?))
	}
}

/// Extract the bracketed field name from a `name[field]` deepObject key.
///
/// Keys that merely share a prefix with `name` (`namex[f]`, `name.f`) do
/// not match, so unrelated parameters never cross-contaminate.
fn deep_object_field<'a>(key: &'a str, name: &str) -> Option<&'a str> {
	let rest = key.strip_prefix(name)?;
	let rest = rest.strip_prefix('[')?;
	rest.strip_suffix(']').filter(|field| !field.is_empty())
}

/// Decode a query parameter from the ordered query-string multi-map.
///
/// `field_names` supplies the declared field names used by
/// `form`+`explode` mappings, where each field is its own query key; pass
/// `None` for a free-form mapping that absorbs every pair.
pub fn decode_query(
	name: &str,
	style: Style,
	explode: bool,
	shape: Shape,
	field_names: Option<&[&str]>,
	pairs: &[(String, String)],
) -> DecodeResult {
	let values: Vec<&str> = pairs
		.iter()
		.filter(|(key, _)| key == name)
		.map(|(_, value)| value.as_str())
		.collect();

	match style {
		Style::Form => match shape {
			Shape::Scalar => Ok(values.first().and_then(|raw| scalar(raw))),
			Shape::Sequence => {
				if explode {
					if values.is_empty() {
						Ok(None)
					} else {
						Ok(sequence(values))
					}
				} else {
					Ok(values.first().and_then(|raw| sequence(raw.split(','))))
				}
			}
			Shape::Mapping => {
				if explode {
					decode_exploded_form_mapping(field_names, pairs)
				} else {
					match values.first() {
						None => Ok(None),
						Some(raw) => {
							let elements: Vec<&str> = raw.split(',').collect();
							mapping_from_elements(&elements, false)
						}
					}
				}
			}
		},
		Style::SpaceDelimited | Style::PipeDelimited => {
			if shape != Shape::Sequence {
				return Err(InvalidSerialization::new(format!(
					"style '{style}' can only decode sequence values"
				)));
			}
			if explode {
				if values.is_empty() {
					Ok(None)
				} else {
					Ok(sequence(values))
				}
			} else {
				let delimiter = if style == Style::SpaceDelimited { ' ' } else { '|' };
				Ok(values
					.first()
					.and_then(|raw| sequence(raw.split(delimiter))))
			}
		}
		Style::DeepObject => {
			let mut map = Map::new();
			for (key, value) in pairs {
				if let Some(field) = deep_object_field(key, name) {
					// first occurrence of a field wins
					map.entry(field.to_string())
						.or_insert_with(|| Value::String(value.clone()));
				}
			}
			if map.is_empty() {
				Ok(None)
			} else {
				Ok(Some(Value::Object(map)))
			}
		}
		Style::Simple | Style::Label | Style::Matrix => Err(InvalidSerialization::new(format!(
			"style '{style}' is not defined for the query location"
		))),
	}
}

/// A `form`+`explode` mapping: each declared field is its own query key.
fn decode_exploded_form_mapping(
	field_names: Option<&[&str]>,
	pairs: &[(String, String)],
) -> DecodeResult {
	let mut map = Map::new();
	match field_names {
		Some(fields) => {
			for field in fields {
				if let Some((_, value)) = pairs.iter().find(|(key, _)| key == field) {
					map.insert(field.to_string(), Value::String(value.clone()));
				}
			}
		}
		None => {
			for (key, value) in pairs {
				map.entry(key.clone())
					.or_insert_with(|| Value::String(value.clone()));
			}
		}
	}
	if map.is_empty() {
		Ok(None)
	} else {
		Ok(Some(Value::Object(map)))
	}
}

/// Decode a path parameter from its captured segment.
pub fn decode_path(
	name: &str,
	style: Style,
	explode: bool,
	shape: Shape,
	raw: Option<&str>,
) -> DecodeResult {
	let Some(raw) = raw else {
		return Ok(None);
	};

	match style {
		Style::Simple => match shape {
			Shape::Scalar => Ok(scalar(raw)),
			// explode does not change simple-style sequences
			Shape::Sequence => Ok(sequence(raw.split(','))),
			Shape::Mapping => {
				let elements: Vec<&str> = raw.split(',').collect();
				mapping_from_elements(&elements, explode)
			}
		},
		Style::Label => {
			let rest = raw.strip_prefix('.').ok_or_else(|| {
				InvalidSerialization::new("label serialized parameter must start with '.'")
			})?;
			match shape {
				Shape::Scalar => Ok(scalar(rest)),
				Shape::Sequence => {
					let delimiter = if explode { '.' } else { ',' };
					Ok(sequence(rest.split(delimiter)))
				}
				Shape::Mapping => {
					let delimiter = if explode { '.' } else { ',' };
					let elements: Vec<&str> = rest.split(delimiter).collect();
					mapping_from_elements(&elements, explode)
				}
			}
		}
		Style::Matrix => decode_matrix(name, explode, shape, raw),
		_ => Err(InvalidSerialization::new(format!(
			"style '{style}' is not defined for the path location"
		))),
	}
}

fn decode_matrix(name: &str, explode: bool, shape: Shape, raw: &str) -> DecodeResult {
	let prefix = format!(";{name}=");
	match shape {
		Shape::Scalar => {
			let value = raw.strip_prefix(&prefix).ok_or_else(|| {
				InvalidSerialization::new(format!(
					"matrix serialized parameter must start with '{prefix}'"
				))
			})?;
			Ok(scalar(value))
		}
		Shape::Sequence => {
			if explode {
				let rest = raw.strip_prefix(';').ok_or_else(|| {
					InvalidSerialization::new(format!(
						"matrix serialized parameter must start with '{prefix}'"
					))
				})?;
				let mut values = Vec::new();
				for segment in rest.split(';') {
					let (key, value) = split_key_value(segment)?;
					if key != name {
						return Err(InvalidSerialization::new(format!(
							"matrix serialized parameter must repeat '{prefix}' segments"
						)));
					}
					values.push(value);
				}
				Ok(sequence(values.iter().map(String::as_str)))
			} else {
				let value = raw.strip_prefix(&prefix).ok_or_else(|| {
					InvalidSerialization::new(format!(
						"matrix serialized parameter must start with '{prefix}'"
					))
				})?;
				Ok(sequence(value.split(',')))
			}
		}
		Shape::Mapping => {
			if explode {
				let rest = raw.strip_prefix(';').ok_or_else(|| {
					InvalidSerialization::new(
						"matrix serialized mapping must start with ';'",
					)
				})?;
				let elements: Vec<&str> = rest.split(';').collect();
				mapping_from_elements(&elements, true)
			} else {
				let value = raw.strip_prefix(&prefix).ok_or_else(|| {
					InvalidSerialization::new(format!(
						"matrix serialized parameter must start with '{prefix}'"
					))
				})?;
				let elements: Vec<&str> = value.split(',').collect();
				mapping_from_elements(&elements, false)
			}
		}
	}
}

/// Decode a header parameter from its raw header lines.
///
/// Scalar targets take the first line verbatim. Composite targets fold
/// repeated lines RFC 7230-style (comma-join, then split on `,`) and
/// strip *leading* whitespace from each element. The stripping is
/// deliberate and header-specific: query and path elements are never
/// stripped, so a two-line header `1`/`2` and a single line `1, 2`
/// decode identically for array targets.
pub fn decode_header(lines: &[&str], explode: bool, shape: Shape) -> DecodeResult {
	if lines.is_empty() {
		return Ok(None);
	}
	match shape {
		// first line, whether or not explode is set
		Shape::Scalar => Ok(scalar(lines[0])),
		Shape::Sequence => {
			let joined = lines.join(",");
			Ok(sequence(joined.split(',').map(str::trim_start)))
		}
		Shape::Mapping => {
			let joined = lines.join(",");
			let elements: Vec<&str> = joined.split(',').map(str::trim_start).collect();
			mapping_from_elements(&elements, explode)
		}
	}
}

/// Decode a cookie parameter from its single value.
///
/// Cookies only support `form` style without explode for composite
/// shapes; registration rejects anything else, so the decoder only
/// handles the comma-joined forms.
pub fn decode_cookie(raw: Option<&str>, shape: Shape) -> DecodeResult {
	let Some(raw) = raw else {
		return Ok(None);
	};
	match shape {
		Shape::Scalar => Ok(scalar(raw)),
		Shape::Sequence => Ok(sequence(raw.split(','))),
		Shape::Mapping => {
			let elements: Vec<&str> = raw.split(',').collect();
			mapping_from_elements(&elements, false)
		}
	}
}

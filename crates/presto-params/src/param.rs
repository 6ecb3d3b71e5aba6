//! Per-location parameter extractors.
//!
//! A [`ParameterSpec`] is built once at startup, checked against the
//! style/location/explode rules, and shared read-only across requests.
//! The [`ParamExtractor`] wrapping it is a pure function of
//! `(spec, request)`: it pulls the raw text from the right connection
//! surface, runs the style decoder, and hands the result to the
//! validator.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use presto_http::Request;

use crate::error::{FieldError, LocItem, RegistrationError};
use crate::schema::{FieldSchema, Shape};
use crate::style::{self, Location, Style};
use crate::validate::{self, CoercionMode, ValueContext};

/// Identity of a parameter for deduplication across a dependency graph.
///
/// Two registrations sharing `(location, name)` are the same physical
/// parameter: they appear once in the OpenAPI document and extract once
/// per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamKey {
	pub location: Location,
	pub name: String,
}

impl fmt::Display for ParamKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.location, self.name)
	}
}

/// Static description of one declared parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
	/// Wire name (after alias resolution).
	pub name: String,
	pub location: Location,
	pub style: Style,
	pub explode: bool,
	pub required: bool,
	pub deprecated: bool,
	pub description: Option<String>,
	pub example: Option<Value>,
	pub include_in_schema: bool,
	pub schema: FieldSchema,
}

impl ParameterSpec {
	/// Create a spec with the location's default style and explode.
	///
	/// Defaults follow OpenAPI: `form` + explode for query and cookie,
	/// `simple` without explode for path and header. `required` derives
	/// from the schema: a parameter without a default is required; path
	/// parameters are always required.
	pub fn new(name: impl Into<String>, location: Location, schema: FieldSchema) -> Self {
		let style = match location {
			Location::Query | Location::Cookie => Style::Form,
			Location::Path | Location::Header => Style::Simple,
		};
		let required = location == Location::Path || schema.default.is_none();
		Self {
			name: name.into(),
			location,
			style,
			explode: style == Style::Form,
			required,
			deprecated: false,
			description: schema.description.clone(),
			example: None,
			include_in_schema: true,
			schema,
		}
	}

	pub fn shape(&self) -> Shape {
		self.schema.shape()
	}

	pub fn key(&self) -> ParamKey {
		ParamKey {
			location: self.location,
			name: self.name.clone(),
		}
	}

	/// Check the style/location/explode matrix.
	///
	/// Violations are programming errors and fail at startup, never at
	/// request time.
	pub fn validate(&self) -> Result<(), RegistrationError> {
		let style_fits_location = match self.location {
			Location::Query => matches!(
				self.style,
				Style::Form | Style::SpaceDelimited | Style::PipeDelimited | Style::DeepObject
			),
			Location::Path => {
				matches!(self.style, Style::Simple | Style::Label | Style::Matrix)
			}
			Location::Header => self.style == Style::Simple,
			Location::Cookie => self.style == Style::Form,
		};
		if !style_fits_location {
			return Err(RegistrationError::StyleLocationMismatch {
				style: self.style,
				location: self.location,
			});
		}

		match self.style {
			Style::DeepObject => {
				if !self.explode {
					return Err(RegistrationError::DeepObjectWithoutExplode);
				}
				if self.shape() != Shape::Mapping {
					return Err(RegistrationError::DeepObjectOnNonMapping);
				}
			}
			Style::SpaceDelimited | Style::PipeDelimited => {
				if self.shape() != Shape::Sequence {
					return Err(RegistrationError::SequenceStyleOnNonSequence {
						style: self.style,
					});
				}
			}
			_ => {}
		}

		if self.location == Location::Cookie && self.explode && self.shape() != Shape::Scalar {
			return Err(RegistrationError::CookieExplode {
				name: self.name.clone(),
			});
		}

		if self.location == Location::Path && self.schema.default.is_some() {
			return Err(RegistrationError::PathParamWithDefault {
				name: self.name.clone(),
			});
		}

		Ok(())
	}
}

/// Runtime extractor for one parameter.
///
/// Carries no per-request state; safe to call from any number of
/// concurrent request tasks.
#[derive(Debug, Clone)]
pub struct ParamExtractor {
	spec: Arc<ParameterSpec>,
}

impl ParamExtractor {
	pub fn new(spec: ParameterSpec) -> Result<Self, RegistrationError> {
		spec.validate()?;
		tracing::debug!(
			name = %spec.name,
			location = %spec.location,
			style = %spec.style,
			explode = spec.explode,
			"registered parameter"
		);
		Ok(Self {
			spec: Arc::new(spec),
		})
	}

	pub fn spec(&self) -> &ParameterSpec {
		&self.spec
	}

	pub fn key(&self) -> ParamKey {
		self.spec.key()
	}

	fn loc(&self) -> Vec<LocItem> {
		vec![
			LocItem::from(self.spec.location),
			LocItem::Key(self.spec.name.clone()),
		]
	}

	/// Pull, decode and validate this parameter from a live request.
	pub fn extract(&self, request: &Request) -> Result<Value, Vec<FieldError>> {
		let spec = &self.spec;
		let shape = spec.shape();
		let field_names = spec.schema.field_names();

		let decoded = match spec.location {
			Location::Query => style::decode_query(
				&spec.name,
				spec.style,
				spec.explode,
				shape,
				field_names.as_deref(),
				request.query_pairs(),
			),
			Location::Path => style::decode_path(
				&spec.name,
				spec.style,
				spec.explode,
				shape,
				request.path_param(&spec.name),
			),
			Location::Header => {
				let lines = request.header_lines(&spec.name);
				style::decode_header(&lines, spec.explode, shape)
			}
			Location::Cookie => {
				style::decode_cookie(request.cookie(&spec.name).as_deref(), shape)
			}
		};

		let decoded = match decoded {
			Ok(decoded) => decoded,
			Err(error) => {
				trace!(name = %spec.name, %error, "parameter failed style decoding");
				return Err(vec![FieldError::new(
					self.loc(),
					error.message,
					"invalidserialization",
				)]);
			}
		};

		// An optional parameter with no default simply binds null when
		// absent.
		if decoded.is_none() && !spec.required && spec.schema.default.is_none() {
			return Ok(Value::Null);
		}

		validate::validate(
			&spec.schema,
			decoded,
			&self.loc(),
			CoercionMode::Wire,
			ValueContext::Parameter(spec.location),
		)
	}
}

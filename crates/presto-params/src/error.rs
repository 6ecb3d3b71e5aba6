//! Error types for registration-time and request-time failures.
//!
//! Registration errors are programming errors and surface immediately at
//! startup. Request-time failures are structured values: every individual
//! problem becomes one [`FieldError`] with a positional `loc` path, and
//! independent problems accumulate instead of short-circuiting.

use std::fmt;

use serde::Serialize;

use crate::style::{Location, Style};

/// One element of an error location path: a field/parameter name or a
/// sequence index.
///
/// Serializes untagged so a path renders as `["query", "param"]` or
/// `["body", "items", 2, "price"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocItem {
	Key(String),
	Index(usize),
}

impl From<&str> for LocItem {
	fn from(value: &str) -> Self {
		Self::Key(value.to_string())
	}
}

impl From<String> for LocItem {
	fn from(value: String) -> Self {
		Self::Key(value)
	}
}

impl From<usize> for LocItem {
	fn from(value: usize) -> Self {
		Self::Index(value)
	}
}

impl From<Location> for LocItem {
	fn from(value: Location) -> Self {
		Self::Key(value.to_string())
	}
}

impl fmt::Display for LocItem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Key(k) => write!(f, "{k}"),
			Self::Index(i) => write!(f, "{i}"),
		}
	}
}

/// One validation failure with its position inside the request.
///
/// The wire rendering is `{"loc": [...], "msg": "...", "type": "..."}`,
/// matching the error response shape `{"detail": [FieldError, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
	pub loc: Vec<LocItem>,
	pub msg: String,
	#[serde(rename = "type")]
	pub kind: String,
}

impl FieldError {
	pub fn new(
		loc: impl IntoIterator<Item = LocItem>,
		msg: impl Into<String>,
		kind: impl Into<String>,
	) -> Self {
		Self {
			loc: loc.into_iter().collect(),
			msg: msg.into(),
			kind: kind.into(),
		}
	}

	/// The error reported for an absent required parameter.
	pub fn missing_parameter(location: Location, name: &str) -> Self {
		Self::new(
			[LocItem::from(location), LocItem::from(name)],
			format!("Missing required {location} parameter"),
			"value_error",
		)
	}

	/// The error reported for an absent required body or body field.
	pub fn missing_value(loc: impl IntoIterator<Item = LocItem>) -> Self {
		Self::new(loc, "Missing required value", "value_error")
	}
}

/// Raw wire text does not conform to the declared style grammar.
///
/// Decoders raise this for wrong prefixes, malformed `key=value` pairs and
/// odd-length flattened mappings. It is never raised for merely-empty
/// input; rejecting empties is the validator's job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidSerialization {
	pub message: String,
}

impl InvalidSerialization {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// Request-time extraction failure for an HTTP connection.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
	/// One or more values failed decoding or validation. Maps to 422.
	#[error("request validation failed")]
	Validation(Vec<FieldError>),
	/// The body's content type does not satisfy the declared pattern.
	/// Maps to 415; the detail entries are positioned at
	/// `["headers", "content-type"]`.
	#[error("unsupported media type")]
	UnsupportedMediaType(Vec<FieldError>),
	/// The body stream failed (disconnect, double read, I/O error).
	#[error(transparent)]
	Body(#[from] presto_http::BodyError),
}

impl ExtractError {
	pub fn status_code(&self) -> http::StatusCode {
		match self {
			Self::Validation(_) => http::StatusCode::UNPROCESSABLE_ENTITY,
			Self::UnsupportedMediaType(_) => http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
			Self::Body(_) => http::StatusCode::BAD_REQUEST,
		}
	}

	pub fn detail(&self) -> &[FieldError] {
		match self {
			Self::Validation(detail) | Self::UnsupportedMediaType(detail) => detail,
			Self::Body(_) => &[],
		}
	}

	/// The response payload: `{"detail": [...]}`.
	pub fn to_detail_json(&self) -> serde_json::Value {
		serde_json::json!({ "detail": self.detail() })
	}
}

/// Validation failure on a WebSocket handshake.
///
/// Deliberately a distinct, non-HTTP type: the caller closes the socket
/// instead of rendering a response. This is the only place the extraction
/// pipeline branches on transport kind.
#[derive(Debug, thiserror::Error)]
#[error("websocket request validation failed")]
pub struct WebSocketValidationError {
	pub detail: Vec<FieldError>,
}

impl From<ExtractError> for WebSocketValidationError {
	fn from(error: ExtractError) -> Self {
		Self {
			detail: error.detail().to_vec(),
		}
	}
}

/// Startup-time configuration errors.
///
/// These are raised while building extractors, before any request is in
/// flight, and are never deferred to request handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
	#[error("deepObject can only be used with explode=True")]
	DeepObjectWithoutExplode,
	#[error("deepObject can only be applied to mapping values")]
	DeepObjectOnNonMapping,
	#[error("Path parameters MUST be required: '{name}' declares a default value")]
	PathParamWithDefault { name: String },
	#[error("cookie parameter '{name}' cannot combine explode=True with sequence or mapping values")]
	CookieExplode { name: String },
	#[error("There can only be 1 top level body")]
	MultipleTopLevelBodies,
	#[error("style '{style}' cannot be used at the {location} location")]
	StyleLocationMismatch { style: Style, location: Location },
	#[error("style '{style}' can only be applied to sequence values")]
	SequenceStyleOnNonSequence { style: Style },
	#[error("content-type discriminated unions may only contain body markers")]
	NonBodyUnionMember,
}

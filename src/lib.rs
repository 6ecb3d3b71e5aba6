//! # Presto
//!
//! A typed request-binding engine for OpenAPI-described web APIs,
//! inspired by FastAPI's parameter and body extraction layer.
//!
//! Presto turns declared parameters into paired artifacts: a runtime
//! extractor that decodes and validates live requests, and an OpenAPI
//! emitter that documents exactly what the extractor does. Both are built
//! from the same static signature at startup, so the documented contract
//! and the enforced contract cannot drift apart.
//!
//! ## Crates
//!
//! - [`presto_http`] - the connection surface: [`Request`], media-type
//!   matching, the single-use body stream
//! - [`presto_params`] - style decoders, parameter/body extractors,
//!   validation with positioned errors, registration markers
//! - [`presto_openapi`] - parameter/request-body emission and the
//!   component schema registry
//!
//! ## Example
//!
//! ```
//! use presto::{
//!     FieldSchema, Marker, ParamConfig, RegisteredPair, register_pair,
//! };
//!
//! let pair = register_pair(
//!     Marker::Query(ParamConfig::default()),
//!     "limit",
//!     FieldSchema::integer().with_default(10),
//! )
//! .unwrap();
//!
//! match pair {
//!     RegisteredPair::Parameter(extractor, emitter) => {
//!         assert_eq!(extractor.spec().name, "limit");
//!         assert!(emitter.spec().include_in_schema);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

pub use presto_http;
pub use presto_openapi;
pub use presto_params;

pub use presto_http::{BodyError, BodyStream, Request, RequestBuilder, ScopeKind};
pub use presto_openapi::{ComponentRegistry, ParameterEmitter, RequestBodyEmitter};
pub use presto_params::{
	BindingFailure, BodyConfig, BodyExtractor, BoundValue, BoundValues, EndpointBinding,
	EvaluationMode, ExtractError, FieldConfig, FieldError, FieldExtractor, FieldKindConfig,
	FieldSchema, FileConfig, Location, Marker, ModelName, ObjectField, ParamConfig,
	ParamExtractor, ParameterSpec, Registered, RegistrationError, Shape, Style,
	WebSocketValidationError, register,
};

/// A marker's registered artifacts: the runtime extractor paired with its
/// OpenAPI emitter.
#[derive(Debug, Clone)]
pub enum RegisteredPair {
	Parameter(ParamExtractor, ParameterEmitter),
	Body(BodyExtractor, RequestBodyEmitter),
	/// Field extractors nest inside a form/multipart body and emit through
	/// it, so they carry no emitter of their own.
	Field(FieldExtractor),
}

/// Register a declared parameter, producing both the runtime extractor
/// and the schema emitter from the same static signature.
pub fn register_pair(
	marker: Marker,
	name: &str,
	schema: FieldSchema,
) -> Result<RegisteredPair, RegistrationError> {
	Ok(match register(marker, name, schema)? {
		Registered::Parameter(extractor) => {
			let emitter = ParameterEmitter::from_extractor(&extractor);
			RegisteredPair::Parameter(extractor, emitter)
		}
		Registered::Body(body) => {
			let emitter = RequestBodyEmitter::from_extractor(&body);
			RegisteredPair::Body(body, emitter)
		}
		Registered::Field(field) => RegisteredPair::Field(field),
	})
}

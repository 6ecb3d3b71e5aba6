//! # Presto Params
//!
//! Style-aware parameter and body extraction for OpenAPI-described web
//! APIs, inspired by FastAPI's binding layer.
//!
//! At startup each declared parameter registers a [`Marker`] plus its
//! static [`FieldSchema`]; the result is an immutable extractor shared
//! read-only across every request. At request time extractors are pure
//! functions of `(spec, request)`: they pull raw text from the right
//! connection surface, decode it per the OpenAPI serialization style
//! (form, simple, label, matrix, spaceDelimited, pipeDelimited,
//! deepObject), and validate it into a typed value, or into a list of
//! positioned [`FieldError`]s rendered as `{"detail": [...]}` with
//! status 422 (415 for media-type rejections).
//!
//! Configuration mistakes (deepObject without explode, a defaulted path
//! parameter, cookie explode on composite shapes, two top-level bodies)
//! are [`RegistrationError`]s raised at startup, never at request time.

pub mod body;
pub mod error;
pub mod form;
pub mod multipart;
pub mod param;
pub mod register;
pub mod schema;
pub mod style;
pub mod validate;

pub use body::{
	BodyExtractor, BodySpec, BoundValue, DiscriminatedBody, FileBody, FileTarget, JsonBody,
	JsonDecoder, UploadFile,
};
pub use error::{
	ExtractError, FieldError, InvalidSerialization, LocItem, RegistrationError,
	WebSocketValidationError,
};
pub use form::{FieldDecoder, FieldExtractor, FieldMap, FormBody, FormData, FormPart};
pub use multipart::MultipartBody;
pub use param::{ParamExtractor, ParamKey, ParameterSpec};
pub use register::{
	BindingFailure, BodyConfig, BoundValues, EndpointBinding, EndpointBindingBuilder,
	EvaluationMode, Extract, FieldConfig, FieldKindConfig, FileConfig, Marker, ParamConfig,
	Registered, register,
};
pub use schema::{FieldKind, FieldSchema, ModelName, ObjectField, Shape};
pub use style::{Location, Style};
pub use validate::{CoercionMode, ValueContext, validate};

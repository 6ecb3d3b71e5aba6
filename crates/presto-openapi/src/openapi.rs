//! OpenAPI 3.1 types
//!
//! Re-exports utoipa's OpenAPI types for use in presto.

// Re-export core utoipa types as presto's OpenAPI types
pub use utoipa::openapi::{
	Components, ComponentsBuilder, Content, ContentBuilder, Deprecated, Ref, RefOr, Required,
	Schema,
};

// Re-export schema construction types
pub use utoipa::openapi::schema::{
	ArrayBuilder, KnownFormat, Object, ObjectBuilder, SchemaFormat, SchemaType, Type,
};

// Re-export request/response types
pub use utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};

// Re-export path operation types
pub use utoipa::openapi::path::{Parameter, ParameterBuilder, ParameterIn, ParameterStyle};

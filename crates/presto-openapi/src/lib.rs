//! # Presto OpenAPI
//!
//! Schema emission for the presto binding engine.
//!
//! For each registered parameter or body this crate produces the static
//! OpenAPI object (`{name, in, required, style, explode, schema, ...}`
//! for parameters, `{content: {media_type: {schema}}, required}` for
//! bodies) from the very same specs the runtime extractors consume.
//! Named model schemas accumulate in a shared [`ComponentRegistry`] with
//! display-name collision handling.
//!
//! The document model is utoipa's OpenAPI 3.1 types, re-exported from
//! [`openapi`].

pub mod emitter;
pub mod openapi;
pub mod registry;
pub mod schema;

pub use emitter::{ParameterEmitter, RequestBodyEmitter};
pub use registry::ComponentRegistry;
pub use schema::to_schema_ref;

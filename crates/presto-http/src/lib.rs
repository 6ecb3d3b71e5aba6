//! # Presto HTTP
//!
//! The connection surface consumed by the presto binding engine.
//!
//! This crate owns the [`Request`] type: a transport-agnostic view of one
//! HTTP (or WebSocket handshake) request exposing everything the extraction
//! layer needs: path parameters, an ordered query multi-map, headers,
//! cookies, and a body byte-stream that can be consumed exactly once.
//!
//! It deliberately knows nothing about routing, dependency injection, or
//! the server loop; those live in external collaborators.

pub mod media_type;
pub mod request;

pub use media_type::matches_media_type;
pub use request::{BodyError, BodyStream, Request, RequestBuilder, ScopeKind};

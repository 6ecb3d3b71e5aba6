//! Registration-time marker dispatch and endpoint binding.
//!
//! Every declared parameter is described by one [`Marker`] variant. At
//! startup `register` turns a marker plus the parameter's static
//! signature into a runtime extractor; the OpenAPI emitters are built
//! from the same specs by the companion crate. All configuration errors
//! surface here, before any request is in flight.

use async_trait::async_trait;
use futures_util::future::join_all;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use presto_http::{Request, ScopeKind};

use crate::body::{
	BodyExtractor, BoundValue, DiscriminatedBody, FileBody, FileTarget, JsonBody,
};
use crate::error::{
	ExtractError, FieldError, RegistrationError, WebSocketValidationError,
};
use crate::form::{FieldDecoder, FieldExtractor, FieldMap, FormBody};
use crate::multipart::MultipartBody;
use crate::param::{ParamExtractor, ParamKey, ParameterSpec};
use crate::schema::FieldSchema;
use crate::style::{Location, Style};

/// Configuration shared by the four parameter markers.
#[derive(Debug, Clone)]
pub struct ParamConfig {
	/// Wire name when it differs from the binding name.
	pub alias: Option<String>,
	pub style: Option<Style>,
	pub explode: Option<bool>,
	pub description: Option<String>,
	pub example: Option<Value>,
	pub deprecated: bool,
	pub include_in_schema: bool,
}

impl Default for ParamConfig {
	fn default() -> Self {
		Self {
			alias: None,
			style: None,
			explode: None,
			description: None,
			example: None,
			deprecated: false,
			include_in_schema: true,
		}
	}
}

/// Configuration for body markers.
#[derive(Debug, Clone)]
pub struct BodyConfig {
	pub media_type: Option<String>,
	pub enforce_media_type: bool,
	pub description: Option<String>,
	pub include_in_schema: bool,
}

impl Default for BodyConfig {
	fn default() -> Self {
		Self {
			media_type: None,
			enforce_media_type: true,
			description: None,
			include_in_schema: true,
		}
	}
}

/// Configuration for the raw body / file marker.
#[derive(Debug, Clone)]
pub struct FileConfig {
	/// Allow-pattern, e.g. `image/*`; `None` accepts anything.
	pub media_type: Option<String>,
	pub enforce_media_type: bool,
	pub target: FileTarget,
	pub required: bool,
}

impl Default for FileConfig {
	fn default() -> Self {
		Self {
			media_type: None,
			enforce_media_type: true,
			target: FileTarget::Bytes,
			required: true,
		}
	}
}

/// What a form/multipart field marker decodes its value as.
#[derive(Debug, Clone, Default)]
pub enum FieldKindConfig {
	#[default]
	Text,
	Json,
	File {
		media_type: Option<String>,
		enforce_media_type: bool,
	},
	/// A nested form-encoded sub-body with its own declared fields.
	Urlencoded(FieldMap),
}

/// Configuration for field markers.
#[derive(Debug, Clone, Default)]
pub struct FieldConfig {
	pub alias: Option<String>,
	pub kind: FieldKindConfig,
}

/// The closed set of registration markers.
#[derive(Debug, Clone)]
pub enum Marker {
	Query(ParamConfig),
	Header(ParamConfig),
	Cookie(ParamConfig),
	Path(ParamConfig),
	Json(BodyConfig),
	Form { config: BodyConfig, fields: FieldMap },
	Multipart { config: BodyConfig, fields: FieldMap },
	File(FileConfig),
	Field(FieldConfig),
	RepeatedField(FieldConfig),
	ContentTypeDiscriminated(Vec<Marker>),
}

/// The runtime artifact a marker registers into.
#[derive(Debug, Clone)]
pub enum Registered {
	Parameter(ParamExtractor),
	Body(BodyExtractor),
	Field(FieldExtractor),
}

/// Build the runtime extractor for one declared parameter.
pub fn register(
	marker: Marker,
	name: &str,
	schema: FieldSchema,
) -> Result<Registered, RegistrationError> {
	match marker {
		Marker::Query(config) => register_param(Location::Query, config, name, schema),
		Marker::Header(config) => register_param(Location::Header, config, name, schema),
		Marker::Cookie(config) => register_param(Location::Cookie, config, name, schema),
		Marker::Path(config) => register_param(Location::Path, config, name, schema),
		Marker::Json(config) => {
			let mut body = JsonBody::new(schema);
			apply_body_config(&mut body.spec, config);
			Ok(Registered::Body(BodyExtractor::Json(body)))
		}
		Marker::Form { config, fields } => {
			let mut body = FormBody::new(fields);
			apply_body_config(&mut body.spec, config);
			Ok(Registered::Body(BodyExtractor::Form(body)))
		}
		Marker::Multipart { config, fields } => {
			let mut body = MultipartBody::new(fields);
			apply_body_config(&mut body.spec, config);
			Ok(Registered::Body(BodyExtractor::Multipart(body)))
		}
		Marker::File(config) => {
			let mut body = FileBody::new(config.media_type, config.target);
			body.spec.enforce_media_type = config.enforce_media_type;
			body.spec.required = config.required;
			Ok(Registered::Body(BodyExtractor::File(body)))
		}
		Marker::Field(config) => Ok(Registered::Field(FieldExtractor::single(
			config.alias.as_deref().unwrap_or(name),
			field_decoder(config.kind, schema),
		))),
		Marker::RepeatedField(config) => Ok(Registered::Field(FieldExtractor::repeated(
			config.alias.as_deref().unwrap_or(name),
			field_decoder(config.kind, schema),
		))),
		Marker::ContentTypeDiscriminated(markers) => {
			let mut variants = Vec::with_capacity(markers.len());
			for marker in markers {
				match register(marker, name, schema.clone())? {
					Registered::Body(body) => variants.push(body),
					_ => return Err(RegistrationError::NonBodyUnionMember),
				}
			}
			Ok(Registered::Body(BodyExtractor::Discriminated(
				DiscriminatedBody::new(variants)?,
			)))
		}
	}
}

fn register_param(
	location: Location,
	config: ParamConfig,
	name: &str,
	schema: FieldSchema,
) -> Result<Registered, RegistrationError> {
	let wire_name = config.alias.unwrap_or_else(|| name.to_string());
	let mut spec = ParameterSpec::new(wire_name, location, schema);
	if let Some(style) = config.style {
		spec.style = style;
		// OpenAPI defaults explode to true for form style; deepObject is
		// only defined with explode
		spec.explode = matches!(style, Style::Form | Style::DeepObject);
	}
	if let Some(explode) = config.explode {
		spec.explode = explode;
	}
	if config.description.is_some() {
		spec.description = config.description;
	}
	spec.example = config.example;
	spec.deprecated = config.deprecated;
	spec.include_in_schema = config.include_in_schema;
	Ok(Registered::Parameter(ParamExtractor::new(spec)?))
}

fn apply_body_config(spec: &mut crate::body::BodySpec, config: BodyConfig) {
	if config.media_type.is_some() {
		spec.media_type = config.media_type;
	}
	spec.enforce_media_type = config.enforce_media_type;
	spec.include_in_schema = config.include_in_schema;
	if config.description.is_some() {
		spec.description = config.description;
	}
}

fn field_decoder(kind: FieldKindConfig, schema: FieldSchema) -> FieldDecoder {
	match kind {
		FieldKindConfig::Text => FieldDecoder::Text(schema),
		FieldKindConfig::Json => FieldDecoder::Json(schema),
		FieldKindConfig::File {
			media_type,
			enforce_media_type,
		} => FieldDecoder::File {
			media_type,
			enforce_media_type,
		},
		FieldKindConfig::Urlencoded(fields) => FieldDecoder::Urlencoded(fields),
	}
}

/// The uniform extraction interface exposed to the routing collaborator.
///
/// Both extractor kinds are pure functions of `(spec, request)` and safe
/// for unbounded concurrent invocation; this trait erases the kind for
/// callers that evaluate a heterogeneous list.
#[async_trait]
pub trait Extract: Send + Sync {
	async fn extract_value(&self, request: &Request) -> Result<BoundValue, ExtractError>;
}

#[async_trait]
impl Extract for ParamExtractor {
	async fn extract_value(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		self.extract(request)
			.map(BoundValue::Json)
			.map_err(ExtractError::Validation)
	}
}

#[async_trait]
impl Extract for BodyExtractor {
	async fn extract_value(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		self.extract(request).await
	}
}

/// Whether an endpoint's extractors run one-by-one or interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationMode {
	#[default]
	Sequential,
	Concurrent,
}

/// Extraction failure, branched on the connection's transport.
#[derive(Debug, thiserror::Error)]
pub enum BindingFailure {
	#[error(transparent)]
	Http(#[from] ExtractError),
	#[error(transparent)]
	WebSocket(#[from] WebSocketValidationError),
}

/// Everything bound for one request.
#[derive(Debug)]
pub struct BoundValues {
	/// Typed parameter values keyed by wire name.
	pub params: IndexMap<String, Value>,
	pub body: Option<BoundValue>,
}

/// The registered extractors of one endpoint.
///
/// Parameters sharing `(location, name)` across a dependency graph are
/// deduplicated here so the physical parameter extracts once and appears
/// once in the OpenAPI document. At most one extractor may claim the body
/// stream.
#[derive(Debug, Clone, Default)]
pub struct EndpointBinding {
	params: IndexMap<ParamKey, ParamExtractor>,
	body: Option<BodyExtractor>,
	mode: EvaluationMode,
}

impl EndpointBinding {
	pub fn builder() -> EndpointBindingBuilder {
		EndpointBindingBuilder::default()
	}

	pub fn parameters(&self) -> impl Iterator<Item = &ParamExtractor> {
		self.params.values()
	}

	pub fn body(&self) -> Option<&BodyExtractor> {
		self.body.as_ref()
	}

	/// Run every registered extractor against one request.
	///
	/// All parameter failures across the request are merged into a single
	/// response; a media-type rejection or transport failure on the body
	/// is terminal and returned on its own.
	pub async fn evaluate(&self, request: &Request) -> Result<BoundValues, BindingFailure> {
		let mut errors: Vec<FieldError> = Vec::new();
		let mut params = IndexMap::new();

		let results: Vec<(String, Result<Value, Vec<FieldError>>)> = match self.mode {
			EvaluationMode::Sequential => self
				.params
				.values()
				.map(|extractor| {
					(extractor.spec().name.clone(), extractor.extract(request))
				})
				.collect(),
			EvaluationMode::Concurrent => {
				join_all(self.params.values().map(|extractor| async move {
					(extractor.spec().name.clone(), extractor.extract(request))
				}))
				.await
			}
		};
		for (name, result) in results {
			match result {
				Ok(value) => {
					params.insert(name, value);
				}
				Err(param_errors) => errors.extend(param_errors),
			}
		}

		let mut body = None;
		if let Some(extractor) = &self.body {
			match extractor.extract(request).await {
				Ok(value) => body = Some(value),
				Err(ExtractError::Validation(body_errors)) => errors.extend(body_errors),
				Err(terminal) => return Err(self.fail(request, terminal)),
			}
		}

		if errors.is_empty() {
			Ok(BoundValues { params, body })
		} else {
			Err(self.fail(request, ExtractError::Validation(errors)))
		}
	}

	fn fail(&self, request: &Request, error: ExtractError) -> BindingFailure {
		match request.scope_kind() {
			ScopeKind::Http => BindingFailure::Http(error),
			ScopeKind::WebSocket => BindingFailure::WebSocket(error.into()),
		}
	}
}

/// Builder enforcing the startup invariants of an endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointBindingBuilder {
	params: IndexMap<ParamKey, ParamExtractor>,
	body: Option<BodyExtractor>,
	mode: EvaluationMode,
}

impl EndpointBindingBuilder {
	/// Add a parameter extractor, deduplicating by `(location, name)`.
	pub fn parameter(mut self, extractor: ParamExtractor) -> Self {
		let key = extractor.key();
		if self.params.contains_key(&key) {
			debug!(%key, "parameter already registered, sharing the existing extractor");
		} else {
			self.params.insert(key, extractor);
		}
		self
	}

	/// Claim the body stream for one extractor.
	///
	/// The stream can only be consumed once, so a second claim is a
	/// startup error.
	pub fn body(mut self, body: BodyExtractor) -> Result<Self, RegistrationError> {
		if self.body.is_some() {
			return Err(RegistrationError::MultipleTopLevelBodies);
		}
		self.body = Some(body);
		Ok(self)
	}

	pub fn evaluation_mode(mut self, mode: EvaluationMode) -> Self {
		self.mode = mode;
		self
	}

	pub fn build(self) -> EndpointBinding {
		EndpointBinding {
			params: self.params,
			body: self.body,
			mode: self.mode,
		}
	}
}

//! Body extraction: JSON, raw/file bodies and content-type unions.
//!
//! Every body extractor owns a [`BodySpec`] built at startup and consumes
//! the request's single-use byte stream at most once. URL-encoded form and
//! multipart bodies live in their own modules ([`crate::form`],
//! [`crate::multipart`]); this module hosts the shared value type, the
//! streaming upload target, and the content-type-discriminated union.

use std::future::Future;
use std::io::SeekFrom;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::StreamExt;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use presto_http::{BodyError, Request, matches_media_type};

use crate::error::{ExtractError, FieldError, LocItem, RegistrationError};
use crate::form::FormBody;
use crate::multipart::MultipartBody;
use crate::schema::FieldSchema;
use crate::validate::{self, CoercionMode, ValueContext};

/// Static description of one body target.
#[derive(Debug, Clone)]
pub struct BodySpec {
	/// Declared media type pattern; `None` means "any".
	pub media_type: Option<String>,
	/// Whether a mismatching `Content-Type` is a 415 or merely advisory.
	pub enforce_media_type: bool,
	pub required: bool,
	pub description: Option<String>,
	pub include_in_schema: bool,
	pub schema: FieldSchema,
}

impl BodySpec {
	pub fn new(media_type: Option<String>, schema: FieldSchema) -> Self {
		Self {
			media_type,
			enforce_media_type: true,
			required: schema.default.is_none(),
			description: schema.description.clone(),
			include_in_schema: true,
			schema,
		}
	}
}

/// A fully extracted and validated value, ready for handler binding.
///
/// JSON-representable results use [`BoundValue::Json`]; file uploads and
/// raw bodies cannot be represented as `serde_json::Value` and get their
/// own variants. Form and multipart bodies bind as ordered field maps
/// that may mix both.
#[derive(Debug)]
pub enum BoundValue {
	Json(Value),
	Bytes(Bytes),
	File(UploadFile),
	List(Vec<BoundValue>),
	Fields(IndexMap<String, BoundValue>),
}

impl BoundValue {
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			Self::Json(value) => Some(value),
			_ => None,
		}
	}

	pub fn into_json(self) -> Option<Value> {
		match self {
			Self::Json(value) => Some(value),
			_ => None,
		}
	}
}

/// A streamed upload spooled to an anonymous temp file.
///
/// Chunks are written as they arrive so peak memory stays bounded by the
/// chunk size, not the payload size; the file is rewound to the start
/// once the stream ends.
#[derive(Debug)]
pub struct UploadFile {
	filename: Option<String>,
	content_type: Option<String>,
	file: File,
	size: u64,
}

impl UploadFile {
	pub async fn create() -> std::io::Result<Self> {
		let file = tempfile::tempfile()?;
		Ok(Self {
			filename: None,
			content_type: None,
			file: File::from_std(file),
			size: 0,
		})
	}

	pub fn with_metadata(
		mut self,
		filename: Option<String>,
		content_type: Option<String>,
	) -> Self {
		self.filename = filename;
		self.content_type = content_type;
		self
	}

	pub fn filename(&self) -> Option<&str> {
		self.filename.as_deref()
	}

	pub fn content_type(&self) -> Option<&str> {
		self.content_type.as_deref()
	}

	pub fn size(&self) -> u64 {
		self.size
	}

	pub async fn write_chunk(&mut self, chunk: &[u8]) -> std::io::Result<()> {
		self.file.write_all(chunk).await?;
		self.size += chunk.len() as u64;
		Ok(())
	}

	/// Flush and seek back to the start, ready for the handler to read.
	pub async fn rewind(&mut self) -> std::io::Result<()> {
		self.file.flush().await?;
		self.file.seek(SeekFrom::Start(0)).await?;
		Ok(())
	}

	pub async fn read_to_bytes(&mut self) -> std::io::Result<Bytes> {
		let mut buf = Vec::with_capacity(self.size as usize);
		self.file.read_to_end(&mut buf).await?;
		Ok(Bytes::from(buf))
	}
}

/// Build the 415 error for a rejected or missing content type.
pub(crate) fn unsupported_media_type(content_type: Option<&str>) -> ExtractError {
	let msg = match content_type {
		Some(content_type) => format!("Media type {content_type} is not acceptable"),
		None => "Content-Type header missing".to_string(),
	};
	ExtractError::UnsupportedMediaType(vec![FieldError::new(
		[LocItem::from("headers"), LocItem::from("content-type")],
		msg,
		"value_error",
	)])
}

/// Enforce a media-type pattern against the request, when enforcement is
/// on and a pattern is declared.
pub(crate) fn check_media_type(
	request: &Request,
	pattern: Option<&str>,
	enforce: bool,
) -> Result<(), ExtractError> {
	let Some(pattern) = pattern else {
		return Ok(());
	};
	if !enforce {
		return Ok(());
	}
	match request.content_type() {
		Some(content_type) if matches_media_type(pattern, content_type) => Ok(()),
		content_type => Err(unsupported_media_type(content_type)),
	}
}

pub(crate) fn body_loc() -> Vec<LocItem> {
	vec![LocItem::from("body")]
}

/// Decode hook turning raw body bytes into an untyped JSON value.
pub type JsonDecoder = fn(&[u8]) -> Result<Value, serde_json::Error>;

fn decode_json(bytes: &[u8]) -> Result<Value, serde_json::Error> {
	serde_json::from_slice(bytes)
}

/// JSON body extractor.
#[derive(Debug, Clone)]
pub struct JsonBody {
	pub spec: BodySpec,
	/// Pluggable decoder; defaults to `serde_json`.
	pub decoder: JsonDecoder,
}

impl JsonBody {
	pub fn new(schema: FieldSchema) -> Self {
		Self {
			spec: BodySpec::new(Some("application/json".to_string()), schema),
			decoder: decode_json,
		}
	}

	pub fn with_decoder(mut self, decoder: JsonDecoder) -> Self {
		self.decoder = decoder;
		self
	}

	fn pattern(&self) -> &str {
		self.spec.media_type.as_deref().unwrap_or("application/json")
	}

	pub fn matches_media_type(&self, content_type: Option<&str>) -> bool {
		content_type.is_some_and(|ct| matches_media_type(self.pattern(), ct))
	}

	pub async fn extract(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		check_media_type(request, Some(self.pattern()), self.spec.enforce_media_type)?;

		let bytes = request.read_body().await?;
		// An empty stream is "no body" - distinct from the literal text
		// "null", which decodes to a present null value.
		if bytes.is_empty() {
			return match (&self.spec.schema.default, self.spec.required) {
				(Some(default), _) => Ok(BoundValue::Json(default.clone())),
				(None, false) => Ok(BoundValue::Json(Value::Null)),
				(None, true) => Err(ExtractError::Validation(vec![
					FieldError::missing_value(body_loc()),
				])),
			};
		}

		let value: Value = (self.decoder)(&bytes).map_err(|_| {
			ExtractError::Validation(vec![FieldError::new(
				body_loc(),
				"Data is not valid JSON",
				"type_error",
			)])
		})?;

		validate::validate(
			&self.spec.schema,
			Some(value),
			&body_loc(),
			CoercionMode::Json,
			ValueContext::Body,
		)
		.map(BoundValue::Json)
		.map_err(ExtractError::Validation)
	}
}

/// What a raw body binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTarget {
	/// Buffer the whole payload in memory.
	Bytes,
	/// Spool to a temp file chunk-by-chunk; memory stays bounded.
	File,
}

/// Raw body / file upload extractor.
#[derive(Debug, Clone)]
pub struct FileBody {
	pub spec: BodySpec,
	pub target: FileTarget,
}

impl FileBody {
	pub fn new(media_type: Option<String>, target: FileTarget) -> Self {
		let mut spec = BodySpec::new(media_type, FieldSchema::binary());
		spec.required = true;
		Self { spec, target }
	}

	pub fn matches_media_type(&self, content_type: Option<&str>) -> bool {
		match self.spec.media_type.as_deref() {
			Some(pattern) => {
				content_type.is_some_and(|ct| matches_media_type(pattern, ct))
			}
			None => true,
		}
	}

	pub async fn extract(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		check_media_type(
			request,
			self.spec.media_type.as_deref(),
			self.spec.enforce_media_type,
		)?;

		match self.target {
			FileTarget::Bytes => {
				let bytes = request.read_body().await?;
				if bytes.is_empty() && self.spec.required {
					return Err(ExtractError::Validation(vec![
						FieldError::missing_value(body_loc()),
					]));
				}
				Ok(BoundValue::Bytes(bytes))
			}
			FileTarget::File => {
				let mut stream = request.take_body()?;
				let mut upload = UploadFile::create()
					.await
					.map_err(|e| ExtractError::Body(BodyError::Io(e)))?
					.with_metadata(None, request.content_type().map(String::from));
				while let Some(chunk) = stream.next().await {
					let chunk = chunk?;
					upload
						.write_chunk(&chunk)
						.await
						.map_err(|e| ExtractError::Body(BodyError::Io(e)))?;
				}
				upload
					.rewind()
					.await
					.map_err(|e| ExtractError::Body(BodyError::Io(e)))?;
				if upload.size() == 0 && self.spec.required {
					return Err(ExtractError::Validation(vec![
						FieldError::missing_value(body_loc()),
					]));
				}
				Ok(BoundValue::File(upload))
			}
		}
	}
}

/// Content-type-discriminated union over body extractors.
///
/// Sub-extractors are tried in declaration order against the request's
/// `Content-Type`; the first match wins.
#[derive(Debug, Clone)]
pub struct DiscriminatedBody {
	pub variants: Vec<BodyExtractor>,
}

impl DiscriminatedBody {
	pub fn new(variants: Vec<BodyExtractor>) -> Result<Self, RegistrationError> {
		if variants
			.iter()
			.any(|v| matches!(v, BodyExtractor::Discriminated(_)))
		{
			return Err(RegistrationError::NonBodyUnionMember);
		}
		Ok(Self { variants })
	}

	pub fn matches_media_type(&self, content_type: Option<&str>) -> bool {
		self.variants
			.iter()
			.any(|v| v.matches_media_type(content_type))
	}

	pub async fn extract(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		let Some(content_type) = request.content_type().map(String::from) else {
			return Err(unsupported_media_type(None));
		};
		for variant in &self.variants {
			if variant.matches_media_type(Some(&content_type)) {
				let fut: Pin<
					Box<dyn Future<Output = Result<BoundValue, ExtractError>> + Send + '_>,
				> = Box::pin(variant.extract(request));
				return fut.await;
			}
		}
		Err(unsupported_media_type(Some(&content_type)))
	}
}

/// The closed set of body extractors.
#[derive(Debug, Clone)]
pub enum BodyExtractor {
	Json(JsonBody),
	Form(FormBody),
	Multipart(MultipartBody),
	File(FileBody),
	Discriminated(DiscriminatedBody),
}

impl BodyExtractor {
	pub fn matches_media_type(&self, content_type: Option<&str>) -> bool {
		match self {
			Self::Json(b) => b.matches_media_type(content_type),
			Self::Form(b) => b.matches_media_type(content_type),
			Self::Multipart(b) => b.matches_media_type(content_type),
			Self::File(b) => b.matches_media_type(content_type),
			Self::Discriminated(b) => b.matches_media_type(content_type),
		}
	}

	pub async fn extract(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		match self {
			Self::Json(b) => b.extract(request).await,
			Self::Form(b) => b.extract(request).await,
			Self::Multipart(b) => b.extract(request).await,
			Self::File(b) => b.extract(request).await,
			Self::Discriminated(b) => b.extract(request).await,
		}
	}

	/// The spec used for schema emission; a union exposes its first
	/// variant's spec (emitters walk the variants themselves).
	pub fn spec(&self) -> Option<&BodySpec> {
		match self {
			Self::Json(b) => Some(&b.spec),
			Self::Form(b) => Some(&b.spec),
			Self::Multipart(b) => Some(&b.spec),
			Self::File(b) => Some(&b.spec),
			Self::Discriminated(b) => b.variants.first().and_then(BodyExtractor::spec),
		}
	}
}

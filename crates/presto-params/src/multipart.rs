//! `multipart/form-data` body extraction.
//!
//! Streams the body through `multer`; file parts are spooled to temp
//! files chunk-by-chunk so peak memory stays bounded by the chunk size,
//! text parts are buffered. The parsed parts then run through the same
//! declared field extractors as URL-encoded forms.

use presto_http::{BodyError, Request, matches_media_type};

use crate::body::{BodySpec, BoundValue, UploadFile, body_loc, check_media_type, unsupported_media_type};
use crate::error::{ExtractError, FieldError};
use crate::form::{FieldMap, FormData, FormPart, extract_fields, fields_schema};

/// `multipart/form-data` body extractor.
#[derive(Debug, Clone)]
pub struct MultipartBody {
	pub spec: BodySpec,
	pub fields: FieldMap,
}

impl MultipartBody {
	pub fn new(fields: FieldMap) -> Self {
		let schema = fields_schema(&fields);
		let mut spec = BodySpec::new(Some("multipart/form-data".to_string()), schema);
		spec.required = fields.values().any(|field| field.required);
		Self { spec, fields }
	}

	fn pattern(&self) -> &str {
		self.spec
			.media_type
			.as_deref()
			.unwrap_or("multipart/form-data")
	}

	pub fn matches_media_type(&self, content_type: Option<&str>) -> bool {
		content_type.is_some_and(|ct| matches_media_type(self.pattern(), ct))
	}

	pub async fn extract(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		check_media_type(request, Some(self.pattern()), self.spec.enforce_media_type)?;

		let content_type = request
			.content_type()
			.map(String::from)
			.ok_or_else(|| unsupported_media_type(None))?;
		let boundary = multer::parse_boundary(&content_type)
			.map_err(|_| unsupported_media_type(Some(&content_type)))?;

		let stream = request.take_body()?;
		let mut multipart = multer::Multipart::new(stream, boundary);

		let mut form = FormData::new();
		while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
			let Some(name) = field.name().map(String::from) else {
				return Err(ExtractError::Validation(vec![FieldError::new(
					body_loc(),
					"Form field is missing a name",
					"value_error",
				)]));
			};
			if let Some(filename) = field.file_name().map(String::from) {
				let part_type = field.content_type().map(|m| m.to_string());
				let mut upload = UploadFile::create()
					.await
					.map_err(io_error)?
					.with_metadata(Some(filename), part_type);
				while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
					upload.write_chunk(&chunk).await.map_err(io_error)?;
				}
				upload.rewind().await.map_err(io_error)?;
				form.push(name, FormPart::File(upload));
			} else {
				let text = field.text().await.map_err(multipart_error)?;
				form.push(name, FormPart::Text(text));
			}
		}

		extract_fields(&self.fields, &mut form, &body_loc())
			.map(BoundValue::Fields)
			.map_err(ExtractError::Validation)
	}
}

fn io_error(error: std::io::Error) -> ExtractError {
	ExtractError::Body(BodyError::Io(error))
}

/// Stream failures are transport errors; everything else is malformed
/// client data and reports as a validation failure on the body.
fn multipart_error(error: multer::Error) -> ExtractError {
	match error {
		multer::Error::StreamReadFailed(source) => {
			ExtractError::Body(BodyError::Io(std::io::Error::other(source)))
		}
		error => ExtractError::Validation(vec![FieldError::new(
			body_loc(),
			format!("Failed to read multipart body: {error}"),
			"value_error",
		)]),
	}
}

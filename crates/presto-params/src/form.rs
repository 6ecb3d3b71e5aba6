//! URL-encoded form bodies and the field extractors shared with
//! multipart.
//!
//! A form body is a bag of named fields; each declared field owns a
//! nested extractor that decides how its raw part decodes (plain text,
//! JSON-in-a-field, a file, or a nested form-encoded sub-body). Fields
//! absent from the submitted form are simply omitted before validation,
//! which then applies required/default semantics per field.

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use serde_json::Value;

use presto_http::{Request, matches_media_type};

use crate::body::{BodySpec, BoundValue, UploadFile, body_loc, check_media_type};
use crate::error::{ExtractError, FieldError, LocItem};
use crate::schema::{FieldSchema, ObjectField};
use crate::validate::{self, CoercionMode, ValueContext};

/// One part of a parsed form: text or an uploaded file.
#[derive(Debug)]
pub enum FormPart {
	Text(String),
	File(UploadFile),
}

/// An ordered multimap of parsed form parts.
///
/// Field extractors *take* parts out so repeated extraction of the same
/// name observes each occurrence exactly once.
#[derive(Debug, Default)]
pub struct FormData {
	items: Vec<(String, FormPart)>,
}

impl FormData {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, name: impl Into<String>, part: FormPart) {
		self.items.push((name.into(), part));
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Remove and return the first part named `name`.
	pub fn take_first(&mut self, name: &str) -> Option<FormPart> {
		let index = self.items.iter().position(|(k, _)| k == name)?;
		Some(self.items.remove(index).1)
	}

	/// Remove and return every part named `name`, in order.
	pub fn take_all(&mut self, name: &str) -> Vec<FormPart> {
		let mut taken = Vec::new();
		let mut remaining = Vec::with_capacity(self.items.len());
		for (key, part) in self.items.drain(..) {
			if key == name {
				taken.push(part);
			} else {
				remaining.push((key, part));
			}
		}
		self.items = remaining;
		taken
	}

	/// Parse an `application/x-www-form-urlencoded` payload.
	pub fn parse_urlencoded(text: &str) -> Result<Self, serde_urlencoded::de::Error> {
		let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text)?;
		let mut data = Self::new();
		for (key, value) in pairs {
			data.push(key, FormPart::Text(value));
		}
		Ok(data)
	}

	/// Re-parse a raw form-encoded value nested inside another body.
	///
	/// Used when a multipart field carries a form-encoded sub-body: the
	/// field text is split on `&`/`=` by hand and each component
	/// percent-decoded.
	pub fn parse_nested(text: &str) -> Self {
		let mut data = Self::new();
		for pair in text.split('&') {
			if pair.is_empty() {
				continue;
			}
			let mut parts = pair.splitn(2, '=');
			let key = decode_component(parts.next().unwrap_or_default());
			let value = decode_component(parts.next().unwrap_or_default());
			data.push(key, FormPart::Text(value));
		}
		data
	}
}

fn decode_component(raw: &str) -> String {
	let spaced = raw.replace('+', " ");
	percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// How one form field's raw part decodes.
#[derive(Debug, Clone)]
pub enum FieldDecoder {
	/// Wire text validated against a schema.
	Text(FieldSchema),
	/// The field text is itself a JSON document.
	Json(FieldSchema),
	/// An uploaded file, optionally constrained to a media-type pattern.
	File {
		media_type: Option<String>,
		enforce_media_type: bool,
	},
	/// The field text is a nested form-encoded sub-body.
	Urlencoded(FieldMap),
}

/// Extractor for one declared form/multipart field.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
	/// Wire field name.
	pub name: String,
	pub required: bool,
	/// Whether every occurrence is collected instead of the first.
	pub repeated: bool,
	pub decoder: FieldDecoder,
}

/// Declared fields of a form/multipart body, in declaration order.
pub type FieldMap = IndexMap<String, FieldExtractor>;

impl FieldExtractor {
	pub fn single(name: impl Into<String>, decoder: FieldDecoder) -> Self {
		let required = match &decoder {
			FieldDecoder::Text(schema) | FieldDecoder::Json(schema) => {
				schema.default.is_none()
			}
			_ => true,
		};
		Self {
			name: name.into(),
			required,
			repeated: false,
			decoder,
		}
	}

	pub fn repeated(name: impl Into<String>, decoder: FieldDecoder) -> Self {
		Self {
			repeated: true,
			..Self::single(name, decoder)
		}
	}

	pub fn optional(mut self) -> Self {
		self.required = false;
		self
	}

	/// The schema this field contributes to the emitted body schema.
	pub fn schema(&self) -> FieldSchema {
		let inner = match &self.decoder {
			FieldDecoder::Text(schema) | FieldDecoder::Json(schema) => schema.clone(),
			FieldDecoder::File { .. } => FieldSchema::binary(),
			FieldDecoder::Urlencoded(fields) => fields_schema(fields),
		};
		if self.repeated {
			FieldSchema::array(inner)
		} else {
			inner
		}
	}

	/// Pull this field out of a parsed form.
	///
	/// Returns `Ok(None)` when the field is absent; the caller applies
	/// required/default semantics afterwards.
	pub fn extract_from_form(
		&self,
		form: &mut FormData,
		loc: &[LocItem],
	) -> Result<Option<BoundValue>, Vec<FieldError>> {
		let mut field_loc = loc.to_vec();
		field_loc.push(LocItem::Key(self.name.clone()));

		if self.repeated {
			let parts = form.take_all(&self.name);
			if parts.is_empty() {
				return Ok(None);
			}
			let mut values = Vec::with_capacity(parts.len());
			let mut errors = Vec::new();
			for (index, part) in parts.into_iter().enumerate() {
				let mut item_loc = field_loc.clone();
				item_loc.push(LocItem::Index(index));
				match self.extract_from_field(part, &item_loc) {
					Ok(value) => values.push(value),
					Err(item_errors) => errors.extend(item_errors),
				}
			}
			if !errors.is_empty() {
				return Err(errors);
			}
			// collapse to a JSON array when every element is JSON
			if values.iter().all(|v| v.as_json().is_some()) {
				let array = values
					.into_iter()
					.filter_map(BoundValue::into_json)
					.collect();
				Ok(Some(BoundValue::Json(Value::Array(array))))
			} else {
				Ok(Some(BoundValue::List(values)))
			}
		} else {
			match form.take_first(&self.name) {
				None => Ok(None),
				Some(part) => self.extract_from_field(part, &field_loc).map(Some),
			}
		}
	}

	/// Decode one raw part with this field's wrapped extractor.
	pub fn extract_from_field(
		&self,
		part: FormPart,
		loc: &[LocItem],
	) -> Result<BoundValue, Vec<FieldError>> {
		match (&self.decoder, part) {
			(FieldDecoder::Text(schema), FormPart::Text(text)) => validate::validate(
				schema,
				Some(Value::String(text)),
				loc,
				CoercionMode::Wire,
				ValueContext::Body,
			)
			.map(BoundValue::Json),
			(FieldDecoder::Json(schema), FormPart::Text(text)) => {
				let value: Value = serde_json::from_str(&text).map_err(|_| {
					vec![FieldError::new(
						loc.to_vec(),
						"Data is not valid JSON",
						"type_error",
					)]
				})?;
				validate::validate(
					schema,
					Some(value),
					loc,
					CoercionMode::Json,
					ValueContext::Body,
				)
				.map(BoundValue::Json)
			}
			(FieldDecoder::Urlencoded(fields), FormPart::Text(text)) => {
				let mut nested = FormData::parse_nested(&text);
				extract_fields(fields, &mut nested, loc).map(BoundValue::Fields)
			}
			(
				FieldDecoder::File {
					media_type,
					enforce_media_type,
				},
				FormPart::File(file),
			) => {
				if *enforce_media_type
					&& let Some(pattern) = media_type.as_deref()
				{
					let accepted = file
						.content_type()
						.is_some_and(|ct| matches_media_type(pattern, ct));
					if !accepted {
						let found = file.content_type().unwrap_or("unknown");
						return Err(vec![FieldError::new(
							loc.to_vec(),
							format!("Media type {found} is not acceptable"),
							"value_error",
						)]);
					}
				}
				Ok(BoundValue::File(file))
			}
			(FieldDecoder::File { .. }, FormPart::Text(_)) => Err(vec![FieldError::new(
				loc.to_vec(),
				"Expected a file, got a string",
				"type_error",
			)]),
			(_, FormPart::File(_)) => Err(vec![FieldError::new(
				loc.to_vec(),
				"Expected a string form field but received a file",
				"type_error",
			)]),
		}
	}
}

/// Run every declared field extractor over a parsed form, assembling the
/// present fields and accumulating all errors.
pub fn extract_fields(
	fields: &FieldMap,
	form: &mut FormData,
	loc: &[LocItem],
) -> Result<IndexMap<String, BoundValue>, Vec<FieldError>> {
	let mut out = IndexMap::new();
	let mut errors = Vec::new();

	for (name, field) in fields {
		match field.extract_from_form(form, loc) {
			Ok(Some(value)) => {
				out.insert(name.clone(), value);
			}
			Ok(None) => {
				let default = match &field.decoder {
					FieldDecoder::Text(schema) | FieldDecoder::Json(schema) => {
						schema.default.clone()
					}
					_ => None,
				};
				if let Some(default) = default {
					out.insert(name.clone(), BoundValue::Json(default));
				} else if field.required {
					let mut field_loc = loc.to_vec();
					field_loc.push(LocItem::Key(name.clone()));
					errors.push(FieldError::missing_value(field_loc));
				}
			}
			Err(field_errors) => errors.extend(field_errors),
		}
	}

	if errors.is_empty() {
		Ok(out)
	} else {
		Err(errors)
	}
}

/// The object schema a field map contributes to the OpenAPI document.
pub(crate) fn fields_schema(fields: &FieldMap) -> FieldSchema {
	FieldSchema::object(
		fields
			.iter()
			.map(|(name, field)| ObjectField {
				name: name.clone(),
				schema: field.schema(),
				required: field.required,
			})
			.collect(),
	)
}

/// `application/x-www-form-urlencoded` body extractor.
#[derive(Debug, Clone)]
pub struct FormBody {
	pub spec: BodySpec,
	pub fields: FieldMap,
}

impl FormBody {
	pub fn new(fields: FieldMap) -> Self {
		let schema = fields_schema(&fields);
		let mut spec = BodySpec::new(
			Some("application/x-www-form-urlencoded".to_string()),
			schema,
		);
		spec.required = fields.values().any(|field| field.required);
		Self { spec, fields }
	}

	fn pattern(&self) -> &str {
		self.spec
			.media_type
			.as_deref()
			.unwrap_or("application/x-www-form-urlencoded")
	}

	pub fn matches_media_type(&self, content_type: Option<&str>) -> bool {
		content_type.is_some_and(|ct| matches_media_type(self.pattern(), ct))
	}

	pub async fn extract(&self, request: &Request) -> Result<BoundValue, ExtractError> {
		check_media_type(request, Some(self.pattern()), self.spec.enforce_media_type)?;

		let bytes = request.read_body().await?;
		let text = std::str::from_utf8(&bytes).map_err(|_| {
			ExtractError::Validation(vec![FieldError::new(
				body_loc(),
				"Invalid UTF-8 in form body",
				"type_error",
			)])
		})?;

		let mut form = FormData::parse_urlencoded(text).map_err(|e| {
			ExtractError::Validation(vec![FieldError::new(
				body_loc(),
				format!("Invalid form body: {e}"),
				"type_error",
			)])
		})?;
		extract_fields(&self.fields, &mut form, &body_loc())
			.map(BoundValue::Fields)
			.map_err(ExtractError::Validation)
	}
}

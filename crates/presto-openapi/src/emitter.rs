//! Parameter and request-body emitters.
//!
//! Structurally parallel to the runtime extractors: each emitter is built
//! from the same spec and produces the static OpenAPI object instead of
//! performing extraction. `include_in_schema = false` omits the object
//! from the document while the runtime extractor keeps working.

use presto_params::{BodyExtractor, BodySpec, Location, ParamExtractor, ParameterSpec, Style};

use crate::openapi::{
	ContentBuilder, Deprecated, Parameter, ParameterBuilder, ParameterIn, ParameterStyle,
	RequestBody, RequestBodyBuilder, Required,
};
use crate::registry::ComponentRegistry;
use crate::schema::to_schema_ref;

fn parameter_in(location: Location) -> ParameterIn {
	match location {
		Location::Query => ParameterIn::Query,
		Location::Header => ParameterIn::Header,
		Location::Cookie => ParameterIn::Cookie,
		Location::Path => ParameterIn::Path,
	}
}

fn parameter_style(style: Style) -> ParameterStyle {
	match style {
		Style::Form => ParameterStyle::Form,
		Style::Simple => ParameterStyle::Simple,
		Style::Label => ParameterStyle::Label,
		Style::Matrix => ParameterStyle::Matrix,
		Style::SpaceDelimited => ParameterStyle::SpaceDelimited,
		Style::PipeDelimited => ParameterStyle::PipeDelimited,
		Style::DeepObject => ParameterStyle::DeepObject,
	}
}

/// The OpenAPI default `(style, explode)` for a location.
fn default_serialization(location: Location) -> (Style, bool) {
	match location {
		Location::Query | Location::Cookie => (Style::Form, true),
		Location::Path | Location::Header => (Style::Simple, false),
	}
}

/// Emits the `Parameter` object for one registered parameter.
#[derive(Debug, Clone)]
pub struct ParameterEmitter {
	spec: ParameterSpec,
}

impl ParameterEmitter {
	pub fn new(spec: ParameterSpec) -> Self {
		Self { spec }
	}

	pub fn from_extractor(extractor: &ParamExtractor) -> Self {
		Self::new(extractor.spec().clone())
	}

	pub fn spec(&self) -> &ParameterSpec {
		&self.spec
	}

	/// Build the parameter object, registering any named schemas into the
	/// shared component map. Returns `None` when the parameter opted out
	/// of the document.
	pub fn emit(&self, registry: &mut ComponentRegistry) -> Option<Parameter> {
		let spec = &self.spec;
		if !spec.include_in_schema {
			return None;
		}

		let mut builder = ParameterBuilder::new()
			.name(spec.name.clone())
			.parameter_in(parameter_in(spec.location))
			.required(if spec.required {
				Required::True
			} else {
				Required::False
			})
			.schema(Some(to_schema_ref(&spec.schema, registry)));

		// style/explode only emit when they differ from the location default
		if (spec.style, spec.explode) != default_serialization(spec.location) {
			builder = builder
				.style(Some(parameter_style(spec.style)))
				.explode(Some(spec.explode));
		}
		if let Some(description) = &spec.description {
			builder = builder.description(Some(description.clone()));
		}
		if spec.deprecated {
			builder = builder.deprecated(Some(Deprecated::True));
		}
		if let Some(example) = &spec.example {
			builder = builder.example(Some(example.clone()));
		}

		Some(builder.build())
	}
}

/// Emits the `RequestBody` object for one registered body.
#[derive(Debug, Clone)]
pub struct RequestBodyEmitter {
	body: BodyExtractor,
}

impl RequestBodyEmitter {
	pub fn new(body: BodyExtractor) -> Self {
		Self { body }
	}

	pub fn from_extractor(body: &BodyExtractor) -> Self {
		Self::new(body.clone())
	}

	pub fn emit(&self, registry: &mut ComponentRegistry) -> Option<RequestBody> {
		let include = self
			.body
			.spec()
			.map(|spec| spec.include_in_schema)
			.unwrap_or(false);
		if !include {
			return None;
		}

		let entries = content_entries(&self.body);
		let mut builder = RequestBodyBuilder::new();
		let mut required = false;
		for (media_type, spec) in &entries {
			let content = ContentBuilder::new()
				.schema(Some(to_schema_ref(&spec.schema, registry)))
				.build();
			builder = builder.content(media_type.clone(), content);
			required |= spec.required;
		}
		builder = builder.required(Some(if required {
			Required::True
		} else {
			Required::False
		}));
		if let Some(description) = entries.first().and_then(|(_, spec)| spec.description.clone())
		{
			builder = builder.description(Some(description));
		}

		Some(builder.build())
	}
}

/// The `(media type, spec)` content entries of a body, in declaration
/// order; unions contribute one entry per variant.
fn content_entries(body: &BodyExtractor) -> Vec<(String, &BodySpec)> {
	match body {
		BodyExtractor::Json(b) => vec![(
			b.spec
				.media_type
				.clone()
				.unwrap_or_else(|| "application/json".to_string()),
			&b.spec,
		)],
		BodyExtractor::Form(b) => vec![(
			b.spec
				.media_type
				.clone()
				.unwrap_or_else(|| "application/x-www-form-urlencoded".to_string()),
			&b.spec,
		)],
		BodyExtractor::Multipart(b) => vec![(
			b.spec
				.media_type
				.clone()
				.unwrap_or_else(|| "multipart/form-data".to_string()),
			&b.spec,
		)],
		BodyExtractor::File(b) => vec![(
			b.spec
				.media_type
				.clone()
				.unwrap_or_else(|| "application/octet-stream".to_string()),
			&b.spec,
		)],
		BodyExtractor::Discriminated(d) => {
			d.variants.iter().flat_map(content_entries).collect()
		}
	}
}

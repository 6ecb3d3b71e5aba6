//! Static shape and validation metadata for declared types.
//!
//! The engine never reflects over handler signatures. Whoever registers a
//! parameter supplies a [`FieldSchema`] describing the declared type
//! (scalar kind, item schema, named fields, nullability, default),
//! computed once at startup. The same descriptor drives the runtime validator and
//! the OpenAPI emitters, so documented behavior cannot diverge from actual
//! behavior.

use serde_json::Value;

/// Classification of a declared type, selecting the decoder variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
	Scalar,
	Sequence,
	Mapping,
}

/// Identity of a named model type, used for `$ref` emission.
///
/// `module_path` disambiguates two distinct types sharing a display name:
/// the schema component key falls back to the module-path-qualified form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelName {
	pub name: String,
	pub module_path: String,
}

impl ModelName {
	pub fn new(name: impl Into<String>, module_path: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			module_path: module_path.into(),
		}
	}

	/// The fully qualified component key, e.g. `app__models__User`.
	pub fn qualified(&self, separator: &str) -> String {
		let mut parts: Vec<&str> = self.module_path.split("::").collect();
		parts.push(&self.name);
		parts.join(separator)
	}
}

/// One named field of a mapping type.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
	pub name: String,
	pub schema: FieldSchema,
	pub required: bool,
}

impl ObjectField {
	pub fn required(name: impl Into<String>, schema: FieldSchema) -> Self {
		Self {
			name: name.into(),
			schema,
			required: true,
		}
	}

	pub fn optional(name: impl Into<String>, schema: FieldSchema) -> Self {
		Self {
			name: name.into(),
			schema,
			required: false,
		}
	}
}

/// The kind of a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
	String,
	Integer,
	Number,
	Boolean,
	Array { items: Box<FieldSchema> },
	/// A mapping: either a named model with declared fields, or a free-form
	/// dictionary when `fields` is empty.
	Object {
		model: Option<ModelName>,
		fields: Vec<ObjectField>,
	},
}

/// Validation rules for one declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
	pub kind: FieldKind,
	pub nullable: bool,
	pub default: Option<Value>,
	pub enum_values: Option<Vec<Value>>,
	pub description: Option<String>,
	/// OpenAPI `format` hint (`binary` for file fields); documentation only.
	pub format: Option<String>,
}

impl FieldSchema {
	fn of(kind: FieldKind) -> Self {
		Self {
			kind,
			nullable: false,
			default: None,
			enum_values: None,
			description: None,
			format: None,
		}
	}

	pub fn string() -> Self {
		Self::of(FieldKind::String)
	}

	pub fn integer() -> Self {
		Self::of(FieldKind::Integer)
	}

	pub fn number() -> Self {
		Self::of(FieldKind::Number)
	}

	pub fn boolean() -> Self {
		Self::of(FieldKind::Boolean)
	}

	/// A string carrying binary content (file field payloads).
	pub fn binary() -> Self {
		let mut schema = Self::of(FieldKind::String);
		schema.format = Some("binary".to_string());
		schema
	}

	pub fn array(items: FieldSchema) -> Self {
		Self::of(FieldKind::Array {
			items: Box::new(items),
		})
	}

	/// An anonymous mapping with declared fields; pass an empty list for a
	/// free-form dictionary.
	pub fn object(fields: Vec<ObjectField>) -> Self {
		Self::of(FieldKind::Object {
			model: None,
			fields,
		})
	}

	/// A named model type; the name feeds `$ref` emission and collision
	/// handling.
	pub fn model(
		name: impl Into<String>,
		module_path: impl Into<String>,
		fields: Vec<ObjectField>,
	) -> Self {
		Self::of(FieldKind::Object {
			model: Some(ModelName::new(name, module_path)),
			fields,
		})
	}

	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub fn with_default(mut self, default: impl Into<Value>) -> Self {
		self.default = Some(default.into());
		self
	}

	pub fn with_enum(mut self, values: Vec<Value>) -> Self {
		self.enum_values = Some(values);
		self
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	/// Classify this type for decoder selection.
	pub fn shape(&self) -> Shape {
		match self.kind {
			FieldKind::Array { .. } => Shape::Sequence,
			FieldKind::Object { .. } => Shape::Mapping,
			_ => Shape::Scalar,
		}
	}

	/// Declared field names for mapping types, in declaration order.
	pub fn field_names(&self) -> Option<Vec<&str>> {
		match &self.kind {
			FieldKind::Object { fields, .. } if !fields.is_empty() => {
				Some(fields.iter().map(|f| f.name.as_str()).collect())
			}
			_ => None,
		}
	}
}

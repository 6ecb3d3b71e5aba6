//! Conversion from [`FieldSchema`] to utoipa schema objects.
//!
//! The same descriptor the runtime validator consumes drives emission
//! here, so `nullable`, defaults, enums and nested `$ref`s can never
//! diverge from actual extraction behavior. Nullability renders as an
//! OpenAPI 3.1 type array (`["string", "null"]`).

use presto_params::{FieldKind, FieldSchema, ObjectField};

use crate::openapi::{
	ArrayBuilder, KnownFormat, ObjectBuilder, RefOr, Schema, SchemaFormat, SchemaType, Type,
};
use crate::registry::ComponentRegistry;

/// Emit the schema (or `$ref`) for one declared type.
///
/// Named models land in the registry and come back as `$ref`s; anonymous
/// types inline.
pub fn to_schema_ref(field: &FieldSchema, registry: &mut ComponentRegistry) -> RefOr<Schema> {
	match &field.kind {
		FieldKind::Object {
			model: Some(model),
			fields,
		} => {
			let key = registry.register(model, |registry| {
				object_schema(field, fields, registry)
			});
			ComponentRegistry::schema_ref(&key)
		}
		FieldKind::Object {
			model: None,
			fields,
		} => RefOr::T(object_schema(field, fields, registry)),
		FieldKind::Array { items } => {
			let mut builder = ArrayBuilder::new().items(to_schema_ref(items, registry));
			if field.nullable {
				builder =
					builder.schema_type(SchemaType::Array(vec![Type::Array, Type::Null]));
			}
			if let Some(description) = &field.description {
				builder = builder.description(Some(description.clone()));
			}
			RefOr::T(Schema::Array(builder.build()))
		}
		_ => RefOr::T(Schema::Object(scalar_schema(field).build())),
	}
}

fn scalar_type(field: &FieldSchema) -> Type {
	match field.kind {
		FieldKind::String => Type::String,
		FieldKind::Integer => Type::Integer,
		FieldKind::Number => Type::Number,
		FieldKind::Boolean => Type::Boolean,
		_ => Type::Object,
	}
}

fn scalar_schema(field: &FieldSchema) -> ObjectBuilder {
	let ty = scalar_type(field);
	let mut builder = ObjectBuilder::new();
	builder = if field.nullable {
		builder.schema_type(SchemaType::Array(vec![ty, Type::Null]))
	} else {
		builder.schema_type(SchemaType::Type(ty))
	};
	if let Some(description) = &field.description {
		builder = builder.description(Some(description.clone()));
	}
	if let Some(default) = &field.default {
		builder = builder.default(Some(default.clone()));
	}
	if let Some(values) = &field.enum_values {
		builder = builder.enum_values(Some(values.clone()));
	}
	if let Some(format) = &field.format {
		let format = match format.as_str() {
			"binary" => SchemaFormat::KnownFormat(KnownFormat::Binary),
			other => SchemaFormat::Custom(other.to_string()),
		};
		builder = builder.format(Some(format));
	}
	builder
}

fn object_schema(
	field: &FieldSchema,
	fields: &[ObjectField],
	registry: &mut ComponentRegistry,
) -> Schema {
	let mut builder = ObjectBuilder::new();
	builder = if field.nullable {
		builder.schema_type(SchemaType::Array(vec![Type::Object, Type::Null]))
	} else {
		builder.schema_type(SchemaType::Type(Type::Object))
	};
	if let Some(description) = &field.description {
		builder = builder.description(Some(description.clone()));
	}
	for object_field in fields {
		builder = builder.property(
			&object_field.name,
			to_schema_ref(&object_field.schema, registry),
		);
		// a field with a default is never required in the document
		if object_field.required && object_field.schema.default.is_none() {
			builder = builder.required(&object_field.name);
		}
	}
	Schema::Object(builder.build())
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn emitted(field: &FieldSchema) -> serde_json::Value {
		let mut registry = ComponentRegistry::new();
		let schema = to_schema_ref(field, &mut registry);
		serde_json::to_value(&schema).unwrap()
	}

	#[test]
	fn test_scalar_with_default() {
		let json = emitted(&FieldSchema::integer().with_default(2));
		assert_eq!(json["type"], "integer");
		assert_eq!(json["default"], 2);
	}

	#[test]
	fn test_nullable_renders_as_type_array() {
		let json = emitted(&FieldSchema::string().nullable());
		assert_eq!(json["type"], json!(["string", "null"]));
	}

	#[test]
	fn test_enum_values() {
		let json =
			emitted(&FieldSchema::string().with_enum(vec![json!("asc"), json!("desc")]));
		assert_eq!(json["enum"], json!(["asc", "desc"]));
	}

	#[test]
	fn test_binary_format() {
		let json = emitted(&FieldSchema::binary());
		assert_eq!(json["format"], "binary");
	}

	#[test]
	fn test_array_of_integers() {
		let json = emitted(&FieldSchema::array(FieldSchema::integer()));
		assert_eq!(json["type"], "array");
		assert_eq!(json["items"]["type"], "integer");
	}

	#[test]
	fn test_named_model_becomes_ref() {
		let field = FieldSchema::model(
			"Item",
			"shop::models",
			vec![
				ObjectField::required("name", FieldSchema::string()),
				ObjectField::optional("note", FieldSchema::string()),
			],
		);
		let mut registry = ComponentRegistry::new();
		let schema_ref = to_schema_ref(&field, &mut registry);
		let json = serde_json::to_value(&schema_ref).unwrap();
		assert_eq!(json["$ref"], "#/components/schemas/Item");

		let components = serde_json::to_value(registry.to_components()).unwrap();
		let item = &components["schemas"]["Item"];
		assert_eq!(item["type"], "object");
		assert_eq!(item["required"], json!(["name"]));
		assert_eq!(item["properties"]["name"]["type"], "string");
	}

	#[test]
	fn test_field_with_default_not_required() {
		let field = FieldSchema::object(vec![ObjectField::required(
			"limit",
			FieldSchema::integer().with_default(10),
		)]);
		let json = emitted(&field);
		assert!(json.get("required").is_none());
	}
}

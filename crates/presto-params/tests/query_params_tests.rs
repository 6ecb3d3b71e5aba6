//! Query parameter extraction tests
//!
//! Modeled on FastAPI's query parameter semantics (test_query.py):
//! 1. Required vs optional vs defaulted parameters
//! 2. Type coercion (string, integer, float, boolean)
//! 3. Multiple values (lists) across explode settings
//! 4. deepObject and delimiter styles
//! 5. Error positions and messages for invalid values

use http::Method;
use presto_http::Request;
use presto_params::{
	FieldSchema, LocItem, Marker, ParamConfig, ParamExtractor, Registered, Style, register,
};
use serde_json::json;

// Helper function to create a mock request with query string
fn create_test_request(query_string: &str) -> Request {
	let uri = if query_string.is_empty() {
		"/test".to_string()
	} else {
		format!("/test?{query_string}")
	};
	Request::builder()
		.method(Method::GET)
		.uri(uri)
		.build()
		.expect("Invalid URI")
}

fn query_extractor(name: &str, schema: FieldSchema) -> ParamExtractor {
	query_extractor_with(ParamConfig::default(), name, schema)
}

fn query_extractor_with(
	config: ParamConfig,
	name: &str,
	schema: FieldSchema,
) -> ParamExtractor {
	match register(Marker::Query(config), name, schema).expect("registration failed") {
		Registered::Parameter(extractor) => extractor,
		_ => unreachable!(),
	}
}

// ============================================================================
// Required / Optional / Default
// ============================================================================

#[test]
fn test_query_required_missing() {
	let extractor = query_extractor("query", FieldSchema::string());
	let req = create_test_request("");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors.len(), 1);
	assert_eq!(
		errors[0].loc,
		vec![LocItem::from("query"), LocItem::from("query")]
	);
	assert_eq!(errors[0].msg, "Missing required query parameter");
	assert_eq!(errors[0].kind, "value_error");
}

#[test]
fn test_query_required_provided() {
	let extractor = query_extractor("query", FieldSchema::string());
	let req = create_test_request("query=baz");

	assert_eq!(extractor.extract(&req).unwrap(), json!("baz"));
}

#[test]
fn test_query_undeclared_param_ignored() {
	let extractor = query_extractor("query", FieldSchema::string());
	let req = create_test_request("not_declared=baz");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors[0].msg, "Missing required query parameter");
}

#[test]
fn test_query_default_applied_when_missing() {
	let extractor = query_extractor("limit", FieldSchema::integer().with_default(2));
	let req = create_test_request("");

	assert_eq!(extractor.extract(&req).unwrap(), json!(2));
}

#[test]
fn test_query_default_overridden_when_present() {
	let extractor = query_extractor("limit", FieldSchema::integer().with_default(2));
	let req = create_test_request("limit=5");

	assert_eq!(extractor.extract(&req).unwrap(), json!(5));
}

#[test]
fn test_query_optional_missing_binds_null() {
	// optional-without-default is expressed with a null default; a
	// nullable schema without any default is still required
	let extractor = query_extractor(
		"q",
		FieldSchema::string().nullable().with_default(json!(null)),
	);
	let req = create_test_request("");

	assert_eq!(extractor.extract(&req).unwrap(), json!(null));
}

// ============================================================================
// Scalar coercion
// ============================================================================

#[test]
fn test_query_int_valid() {
	let extractor = query_extractor("query", FieldSchema::integer());
	let req = create_test_request("query=42");

	assert_eq!(extractor.extract(&req).unwrap(), json!(42));
}

#[test]
fn test_query_int_invalid_float() {
	let extractor = query_extractor("query", FieldSchema::integer());
	let req = create_test_request("query=42.5");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors[0].msg, "value is not a valid integer");
	assert_eq!(errors[0].kind, "type_error.integer");
}

#[test]
fn test_query_scalar_rejects_joined_list() {
	let extractor = query_extractor("limit", FieldSchema::integer().with_default(2));
	let req = create_test_request("limit=5,6");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors[0].msg, "value is not a valid integer");
}

#[test]
fn test_query_empty_value_on_required_scalar() {
	let extractor = query_extractor("param", FieldSchema::string());
	let req = create_test_request("param=");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors[0].msg, "none is not an allowed value");
	assert_eq!(errors[0].kind, "type_error.none.not_allowed");
}

#[test]
fn test_query_empty_value_on_defaulted_non_nullable_scalar() {
	// ?limit= with `limit: int = 2`: present-but-empty is not "absent",
	// so the default does not apply and the empty value is rejected
	let extractor = query_extractor("limit", FieldSchema::integer().with_default(2));
	let req = create_test_request("limit=");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors[0].kind, "type_error.none.not_allowed");
}

#[test]
fn test_query_float_valid() {
	let extractor = query_extractor("price", FieldSchema::number());
	let req = create_test_request("price=1.5");

	assert_eq!(extractor.extract(&req).unwrap(), json!(1.5));
}

#[test]
fn test_query_bool_coercion() {
	let extractor = query_extractor("flag", FieldSchema::boolean());
	for (raw, expected) in [("true", true), ("1", true), ("off", false)] {
		let req = create_test_request(&format!("flag={raw}"));
		assert_eq!(extractor.extract(&req).unwrap(), json!(expected));
	}
}

// ============================================================================
// Sequences
// ============================================================================

#[test]
fn test_query_list_exploded() {
	let extractor = query_extractor("ids", FieldSchema::array(FieldSchema::integer()));
	let req = create_test_request("ids=1&ids=2&ids=3");

	assert_eq!(extractor.extract(&req).unwrap(), json!([1, 2, 3]));
}

#[test]
fn test_query_list_unexploded_csv() {
	let config = ParamConfig {
		explode: Some(false),
		..ParamConfig::default()
	};
	let extractor =
		query_extractor_with(config, "ids", FieldSchema::array(FieldSchema::integer()));
	let req = create_test_request("ids=1,2,3");

	assert_eq!(extractor.extract(&req).unwrap(), json!([1, 2, 3]));
}

#[test]
fn test_query_list_item_error_carries_index() {
	let extractor = query_extractor("ids", FieldSchema::array(FieldSchema::integer()));
	let req = create_test_request("ids=1&ids=x");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors.len(), 1);
	assert_eq!(
		errors[0].loc,
		vec![
			LocItem::from("query"),
			LocItem::from("ids"),
			LocItem::from(1usize)
		]
	);
}

#[test]
fn test_query_pipe_delimited() {
	let config = ParamConfig {
		style: Some(Style::PipeDelimited),
		..ParamConfig::default()
	};
	let extractor =
		query_extractor_with(config, "ids", FieldSchema::array(FieldSchema::string()));
	let req = create_test_request("ids=a%7Cb%7Cc");

	assert_eq!(extractor.extract(&req).unwrap(), json!(["a", "b", "c"]));
}

#[test]
fn test_query_space_delimited() {
	let config = ParamConfig {
		style: Some(Style::SpaceDelimited),
		..ParamConfig::default()
	};
	let extractor =
		query_extractor_with(config, "ids", FieldSchema::array(FieldSchema::string()));
	let req = create_test_request("ids=a%20b%20c");

	assert_eq!(extractor.extract(&req).unwrap(), json!(["a", "b", "c"]));
}

// ============================================================================
// Mappings
// ============================================================================

#[test]
fn test_query_deep_object() {
	let config = ParamConfig {
		style: Some(Style::DeepObject),
		..ParamConfig::default()
	};
	let schema = FieldSchema::object(vec![
		presto_params::ObjectField::required("role", FieldSchema::string()),
		presto_params::ObjectField::required("name", FieldSchema::string()),
	]);
	let extractor = query_extractor_with(config, "filter", schema);
	let req = create_test_request("filter%5Brole%5D=admin&filter%5Bname%5D=alice&other=x");

	assert_eq!(
		extractor.extract(&req).unwrap(),
		json!({"role": "admin", "name": "alice"})
	);
}

#[test]
fn test_query_deep_object_prefix_does_not_cross_contaminate() {
	let config = ParamConfig {
		style: Some(Style::DeepObject),
		..ParamConfig::default()
	};
	let schema = FieldSchema::object(vec![presto_params::ObjectField::required(
		"role",
		FieldSchema::string(),
	)]);
	let extractor = query_extractor_with(config, "filter", schema);
	// filterx[role] must not count as filter[role]
	let req = create_test_request("filterx%5Brole%5D=admin");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors[0].msg, "Missing required query parameter");
}

#[test]
fn test_query_mapping_unexploded_form() {
	let config = ParamConfig {
		explode: Some(false),
		..ParamConfig::default()
	};
	let schema = FieldSchema::object(vec![
		presto_params::ObjectField::required("x", FieldSchema::integer()),
		presto_params::ObjectField::required("y", FieldSchema::integer()),
	]);
	let extractor = query_extractor_with(config, "point", schema);
	let req = create_test_request("point=x,1,y,2");

	assert_eq!(extractor.extract(&req).unwrap(), json!({"x": 1, "y": 2}));
}

#[test]
fn test_query_mapping_unexploded_malformed() {
	let config = ParamConfig {
		explode: Some(false),
		..ParamConfig::default()
	};
	let schema = FieldSchema::object(vec![presto_params::ObjectField::required(
		"x",
		FieldSchema::integer(),
	)]);
	let extractor = query_extractor_with(config, "point", schema);
	let req = create_test_request("point=x,1,y");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors[0].kind, "invalidserialization");
}

#[test]
fn test_query_mapping_nested_field_errors() {
	let config = ParamConfig {
		style: Some(Style::DeepObject),
		..ParamConfig::default()
	};
	let schema = FieldSchema::object(vec![
		presto_params::ObjectField::required("a", FieldSchema::integer()),
		presto_params::ObjectField::required("b", FieldSchema::integer()),
	]);
	let extractor = query_extractor_with(config, "filter", schema);
	let req = create_test_request("filter%5Ba%5D=x&filter%5Bb%5D=y");

	let errors = extractor.extract(&req).unwrap_err();
	assert_eq!(errors.len(), 2);
	assert_eq!(
		errors[0].loc,
		vec![
			LocItem::from("query"),
			LocItem::from("filter"),
			LocItem::from("a")
		]
	);
	assert_eq!(
		errors[1].loc,
		vec![
			LocItem::from("query"),
			LocItem::from("filter"),
			LocItem::from("b")
		]
	);
}

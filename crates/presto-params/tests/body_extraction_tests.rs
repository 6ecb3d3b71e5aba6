//! Body extraction tests
//!
//! JSON bodies, raw/file bodies and content-type-discriminated unions:
//! media-type enforcement (415 with the error positioned at
//! ["headers", "content-type"]), empty-body vs literal-null semantics,
//! nested validation error accumulation, and streaming file targets.

use bytes::Bytes;
use http::Method;
use presto_http::Request;
use presto_params::{
	BodyConfig, BodyExtractor, BoundValue, ExtractError, FieldSchema, FileConfig, FileTarget,
	LocItem, Marker, ObjectField, Registered, register,
};
use serde_json::json;

fn post_request(content_type: Option<&str>, body: &[u8]) -> Request {
	let mut builder = Request::builder()
		.method(Method::POST)
		.uri("/items/")
		.body(Bytes::copy_from_slice(body));
	if let Some(content_type) = content_type {
		builder = builder.header("content-type", content_type);
	}
	builder.build().expect("Invalid URI")
}

fn json_body(schema: FieldSchema) -> BodyExtractor {
	match register(Marker::Json(BodyConfig::default()), "body", schema).unwrap() {
		Registered::Body(body) => body,
		_ => unreachable!(),
	}
}

fn item_schema() -> FieldSchema {
	FieldSchema::object(vec![
		ObjectField::required("name", FieldSchema::string()),
		ObjectField::required("price", FieldSchema::number()),
		ObjectField::optional("note", FieldSchema::string()),
	])
}

// ============================================================================
// JSON bodies
// ============================================================================

#[tokio::test]
async fn test_json_body_valid() {
	let body = json_body(item_schema());
	let req = post_request(
		Some("application/json"),
		br#"{"name": "hammer", "price": 9.5}"#,
	);

	let value = body.extract(&req).await.unwrap();
	assert_eq!(
		value.as_json().unwrap(),
		&json!({"name": "hammer", "price": 9.5})
	);
}

#[tokio::test]
async fn test_json_body_invalid_json() {
	let body = json_body(item_schema());
	let req = post_request(Some("application/json"), br#"{"name": oops}"#);

	let error = body.extract(&req).await.unwrap_err();
	match error {
		ExtractError::Validation(detail) => {
			assert_eq!(detail[0].loc, vec![LocItem::from("body")]);
			assert_eq!(detail[0].msg, "Data is not valid JSON");
			assert_eq!(detail[0].kind, "type_error");
		}
		other => panic!("expected validation error, got {other:?}"),
	}
}

#[tokio::test]
async fn test_json_body_two_missing_fields_two_errors() {
	let body = json_body(item_schema());
	let req = post_request(Some("application/json"), br#"{"note": "hi"}"#);

	let error = body.extract(&req).await.unwrap_err();
	let ExtractError::Validation(detail) = error else {
		panic!("expected validation error");
	};
	assert_eq!(detail.len(), 2);
	assert_eq!(
		detail[0].loc,
		vec![LocItem::from("body"), LocItem::from("name")]
	);
	assert_eq!(detail[0].msg, "Missing required value");
	assert_eq!(
		detail[1].loc,
		vec![LocItem::from("body"), LocItem::from("price")]
	);
}

#[tokio::test]
async fn test_json_body_wrong_content_type_is_415() {
	let body = json_body(item_schema());
	let req = post_request(Some("text/plain"), b"{}");

	let error = body.extract(&req).await.unwrap_err();
	match error {
		ExtractError::UnsupportedMediaType(detail) => {
			assert_eq!(
				detail[0].loc,
				vec![LocItem::from("headers"), LocItem::from("content-type")]
			);
			assert_eq!(detail[0].msg, "Media type text/plain is not acceptable");
		}
		other => panic!("expected 415, got {other:?}"),
	}
}

#[tokio::test]
async fn test_json_body_missing_content_type_is_415() {
	let body = json_body(item_schema());
	let req = post_request(None, b"{}");

	let error = body.extract(&req).await.unwrap_err();
	let ExtractError::UnsupportedMediaType(detail) = error else {
		panic!("expected 415");
	};
	assert_eq!(detail[0].msg, "Content-Type header missing");
}

#[tokio::test]
async fn test_json_body_charset_parameter_accepted() {
	let body = json_body(item_schema());
	let req = post_request(
		Some("application/json; charset=utf-8"),
		br#"{"name": "hammer", "price": 1.0}"#,
	);

	assert!(body.extract(&req).await.is_ok());
}

#[tokio::test]
async fn test_json_body_empty_stream_is_missing() {
	let body = json_body(item_schema());
	let req = post_request(Some("application/json"), b"");

	let error = body.extract(&req).await.unwrap_err();
	let ExtractError::Validation(detail) = error else {
		panic!("expected validation error");
	};
	assert_eq!(detail[0].loc, vec![LocItem::from("body")]);
	assert_eq!(detail[0].msg, "Missing required value");
}

#[tokio::test]
async fn test_json_body_empty_stream_takes_default() {
	let body = json_body(item_schema().with_default(json!({"name": "x", "price": 0.0})));
	let req = post_request(Some("application/json"), b"");

	let value = body.extract(&req).await.unwrap();
	assert_eq!(value.as_json().unwrap(), &json!({"name": "x", "price": 0.0}));
}

#[tokio::test]
async fn test_json_body_literal_null_is_present() {
	// the literal text "null" is a present null, distinct from an empty
	// stream: a non-nullable schema rejects it instead of applying
	// missing-value semantics
	let body = json_body(item_schema());
	let req = post_request(Some("application/json"), b"null");

	let error = body.extract(&req).await.unwrap_err();
	let ExtractError::Validation(detail) = error else {
		panic!("expected validation error");
	};
	assert_eq!(detail[0].msg, "none is not an allowed value");
}

#[tokio::test]
async fn test_json_body_strict_mode_no_string_coercion() {
	let schema = FieldSchema::object(vec![ObjectField::required(
		"count",
		FieldSchema::integer(),
	)]);
	let body = json_body(schema);
	let req = post_request(Some("application/json"), br#"{"count": "3"}"#);

	let error = body.extract(&req).await.unwrap_err();
	let ExtractError::Validation(detail) = error else {
		panic!("expected validation error");
	};
	assert_eq!(detail[0].kind, "type_error.integer");
}

// ============================================================================
// Raw / file bodies
// ============================================================================

#[tokio::test]
async fn test_file_body_buffers_bytes() {
	let body = match register(
		Marker::File(FileConfig::default()),
		"payload",
		FieldSchema::binary(),
	)
	.unwrap()
	{
		Registered::Body(body) => body,
		_ => unreachable!(),
	};
	let req = post_request(Some("application/octet-stream"), b"raw bytes");

	match body.extract(&req).await.unwrap() {
		BoundValue::Bytes(bytes) => assert_eq!(&bytes[..], b"raw bytes"),
		other => panic!("expected bytes, got {other:?}"),
	}
}

#[tokio::test]
async fn test_file_body_streams_to_temp_file() {
	let config = FileConfig {
		target: FileTarget::File,
		..FileConfig::default()
	};
	let body = match register(Marker::File(config), "upload", FieldSchema::binary()).unwrap()
	{
		Registered::Body(body) => body,
		_ => unreachable!(),
	};
	let req = post_request(Some("application/pdf"), b"%PDF-1.7 data");

	match body.extract(&req).await.unwrap() {
		BoundValue::File(mut file) => {
			assert_eq!(file.size(), 13);
			assert_eq!(file.content_type(), Some("application/pdf"));
			let replayed = file.read_to_bytes().await.unwrap();
			assert_eq!(&replayed[..], b"%PDF-1.7 data");
		}
		other => panic!("expected a file, got {other:?}"),
	}
}

#[tokio::test]
async fn test_file_body_wildcard_media_pattern() {
	let config = FileConfig {
		media_type: Some("image/*".to_string()),
		..FileConfig::default()
	};
	let body = match register(Marker::File(config), "image", FieldSchema::binary()).unwrap()
	{
		Registered::Body(body) => body,
		_ => unreachable!(),
	};

	let ok = post_request(Some("image/png"), b"png");
	assert!(body.extract(&ok).await.is_ok());

	let bad = post_request(Some("text/plain"), b"nope");
	let error = body.extract(&bad).await.unwrap_err();
	assert!(matches!(error, ExtractError::UnsupportedMediaType(_)));
}

#[tokio::test]
async fn test_file_body_pattern_advisory_when_not_enforced() {
	let config = FileConfig {
		media_type: Some("image/*".to_string()),
		enforce_media_type: false,
		..FileConfig::default()
	};
	let body = match register(Marker::File(config), "image", FieldSchema::binary()).unwrap()
	{
		Registered::Body(body) => body,
		_ => unreachable!(),
	};

	let req = post_request(Some("text/plain"), b"still fine");
	assert!(body.extract(&req).await.is_ok());
}

// ============================================================================
// Content-type-discriminated unions
// ============================================================================

fn union_body() -> BodyExtractor {
	let image = Marker::File(FileConfig {
		media_type: Some("image/*".to_string()),
		..FileConfig::default()
	});
	let text = Marker::File(FileConfig {
		media_type: Some("text/plain".to_string()),
		..FileConfig::default()
	});
	let json = Marker::Json(BodyConfig::default());
	match register(
		Marker::ContentTypeDiscriminated(vec![image, text, json]),
		"payload",
		item_schema(),
	)
	.unwrap()
	{
		Registered::Body(body) => body,
		_ => unreachable!(),
	}
}

#[tokio::test]
async fn test_union_selects_json_variant_by_media_type() {
	let body = union_body();
	let req = post_request(
		Some("application/json"),
		br#"{"name": "hammer", "price": 2.5}"#,
	);

	let value = body.extract(&req).await.unwrap();
	assert!(value.as_json().is_some());
}

#[tokio::test]
async fn test_union_selects_first_matching_variant() {
	let body = union_body();
	let req = post_request(Some("image/jpeg"), b"jpeg data");

	match body.extract(&req).await.unwrap() {
		BoundValue::Bytes(bytes) => assert_eq!(&bytes[..], b"jpeg data"),
		other => panic!("expected bytes from the image variant, got {other:?}"),
	}
}

#[tokio::test]
async fn test_union_no_match_is_415() {
	let body = union_body();
	let req = post_request(Some("application/xml"), b"<x/>");

	let error = body.extract(&req).await.unwrap_err();
	let ExtractError::UnsupportedMediaType(detail) = error else {
		panic!("expected 415");
	};
	assert_eq!(detail[0].msg, "Media type application/xml is not acceptable");
}

#[tokio::test]
async fn test_union_missing_content_type_is_415() {
	let body = union_body();
	let req = post_request(None, b"data");

	let error = body.extract(&req).await.unwrap_err();
	let ExtractError::UnsupportedMediaType(detail) = error else {
		panic!("expected 415");
	};
	assert_eq!(detail[0].msg, "Content-Type header missing");
}

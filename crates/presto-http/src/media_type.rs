//! Media-type matching for body extractors.
//!
//! Patterns are declared at registration time (`application/json`,
//! `image/*`, `*/*`) and compared against the request's `Content-Type`
//! ignoring parameters such as `charset`.

use mime::Mime;

/// Check whether a concrete `Content-Type` satisfies a declared pattern.
///
/// The subtype may be a wildcard (`image/*`); a full wildcard (`*/*`)
/// matches any parseable media type. Parameters on either side are
/// ignored. Unparseable input never matches.
///
/// # Examples
///
/// ```
/// use presto_http::matches_media_type;
///
/// assert!(matches_media_type("application/json", "application/json; charset=utf-8"));
/// assert!(matches_media_type("image/*", "image/png"));
/// assert!(!matches_media_type("image/*", "text/plain"));
/// ```
pub fn matches_media_type(pattern: &str, content_type: &str) -> bool {
	let (Ok(pattern), Ok(value)) = (
		pattern.trim().parse::<Mime>(),
		content_type.trim().parse::<Mime>(),
	) else {
		return false;
	};

	if pattern.type_() == mime::STAR {
		return true;
	}
	if pattern.type_() != value.type_() {
		return false;
	}
	pattern.subtype() == mime::STAR || pattern.subtype() == value.subtype()
}

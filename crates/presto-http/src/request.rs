//! Request type exposing the surfaces the extraction layer reads from.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use http::{HeaderMap, Method, Uri, Version};

/// Errors that can occur while reading a request body.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
	#[error("request body has already been consumed")]
	AlreadyConsumed,
	#[error("client disconnected while reading the request body")]
	Disconnected,
	#[error("I/O error while reading the request body: {0}")]
	Io(#[from] std::io::Error),
}

/// The request body as an async stream of byte chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, BodyError>>;

/// Transport discriminator for a connection.
///
/// The extraction pipeline behaves identically for both kinds; the only
/// branch is which error type a validation failure converts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
	Http,
	WebSocket,
}

/// A single incoming request, as seen by the binding engine.
///
/// The body is a single-use resource: [`Request::take_body`] hands the
/// stream to exactly one caller and every later take fails with
/// [`BodyError::AlreadyConsumed`].
///
/// # Examples
///
/// ```
/// use presto_http::Request;
/// use http::Method;
///
/// let request = Request::builder()
///     .method(Method::GET)
///     .uri("/items?limit=10")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.path(), "/items");
/// assert_eq!(request.query_values("limit"), vec!["10"]);
/// ```
pub struct Request {
	method: Method,
	uri: Uri,
	version: Version,
	headers: HeaderMap,
	body: Mutex<Option<BodyStream>>,
	path_params: HashMap<String, String>,
	query_params: Vec<(String, String)>,
	scope: ScopeKind,
}

impl Request {
	/// Create a request with a fully buffered body.
	pub fn new(
		method: Method,
		uri: Uri,
		version: Version,
		headers: HeaderMap,
		body: Bytes,
	) -> Self {
		let query_params = Self::parse_query_params(&uri);
		let stream: BodyStream = if body.is_empty() {
			stream::empty().boxed()
		} else {
			stream::once(async move { Ok(body) }).boxed()
		};
		Self {
			method,
			uri,
			version,
			headers,
			body: Mutex::new(Some(stream)),
			path_params: HashMap::new(),
			query_params,
			scope: ScopeKind::Http,
		}
	}

	/// Start building a request.
	pub fn builder() -> RequestBuilder {
		RequestBuilder::new()
	}

	/// Parse the query string into an ordered multi-map.
	///
	/// Splitting happens on the first `=` only so values may contain `=`
	/// (e.g. Base64 payloads); percent-encoding and `+` are decoded.
	fn parse_query_params(uri: &Uri) -> Vec<(String, String)> {
		uri.query()
			.map(|q| {
				url::form_urlencoded::parse(q.as_bytes())
					.map(|(k, v)| (k.into_owned(), v.into_owned()))
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn uri(&self) -> &Uri {
		&self.uri
	}

	pub fn version(&self) -> Version {
		self.version
	}

	/// Get the request path
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// All header lines carrying `name`, in wire order.
	///
	/// Values that are not valid UTF-8 are skipped.
	pub fn header_lines(&self, name: &str) -> Vec<&str> {
		self.headers
			.get_all(name)
			.iter()
			.filter_map(|v| v.to_str().ok())
			.collect()
	}

	/// The `Content-Type` header, if present and valid UTF-8.
	pub fn content_type(&self) -> Option<&str> {
		self.headers
			.get(http::header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
	}

	/// Path parameters captured by the router.
	pub fn path_params(&self) -> &HashMap<String, String> {
		&self.path_params
	}

	/// The raw text captured for one path parameter.
	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(String::as_str)
	}

	/// Set a path parameter (used by routers for path variable extraction).
	///
	/// # Examples
	///
	/// ```
	/// use presto_http::Request;
	/// use http::Method;
	///
	/// let mut request = Request::builder()
	///     .method(Method::GET)
	///     .uri("/users/123")
	///     .build()
	///     .unwrap();
	///
	/// request.set_path_param("id", "123");
	/// assert_eq!(request.path_param("id"), Some("123"));
	/// ```
	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}

	/// The decoded query string as an ordered multi-map.
	pub fn query_pairs(&self) -> &[(String, String)] {
		&self.query_params
	}

	/// Every value carried by `name` in the query string, in order.
	pub fn query_values(&self, name: &str) -> Vec<&str> {
		self.query_params
			.iter()
			.filter(|(k, _)| k == name)
			.map(|(_, v)| v.as_str())
			.collect()
	}

	/// Parse the `Cookie` header(s) into a name/value map.
	///
	/// Malformed cookies (missing `=`, empty or invalid names per RFC 6265)
	/// are skipped rather than failing the whole request. The first
	/// occurrence of a name wins.
	pub fn cookies(&self) -> HashMap<String, String> {
		let mut cookies = HashMap::new();
		for line in self.header_lines(http::header::COOKIE.as_str()) {
			for cookie in line.split(';') {
				let cookie = cookie.trim();
				if cookie.is_empty() {
					continue;
				}
				let mut parts = cookie.splitn(2, '=');
				let name = parts.next().unwrap_or("").trim();
				let value = match parts.next() {
					Some(v) => v.trim(),
					// Missing '=' means malformed cookie - skip it
					None => continue,
				};
				if name.is_empty() || !is_valid_cookie_name(name) {
					continue;
				}
				cookies
					.entry(name.to_string())
					.or_insert_with(|| value.to_string());
			}
		}
		cookies
	}

	/// The value of one cookie, if present.
	pub fn cookie(&self, name: &str) -> Option<String> {
		self.cookies().remove(name)
	}

	pub fn scope_kind(&self) -> ScopeKind {
		self.scope
	}

	/// Take ownership of the body stream.
	///
	/// The stream can be taken exactly once; the registration layer keeps
	/// this from racing by allowing only one body-bearing extractor per
	/// endpoint.
	pub fn take_body(&self) -> Result<BodyStream, BodyError> {
		self.body
			.lock()
			.expect("body lock poisoned")
			.take()
			.ok_or(BodyError::AlreadyConsumed)
	}

	/// Read the whole body into one buffer.
	///
	/// Propagates disconnects and I/O failures from the underlying stream;
	/// fails if the body was already consumed.
	pub async fn read_body(&self) -> Result<Bytes, BodyError> {
		let mut stream = self.take_body()?;
		let mut buf = BytesMut::new();
		while let Some(chunk) = stream.next().await {
			buf.extend_from_slice(&chunk?);
		}
		Ok(buf.freeze())
	}
}

/// Validate cookie name per RFC 6265.
fn is_valid_cookie_name(name: &str) -> bool {
	name.chars().all(|c| {
		let code = c as u32;
		(0x21..=0x7E).contains(&code)
			&& !matches!(
				c,
				'(' | ')'
					| '<' | '>' | '@' | ','
					| ';' | ':' | '\\' | '"'
					| '/' | '[' | ']' | '?'
					| '=' | '{' | '}' | ' '
					| '\t'
			)
	})
}

/// Builder for [`Request`].
#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	version: Option<Version>,
	headers: HeaderMap,
	body: Option<Bytes>,
	stream: Option<BodyStream>,
	path_params: HashMap<String, String>,
	scope: Option<ScopeKind>,
}

impl RequestBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = Some(version);
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Append one header line, panicking on invalid input (builder is a
	/// test/startup convenience, not a wire-facing parser).
	pub fn header(mut self, name: &str, value: &str) -> Self {
		let name: http::header::HeaderName = name.parse().expect("invalid header name");
		let value: http::header::HeaderValue = value.parse().expect("invalid header value");
		self.headers.append(name, value);
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = Some(body.into());
		self
	}

	/// Provide the body as a stream instead of a buffer.
	pub fn streaming_body(mut self, stream: BodyStream) -> Self {
		self.stream = Some(stream);
		self
	}

	pub fn path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.path_params.insert(key.into(), value.into());
		self
	}

	pub fn scope_kind(mut self, scope: ScopeKind) -> Self {
		self.scope = Some(scope);
		self
	}

	pub fn build(self) -> Result<Request, http::uri::InvalidUri> {
		let uri: Uri = self.uri.as_deref().unwrap_or("/").parse()?;
		let mut request = Request::new(
			self.method.unwrap_or(Method::GET),
			uri,
			self.version.unwrap_or(Version::HTTP_11),
			self.headers,
			self.body.unwrap_or_default(),
		);
		if let Some(stream) = self.stream {
			request.body = Mutex::new(Some(stream));
		}
		request.path_params = self.path_params;
		if let Some(scope) = self.scope {
			request.scope = scope;
		}
		Ok(request)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn request_with_uri(uri: &str) -> Request {
		Request::builder().uri(uri).build().unwrap()
	}

	#[rstest]
	fn test_query_pairs_preserve_order_and_repeats() {
		let req = request_with_uri("/test?a=1&b=2&a=3");
		assert_eq!(req.query_values("a"), vec!["1", "3"]);
		assert_eq!(req.query_values("b"), vec!["2"]);
	}

	#[rstest]
	fn test_query_value_preserves_equals() {
		let req = request_with_uri("/test?token=abc==");
		assert_eq!(req.query_values("token"), vec!["abc=="]);
	}

	#[rstest]
	fn test_query_empty_value_is_present() {
		let req = request_with_uri("/test?key=");
		assert_eq!(req.query_values("key"), vec![""]);
	}

	#[rstest]
	fn test_query_percent_decoding() {
		let req = request_with_uri("/test?name=John%20Doe");
		assert_eq!(req.query_values("name"), vec!["John Doe"]);
	}

	#[rstest]
	fn test_no_query_string() {
		let req = request_with_uri("/test");
		assert!(req.query_pairs().is_empty());
	}

	#[rstest]
	fn test_cookie_parsing_skips_malformed() {
		let req = Request::builder()
			.uri("/")
			.header("cookie", "session=abc123; broken; =empty; theme=dark")
			.build()
			.unwrap();
		let cookies = req.cookies();
		assert_eq!(cookies.get("session").map(String::as_str), Some("abc123"));
		assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
		assert_eq!(cookies.len(), 2);
	}

	#[rstest]
	fn test_header_lines_in_order() {
		let req = Request::builder()
			.uri("/")
			.header("x-token", "1")
			.header("x-token", "2")
			.build()
			.unwrap();
		assert_eq!(req.header_lines("x-token"), vec!["1", "2"]);
	}

	#[tokio::test]
	async fn test_body_single_use() {
		let req = Request::builder()
			.uri("/")
			.body(Bytes::from_static(b"hello"))
			.build()
			.unwrap();
		let body = req.read_body().await.unwrap();
		assert_eq!(&body[..], b"hello");
		assert!(matches!(
			req.read_body().await,
			Err(BodyError::AlreadyConsumed)
		));
	}

	#[tokio::test]
	async fn test_streaming_body_collects_chunks() {
		let chunks: Vec<Result<Bytes, BodyError>> =
			vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
		let req = Request::builder()
			.uri("/")
			.streaming_body(stream::iter(chunks).boxed())
			.build()
			.unwrap();
		assert_eq!(&req.read_body().await.unwrap()[..], b"abcd");
	}

	#[tokio::test]
	async fn test_disconnect_propagates() {
		let chunks: Vec<Result<Bytes, BodyError>> =
			vec![Ok(Bytes::from_static(b"ab")), Err(BodyError::Disconnected)];
		let req = Request::builder()
			.uri("/")
			.streaming_body(stream::iter(chunks).boxed())
			.build()
			.unwrap();
		assert!(matches!(
			req.read_body().await,
			Err(BodyError::Disconnected)
		));
	}
}

//! # Stateless gateway request machinery
//!
//! Every gateway endpoint is described by a request type implementing
//! [`GatewayRequest`]: the HTTP method, the (possibly parameterized) path,
//! the query string (the type's `Serialize` impl), and an optional JSON
//! body. The paired [`GatewayResp`] marker decodes the response body; a
//! decode failure is a schema violation, not a silent fallback.
//!
//! The whole protocol surface lives here: [`GatewayTransport`] only moves
//! one prepared request to the API node and hands back the raw response,
//! so anything that can reach an HTTP endpoint (reqwest, a test queue)
//! can drive the client.
//!
//! Status mapping:
//! - 2xx: decode the body against the endpoint's output schema.
//! - 400/401/403/404: map to the stable [`ErrorCode`] taxonomy, carrying
//!   the gateway's error message when the body provides one.
//! - Everything else (5xx included): transport exception via [`HttpError`].

use crate::AuthToken;
use crate::error::{
    ClientError, ClientResult, DecodeError, EncodeError, ErrorCode, HttpError, TransportError,
};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use url::Url;

/// Transport that carries prepared requests to the gateway.
///
/// The protocol layer builds the full `http::Request` (path, query,
/// credential, body) and interprets the full `http::Response`; a
/// transport moves the bytes and reports failures through the client's
/// own [`TransportError`] taxonomy.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait GatewayTransport {
    /// Carry one request to the API node and return the raw response.
    fn fetch(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = Result<http::Response<Vec<u8>>, TransportError>>;
}

#[cfg(feature = "reqwest-client")]
impl GatewayTransport for reqwest::Client {
    async fn fetch(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, TransportError> {
        let (parts, body) = request.into_parts();

        let mut req = self.request(parts.method, parts.uri.to_string()).body(body);
        for (name, value) in &parts.headers {
            req = req.header(name, value.clone());
        }
        let resp = req.send().await?;

        let mut builder = http::Response::builder().status(resp.status());
        for (name, value) in resp.headers() {
            builder = builder.header(name, value.clone());
        }
        let bytes = resp.bytes().await?.to_vec();
        builder
            .body(bytes)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<T: GatewayTransport + Sync> GatewayTransport for Arc<T> {
    fn fetch(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = Result<http::Response<Vec<u8>>, TransportError>> + Send {
        self.as_ref().fetch(request)
    }
}

#[cfg(target_arch = "wasm32")]
impl<T: GatewayTransport> GatewayTransport for Arc<T> {
    fn fetch(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = Result<http::Response<Vec<u8>>, TransportError>> {
        self.as_ref().fetch(request)
    }
}

/// Trait for gateway request types.
///
/// The type's `Serialize` impl produces the query string; fields that feed
/// the path or the body are marked `#[serde(skip)]`.
pub trait GatewayRequest: Serialize {
    /// HTTP method for this endpoint
    const METHOD: http::Method;

    /// Response marker type for this endpoint
    type Response: GatewayResp;

    /// Endpoint path, including any path parameters (e.g.
    /// `/v1/stores/<id>/files`). Must start with `/`.
    fn path(&self) -> String;

    /// Encode the request body, if this endpoint takes one.
    ///
    /// Default implementation sends no body. Mutation endpoints override
    /// this with a JSON encoding.
    fn encode_body(&self) -> Result<Option<Vec<u8>>, EncodeError> {
        Ok(None)
    }
}

/// Trait for gateway response markers.
///
/// The `Output` type is the wire schema: decoding the body against it is
/// the schema check the higher layers rely on.
pub trait GatewayResp {
    /// Schema name reported on decode failure
    const SCHEMA: &'static str;

    /// Decoded response type
    type Output: DeserializeOwned;

    /// Decode the response body.
    ///
    /// Default implementation deserializes JSON. Override for raw-byte
    /// endpoints.
    fn decode_output(body: &[u8]) -> Result<Self::Output, DecodeError> {
        serde_json::from_slice(body).map_err(|e| DecodeError::Schema {
            schema: Self::SCHEMA,
            source: e,
        })
    }
}

/// Per-request options for gateway calls.
#[derive(Debug, Default, Clone)]
pub struct CallOptions {
    /// Credential to apply (session token or API password).
    pub auth: Option<AuthToken>,
    /// Extra headers to attach to this request.
    pub extra_headers: Vec<(HeaderName, HeaderValue)>,
}

/// Extension for stateless gateway calls on any [`GatewayTransport`].
pub trait GatewayExt: GatewayTransport {
    /// Start building a gateway call against the given API node.
    fn gateway(&self, base: Url) -> GatewayCall<'_, Self>
    where
        Self: Sized,
    {
        GatewayCall {
            client: self,
            base,
            opts: CallOptions::default(),
        }
    }
}

impl<T: GatewayTransport> GatewayExt for T {}

/// Stateless gateway call builder.
pub struct GatewayCall<'a, C: GatewayTransport> {
    client: &'a C,
    base: Url,
    opts: CallOptions,
}

impl<'a, C: GatewayTransport> GatewayCall<'a, C> {
    /// Apply a credential to this call.
    pub fn auth(mut self, token: AuthToken) -> Self {
        self.opts.auth = Some(token);
        self
    }

    /// Add an extra header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.opts.extra_headers.push((name, value));
        self
    }

    /// Replace the builder's options entirely.
    pub fn with_options(mut self, opts: CallOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Send the given typed request and return a response wrapper.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(path = %request.path()))
    )]
    pub async fn send<R>(self, request: &R) -> ClientResult<Response<R::Response>>
    where
        R: GatewayRequest,
    {
        let http_request = build_http_request(&self.base, request, &self.opts)?;

        let http_response = self.client.fetch(http_request).await?;

        process_response(http_response)
    }
}

/// Build an HTTP request for a gateway call given the API node base URL.
pub fn build_http_request<R>(
    base: &Url,
    req: &R,
    opts: &CallOptions,
) -> ClientResult<Request<Vec<u8>>>
where
    R: GatewayRequest,
{
    let mut url = base.clone();
    let mut path = url.path().trim_end_matches('/').to_owned();
    path.push_str(&req.path());
    url.set_path(&path);

    let qs = serde_html_form::to_string(req).map_err(EncodeError::Query)?;
    if !qs.is_empty() {
        url.set_query(Some(&qs));
    } else {
        url.set_query(None);
    }

    let mut builder = Request::builder().method(R::METHOD).uri(url.as_str());

    let body = req.encode_body()?;
    if body.is_some() {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }

    if let Some(token) = &opts.auth {
        // The gateway expects the lowercase `bearer` scheme for both
        // session tokens and the API password.
        let hv = HeaderValue::from_str(&format!("bearer {}", token.secret())).map_err(|e| {
            crate::error::TransportError::InvalidRequest(format!("invalid credential: {}", e))
        })?;
        builder = builder.header(AUTHORIZATION, hv);
    }

    for (name, value) in &opts.extra_headers {
        builder = builder.header(name, value);
    }

    builder
        .body(body.unwrap_or_default())
        .map_err(|e| crate::error::TransportError::InvalidRequest(e.to_string()).into())
}

/// Process the HTTP response from the gateway into a response wrapper.
///
/// Statuses outside the mapped taxonomy (5xx and anything unexpected)
/// surface here as [`HttpError`]; mapped statuses flow through to
/// [`Response::parse`].
pub fn process_response<Resp>(http_response: http::Response<Vec<u8>>) -> ClientResult<Response<Resp>>
where
    Resp: GatewayResp,
{
    let status = http_response.status();
    let buffer = Bytes::from(http_response.into_body());

    if !status.is_success() && ErrorCode::from_status(status).is_none() {
        return Err(ClientError::Http(HttpError {
            status,
            body: Some(buffer),
        }));
    }

    Ok(Response::new(buffer, status))
}

/// Gateway response wrapper that owns the response buffer.
pub struct Response<Resp>
where
    Resp: GatewayResp,
{
    _marker: PhantomData<fn() -> Resp>,
    buffer: Bytes,
    status: StatusCode,
}

impl<R> Response<R>
where
    R: GatewayResp,
{
    /// Create a new response from a buffer and status code
    pub fn new(buffer: Bytes, status: StatusCode) -> Self {
        Self {
            buffer,
            status,
            _marker: PhantomData,
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the raw buffer
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Parse the response body against the endpoint's output schema, or
    /// map the status code to the stable error taxonomy.
    pub fn parse(&self) -> Result<R::Output, GatewayError> {
        if self.status.is_success() {
            return Ok(R::decode_output(&self.buffer)?);
        }
        let code = ErrorCode::from_status(self.status)
            // process_response admits only mapped statuses
            .unwrap_or(ErrorCode::RemoteIo);
        let message = serde_json::from_slice::<WireError>(&self.buffer)
            .ok()
            .map(|e| e.error);
        Err(GatewayError::Code { code, message })
    }
}

/// Error body shape the gateway uses for mapped failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct WireError {
    error: SmolStr,
}

/// Errors surfaced when parsing a gateway response.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GatewayError {
    /// Mapped gateway failure (the stable taxonomy)
    #[error("gateway returned {code}: {}", .message.as_deref().unwrap_or("no message"))]
    Code {
        /// Taxonomy code mapped from the status
        code: ErrorCode,
        /// Gateway-provided error message, if the body carried one
        message: Option<SmolStr>,
    },

    /// Failed to decode the response body
    #[error("Failed to decode response: {0}")]
    Decode(#[from] DecodeError),
}

impl GatewayError {
    /// The taxonomy code, if this is a mapped failure.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            GatewayError::Code { code, .. } => Some(*code),
            GatewayError::Decode(_) => None,
        }
    }

    /// Whether this is a mapped NotFound.
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }
}

//! Request item types
//!
//! Requests describe how to fetch a URL. The body travels as a Base64
//! string so requests stay plain data; [`Request::body_bytes`] decodes it.

use crate::metadata::ProbabilityMetadata;
use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};
use itemkit_core::{CastTarget, FieldType, UnknownFields};
use serde_json::json;
use tracing::trace;

/// HTTP method used when none is given
pub const DEFAULT_METHOD: &str = "GET";

/// An HTTP header
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Header name
    pub name: String,
    /// Header value
    pub value: String,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

impl Header {
    /// Header with the given name and value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unknown_fields: UnknownFields::new(),
        }
    }
}

itemkit_core::impl_item! {
    Header {
        name: "name" => required(FieldType::str()),
        value: "value" => required(FieldType::str()),
    }
}

/// A request to fetch a URL
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request body, Base64-encoded
    pub body: Option<String>,
    /// HTTP headers
    pub headers: Option<Vec<Header>>,
    /// Name of the link the request was built from
    pub name: Option<String>,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

impl Request {
    /// GET request for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: DEFAULT_METHOD.to_string(),
            body: None,
            headers: None,
            name: None,
            unknown_fields: UnknownFields::new(),
        }
    }

    /// Decoded request body
    ///
    /// Decoding happens on every call; the Base64 string is the only
    /// stored form.
    pub fn body_bytes(&self) -> std::result::Result<Option<Vec<u8>>, DecodeError> {
        decode_body(self.body.as_deref())
    }

    /// Replace the body with `bytes`
    pub fn with_body_bytes(mut self, bytes: &[u8]) -> Self {
        self.body = Some(STANDARD.encode(bytes));
        self
    }

    /// Value of the first header called `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(self.headers.as_deref(), name)
    }
}

fn decode_body(body: Option<&str>) -> std::result::Result<Option<Vec<u8>>, DecodeError> {
    let Some(body) = body else {
        return Ok(None);
    };
    let bytes = STANDARD.decode(body)?;
    trace!(len = bytes.len(), "decoded request body");
    Ok(Some(bytes))
}

fn find_header<'a>(headers: Option<&'a [Header]>, name: &str) -> Option<&'a str> {
    headers?
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}

itemkit_core::impl_item! {
    Request {
        url: "url" => required(FieldType::str()),
        method: "method" => default(FieldType::str(), json!(DEFAULT_METHOD)),
        body: "body" => optional(FieldType::str()),
        headers: "headers" => list(Header),
        name: "name" => optional(FieldType::str()),
    }
}

/// A request with the probability that it leads to what it claims
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityRequest {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request body, Base64-encoded
    pub body: Option<String>,
    /// HTTP headers
    pub headers: Option<Vec<Header>>,
    /// Name of the link the request was built from
    pub name: Option<String>,
    /// Extraction metadata, including the probability
    pub metadata: Option<ProbabilityMetadata>,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

impl ProbabilityRequest {
    /// Probability of the request, 1.0 when no metadata is set
    pub fn probability(&self) -> f64 {
        self.metadata
            .as_ref()
            .map_or(crate::metadata::DEFAULT_PROBABILITY, |meta| meta.probability.get())
    }

    /// See [`Request::body_bytes`]
    pub fn body_bytes(&self) -> std::result::Result<Option<Vec<u8>>, DecodeError> {
        decode_body(self.body.as_deref())
    }

    /// See [`Request::header`]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(self.headers.as_deref(), name)
    }
}

itemkit_core::impl_item! {
    ProbabilityRequest {
        url: "url" => required(FieldType::str()),
        method: "method" => default(FieldType::str(), json!(DEFAULT_METHOD)),
        body: "body" => optional(FieldType::str()),
        headers: "headers" => list(Header),
        name: "name" => optional(FieldType::str()),
        metadata: "metadata" => nested(ProbabilityMetadata),
    }
}

/// Casting a plain request seeds metadata with probability 1.0
impl CastTarget<Request> for ProbabilityRequest {
    fn seed(_source: &Request, target: &mut Self) {
        if target.metadata.is_none() {
            target.metadata = Some(ProbabilityMetadata::default());
        }
    }
}

impl CastTarget<ProbabilityRequest> for Request {}

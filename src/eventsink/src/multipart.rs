//! Boundary-delimited composite bodies.
//!
//! The writer produces the layout below, which is what `mime/multipart`
//! style readers expect:
//!
//! ```text
//! --<boundary>\r\n
//! name: value\r\n
//! \r\n
//! <body>\r\n
//! --<boundary>\r\n
//! ...
//! <body>\r\n
//! --<boundary>--\r\n
//! ```
//!
//! Reading is left to `multer` and is mostly useful to test drivers that need
//! to pull captured records back out of a dump.

use std::convert::Infallible;

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

const BOUNDARY_LEN: usize = 32;
const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("Content type {0:?} does not declare a multipart boundary")]
    MissingBoundary(String),
    #[error("Invalid content type {0:?}")]
    InvalidContentType(String),
    #[error("Invalid part header name {0:?}")]
    InvalidHeaderName(String),
    #[error("Invalid value for part header {0:?}")]
    InvalidHeaderValue(String),
    #[error("Malformed multipart body: {0}")]
    Malformed(#[from] multer::Error),
}

/// A single part of a composite body
#[derive(Debug, Clone, Default)]
pub struct Part {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Builds a composite body one part at a time
#[derive(Debug)]
pub struct MultipartWriter {
    boundary: String,
    buf: BytesMut,
    parts: usize,
}

impl MultipartWriter {
    /// Creates a writer with a random boundary. The nanoid alphabet is a
    /// subset of the characters allowed in a boundary.
    pub fn new() -> Self {
        Self {
            boundary: nanoid::nanoid!(BOUNDARY_LEN),
            buf: BytesMut::new(),
            parts: 0,
        }
    }

    /// The value to declare in the response's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", mime::MULTIPART_FORM_DATA, self.boundary)
    }

    /// Appends a part. Headers are validated before anything is written, so a
    /// rejected part leaves the body unchanged.
    pub fn write_part<'a, I>(&mut self, headers: I, body: &[u8]) -> Result<(), MultipartError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut head = BytesMut::new();

        for (name, value) in headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(MultipartError::InvalidHeaderName(name.to_string()));
            }

            if HeaderValue::from_bytes(value.as_bytes()).is_err() {
                return Err(MultipartError::InvalidHeaderValue(name.to_string()));
            }

            head.put_slice(name.as_bytes());
            head.put_slice(b": ");
            head.put_slice(value.as_bytes());
            head.put_slice(CRLF);
        }

        if self.parts > 0 {
            self.buf.put_slice(CRLF);
        }
        self.put_delimiter();
        self.buf.put_slice(CRLF);
        self.buf.put(head);
        self.buf.put_slice(CRLF);
        self.buf.put_slice(body);

        self.parts += 1;

        Ok(())
    }

    /// Writes the closing delimiter and returns the finished body
    pub fn finish(mut self) -> Bytes {
        if self.parts > 0 {
            self.buf.put_slice(CRLF);
        }
        self.put_delimiter();
        self.buf.put_slice(b"--");
        self.buf.put_slice(CRLF);

        self.buf.freeze()
    }

    fn put_delimiter(&mut self) {
        self.buf.put_slice(b"--");
        self.buf.put_slice(self.boundary.as_bytes());
    }
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the boundary parameter from a multipart content type
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    let mime = content_type
        .parse::<mime::Mime>()
        .map_err(|_| MultipartError::InvalidContentType(content_type.to_string()))?;

    if mime.type_() != "multipart" {
        return Err(MultipartError::MissingBoundary(content_type.to_string()));
    }

    mime.get_param(mime::BOUNDARY)
        .map(|boundary| boundary.as_str().to_string())
        .ok_or_else(|| MultipartError::MissingBoundary(content_type.to_string()))
}

/// Splits a composite body into its parts
pub async fn decode(boundary: &str, body: Bytes) -> Result<Vec<Part>, MultipartError> {
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut parts = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let headers = field.headers().clone();
        let body = field.bytes().await?;

        parts.push(Part { headers, body });
    }

    Ok(parts)
}

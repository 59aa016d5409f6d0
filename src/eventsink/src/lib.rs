//! eventsink is a passive HTTP recorder for test harnesses. Every `POST` it
//! receives is captured in memory, and the captured set can be read back as a
//! single multipart body, counted, or cleared.

pub mod capture;
pub mod config;
pub mod multipart;
pub mod record;
pub mod retrieve;
pub mod server;
pub mod store;
pub mod tls;

use bytes::Bytes;
use http::{Uri, Version};
use http_body_util::Full;

/// Response type produced by every request handler
pub type HttpResponse = http::Response<Full<Bytes>>;

/// An empty `200 OK` response
pub(crate) fn empty_response() -> HttpResponse {
    http::Response::new(Full::new(Bytes::new()))
}

/// The request target as the client sent it. An HTTP/1 absolute-form target
/// keeps its scheme and authority. HTTP/2 requests always carry both in the
/// `Uri`, so only the path and query count there.
pub(crate) fn request_target(version: Version, uri: &Uri) -> String {
    match uri.path_and_query() {
        Some(path_and_query) if version >= Version::HTTP_2 || uri.scheme().is_none() => {
            path_and_query.as_str().to_string()
        }
        _ => uri.to_string(),
    }
}

use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, HOST};
use http::request::Parts;
use http::{HeaderMap, Request};
use http_body_util::BodyExt;
use hyper::body::Body;

use crate::record::{CapturedRecord, HeaderEntry};
use crate::store::RecordStore;
use crate::HttpResponse;

/// Records `request` in the store and acknowledges it with an empty `200 OK`
pub async fn capture<B>(request: Request<B>, store: &RecordStore) -> HttpResponse
where
    B: Body + Unpin,
    B::Error: Display,
{
    let (parts, body) = request.into_parts();
    let record = read_record(parts, body).await;
    let count = store.append(record);

    tracing::trace!(count, "Captured request");

    crate::empty_response()
}

/// Builds a record from the request head and body.
///
/// Body read failures are not reported: the record keeps whatever bytes
/// arrived before the failure. A request without a body leaves
/// `content_length` and `captured_at_nanos` at zero.
pub async fn read_record<B>(parts: Parts, body: B) -> CapturedRecord
where
    B: Body + Unpin,
    B::Error: Display,
{
    let mut record = CapturedRecord {
        path: crate::request_target(parts.version, &parts.uri),
        method: parts.method.to_string(),
        host: request_host(&parts),
        headers: copy_headers(&parts.headers),
        ..Default::default()
    };

    if has_body(&parts.headers, &body) {
        record.content_length = declared_length(&body);
        record.body = read_body(body).await;
        record.captured_at_nanos = subsec_nanos();
    }

    record
}

fn request_host(parts: &Parts) -> String {
    parts
        .uri
        .authority()
        .map(|authority| authority.as_str().to_string())
        .or_else(|| {
            parts
                .headers
                .get(HOST)
                .map(|host| String::from_utf8_lossy(host.as_bytes()).into_owned())
        })
        .unwrap_or_default()
}

// Owned copies so nothing in the record points back into the transport's
// header storage
fn copy_headers(headers: &HeaderMap) -> Vec<HeaderEntry> {
    headers
        .keys()
        .map(|name| HeaderEntry {
            name: name.as_str().to_string(),
            values: headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect(),
        })
        .collect()
}

fn has_body<B: Body>(headers: &HeaderMap, body: &B) -> bool {
    headers.contains_key(CONTENT_LENGTH) || !body.is_end_stream()
}

fn declared_length<B: Body>(body: &B) -> i64 {
    body.size_hint()
        .exact()
        .and_then(|len| i64::try_from(len).ok())
        .unwrap_or(-1)
}

async fn read_body<B>(mut body: B) -> Bytes
where
    B: Body + Unpin,
    B::Error: Display,
{
    let mut buf = BytesMut::new();

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    buf.put(data);
                }
            }
            Err(e) => {
                tracing::debug!(
                    "Failed to read request body, keeping {} bytes received: {}",
                    buf.len(),
                    e
                );
                break;
            }
        }
    }

    buf.freeze()
}

fn subsec_nanos() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or_default()
}

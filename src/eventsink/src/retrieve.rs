use bytes::Bytes;
use http::header::{InvalidHeaderValue, CONTENT_TYPE};
use http::{HeaderValue, Request, StatusCode};
use http_body_util::Full;
use thiserror::Error;

use crate::multipart::{self, MultipartError, MultipartWriter};
use crate::record::{CapturedRecord, RecordError};
use crate::store::{RecordStore, Snapshot};
use crate::HttpResponse;

/// Request target that reports the record count instead of dumping records
pub const COUNT_PATH: &str = "/count";

#[derive(Debug, Error)]
pub enum DumpError {
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Invalid dump content type: {0}")]
    ContentType(#[from] InvalidHeaderValue),
}

/// Handles a read request: `/count` reports the number of records, any other
/// target dumps them. Neither clears the store.
pub fn retrieve<B>(request: &Request<B>, store: &RecordStore) -> HttpResponse {
    if is_count_target(&crate::request_target(request.version(), request.uri())) {
        count(store)
    } else {
        dump(store)
    }
}

/// Whether the raw request target asks for the count. The query string and
/// any absolute-form scheme or authority are part of the comparison.
pub fn is_count_target(target: &str) -> bool {
    target.eq_ignore_ascii_case(COUNT_PATH)
}

/// Responds with the record count as a bare decimal integer
pub fn count(store: &RecordStore) -> HttpResponse {
    let count = store.count();

    tracing::debug!("Returning count: {}", count);

    http::Response::new(Full::new(Bytes::from(count.to_string())))
}

/// Responds with every stored record as one multipart body
pub fn dump(store: &RecordStore) -> HttpResponse {
    let snapshot = store.snapshot();

    match encode_dump(&snapshot) {
        Ok(response) => {
            tracing::debug!("Sent {} records", snapshot.len());
            response
        }
        Err(e) => {
            tracing::error!("Failed to encode record dump: {}", e);
            internal_error(&e)
        }
    }
}

/// Discards every stored record
pub fn reset(store: &RecordStore) -> HttpResponse {
    store.clear();

    tracing::debug!("Records reset to zero");

    crate::empty_response()
}

/// Encodes `snapshot` as a multipart response, one part per record in store
/// order
pub fn encode_dump(snapshot: &Snapshot) -> Result<HttpResponse, DumpError> {
    let mut writer = MultipartWriter::new();

    for record in snapshot.iter() {
        let headers = record.part_headers();

        writer.write_part(
            headers
                .iter()
                .map(|(name, value)| (*name, value.as_str())),
            &record.body,
        )?;
    }

    let content_type = HeaderValue::try_from(writer.content_type())?;

    let mut response = http::Response::new(Full::new(writer.finish()));
    response.headers_mut().insert(CONTENT_TYPE, content_type);

    Ok(response)
}

/// Parses a dump response body back into records. `content_type` is the
/// value of the dump response's `Content-Type` header.
pub async fn decode_dump(
    content_type: &str,
    body: Bytes,
) -> Result<Vec<CapturedRecord>, DumpError> {
    let boundary = multipart::boundary_from_content_type(content_type)?;

    multipart::decode(&boundary, body)
        .await?
        .into_iter()
        .map(|part| CapturedRecord::from_part(part).map_err(DumpError::from))
        .collect()
}

fn internal_error(error: &DumpError) -> HttpResponse {
    let mut response = http::Response::new(Full::new(Bytes::from(format!("{}\n", error))));

    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    response
}

use bytes::Bytes;
use thiserror::Error;

use crate::multipart::Part;

/// Reserved part headers that carry record metadata through a dump. These
/// names are the wire contract between the recorder and its readers.
pub const TIME_NSEC_HEADER: &str = "__EVENT_RECORDER_TIME_NSEC";
pub const CONTENT_LENGTH_HEADER: &str = "__EVENT_RECORDER_CONTENT_LENGTH";
pub const PATH_HEADER: &str = "__EVENT_RECORDER_PATH";
pub const METHOD_HEADER: &str = "__EVENT_RECORDER_METHOD";
pub const HOST_HEADER: &str = "__EVENT_RECORDER_HOST";

pub const RESERVED_HEADERS: [&str; 5] = [
    TIME_NSEC_HEADER,
    CONTENT_LENGTH_HEADER,
    PATH_HEADER,
    METHOD_HEADER,
    HOST_HEADER,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Part is missing the {0} metadata header")]
    MissingMetadata(&'static str),
    #[error("Invalid value {value:?} for the {name} metadata header")]
    InvalidMetadata { name: &'static str, value: String },
}

/// A header name and all of its values, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: String,
    pub values: Vec<String>,
}

/// One inbound request as captured by the recorder. Records are shared
/// behind an `Arc` once stored and never change afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedRecord {
    /// Request target, including the query string
    pub path: String,
    pub method: String,
    pub host: String,
    pub headers: Vec<HeaderEntry>,
    pub body: Bytes,
    /// Body length declared by the transport, `-1` if it was not declared
    pub content_length: i64,
    /// Nanosecond-of-second at which the body finished reading. This is not
    /// a full timestamp.
    pub captured_at_nanos: u32,
}

impl CapturedRecord {
    /// Header lines for this record's dump part: every captured value, then
    /// the reserved metadata headers.
    pub fn part_headers(&self) -> Vec<(&str, String)> {
        let mut headers: Vec<(&str, String)> = self
            .headers
            .iter()
            .flat_map(|entry| {
                entry
                    .values
                    .iter()
                    .map(move |value| (entry.name.as_str(), value.clone()))
            })
            .collect();

        headers.extend([
            (TIME_NSEC_HEADER, self.captured_at_nanos.to_string()),
            (CONTENT_LENGTH_HEADER, self.content_length.to_string()),
            (PATH_HEADER, self.path.clone()),
            (METHOD_HEADER, self.method.clone()),
            (HOST_HEADER, self.host.clone()),
        ]);

        headers
    }

    /// Rebuilds a record from a dump part, lifting the reserved headers back
    /// into their fields. Header names come back lowercase.
    pub fn from_part(part: Part) -> Result<Self, RecordError> {
        let mut headers: Vec<HeaderEntry> = Vec::new();
        let mut metadata: [Option<String>; 5] = Default::default();

        for (name, value) in part.headers.iter() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();

            if let Some(idx) = RESERVED_HEADERS
                .iter()
                .position(|reserved| reserved.eq_ignore_ascii_case(name.as_str()))
            {
                metadata[idx] = Some(value);
                continue;
            }

            match headers.iter_mut().find(|entry| entry.name == name.as_str()) {
                Some(entry) => entry.values.push(value),
                None => headers.push(HeaderEntry {
                    name: name.as_str().to_string(),
                    values: vec![value],
                }),
            }
        }

        let [nsec, content_length, path, method, host] = metadata;

        Ok(Self {
            path: required(PATH_HEADER, path)?,
            method: required(METHOD_HEADER, method)?,
            host: required(HOST_HEADER, host)?,
            headers,
            body: part.body,
            content_length: parse_required(CONTENT_LENGTH_HEADER, content_length)?,
            captured_at_nanos: parse_required(TIME_NSEC_HEADER, nsec)?,
        })
    }

    /// Returns the values captured for `name`, compared case-insensitively
    pub fn header_values(&self, name: &str) -> Option<&[String]> {
        self.headers
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.values.as_slice())
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String, RecordError> {
    value.ok_or(RecordError::MissingMetadata(name))
}

fn parse_required<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
) -> Result<T, RecordError> {
    let value = required(name, value)?;

    value
        .parse()
        .map_err(|_| RecordError::InvalidMetadata { name, value })
}

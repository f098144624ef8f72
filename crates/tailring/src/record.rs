//! Parsing of pipe-delimited span lines and tag-based anomaly detection.

use std::sync::Arc;

/// Field separator within a span line.
pub const FIELD_DELIMITER: char = '|';
/// Index of the tags blob among the pipe-delimited fields.
pub const TAGS_FIELD: usize = 8;

const ERROR_TAG: &str = "error=1";
const HTTP_STATUS_TAG: &str = "http.status_code=";
const HTTP_STATUS_OK: &str = "200";
const TAG_SEPARATOR: char = '&';

/// One parsed span line.
///
/// The raw line is shared, so handing it to a slot and later to a query result
/// only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    pub trace_id: Arc<str>,
    pub line: Arc<str>,
    /// Whether the tags mark this span as an error
    pub anomalous: bool,
}

impl SpanRecord {
    /// Parses one line (with or without its trailing newline).
    ///
    /// Returns `None` for malformed lines: fewer than two fields, or an empty trace id.
    pub fn parse(raw: &str) -> Option<Self> {
        let line = raw.trim_end_matches(['\n', '\r']);
        let mut fields = line.split(FIELD_DELIMITER);
        let trace_id = fields.next()?;
        fields.next()?;
        if trace_id.is_empty() {
            return None;
        }

        // two fields consumed, the tags blob is TAGS_FIELD - 2 further on
        let anomalous = fields.nth(TAGS_FIELD - 2).is_some_and(is_anomalous_tags);

        Some(Self {
            trace_id: Arc::from(trace_id),
            line: Arc::from(line),
            anomalous,
        })
    }
}

/// A tags blob marks its span as anomalous when it carries `error=1`, or an
/// `http.status_code` whose value is anything but exactly `200`.
pub fn is_anomalous_tags(tags: &str) -> bool {
    tags.contains(ERROR_TAG) || status_codes(tags).any(|code| code != HTTP_STATUS_OK)
}

fn status_codes(tags: &str) -> impl Iterator<Item = &str> {
    tags.match_indices(HTTP_STATUS_TAG).map(move |(at, key)| {
        let value = &tags[at + key.len()..];
        value.find(TAG_SEPARATOR).map_or(value, |end| &value[..end])
    })
}

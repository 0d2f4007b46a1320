//! Incremental `multipart/form-data` decoder.
//!
//! [`MultipartDecoder`] is a push parser: bytes are written in arbitrary
//! chunks and it emits [`MultipartEvent`]s as soon as they can be determined.
//! Only the current part's header section and a boundary-sized look-behind are
//! retained between writes, so file payloads flow through in chunks instead of
//! being re-buffered. [`decode`] drives the parser from an async reader and
//! [`FormCollector`] turns the event stream into fields and [`FilePart`]s.

use std::collections::HashMap;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::MultipartError;

/// Size of the chunks [`decode`] reads from its source.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound for one part's header section.
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

const DEFAULT_ENCODING: &str = "7bit";
const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Whether `content_type` denotes `multipart/form-data` (case-insensitive).
#[must_use]
pub fn is_multipart(content_type: &str) -> bool {
    match content_type.parse::<mime::Mime>() {
        Ok(m) => m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA,
        Err(_) => content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("multipart/form-data"),
    }
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type.
///
/// # Errors
///
/// Returns an error if the content type is not multipart/form-data or the
/// boundary parameter is absent or empty.
pub fn extract_boundary(content_type: &str) -> Result<String, MultipartError> {
    if !is_multipart(content_type) {
        return Err(MultipartError::NotMultipart(content_type.to_owned()));
    }

    for param in content_type.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            if boundary.is_empty() {
                return Err(MultipartError::MissingBoundary);
            }
            return Ok(boundary.to_owned());
        }
    }

    Err(MultipartError::MissingBoundary)
}

/// Metadata announced in a file part's headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Original file name.
    pub filename: String,
    /// `Content-Transfer-Encoding`, `7bit` when absent.
    pub encoding: String,
    /// Declared MIME type, `text/plain` when absent.
    pub mime_type: String,
}

/// Events emitted by [`MultipartDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartEvent {
    /// A complete plain field.
    Field {
        /// Field name.
        name: String,
        /// Field value (lossy UTF-8).
        value: String,
    },
    /// A file part's headers were read.
    FileStart {
        /// Field name.
        name: String,
        /// Announced metadata.
        info: FileInfo,
    },
    /// A chunk of a file part's payload, in order.
    FileData {
        /// Field name.
        name: String,
        /// Payload bytes.
        chunk: Bytes,
    },
}

/// A decoded file upload. Immutable once decoding completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    name: String,
    data: Bytes,
    info: FileInfo,
}

impl FilePart {
    /// Field name the file was uploaded under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accumulated payload.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Original file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.info.filename
    }

    /// Transfer encoding.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.info.encoding
    }

    /// Declared MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.info.mime_type
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug)]
enum PartKind {
    Field { name: String, value: Vec<u8> },
    File { name: String },
    Skip,
}

#[derive(Debug)]
enum State {
    Preamble,
    AfterDelimiter,
    Headers,
    Body(PartKind),
    Done,
}

/// Push parser for `multipart/form-data` bodies.
#[derive(Debug)]
pub struct MultipartDecoder {
    delimiter: Vec<u8>,
    buf: BytesMut,
    state: State,
    max_field_bytes: usize,
}

impl MultipartDecoder {
    /// Create a decoder for `boundary`.
    #[must_use]
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary.as_bytes());

        // The first delimiter is not preceded by CRLF; seeding one lets every
        // delimiter be matched the same way.
        let mut buf = BytesMut::with_capacity(DEFAULT_CHUNK_SIZE);
        buf.extend_from_slice(b"\r\n");

        Self {
            delimiter,
            buf,
            state: State::Preamble,
            max_field_bytes: lambda_events_core::DEFAULT_MULTIPART_MAX_FIELD_BYTES,
        }
    }

    /// Limit the size of plain text fields.
    #[must_use]
    pub fn with_max_field_bytes(mut self, max_field_bytes: usize) -> Self {
        self.max_field_bytes = max_field_bytes;
        self
    }

    /// Whether the closing boundary has been seen.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Feed the next chunk of the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the framing is invalid or a limit is exceeded.
    pub fn write(&mut self, chunk: &[u8]) -> Result<Vec<MultipartEvent>, MultipartError> {
        if !self.is_done() {
            self.buf.extend_from_slice(chunk);
        }
        let mut events = Vec::new();
        self.drain(&mut events)?;
        Ok(events)
    }

    /// Signal end of input.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::UnexpectedEnd`] if the closing boundary was
    /// never seen.
    pub fn finish(&mut self) -> Result<Vec<MultipartEvent>, MultipartError> {
        let mut events = Vec::new();
        self.drain(&mut events)?;
        if self.is_done() {
            Ok(events)
        } else {
            Err(MultipartError::UnexpectedEnd)
        }
    }

    fn drain(&mut self, events: &mut Vec<MultipartEvent>) -> Result<(), MultipartError> {
        loop {
            let state = std::mem::replace(&mut self.state, State::Done);
            let (next, progressed) = self.step(state, events)?;
            self.state = next;
            if !progressed {
                return Ok(());
            }
        }
    }

    fn step(
        &mut self,
        state: State,
        events: &mut Vec<MultipartEvent>,
    ) -> Result<(State, bool), MultipartError> {
        match state {
            State::Preamble => Ok(self.skip_preamble()),
            State::AfterDelimiter => self.after_delimiter(),
            State::Headers => self.read_headers(events),
            State::Body(part) => self.read_body(part, events),
            State::Done => {
                self.buf.clear();
                Ok((State::Done, false))
            }
        }
    }

    fn skip_preamble(&mut self) -> (State, bool) {
        if let Some(pos) = find_bytes(&self.buf, &self.delimiter) {
            self.buf.advance(pos + self.delimiter.len());
            return (State::AfterDelimiter, true);
        }
        let keep = self.delimiter.len() - 1;
        if self.buf.len() > keep {
            let discard = self.buf.len() - keep;
            self.buf.advance(discard);
        }
        (State::Preamble, false)
    }

    fn after_delimiter(&mut self) -> Result<(State, bool), MultipartError> {
        if self.buf.len() < 2 {
            return Ok((State::AfterDelimiter, false));
        }
        if self.buf.starts_with(b"--") {
            debug!("reached closing multipart boundary");
            self.buf.clear();
            return Ok((State::Done, true));
        }
        let Some(pos) = find_bytes(&self.buf, b"\r\n") else {
            if self.buf.len() > MAX_HEADER_BYTES {
                return Err(MultipartError::Malformed(
                    "boundary line is not terminated".to_owned(),
                ));
            }
            return Ok((State::AfterDelimiter, false));
        };
        // Transport padding (linear whitespace) may follow a boundary.
        if !self.buf[..pos].iter().all(|b| *b == b' ' || *b == b'\t') {
            return Err(MultipartError::Malformed(
                "unexpected data after boundary".to_owned(),
            ));
        }
        self.buf.advance(pos + 2);
        Ok((State::Headers, true))
    }

    fn read_headers(
        &mut self,
        events: &mut Vec<MultipartEvent>,
    ) -> Result<(State, bool), MultipartError> {
        let headers = if self.buf.starts_with(b"\r\n") {
            self.buf.advance(2);
            Bytes::new()
        } else if let Some(pos) = find_bytes(&self.buf, b"\r\n\r\n") {
            let headers = self.buf.split_to(pos).freeze();
            self.buf.advance(4);
            headers
        } else {
            if self.buf.len() > MAX_HEADER_BYTES {
                return Err(MultipartError::HeaderTooLarge(MAX_HEADER_BYTES));
            }
            return Ok((State::Headers, false));
        };

        let disposition = parse_content_disposition(&headers);
        let part = match (disposition.name, disposition.filename) {
            (Some(name), Some(filename)) => {
                let info = FileInfo {
                    filename,
                    encoding: parse_header(&headers, "content-transfer-encoding")
                        .unwrap_or_else(|| DEFAULT_ENCODING.to_owned()),
                    mime_type: parse_header(&headers, "content-type")
                        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_owned()),
                };
                debug!(name, filename = %info.filename, "multipart file part started");
                events.push(MultipartEvent::FileStart {
                    name: name.clone(),
                    info,
                });
                PartKind::File { name }
            }
            (Some(name), None) => PartKind::Field {
                name,
                value: Vec::new(),
            },
            (None, _) => PartKind::Skip,
        };
        Ok((State::Body(part), true))
    }

    fn read_body(
        &mut self,
        mut part: PartKind,
        events: &mut Vec<MultipartEvent>,
    ) -> Result<(State, bool), MultipartError> {
        if let Some(pos) = find_bytes(&self.buf, &self.delimiter) {
            let data = self.buf.split_to(pos).freeze();
            self.buf.advance(self.delimiter.len());
            self.emit(&mut part, data, events)?;
            if let PartKind::Field { name, value } = part {
                events.push(MultipartEvent::Field {
                    name,
                    value: String::from_utf8_lossy(&value).into_owned(),
                });
            }
            return Ok((State::AfterDelimiter, true));
        }

        // Hold back enough bytes to recognize a delimiter split across writes.
        let safe = self.buf.len().saturating_sub(self.delimiter.len() - 1);
        if safe > 0 {
            let data = self.buf.split_to(safe).freeze();
            self.emit(&mut part, data, events)?;
        }
        Ok((State::Body(part), false))
    }

    fn emit(
        &self,
        part: &mut PartKind,
        data: Bytes,
        events: &mut Vec<MultipartEvent>,
    ) -> Result<(), MultipartError> {
        if data.is_empty() {
            return Ok(());
        }
        match part {
            PartKind::Field { name, value } => {
                if value.len() + data.len() > self.max_field_bytes {
                    return Err(MultipartError::FieldTooLarge {
                        name: name.clone(),
                        limit: self.max_field_bytes,
                    });
                }
                value.extend_from_slice(&data);
            }
            PartKind::File { name } => events.push(MultipartEvent::FileData {
                name: name.clone(),
                chunk: data,
            }),
            PartKind::Skip => {}
        }
        Ok(())
    }
}

/// Drive a [`MultipartDecoder`] from `reader`, handing every event to `on_event`.
///
/// # Errors
///
/// Returns the first decoder or read error. Events emitted before the error
/// have already been delivered.
pub async fn decode<R, F>(
    mut reader: R,
    boundary: &str,
    max_field_bytes: usize,
    mut on_event: F,
) -> Result<(), MultipartError>
where
    R: AsyncRead + Unpin,
    F: FnMut(MultipartEvent),
{
    let mut decoder = MultipartDecoder::new(boundary).with_max_field_bytes(max_field_bytes);
    let mut chunk = vec![0u8; DEFAULT_CHUNK_SIZE];
    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| MultipartError::Read(e.to_string()))?;
        if n == 0 {
            break;
        }
        decoder.write(&chunk[..n])?.into_iter().for_each(&mut on_event);
    }
    decoder.finish()?.into_iter().for_each(&mut on_event);
    Ok(())
}

/// Accumulates decoder events into plain fields and file parts.
///
/// A file part is created on its first payload byte; file fields that carry
/// no bytes never produce a [`FilePart`]. Repeated file fields with the same
/// name append to one part.
#[derive(Debug, Default)]
pub struct FormCollector {
    announced: HashMap<String, FileInfo>,
    files: HashMap<String, (FileInfo, BytesMut)>,
}

impl FormCollector {
    /// Apply one event. Returns the `(name, value)` pair for plain fields.
    pub fn apply(&mut self, event: MultipartEvent) -> Option<(String, String)> {
        match event {
            MultipartEvent::Field { name, value } => Some((name, value)),
            MultipartEvent::FileStart { name, info } => {
                self.announced.insert(name, info);
                None
            }
            MultipartEvent::FileData { name, chunk } => {
                let announced = &self.announced;
                let (_, data) = self.files.entry(name).or_insert_with_key(|name| {
                    let info = announced.get(name).cloned().unwrap_or_else(|| FileInfo {
                        filename: String::new(),
                        encoding: DEFAULT_ENCODING.to_owned(),
                        mime_type: DEFAULT_MIME_TYPE.to_owned(),
                    });
                    (info, BytesMut::new())
                });
                data.extend_from_slice(&chunk);
                None
            }
        }
    }

    /// Freeze the collected file parts.
    #[must_use]
    pub fn finish(self) -> HashMap<String, FilePart> {
        self.files
            .into_iter()
            .map(|(name, (info, data))| {
                let part = FilePart {
                    name: name.clone(),
                    data: data.freeze(),
                    info,
                };
                (name, part)
            })
            .collect()
    }
}

/// Parsed Content-Disposition parameters.
struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let headers_str = String::from_utf8_lossy(headers);
    let mut name = None;
    let mut filename = None;

    for line in headers_str.split("\r\n") {
        if !line.to_ascii_lowercase().starts_with("content-disposition:") {
            continue;
        }
        if let Some(n) = extract_param(line, "name") {
            name = Some(n);
        }
        if let Some(f) = extract_param(line, "filename") {
            filename = Some(f);
        }
    }

    ContentDisposition { name, filename }
}

/// Value of the header `name` (lowercase) in a part's header section.
fn parse_header(headers: &[u8], name: &str) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_owned())
            .filter(|v| !v.is_empty())
    })
}

/// Extract a `param="value"` or `param=value` parameter from a header line.
///
/// Matches whole parameter names only, so `name` does not match `filename`.
fn extract_param(header_line: &str, param_name: &str) -> Option<String> {
    let (_, params) = header_line.split_once(';')?;
    let mut rest = params;
    while !rest.is_empty() {
        let trimmed = rest.trim_start_matches([' ', '\t', ';']);
        let (key, after_key) = trimmed.split_once('=')?;
        let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
            let end = quoted.find('"')?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            let end = after_key.find(';').unwrap_or(after_key.len());
            (after_key[..end].trim(), &after_key[end..])
        };
        if key.trim().eq_ignore_ascii_case(param_name) {
            return Some(value.to_owned());
        }
        rest = remainder;
    }
    None
}

/// Find the position of a needle in a haystack.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

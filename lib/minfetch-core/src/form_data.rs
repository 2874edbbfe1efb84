//! Form data: multipart request bodies and parsed form responses.
//!
//! [`FormData`] is an ordered multimap of named entries. It is sent as a
//! `multipart/form-data` body and is also what
//! [`FetchResponse::form_data`](crate::FetchResponse::form_data) returns.
//!
//! # Example
//!
//! ```
//! use minfetch_core::FormData;
//!
//! let mut form = FormData::new();
//! form.set("foo", "bar");
//! form.append("baz", "1");
//! form.append("baz", "2");
//!
//! assert_eq!(form.get_all("baz").count(), 2);
//! assert_eq!(form.get("foo").and_then(|value| value.as_text()), Some("bar"));
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// An uploaded file inside a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl FormFile {
    /// File with a name; the content type is guessed from its extension.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename).to_string();
        Self {
            filename: Some(filename),
            content_type: Some(content_type),
            data: data.into(),
        }
    }

    /// Anonymous binary blob (`application/octet-stream`).
    #[must_use]
    pub fn blob(data: impl Into<Bytes>) -> Self {
        Self {
            filename: None,
            content_type: Some("application/octet-stream".to_string()),
            data: data.into(),
        }
    }

    /// Override the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// File name, if any.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// File content.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Value of a form entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Plain text field.
    Text(String),
    /// File field.
    File(FormFile),
}

impl FormValue {
    /// The text content, for text fields.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::File(_) => None,
        }
    }

    /// The file, for file fields.
    #[must_use]
    pub fn as_file(&self) -> Option<&FormFile> {
        match self {
            Self::Text(_) => None,
            Self::File(file) => Some(file),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<FormFile> for FormValue {
    fn from(value: FormFile) -> Self {
        Self::File(value)
    }
}

/// Ordered collection of form entries.
///
/// Equality compares entries only; the multipart boundary is an encoding
/// detail.
#[derive(Debug, Clone)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
    boundary: String,
}

impl PartialEq for FormData {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}

impl FormData {
    /// Empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Empty form with a fixed boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Builder-style [`FormData::append`] for a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value.into());
        self
    }

    /// Builder-style [`FormData::append`] for a file field.
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, file: FormFile) -> Self {
        self.append(name, file);
        self
    }

    /// Add an entry, keeping existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<FormValue>) -> &mut Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    /// Replace every entry named `name` with a single one.
    ///
    /// The new entry takes the position of the first replaced one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FormValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter().position(|(key, _)| *key == name) {
            Some(index) => {
                let mut current = 0;
                self.entries.retain(|(key, _)| {
                    let keep = *key != name || current == index;
                    current += 1;
                    keep
                });
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.1 = value;
                }
            }
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Remove every entry named `name`.
    pub fn delete(&mut self, name: &str) -> &mut Self {
        self.entries.retain(|(key, _)| key != name);
        self
    }

    /// First value named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// All values named `name`, in insertion order.
    pub fn get_all<'s, 'n>(&'s self, name: &'n str) -> impl Iterator<Item = &'s FormValue> + use<'s, 'n> {
        self.entries
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Whether an entry named `name` exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// All entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(String, FormValue)] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the form has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Multipart boundary.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode as a multipart body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for (name, value) in &self.entries {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
            buf.put_slice(name.as_bytes());
            buf.put_u8(b'"');

            match value {
                FormValue::Text(text) => {
                    buf.put_slice(b"\r\n\r\n");
                    buf.put_slice(text.as_bytes());
                }
                FormValue::File(file) => {
                    if let Some(filename) = &file.filename {
                        buf.put_slice(b"; filename=\"");
                        buf.put_slice(filename.as_bytes());
                        buf.put_u8(b'"');
                    }
                    if let Some(content_type) = &file.content_type {
                        buf.put_slice(b"\r\nContent-Type: ");
                        buf.put_slice(content_type.as_bytes());
                    }
                    buf.put_slice(b"\r\n\r\n");
                    buf.put_slice(&file.data);
                }
            }
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn from_url_encoded(body: &[u8]) -> Result<Self> {
        let pairs: Vec<(String, String)> =
            serde_html_form::from_bytes(body).map_err(|e| Error::parse(e.to_string()))?;

        let mut form = Self::new();
        for (name, value) in pairs {
            form.append(name, value);
        }
        Ok(form)
    }

    /// Parse a `multipart/form-data` body delimited by `boundary`.
    pub fn from_multipart(body: &[u8], boundary: &str) -> Result<Self> {
        let delimiter = format!("--{boundary}");
        let delimiter = delimiter.as_bytes();
        let mut form = Self::with_boundary(boundary);

        let start = find(body, delimiter)
            .ok_or_else(|| Error::parse("multipart body has no opening boundary"))?;
        let mut rest = body.get(start + delimiter.len()..).unwrap_or_default();

        loop {
            if rest.starts_with(b"--") {
                return Ok(form);
            }
            rest = rest
                .strip_prefix(b"\r\n")
                .ok_or_else(|| Error::parse("malformed multipart boundary line"))?;

            let end = find_closing(rest, delimiter)
                .ok_or_else(|| Error::parse("multipart body is not terminated"))?;
            let (part, tail) = rest.split_at(end);
            let (name, value) = parse_part(part)?;
            form.append(name, value);

            rest = tail.get(2 + delimiter.len()..).unwrap_or_default();
        }
    }
}

/// Position of `\r\n<delimiter>` closing the current part.
fn find_closing(haystack: &[u8], delimiter: &[u8]) -> Option<usize> {
    let mut needle = Vec::with_capacity(delimiter.len() + 2);
    needle.extend_from_slice(b"\r\n");
    needle.extend_from_slice(delimiter);
    find(haystack, &needle)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_part(part: &[u8]) -> Result<(String, FormValue)> {
    let split = find(part, b"\r\n\r\n")
        .ok_or_else(|| Error::parse("multipart part has no header section"))?;
    let (head, data) = part.split_at(split);
    let data = data.get(4..).unwrap_or_default();
    let head = std::str::from_utf8(head).map_err(|e| Error::parse(e.to_string()))?;

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in head.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if header.eq_ignore_ascii_case("content-disposition") {
            name = disposition_param(value, "name");
            filename = disposition_param(value, "filename");
        } else if header.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    let name = name.ok_or_else(|| Error::parse("multipart part has no name"))?;
    let value = if filename.is_some() || content_type.is_some() {
        FormValue::File(FormFile {
            filename,
            content_type,
            data: Bytes::copy_from_slice(data),
        })
    } else {
        let text = String::from_utf8(data.to_vec()).map_err(|e| Error::parse(e.to_string()))?;
        FormValue::Text(text)
    };

    Ok((name, value))
}

fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    disposition.split(';').skip(1).find_map(|param| {
        let (name, value) = param.trim().split_once('=')?;
        (name == key).then(|| value.trim_matches('"').to_string())
    })
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----MinFetchBoundary{timestamp:x}")
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn set_replaces_all_entries() {
        let mut form = FormData::new();
        form.append("baz", "1").append("foo", "x").append("baz", "2");

        form.set("baz", "3");

        let names: Vec<_> = form.entries().iter().map(|(k, _)| k.as_str()).collect();
        check!(names == ["baz", "foo"]);
        check!(form.get("baz").and_then(FormValue::as_text) == Some("3"));
    }

    #[test]
    fn lookups_outlive_the_name() {
        let form = FormData::new().text("tag", "a").text("tag", "b");

        let first = form.get(&String::from("tag"));
        let all: Vec<_> = form.get_all(&String::from("tag")).collect();

        check!(first.and_then(FormValue::as_text) == Some("a"));
        check!(all.len() == 2);
        check!(form.get("missing").is_none());
    }

    #[test]
    fn delete_and_has() {
        let mut form = FormData::new().text("a", "1").text("b", "2");
        form.delete("a");
        check!(!form.has("a"));
        check!(form.has("b"));
        check!(form.len() == 1);
    }

    #[test]
    fn file_content_type_is_guessed() {
        let file = FormFile::new("photo.JPG", vec![0xFF, 0xD8]);
        check!(file.content_type() == Some("image/jpeg"));
        check!(FormFile::new("data.xyz", "x").content_type() == Some("application/octet-stream"));
    }

    #[test]
    fn encode_text_and_file() {
        let form = FormData::with_boundary("boundary123")
            .text("field", "value")
            .file("upload", FormFile::new("test.txt", "file content"));

        let body = form.encode();
        let body = String::from_utf8_lossy(&body);

        check!(form.content_type() == "multipart/form-data; boundary=boundary123");
        check!(body.contains("--boundary123\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nvalue\r\n"));
        check!(body.contains("name=\"upload\"; filename=\"test.txt\"\r\nContent-Type: text/plain\r\n\r\nfile content\r\n"));
        check!(body.ends_with("--boundary123--\r\n"));
    }

    #[test]
    fn multipart_decodes_what_it_encodes() {
        let form = FormData::with_boundary("xyz")
            .text("foo", "bar")
            .text("baz", "1")
            .text("baz", "2")
            .file("avatar", FormFile::new("a.png", vec![0x89, 0x50]));

        let_assert!(Ok(decoded) = FormData::from_multipart(&form.encode(), "xyz"));

        check!(decoded == form);
    }

    #[test]
    fn multipart_without_boundary_fails() {
        let result = FormData::from_multipart(b"no boundary here", "xyz");
        let_assert!(Err(Error::Parse(_)) = result);
    }

    #[test]
    fn url_encoded_decodes_repeated_keys() {
        let_assert!(Ok(form) = FormData::from_url_encoded(b"foo=bar&baz=1&baz=2"));

        check!(form.get("foo").and_then(FormValue::as_text) == Some("bar"));
        let baz: Vec<_> = form.get_all("baz").filter_map(FormValue::as_text).collect();
        check!(baz == ["1", "2"]);
    }
}

//! Input URI dispatch and data-format resolution.
//!
//! An input string resolves to a byte stream plus a [`Format`]:
//! `http(s)://` URLs are fetched with a blocking GET, `data:` URIs decode
//! inline payloads, and everything else opens as a local file. The format
//! resolver combines the path extension with any media type seen along
//! the way; the media type wins when both are present.

use crate::iql::datasource::csv::CsvSource;
use crate::iql::datasource::html::HtmlSource;
use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::source::{ColumnSelector, Source};
use crate::iql::sql::scope::CancelToken;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use reqwest::StatusCode;
use std::fs::File;
use std::io::{Cursor, Read};
use url::Url;

/// Known external data formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Html,
}

/// Two-input format selector: a path extension and a media type. The
/// media type takes precedence when set.
#[derive(Debug, Default)]
pub struct Resolver {
    extension: Option<String>,
    media_type: Option<String>,
}

impl Resolver {
    /// Seeds the resolver from a file path's extension.
    pub fn resolve_path(&mut self, path: &str) {
        let name = path.rsplit('/').next().unwrap_or(path);
        if let Some((_, ext)) = name.rsplit_once('.') {
            if !ext.is_empty() {
                self.extension = Some(ext.to_ascii_lowercase());
            }
        }
    }

    /// Seeds the resolver from a media type; parameters after `;` are
    /// ignored.
    pub fn resolve_media_type(&mut self, media_type: &str) {
        let media_type = media_type
            .split(';')
            .next()
            .unwrap_or(media_type)
            .trim()
            .to_ascii_lowercase();
        if !media_type.is_empty() {
            self.media_type = Some(media_type);
        }
    }

    /// Resolves the format or fails with the unresolvable token.
    pub fn format(&self) -> SqlResult<Format> {
        let token = self
            .media_type
            .as_deref()
            .or(self.extension.as_deref())
            .unwrap_or("");
        match token {
            "text/csv" | "csv" => Ok(Format::Csv),
            "text/html" | "html" | "htm" => Ok(Format::Html),
            other => Err(SqlError::format_error(format!(
                "unknown data format '{}'",
                other
            ))),
        }
    }
}

/// Resolves an input string to a byte stream and its detected format.
pub fn open_input(input: &str, cancel: &CancelToken) -> SqlResult<(Box<dyn Read>, Format)> {
    let mut resolver = Resolver::default();
    let parsed = Url::parse(input);
    match &parsed {
        Ok(url) => resolver.resolve_path(url.path()),
        Err(_) => resolver.resolve_path(input),
    }

    if let Ok(url) = &parsed {
        match url.scheme() {
            "http" | "https" => return open_http(input, resolver, cancel),
            "data" => return open_data_uri(input, resolver),
            _ => {}
        }
    }

    let file = File::open(input)
        .map_err(|err| SqlError::io_error(format!("{}: {}", input, err)))?;
    let format = resolver.format()?;
    Ok((Box::new(file), format))
}

fn open_http(
    input: &str,
    mut resolver: Resolver,
    cancel: &CancelToken,
) -> SqlResult<(Box<dyn Read>, Format)> {
    cancel.check()?;
    let response = reqwest::blocking::get(input)?;
    if response.status() != StatusCode::OK {
        // Drain and close the body even on failure.
        let _ = response.bytes();
        return Err(SqlError::io_error(format!(
            "HTTP URL '{}' not found",
            input
        )));
    }
    if let Some(content_type) = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    {
        resolver.resolve_media_type(content_type);
    }
    let format = resolver.format()?;
    let body = response.bytes()?;
    debug!("GET {}: {} bytes", input, body.len());
    Ok((Box::new(Cursor::new(body.to_vec())), format))
}

/// `data:<media-type>[;<encoding>],<payload>` with raw or base64
/// payloads. The in-memory reader makes closing trivially idempotent.
fn open_data_uri(input: &str, mut resolver: Resolver) -> SqlResult<(Box<dyn Read>, Format)> {
    let idx = input
        .find(',')
        .ok_or_else(|| SqlError::parse_error(format!("malformed data URI: {}", input)))?;
    let payload = &input[idx + 1..];
    let mut content_type = &input["data:".len()..idx];
    let mut encoding = "";
    if let Some(semi) = content_type.find(';') {
        encoding = &content_type[semi + 1..];
        content_type = &content_type[..semi];
    }

    let decoded = match encoding {
        "base64" => BASE64.decode(payload.as_bytes())?,
        "" => payload.as_bytes().to_vec(),
        other => {
            return Err(SqlError::parse_error(format!(
                "unknown data URI encoding: {}",
                other
            )))
        }
    };

    resolver.resolve_media_type(content_type);
    let format = resolver.format()?;
    Ok((Box::new(Cursor::new(decoded)), format))
}

/// Creates a data source for the input URI, dispatching on the detected
/// format.
pub fn new_source(
    uri: &str,
    filter: &str,
    columns: Vec<ColumnSelector>,
) -> SqlResult<Box<dyn Source>> {
    new_source_with_cancel(uri, filter, columns, &CancelToken::new())
}

/// [`new_source`] with a cancel token attached to the owning scope.
pub fn new_source_with_cancel(
    uri: &str,
    filter: &str,
    columns: Vec<ColumnSelector>,
    cancel: &CancelToken,
) -> SqlResult<Box<dyn Source>> {
    let (input, format) = open_input(uri, cancel)?;
    match format {
        Format::Csv => Ok(Box::new(CsvSource::new(input, filter, columns, cancel)?)),
        Format::Html => Ok(Box::new(HtmlSource::new(
            vec![input],
            filter,
            columns,
            cancel,
        )?)),
    }
}

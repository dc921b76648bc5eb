//! CSV data source adapter.
//!
//! Parsing follows RFC-4180 semantics with a configurable delimiter.
//! Construction options arrive as space-separated `key=value` tokens in
//! the filter string: `skip=N`, `comma=C`, `comment=C` and
//! `headers=true|false`.

use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::source::{Column, ColumnSelector, Row, Source};
use crate::iql::sql::scope::CancelToken;
use log::debug;
use std::io::Read;

/// Parsed CSV construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CsvOptions {
    /// Leading banner lines to skip before parsing
    skip: usize,
    /// Field delimiter
    comma: u8,
    /// Comment byte; lines whose first non-whitespace byte matches are
    /// dropped
    comment: Option<u8>,
    /// First parsed record provides header names
    headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            skip: 0,
            comma: b',',
            comment: None,
            headers: false,
        }
    }
}

impl CsvOptions {
    fn parse(filter: &str) -> SqlResult<CsvOptions> {
        let mut options = CsvOptions::default();
        for token in filter.split_whitespace() {
            let (key, value) = token.split_once('=').ok_or_else(|| {
                SqlError::parse_error(format!("malformed csv option '{}'", token))
            })?;
            match key {
                "skip" => {
                    options.skip = value.parse().map_err(|_| {
                        SqlError::parse_error(format!("invalid skip count '{}'", value))
                    })?;
                }
                "comma" => options.comma = single_byte(key, value)?,
                "comment" => options.comment = Some(single_byte(key, value)?),
                "headers" => {
                    options.headers = value.parse().map_err(|_| {
                        SqlError::parse_error(format!("invalid headers value '{}'", value))
                    })?;
                }
                _ => {
                    return Err(SqlError::parse_error(format!(
                        "unknown csv option '{}'",
                        key
                    )))
                }
            }
        }
        Ok(options)
    }
}

fn single_byte(key: &str, value: &str) -> SqlResult<u8> {
    match value.as_bytes() {
        [b] => Ok(*b),
        _ => Err(SqlError::parse_error(format!(
            "csv option '{}' takes a single character, got '{}'",
            key, value
        ))),
    }
}

/// A materialized CSV data source.
#[derive(Debug)]
pub struct CsvSource {
    columns: Vec<ColumnSelector>,
    rows: Vec<Row>,
}

impl CsvSource {
    /// Drains the input, parses it with the configured options and
    /// projects the selected columns. Header-name references that do not
    /// resolve fail here, before any row is produced.
    pub fn new(
        mut input: Box<dyn Read>,
        filter: &str,
        columns: Vec<ColumnSelector>,
        cancel: &CancelToken,
    ) -> SqlResult<CsvSource> {
        let options = CsvOptions::parse(filter)?;

        cancel.check()?;
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        let body = strip_preamble(&text, &options);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.comma)
            .has_headers(false)
            .flexible(true)
            .from_reader(body.as_bytes());
        let mut records = reader.records();

        let mut headers: Vec<String> = Vec::new();
        if options.headers {
            if let Some(record) = records.next() {
                headers = record?.iter().map(str::to_string).collect();
            }
        }

        let mut columns = columns;
        let mut indices = Vec::with_capacity(columns.len());
        for selector in &columns {
            let index = match selector.name.column.parse::<usize>() {
                Ok(index) => index,
                Err(_) => headers
                    .iter()
                    .position(|header| *header == selector.name.column)
                    .ok_or_else(|| {
                        SqlError::parse_error(format!("unknown column '{}'", selector.name))
                    })?,
            };
            indices.push(index);
        }

        let mut rows = Vec::new();
        for record in records {
            cancel.check()?;
            let record = record?;
            let mut row = Vec::with_capacity(indices.len());
            for (selector_idx, &field_idx) in indices.iter().enumerate() {
                let cell = record.get(field_idx).unwrap_or("").to_string();
                columns[selector_idx].resolve_type(&cell);
                row.push(Column::String(cell));
            }
            rows.push(row);
        }
        debug!("csv: {} rows, {} columns", rows.len(), columns.len());

        Ok(CsvSource { columns, rows })
    }
}

impl Source for CsvSource {
    fn columns(&self) -> &[ColumnSelector] {
        &self.columns
    }

    fn get(&mut self) -> SqlResult<Vec<Row>> {
        Ok(self.rows.clone())
    }
}

/// Drops the `skip` leading lines and any comment lines. Quote parity is
/// tracked so that newlines inside quoted fields are never treated as
/// line starts.
fn strip_preamble(text: &str, options: &CsvOptions) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    let mut skipped = 0;

    for line in text.split_inclusive('\n') {
        if !in_quotes {
            if skipped < options.skip {
                skipped += 1;
                continue;
            }
            if let Some(comment) = options.comment {
                let first = line.trim_start_matches([' ', '\t']).bytes().next();
                if first == Some(comment) {
                    continue;
                }
            }
        }
        out.push_str(line);
        for byte in line.bytes() {
            if byte == b'"' {
                in_quotes = !in_quotes;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iql::sql::execution::source::{ColumnType, Reference};
    use std::io::Cursor;

    fn selectors(names: &[(&str, &str)]) -> Vec<ColumnSelector> {
        names
            .iter()
            .map(|(name, alias)| ColumnSelector::new(Reference::column(*name), *alias))
            .collect()
    }

    fn input(text: &str) -> Box<dyn Read> {
        Box::new(Cursor::new(text.to_string().into_bytes()))
    }

    #[test]
    fn test_options_parse() {
        let options = CsvOptions::parse("skip=1 comma=;  comment=# ").unwrap();
        assert_eq!(
            options,
            CsvOptions {
                skip: 1,
                comma: b';',
                comment: Some(b'#'),
                headers: false,
            }
        );

        assert_eq!(CsvOptions::parse("").unwrap(), CsvOptions::default());

        let err = CsvOptions::parse("sep=;").unwrap_err();
        assert_eq!(err.to_string(), "parse error: unknown csv option 'sep'");

        assert!(CsvOptions::parse("comma=ab").is_err());
        assert!(CsvOptions::parse("skip").is_err());
    }

    #[test]
    fn test_positional_projection() {
        let cancel = CancelToken::new();
        let source = CsvSource::new(
            input("10,100\n20,200\n30,300\n"),
            "",
            selectors(&[("0", "Share"), ("1", "Count")]),
            &cancel,
        )
        .unwrap();
        let mut source = source;
        let rows = source.get().unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), source.columns().len());
        }
        assert_eq!(rows[0][0], Column::String("10".to_string()));
        assert_eq!(source.columns()[0].typ, ColumnType::Int);
    }

    #[test]
    fn test_options_skip_comma_comment() {
        let text = "banner line to ignore\n\
                    # comment\n\
                    1970;100;100.5\n\
                    1971;200;200.5\n\
                    # another comment\n\
                    1972;300;300.5\n";
        let cancel = CancelToken::new();
        let mut source = CsvSource::new(
            input(text),
            "skip=1 comma=; comment=#",
            selectors(&[("0", "Year"), ("1", "Value"), ("2", "Delta")]),
            &cancel,
        )
        .unwrap();
        let rows = source.get().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][0], Column::String("1972".to_string()));
        assert_eq!(source.columns()[0].typ, ColumnType::Int);
        assert_eq!(source.columns()[1].typ, ColumnType::Int);
        assert_eq!(source.columns()[2].typ, ColumnType::Float);
    }

    #[test]
    fn test_header_projection() {
        let text = "Year,IVal,FVal\n1970,100,100.5\n1971,200,200.5\n";
        let cancel = CancelToken::new();
        let mut source = CsvSource::new(
            input(text),
            "headers=true",
            selectors(&[("Year", ""), ("FVal", "")]),
            &cancel,
        )
        .unwrap();
        let rows = source.get().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], Column::String("100.5".to_string()));
        assert_eq!(source.columns()[1].typ, ColumnType::Float);
    }

    #[test]
    fn test_unknown_header_fails_at_construction() {
        let text = "Year,IVal\n1970,100\n";
        let cancel = CancelToken::new();
        let err = CsvSource::new(
            input(text),
            "headers=true",
            selectors(&[("Missing", "")]),
            &cancel,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "parse error: unknown column 'Missing'");
    }

    #[test]
    fn test_quoted_fields() {
        let text = "\"a,b\",\"line\nbreak\",\"quote\"\"inside\"\n";
        let cancel = CancelToken::new();
        let mut source = CsvSource::new(
            input(text),
            "",
            selectors(&[("0", ""), ("1", ""), ("2", "")]),
            &cancel,
        )
        .unwrap();
        let rows = source.get().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Column::String("a,b".to_string()));
        assert_eq!(rows[0][1], Column::String("line\nbreak".to_string()));
        assert_eq!(rows[0][2], Column::String("quote\"inside".to_string()));
    }

    #[test]
    fn test_empty_cells_stay_untyped() {
        let text = "1,\n2,\n";
        let cancel = CancelToken::new();
        let mut source = CsvSource::new(
            input(text),
            "",
            selectors(&[("0", ""), ("1", "")]),
            &cancel,
        )
        .unwrap();
        let rows = source.get().unwrap();
        assert_eq!(rows[0][1], Column::String(String::new()));
        // Empty values never promote the type ladder.
        assert_eq!(source.columns()[1].typ, ColumnType::Bool);
    }

    #[test]
    fn test_cancelled_ingest_aborts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = CsvSource::new(input("1,2\n"), "", selectors(&[("0", "")]), &cancel);
        assert!(result.is_err());
    }
}

//! HTML data source adapter.
//!
//! The filter string is a CSS selector naming row-level elements; each
//! column's reference is itself a CSS selector evaluated inside the
//! matched row element.

use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::source::{Column, ColumnSelector, Row, Source};
use crate::iql::sql::scope::CancelToken;
use log::debug;
use scraper::{ElementRef, Html, Selector};
use std::io::Read;

/// A materialized HTML data source.
#[derive(Debug)]
pub struct HtmlSource {
    columns: Vec<ColumnSelector>,
    rows: Vec<Row>,
}

impl HtmlSource {
    /// Parses every input document and collects one row per filter
    /// match. Explicit columns are required; `SELECT *` has no meaning
    /// for HTML input.
    pub fn new(
        inputs: Vec<Box<dyn Read>>,
        filter: &str,
        columns: Vec<ColumnSelector>,
        cancel: &CancelToken,
    ) -> SqlResult<HtmlSource> {
        if columns.is_empty() {
            return Err(SqlError::parse_error("html: 'SELECT *' not supported"));
        }

        let row_selector = parse_selector(filter)?;
        let cell_selectors = columns
            .iter()
            .map(|selector| parse_selector(&selector.name.column))
            .collect::<SqlResult<Vec<Selector>>>()?;

        let mut columns = columns;
        let mut rows = Vec::new();
        for mut input in inputs {
            cancel.check()?;
            let mut text = String::new();
            input.read_to_string(&mut text)?;
            let document = Html::parse_document(&text);

            for element in document.select(&row_selector) {
                cancel.check()?;
                let mut row = Vec::with_capacity(cell_selectors.len());
                for (idx, cell_selector) in cell_selectors.iter().enumerate() {
                    let cell = extract_cell(element, cell_selector);
                    columns[idx].resolve_type(&cell.to_string());
                    row.push(cell);
                }
                rows.push(row);
            }
        }
        debug!("html: {} rows, {} columns", rows.len(), columns.len());

        Ok(HtmlSource { columns, rows })
    }
}

/// Cell rules by match count: none yields an empty scalar, one yields
/// the trimmed text, several yield a multi-valued cell with untrimmed
/// per-element text.
fn extract_cell(row: ElementRef, selector: &Selector) -> Column {
    let matches: Vec<ElementRef> = row.select(selector).collect();
    match matches.len() {
        0 => Column::String(String::new()),
        1 => Column::String(element_text(&matches[0]).trim().to_string()),
        _ => Column::Strings(matches.iter().map(element_text).collect()),
    }
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect()
}

fn parse_selector(input: &str) -> SqlResult<Selector> {
    Selector::parse(input).map_err(|err| {
        SqlError::parse_error(format!("invalid selector '{}': {:?}", input, err))
    })
}

impl Source for HtmlSource {
    fn columns(&self) -> &[ColumnSelector] {
        &self.columns
    }

    fn get(&mut self) -> SqlResult<Vec<Row>> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iql::sql::execution::source::{ColumnType, Reference};
    use std::io::Cursor;

    const DOC: &str = r#"<html><body><table>
<tr><td class="year"> 1970 </td><td class="val">100</td></tr>
<tr><td class="year">1971</td><td class="val">200</td><td class="val">201</td></tr>
<tr><td class="year">1972</td></tr>
</table></body></html>"#;

    fn inputs(text: &str) -> Vec<Box<dyn Read>> {
        vec![Box::new(Cursor::new(text.to_string().into_bytes())) as Box<dyn Read>]
    }

    fn selectors(names: &[&str]) -> Vec<ColumnSelector> {
        names
            .iter()
            .map(|name| ColumnSelector::new(Reference::column(*name), ""))
            .collect()
    }

    #[test]
    fn test_rows_and_cell_rules() {
        let cancel = CancelToken::new();
        let mut source = HtmlSource::new(
            inputs(DOC),
            "tr",
            selectors(&["td.year", "td.val"]),
            &cancel,
        )
        .unwrap();
        let rows = source.get().unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), source.columns().len());
        }

        // Single match: trimmed text.
        assert_eq!(rows[0][0], Column::String("1970".to_string()));
        assert_eq!(rows[0][1], Column::String("100".to_string()));

        // Multiple matches: multi-valued, untrimmed.
        assert_eq!(
            rows[1][1],
            Column::Strings(vec!["200".to_string(), "201".to_string()])
        );

        // No match: empty scalar.
        assert_eq!(rows[2][1], Column::String(String::new()));
    }

    #[test]
    fn test_type_inference_per_cell() {
        let cancel = CancelToken::new();
        let source = HtmlSource::new(
            inputs(DOC),
            "tr",
            selectors(&["td.year", "td.val"]),
            &cancel,
        )
        .unwrap();
        assert_eq!(source.columns()[0].typ, ColumnType::Int);
        // The multi-valued cell's display form is not numeric.
        assert_eq!(source.columns()[1].typ, ColumnType::String);
    }

    #[test]
    fn test_select_star_rejected() {
        let cancel = CancelToken::new();
        let err = HtmlSource::new(inputs(DOC), "tr", Vec::new(), &cancel).unwrap_err();
        assert_eq!(err.to_string(), "parse error: html: 'SELECT *' not supported");
    }

    #[test]
    fn test_invalid_selector() {
        let cancel = CancelToken::new();
        let result = HtmlSource::new(inputs(DOC), "tr[", selectors(&["td"]), &cancel);
        assert!(result.is_err());
    }

    #[test]
    fn test_multiple_inputs_concatenate() {
        let cancel = CancelToken::new();
        let mut all = inputs(DOC);
        all.extend(inputs(DOC));
        let mut source =
            HtmlSource::new(all, "tr", selectors(&["td.year"]), &cancel).unwrap();
        assert_eq!(source.get().unwrap().len(), 6);
    }
}

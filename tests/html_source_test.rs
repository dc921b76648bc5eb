/*!
HTML adapter tests through the public URI dispatch API.

Rows come from a CSS selector over the document; each column is a CSS
selector evaluated inside the row element. Covers the 0/1/n match cell
rules and query composition over an HTML source.
*/

use iql::iql::datasource::new_source;
use iql::iql::sql::execution::{FromBinding, Query, SelectItem};
use iql::iql::sql::scope::Scope;
use iql::{Column, ColumnSelector, ColumnType, Expr, Reference, Source};

const DOC: &str = "<html><body><table>\
<tr><td class='year'> 1970 </td><td class='val'>100</td></tr>\
<tr><td class='year'>1971</td><td class='val'>200</td><td class='val'>201</td></tr>\
<tr><td class='year'>1972</td></tr>\
</table></body></html>";

fn doc_uri() -> String {
    format!("data:text/html,{}", DOC)
}

fn selectors(specs: &[(&str, &str)]) -> Vec<ColumnSelector> {
    specs
        .iter()
        .map(|(selector, alias)| ColumnSelector::new(Reference::column(*selector), *alias))
        .collect()
}

#[test]
fn test_cell_rules() {
    let mut source = new_source(
        &doc_uri(),
        "tr",
        selectors(&[("td.year", "Year"), ("td.val", "Value")]),
    )
    .unwrap();

    let rows = source.get().unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.len(), source.columns().len());
    }

    // One match: trimmed scalar text.
    assert_eq!(rows[0][0], Column::String("1970".to_string()));

    // Several matches: untrimmed multi-valued cell.
    assert_eq!(
        rows[1][1],
        Column::Strings(vec!["200".to_string(), "201".to_string()])
    );

    // No match: empty scalar.
    assert_eq!(rows[2][1], Column::String(String::new()));
}

#[test]
fn test_select_star_rejected() {
    let err = new_source(&doc_uri(), "tr", Vec::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "parse error: html: 'SELECT *' not supported"
    );
}

#[test]
fn test_query_over_html_source() {
    let source = new_source(&doc_uri(), "tr", selectors(&[("td.year", "Year")])).unwrap();
    let scope = Scope::new();
    let mut query = Query::new(
        vec![SelectItem::new(
            Expr::function("MAX", vec![Expr::column("Year")]),
            "",
        )],
        vec![FromBinding::new(None, source)],
        None,
        scope,
    )
    .unwrap();

    let rows = query.get().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0].to_string(), "1972");
}

#[test]
fn test_type_inference() {
    let source = new_source(
        &doc_uri(),
        "tr",
        selectors(&[("td.year", "Year"), ("td.val", "Value")]),
    )
    .unwrap();

    assert_eq!(source.columns()[0].typ, ColumnType::Int);
    // The multi-valued display form demotes the column to string.
    assert_eq!(source.columns()[1].typ, ColumnType::String);
}

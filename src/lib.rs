//! IQL: a SQL-style query language over CSV and HTML data sources.
//!
//! The engine runs read-only queries over heterogeneous tabular inputs
//! (CSV streams, HTML documents, data URIs, HTTP resources) and produces
//! typed row sets that compose as inputs to further queries.

pub mod iql;

// Re-export main API
pub use iql::datasource::{new_source, Format};
pub use iql::sql::{
    init_system_variables, Column, ColumnSelector, ColumnType, Expr, Query, Reference, Row, Scope,
    Source, SqlError, SqlResult, Type, Value,
};

// Version and feature info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FEATURES: &[&str] = &[
    "csv_sources",        // RFC-4180 CSV with delimiter/comment/header options
    "html_sources",       // CSS-selector row and cell extraction
    "data_uris",          // inline raw and base64 payloads
    "http_sources",       // blocking GET with media-type detection
    "type_inference",     // per-column most-specific-type resolution
    "string_functions",   // CHARINDEX, STUFF, SUBSTRING, CONCAT, BASE64ENC, ...
    "datetime_functions", // GETDATE, YEAR, MONTH, DAY, DATEDIFF
    "aggregate_functions", // AVG, COUNT, MAX, MIN, SUM
    "system_variables",   // ARGS, REALFMT, TABLEFMT, TERMOUT
];

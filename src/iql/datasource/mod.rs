//! Data source adapters and input dispatch.

pub mod csv;
pub mod html;
pub mod uri;

pub use csv::CsvSource;
pub use html::HtmlSource;
pub use uri::{new_source, new_source_with_cancel, open_input, Format, Resolver};

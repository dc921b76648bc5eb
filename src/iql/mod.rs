pub mod datasource;
pub mod sql;

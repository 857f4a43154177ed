mod backend;
mod catalog;
mod coerce;
mod error;
mod rules;
mod sql;
mod types;
mod writer;

pub use backend::{Backend, MemoryBackend, MemoryStore, PgBackend, SharedStore};
pub use catalog::{
    Catalog, FieldSpec, FieldType, KeyPolicy, ReferenceEdge, TableSpec, gtfs_editor_catalog,
};
pub use error::{EditorError, error_code};
pub use types::{
    SqlValue, format_service_date, format_time_of_day, parse_service_date, parse_time_of_day,
};
pub use writer::EntityWriter;

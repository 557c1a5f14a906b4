//! Dataset loading and the typed, read-only table view.

mod loader;
mod table;

pub use loader::{LoadStats, Loader, LoaderConfig};
pub use table::{
    ColumnDescriptor, ColumnKind, DataTable, Row, Value, format_number, is_null_token,
    parse_decimal,
};

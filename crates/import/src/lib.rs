pub mod date;
pub mod dedup;
pub mod dialect;
pub mod parser;
pub mod record;

pub use dialect::{ColumnKind, Dialect, DialectSpec, Registry, RegistryError};
pub use parser::{ParseError, ParseOutcome, Parser};
pub use record::RowError;

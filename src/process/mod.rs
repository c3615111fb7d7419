// src/process/mod.rs
pub mod clean;
pub mod convert;
pub mod date_parser;
pub mod filter;
pub mod reader;
pub mod schema;
pub mod utils;
pub mod writer;

pub use clean::{clean, CleanParams};
pub use filter::PriceRange;
pub use reader::{deserialize, deserialize_with_schema, read_csv_file};
pub use writer::{serialize, write_csv_file};

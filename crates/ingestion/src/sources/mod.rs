//! Concrete source adapters and the parsing helpers they share.

pub mod iem;
pub mod keystone;
pub mod station_file;

mod asos_csv;
mod table;

pub use asos_csv::{parse_asos_csv, ParsedFeed};
pub use keystone::parse_feature_collection;

//! Common types and utilities shared across the mesonet fusion crates.

pub mod bbox;
pub mod error;
pub mod geo;
pub mod reading;
pub mod region;
pub mod units;

pub use bbox::BoundingBox;
pub use error::{WxError, WxResult};
pub use geo::{haversine_km, GeoPoint};
pub use reading::{SourceId, StationReading, Variable};
pub use region::Region;

pub mod aggregate;
pub mod error;
pub mod locate_station;

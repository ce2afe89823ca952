pub mod clusters;
pub mod error;

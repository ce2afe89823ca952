pub mod accommodation;
pub mod attendance;
pub mod cluster;
pub mod period;
pub mod station;

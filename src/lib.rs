pub mod fence;
pub mod geocoding;
pub mod geodesy;
pub mod resolution;
pub mod server;

pub mod params;
pub mod session;

pub mod driver;
pub mod model;
pub mod plot;
pub mod upscale;

pub mod errors;
pub mod image;
pub mod models;
pub mod paths;
pub mod services;
pub mod store;

pub use errors::*;
pub use image::*;
pub use models::*;
pub use services::*;
pub use store::*;

pub mod common;
pub mod events;
pub mod image;
pub mod outline;
pub mod request;
pub mod slide;
pub mod storage;

pub use common::*;
pub use events::*;
pub use image::*;
pub use outline::*;
pub use request::*;
pub use slide::*;
pub use storage::*;

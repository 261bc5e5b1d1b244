pub mod folder;
pub mod media_store;
pub mod video;

pub use folder::*;
pub use media_store::*;
pub use video::*;

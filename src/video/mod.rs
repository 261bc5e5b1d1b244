pub mod player;
pub mod status;

pub use player::VideoPlayer;
pub use status::{PlayerProbe, PlayerStatus};

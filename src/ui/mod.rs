pub mod keybindings;
pub mod player_screen;
pub mod tiles;
pub mod window;

pub use window::MainWindow;

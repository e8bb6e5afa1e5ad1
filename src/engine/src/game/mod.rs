pub mod bank;
pub mod grid;
pub mod state;
pub mod tile;
pub mod words;

pub use bank::Bank;
pub use grid::{BoardWire, Grid};
pub use state::{GameState, Location};
pub use tile::{Pos, Tile};
pub use words::Word;

//! Grid-based landscape and burn state

pub mod grid_state;
pub mod landscape;

// Re-export main types
pub use grid_state::{BurnRecord, CellStatus, GridState, IgnitionSource};
pub use landscape::{FuelCell, Landscape};

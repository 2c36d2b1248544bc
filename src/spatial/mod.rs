mod cell;
mod stacked;

pub use cell::{Cell, FLIP_D, FLIP_H, FLIP_V, GID_MASK};
pub use stacked::StackedGrid;

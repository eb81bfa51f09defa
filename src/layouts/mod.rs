mod layout;

pub mod force_directed;
pub mod hierarchical;

pub use layout::{AnimatedState, Layout, LayoutState};

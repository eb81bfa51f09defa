mod layout;

pub use layout::{ForceDirected, State};

mod layout;

pub use layout::{Hierarchical, State};

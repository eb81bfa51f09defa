mod drawer;

pub use drawer::{DrawContext, Drawer};

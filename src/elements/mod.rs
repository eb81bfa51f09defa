mod edge;
mod node;

pub use edge::CallEdge;
pub use node::{Address, FunctionNode};

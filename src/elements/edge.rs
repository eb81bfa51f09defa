use serde::{Deserialize, Serialize};

use super::Address;

/// A call relation between two functions.
///
/// Endpoints are addresses, not graph indices, so an edge stays meaningful
/// across graph rebuilds that reassign indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    from: Address,
    to: Address,
}

impl CallEdge {
    pub fn new(from: Address, to: Address) -> Self {
        Self { from, to }
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Address {
        self.to
    }
}

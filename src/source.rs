use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elements::Address;

/// Function metadata as reported by the data source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub address: Address,
    pub name: String,
    pub size: u32,
}

/// Capability interface to the call-graph data source.
///
/// Any producer of caller/callee relations can implement this: a static
/// binary analysis, a DWARF-derived call graph, a profiler trace. Queries are
/// synchronous and may be issued many times per graph rebuild, so
/// implementations should be cheap or memoized.
pub trait CallSource {
    fn function_count(&self) -> usize;

    fn function_at(&self, index: usize) -> Option<FunctionInfo>;

    /// Resolves an address to the function containing it, if any.
    fn function_info(&self, address: Address) -> Option<FunctionInfo>;

    /// Addresses of functions calling `address`. May contain duplicates
    /// (one per call site); callers deduplicate.
    fn callers_of(&self, address: Address) -> Vec<Address>;

    /// Addresses of functions called by `address`. May contain duplicates.
    fn callees_of(&self, address: Address) -> Vec<Address>;

    /// Total caller + callee count, used for hub detection.
    fn xref_count(&self, address: Address) -> usize {
        self.callers_of(address).len() + self.callees_of(address).len()
    }
}

/// In-memory [`CallSource`] built from explicit function and call lists.
/// Useful for demos and as a test fixture.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    functions: Vec<FunctionInfo>,
    by_address: BTreeMap<Address, usize>,
    callers: BTreeMap<Address, Vec<Address>>,
    callees: BTreeMap<Address, Vec<Address>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, address: Address, name: impl Into<String>, size: u32) {
        if self.by_address.contains_key(&address) {
            return;
        }
        self.by_address.insert(address, self.functions.len());
        self.functions.push(FunctionInfo {
            address,
            name: name.into(),
            size,
        });
    }

    /// Records a call relation. Both endpoints must already be registered;
    /// unknown endpoints are ignored.
    pub fn add_call(&mut self, from: Address, to: Address) {
        if !self.by_address.contains_key(&from) || !self.by_address.contains_key(&to) {
            return;
        }
        self.callees.entry(from).or_default().push(to);
        self.callers.entry(to).or_default().push(from);
    }
}

impl CallSource for StaticSource {
    fn function_count(&self) -> usize {
        self.functions.len()
    }

    fn function_at(&self, index: usize) -> Option<FunctionInfo> {
        self.functions.get(index).cloned()
    }

    /// Containing-function lookup: the greatest start address at or below
    /// `address` whose size covers it. An exact start address always matches.
    fn function_info(&self, address: Address) -> Option<FunctionInfo> {
        let (&start, &i) = self.by_address.range(..=address).next_back()?;
        let info = &self.functions[i];
        if start == address || address < start + u64::from(info.size) {
            Some(info.clone())
        } else {
            None
        }
    }

    fn callers_of(&self, address: Address) -> Vec<Address> {
        self.callers.get(&address).cloned().unwrap_or_default()
    }

    fn callees_of(&self, address: Address) -> Vec<Address> {
        self.callees.get(&address).cloned().unwrap_or_default()
    }
}

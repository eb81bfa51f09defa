use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A function address. Opaque 64-bit key, unique per node.
pub type Address = u64;

/// Stores properties of a function node.
///
/// The address is immutable once created; position and velocity mutate every
/// simulation step. Distance fields are recomputed wholesale on every
/// selection or filter change and are `-1` while unset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionNode {
    address: Address,
    name: String,
    size: u32,

    caller_count: u32,
    callee_count: u32,

    pos: Vec3,
    vel: Vec3,

    /// BFS distance from the selected node, -1 if not computed.
    graph_distance: i32,
    /// BFS distance from the nearest followed node, -1 if not computed.
    follow_distance: i32,

    hub: bool,
    followed: bool,

    /// 0..=1 relative to the selected node.
    importance: f32,
    opacity: f32,
    scale: f32,
}

impl FunctionNode {
    pub fn new(address: Address, name: impl Into<String>, size: u32) -> Self {
        Self {
            address,
            name: name.into(),
            size,
            caller_count: 0,
            callee_count: 0,
            pos: Vec3::ZERO,
            vel: Vec3::ZERO,
            graph_distance: -1,
            follow_distance: -1,
            hub: false,
            followed: false,
            importance: 0.,
            opacity: 1.,
            scale: 1.,
        }
    }

    /// Sets caller/callee counts and derives the visual scale from
    /// connectivity.
    pub fn with_xrefs(mut self, caller_count: u32, callee_count: u32) -> Self {
        self.caller_count = caller_count;
        self.callee_count = callee_count;
        let connectivity = (caller_count + callee_count) as f32;
        self.scale = 0.8 + (connectivity / 20.).min(2.);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn caller_count(&self) -> u32 {
        self.caller_count
    }

    pub fn callee_count(&self) -> u32 {
        self.callee_count
    }

    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    pub fn set_pos(&mut self, pos: Vec3) {
        self.pos = pos;
    }

    pub fn vel(&self) -> Vec3 {
        self.vel
    }

    pub fn set_vel(&mut self, vel: Vec3) {
        self.vel = vel;
    }

    pub fn graph_distance(&self) -> i32 {
        self.graph_distance
    }

    pub fn set_graph_distance(&mut self, d: i32) {
        self.graph_distance = d;
    }

    pub fn follow_distance(&self) -> i32 {
        self.follow_distance
    }

    pub fn set_follow_distance(&mut self, d: i32) {
        self.follow_distance = d;
    }

    pub fn is_hub(&self) -> bool {
        self.hub
    }

    pub fn set_hub(&mut self, hub: bool) {
        self.hub = hub;
    }

    pub fn followed(&self) -> bool {
        self.followed
    }

    pub fn set_followed(&mut self, followed: bool) {
        self.followed = followed;
    }

    pub fn importance(&self) -> f32 {
        self.importance
    }

    pub fn set_importance(&mut self, importance: f32) {
        self.importance = importance;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_derives_from_connectivity() {
        let n = FunctionNode::new(0x1000, "main", 64).with_xrefs(0, 0);
        assert!((n.scale() - 0.8).abs() < 1e-6);

        // Connectivity is capped so hubs do not dwarf everything else.
        let hub = FunctionNode::new(0x2000, "memcpy", 32).with_xrefs(500, 0);
        assert!((hub.scale() - 2.8).abs() < 1e-6);
    }

    #[test]
    fn distances_start_unset() {
        let n = FunctionNode::new(0x1000, "main", 64);
        assert_eq!(n.graph_distance(), -1);
        assert_eq!(n.follow_distance(), -1);
    }
}

use std::fmt::Debug;

use crate::graph::CallGraph;

/// State carried between layout invocations. Owned by the controller and
/// handed to the layout on every frame.
pub trait LayoutState: Clone + Default + Debug {}

/// Optional hooks for animated/simulated layout states, letting callers
/// observe and drive the simulation lifecycle.
pub trait AnimatedState {
    fn is_running(&self) -> bool;
    fn set_running(&mut self, v: bool);

    /// Total simulation steps performed since the last restart.
    fn step_count(&self) -> u32 {
        0
    }

    fn set_step_count(&mut self, _v: u32) {}
}

pub trait Layout<S>: Default
where
    S: LayoutState,
{
    /// Creates a layout from its state. State is reloaded and stored back on
    /// every frame.
    fn from_state(state: S) -> Self;

    /// Called once per frame; advances node positions.
    fn next(&mut self, g: &mut CallGraph);

    /// Returns the current state of the layout.
    fn state(&self) -> S;
}

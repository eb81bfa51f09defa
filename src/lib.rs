mod camera;
mod controller;
mod draw;
mod elements;
mod events;
mod filter;
mod graph;
mod loader;
mod settings;
mod source;
mod view;

pub mod layouts;

pub use self::camera::{Camera, OrthoCamera, Projector};
pub use self::controller::{FrameMetrics, GraphController, LayoutKind};
pub use self::draw::{DrawContext, Drawer};
pub use self::elements::{Address, CallEdge, FunctionNode};
pub use self::events::{
    Event, EventSink, PayloadFollowToggle, PayloadLockChange, PayloadNavigateTo,
    PayloadNodeDeselect, PayloadNodeHoverEnter, PayloadNodeHoverLeave, PayloadNodeSelect,
};
pub use self::filter::{filter_by_depth, identity_copy};
pub use self::graph::CallGraph;
pub use self::loader::{
    build_full_graph, load_neighbors, NeighborLoad, HUB_XREF_THRESHOLD, MAX_NODES,
};
pub use self::settings::{SettingsInteraction, SettingsNavigation, SettingsStyle};
pub use self::source::{CallSource, FunctionInfo, StaticSource};
pub use self::view::CallGraphView;

mod event;
mod sink;

pub use event::{
    Event, PayloadFollowToggle, PayloadLockChange, PayloadNavigateTo, PayloadNodeDeselect,
    PayloadNodeHoverEnter, PayloadNodeHoverLeave, PayloadNodeSelect,
};
pub use sink::EventSink;

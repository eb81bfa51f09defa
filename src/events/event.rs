use serde::{Deserialize, Serialize};

use crate::elements::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNodeSelect {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNodeDeselect {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNodeHoverEnter {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNodeHoverLeave {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFollowToggle {
    pub address: Address,
    /// Whether the node is followed after the toggle.
    pub followed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLockChange {
    pub locked: bool,
}

/// Request for the host to navigate its own views to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNavigateTo {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    NodeSelect(PayloadNodeSelect),
    NodeDeselect(PayloadNodeDeselect),
    NodeHoverEnter(PayloadNodeHoverEnter),
    NodeHoverLeave(PayloadNodeHoverLeave),
    FollowToggle(PayloadFollowToggle),
    LockChange(PayloadLockChange),
    NavigateTo(PayloadNavigateTo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_node_select() {
        let event = Event::NodeSelect(PayloadNodeSelect { address: 4096 });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"NodeSelect":{"address":4096}}"#);

        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, Event::NodeSelect(PayloadNodeSelect { address: 4096 }));
    }

    #[test]
    fn contract_follow_toggle() {
        let event = Event::FollowToggle(PayloadFollowToggle {
            address: 8192,
            followed: true,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"FollowToggle":{"address":8192,"followed":true}}"#);

        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(
            event,
            Event::FollowToggle(PayloadFollowToggle {
                address: 8192,
                followed: true,
            })
        );
    }

    #[test]
    fn contract_navigate_to() {
        let event = Event::NavigateTo(PayloadNavigateTo { address: 255 });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"NavigateTo":{"address":255}}"#);

        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, Event::NavigateTo(PayloadNavigateTo { address: 255 }));
    }

    #[test]
    fn contract_lock_change() {
        let event = Event::LockChange(PayloadLockChange { locked: true });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"LockChange":{"locked":true}}"#);

        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, Event::LockChange(PayloadLockChange { locked: true }));
    }
}

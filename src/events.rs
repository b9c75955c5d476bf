use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::Result;
use crate::dom::NodeId;
use crate::page::Page;

pub(crate) type ListenerFn = dyn Fn(&mut Page, &mut Event) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Capturing,
    AtTarget,
    Bubbling,
}

/// Key pressed by the user, with its modifier state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Whether the key produces a `keypress` after `keydown`.
    pub(crate) fn produces_keypress(&self) -> bool {
        self.key == "Enter" || (self.key.chars().count() == 1 && !self.ctrl && !self.meta)
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) phase: EventPhase,
    pub(crate) time_stamp_ms: i64,
    pub(crate) bubbles: bool,
    pub(crate) cancelable: bool,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_propagation_stopped: bool,
    pub(crate) key: Option<KeyInput>,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: NodeId, time_stamp_ms: i64) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            phase: EventPhase::AtTarget,
            time_stamp_ms,
            bubbles: bubbles_by_default(event_type),
            cancelable: cancelable_by_default(event_type),
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            key: None,
        }
    }

    pub(crate) fn with_key(mut self, key: KeyInput) -> Self {
        self.key = Some(key);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn time_stamp_ms(&self) -> i64 {
        self.time_stamp_ms
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_ref().map(|key| key.key.as_str())
    }

    pub fn ctrl_key(&self) -> bool {
        self.key.as_ref().is_some_and(|key| key.ctrl)
    }

    pub fn meta_key(&self) -> bool {
        self.key.as_ref().is_some_and(|key| key.meta)
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

fn bubbles_by_default(event_type: &str) -> bool {
    !matches!(event_type, "mouseenter" | "mouseleave" | "focus" | "blur")
}

fn cancelable_by_default(event_type: &str) -> bool {
    matches!(
        event_type,
        "click" | "submit" | "keydown" | "keypress" | "mousedown"
    )
}

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) key: &'static str,
    pub(crate) capture: bool,
    pub(crate) callback: Rc<ListenerFn>,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("key", &self.key)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    /// Registers the listener unless one with the same key and capture flag
    /// is already present for this node and event. Returns whether it was added.
    pub(crate) fn add(&mut self, node_id: NodeId, event: &str, listener: Listener) -> bool {
        let listeners = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default();

        if listeners
            .iter()
            .any(|existing| existing.key == listener.key && existing.capture == listener.capture)
        {
            return false;
        }

        listeners.push(listener);
        true
    }

    pub(crate) fn remove(&mut self, node_id: NodeId, event: &str, key: &str) -> bool {
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|listener| listener.key != key);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            events.remove(event);
        }
        if events.is_empty() {
            self.map.remove(&node_id);
        }
        removed
    }

    pub(crate) fn remove_node(&mut self, node_id: NodeId) -> usize {
        self.map
            .remove(&node_id)
            .map_or(0, |events| events.values().map(Vec::len).sum())
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }
}

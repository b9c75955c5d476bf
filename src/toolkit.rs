//! The UI toolkit seam. Behaviors never touch widget internals; they ask the
//! toolkit to close alerts, show toasts and create widget instances.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use crate::Result;
use crate::dom::{Dom, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Tooltip,
    Popover,
    Dropdown,
}

impl WidgetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tooltip => "tooltip",
            Self::Popover => "popover",
            Self::Dropdown => "dropdown",
        }
    }
}

pub trait Dismissible {
    /// Closes an alert. Closing an alert that is no longer in the document is a no-op.
    fn close(&mut self, dom: &mut Dom, alert: NodeId) -> Result<()>;
}

pub trait ToastHost {
    fn show(&mut self, dom: &mut Dom, toast: NodeId) -> Result<()>;
}

pub trait TooltipHost {
    /// Creates a widget instance for `element`. Returns false when one already exists.
    fn create(&mut self, dom: &mut Dom, kind: WidgetKind, element: NodeId) -> Result<bool>;
}

pub trait Toolkit: Dismissible + ToastHost + TooltipHost {}

impl<T: Dismissible + ToastHost + TooltipHost> Toolkit for T {}

#[derive(Debug, Default)]
struct BootstrapState {
    closed_alerts: Vec<NodeId>,
    shown_toasts: Vec<NodeId>,
    instances: Vec<(WidgetKind, NodeId)>,
    instance_keys: HashSet<(WidgetKind, NodeId)>,
}

/// In-memory toolkit with Bootstrap's observable effects: a closed alert loses
/// `show` and leaves the document, a shown toast gains `show`, and each element
/// holds at most one instance per widget kind.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct BootstrapToolkit {
    state: Rc<RefCell<BootstrapState>>,
}

impl BootstrapToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn closed_alerts(&self) -> Vec<NodeId> {
        self.state.borrow().closed_alerts.clone()
    }

    pub fn shown_toasts(&self) -> Vec<NodeId> {
        self.state.borrow().shown_toasts.clone()
    }

    pub fn instances(&self, kind: WidgetKind) -> Vec<NodeId> {
        self.state
            .borrow()
            .instances
            .iter()
            .filter(|(instance_kind, _)| *instance_kind == kind)
            .map(|(_, node)| *node)
            .collect()
    }

    pub fn instance_count(&self) -> usize {
        self.state.borrow().instances.len()
    }
}

impl Dismissible for BootstrapToolkit {
    fn close(&mut self, dom: &mut Dom, alert: NodeId) -> Result<()> {
        if !dom.is_connected(alert) {
            debug!(node = alert.index(), "alert already removed");
            return Ok(());
        }
        dom.class_remove(alert, "show")?;
        dom.detach(alert);
        self.state.borrow_mut().closed_alerts.push(alert);
        Ok(())
    }
}

impl ToastHost for BootstrapToolkit {
    fn show(&mut self, dom: &mut Dom, toast: NodeId) -> Result<()> {
        dom.class_add(toast, "show")?;
        self.state.borrow_mut().shown_toasts.push(toast);
        Ok(())
    }
}

impl TooltipHost for BootstrapToolkit {
    fn create(&mut self, _dom: &mut Dom, kind: WidgetKind, element: NodeId) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        if !state.instance_keys.insert((kind, element)) {
            return Ok(false);
        }
        state.instances.push((kind, element));
        debug!(kind = kind.as_str(), node = element.index(), "widget instance created");
        Ok(true)
    }
}

use std::rc::Rc;

use tracing::debug;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::page::Page;
use crate::toolkit::{TooltipHost, WidgetKind};
use crate::Result;

const WIDGET_TRIGGERS: [(&str, WidgetKind); 3] = [
    (r#"[data-bs-toggle="tooltip"]"#, WidgetKind::Tooltip),
    (r#"[data-bs-toggle="popover"]"#, WidgetKind::Popover),
    (".dropdown-toggle", WidgetKind::Dropdown),
];

fn binding_key(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::Tooltip => "widgets.tooltip",
        WidgetKind::Popover => "widgets.popover",
        WidgetKind::Dropdown => "widgets.dropdown",
    }
}

/// Creates one toolkit widget per trigger element under `root`.
pub fn register(page: &mut Page, root: NodeId, _config: &Rc<EnhancerConfig>) -> Result<usize> {
    let mut created = 0;
    for (selector, kind) in WIDGET_TRIGGERS {
        for element in page.dom().select_in_subtree(root, selector)? {
            if !page.mark_bound(element, binding_key(kind)) {
                continue;
            }
            if page.with_toolkit(|toolkit, dom| toolkit.create(dom, kind, element))? {
                created += 1;
            }
        }
    }
    if created > 0 {
        debug!(count = created, "widgets created");
    }
    Ok(created)
}

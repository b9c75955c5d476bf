//! `data-action` buttons: print and copy-to-clipboard with a toast.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::events::Event;
use crate::html::escape_html_text;
use crate::page::Page;
use crate::toolkit::ToastHost;
use crate::Result;

pub const PRINT_SELECTOR: &str = r#"[data-action="print"]"#;
pub const COPY_SELECTOR: &str = r#"[data-action="copy"]"#;

const PRINT_CLICK: &str = "actions.print";
const COPY_CLICK: &str = "actions.copy";
const COPY_RESULT: &str = "actions.copy_result";
const TOAST_REMOVE: &str = "actions.toast_remove";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Failure,
}

impl ToastKind {
    fn class_name(self) -> &'static str {
        match self {
            Self::Success => "toast align-items-center text-white bg-success border-0",
            Self::Failure => "toast align-items-center text-white bg-danger border-0",
        }
    }
}

pub fn register(page: &mut Page, root: NodeId, config: &Rc<EnhancerConfig>) -> Result<usize> {
    let mut bound = 0;
    for button in page.dom().select_in_subtree(root, PRINT_SELECTOR)? {
        if page.add_event_listener(button, "click", PRINT_CLICK, false, on_print) {
            bound += 1;
        }
    }
    for button in page.dom().select_in_subtree(root, COPY_SELECTOR)? {
        let config = Rc::clone(config);
        if page.add_event_listener(button, "click", COPY_CLICK, false, move |page, event| {
            on_copy(page, event, &config)
        }) {
            bound += 1;
        }
    }
    Ok(bound)
}

fn on_print(page: &mut Page, event: &mut Event) -> Result<()> {
    event.prevent_default();
    page.platform_mut().print();
    Ok(())
}

fn on_copy(page: &mut Page, event: &mut Event, config: &Rc<EnhancerConfig>) -> Result<()> {
    event.prevent_default();
    let text = page
        .dom()
        .attr(event.current_target(), "data-copy-text")
        .unwrap_or_default()
        .to_string();
    if text.is_empty() {
        return Ok(());
    }

    let written = page.platform_mut().write_clipboard(&text);
    let config = Rc::clone(config);
    page.queue_microtask(COPY_RESULT, move |page| match written {
        Ok(()) => {
            debug!(chars = text.chars().count(), "copied to clipboard");
            show_toast(page, ToastKind::Success, &config).map(|_| ())
        }
        Err(err) => {
            warn!(error = %err, "clipboard write failed");
            if config.clipboard_failure_toast {
                show_toast(page, ToastKind::Failure, &config)?;
            }
            Ok(())
        }
    });
    Ok(())
}

/// Appends a toast to the body, shows it through the toolkit and schedules its
/// removal after the configured lifetime.
pub fn show_toast(page: &mut Page, kind: ToastKind, config: &EnhancerConfig) -> Result<NodeId> {
    let message = match kind {
        ToastKind::Success => &config.copy_success_message,
        ToastKind::Failure => &config.copy_failure_message,
    };
    let markup = format!(
        r#"<div class="d-flex"><div class="toast-body">{}</div><button type="button" class="btn-close btn-close-white me-2 m-auto" data-bs-dismiss="toast"></button></div>"#,
        escape_html_text(message)
    );

    let body = page.body_or_root();
    let toast = page.dom_mut().create_element("div");
    page.dom_mut().set_attr(toast, "class", kind.class_name())?;
    page.dom_mut().set_inner_html(toast, &markup)?;
    page.dom_mut().append_child(body, toast)?;
    page.with_toolkit(|toolkit, dom| toolkit.show(dom, toast))?;

    page.set_timeout(config.toast_lifetime_ms, TOAST_REMOVE, move |page| {
        page.remove_node(toast);
        Ok(())
    });
    Ok(toast)
}

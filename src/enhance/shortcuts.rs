use std::rc::Rc;

use tracing::debug;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::enhance::alerts;
use crate::events::Event;
use crate::page::Page;
use crate::Result;

pub const NEW_ITEM_LINK_SELECTOR: &str = r#"a[href*="/new"]"#;

const KEYDOWN: &str = "shortcuts.keydown";

/// Binds the document-level shortcut listener; `root` does not narrow it.
pub fn register(page: &mut Page, _root: NodeId, _config: &Rc<EnhancerConfig>) -> Result<usize> {
    let document = page.dom().root();
    Ok(usize::from(page.add_event_listener(
        document,
        "keydown",
        KEYDOWN,
        false,
        on_keydown,
    )))
}

fn on_keydown(page: &mut Page, event: &mut Event) -> Result<()> {
    if (event.ctrl_key() || event.meta_key()) && event.key() == Some("n") {
        if let Some(link) = page.dom().query_selector(NEW_ITEM_LINK_SELECTOR)? {
            event.prevent_default();
            debug!(link = %page.dom().node_label(link), "new-item shortcut");
            page.click_node(link)?;
        }
    }

    if event.key() == Some("Escape") {
        let dismissed = alerts::dismiss_all(page)?;
        debug!(count = dismissed, "alerts dismissed by escape");
    }
    Ok(())
}

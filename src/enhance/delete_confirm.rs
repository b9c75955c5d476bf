use std::rc::Rc;

use tracing::debug;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::events::Event;
use crate::page::Page;
use crate::Result;

pub const DELETE_LINK_SELECTOR: &str = r#"a[href*="delete"]"#;

const CONFIRM: &str = "delete.confirm";

pub fn register(page: &mut Page, root: NodeId, _config: &Rc<EnhancerConfig>) -> Result<usize> {
    let mut bound = 0;
    for link in page.dom().select_in_subtree(root, DELETE_LINK_SELECTOR)? {
        if page.add_event_listener(link, "click", CONFIRM, false, confirm_delete) {
            bound += 1;
        }
    }
    Ok(bound)
}

fn confirm_delete(page: &mut Page, event: &mut Event) -> Result<()> {
    let link = event.current_target();
    let href = page.dom().attr(link, "href").unwrap_or_default().to_string();
    let url = page
        .resolve_url(&href)
        .map(|url| url.to_string())
        .unwrap_or(href);
    let message = confirmation_message(&url);
    if !page.platform_mut().confirm(&message) {
        debug!(url = %url, "delete declined");
        event.prevent_default();
    }
    Ok(())
}

/// Entity named in the confirmation for a delete URL.
pub fn entity_label(url: &str) -> &'static str {
    if url.contains("categories") {
        "category"
    } else {
        "product"
    }
}

pub fn confirmation_message(url: &str) -> String {
    format!("Are you sure you want to delete this {}?", entity_label(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_follows_the_url() {
        assert_eq!(
            confirmation_message("http://shop.test/categories/delete/2"),
            "Are you sure you want to delete this category?"
        );
        assert_eq!(entity_label("/products/delete/9"), "product");
        assert_eq!(entity_label("/delete?id=3"), "product");
    }
}

use std::rc::Rc;

use tracing::debug;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::page::Page;
use crate::toolkit::Dismissible;
use crate::Result;

pub const ALERT_SELECTOR: &str = ".alert";

const AUTO_DISMISS: &str = "alerts.auto_dismiss";

/// Schedules every alert under `root` to close after the configured delay.
pub fn register(page: &mut Page, root: NodeId, config: &Rc<EnhancerConfig>) -> Result<usize> {
    let mut scheduled = 0;
    for alert in page.dom().select_in_subtree(root, ALERT_SELECTOR)? {
        if !page.mark_bound(alert, AUTO_DISMISS) {
            continue;
        }
        page.set_timeout(config.alert_dismiss_ms, AUTO_DISMISS, move |page| {
            dismiss(page, alert)
        });
        scheduled += 1;
    }
    if scheduled > 0 {
        debug!(count = scheduled, delay_ms = config.alert_dismiss_ms, "alert dismissal scheduled");
    }
    Ok(scheduled)
}

pub fn dismiss(page: &mut Page, alert: NodeId) -> Result<()> {
    let was_connected = page.dom().is_connected(alert);
    page.with_toolkit(|toolkit, dom| toolkit.close(dom, alert))?;
    if was_connected && !page.dom().is_connected(alert) {
        page.forget_subtree(alert);
    }
    Ok(())
}

/// Closes every alert currently in the document.
pub fn dismiss_all(page: &mut Page) -> Result<usize> {
    let alerts = page.select_all(ALERT_SELECTOR)?;
    for alert in &alerts {
        dismiss(page, *alert)?;
    }
    Ok(alerts.len())
}

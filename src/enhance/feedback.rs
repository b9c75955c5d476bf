//! Visual feedback: row hover, submit-button loading state, pagination dimming
//! and bordered overflowing tables.

use std::rc::Rc;

use tracing::debug;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::html::escape_html_text;
use crate::page::Page;
use crate::scheduler::TimerId;
use crate::Result;

pub const TABLE_ROW_SELECTOR: &str = "table tbody tr";
pub const SUBMIT_BUTTON_SELECTOR: &str = r#"button[type="submit"]"#;
pub const PAGINATION_LINK_SELECTOR: &str = ".pagination a";
pub const RESPONSIVE_TABLE_SELECTOR: &str = ".table-responsive table";

const SPINNER_MARKUP: &str =
    r#"<span class="spinner-border spinner-border-sm me-2" role="status" aria-hidden="true"></span>"#;

const ROW_ENTER: &str = "feedback.row_enter";
const ROW_LEAVE: &str = "feedback.row_leave";
const SUBMIT_CLICK: &str = "feedback.submit_loading";
const LOADING_STATE: &str = "feedback.loading_state";
const BUTTON_RESET: &str = "feedback.button_reset";
const PAGINATION_CLICK: &str = "feedback.pagination";
const TABLE_BORDER: &str = "feedback.table_border";

#[derive(Debug)]
struct LoadingState {
    original_html: String,
    reset_timer: TimerId,
}

pub fn register_row_hover(
    page: &mut Page,
    root: NodeId,
    config: &Rc<EnhancerConfig>,
) -> Result<usize> {
    let mut bound = 0;
    for row in page.dom().select_in_subtree(root, TABLE_ROW_SELECTOR)? {
        let config = Rc::clone(config);
        let added = page.add_event_listener(row, "mouseenter", ROW_ENTER, false, move |page, event| {
            page.dom_mut()
                .set_style(event.current_target(), "background-color", &config.row_hover_color)
        });
        page.add_event_listener(row, "mouseleave", ROW_LEAVE, false, |page, event| {
            page.dom_mut()
                .set_style(event.current_target(), "background-color", "")
        });
        if added {
            bound += 1;
        }
    }
    Ok(bound)
}

pub fn register_submit_loading(
    page: &mut Page,
    root: NodeId,
    config: &Rc<EnhancerConfig>,
) -> Result<usize> {
    let mut bound = 0;
    for button in page.dom().select_in_subtree(root, SUBMIT_BUTTON_SELECTOR)? {
        let config = Rc::clone(config);
        if page.add_event_listener(button, "click", SUBMIT_CLICK, false, move |page, event| {
            enter_loading_state(page, event.current_target(), &config)
        }) {
            bound += 1;
        }
    }
    Ok(bound)
}

fn enter_loading_state(page: &mut Page, button: NodeId, config: &EnhancerConfig) -> Result<()> {
    if is_loading(page, button) {
        return Ok(());
    }
    let original_html = page.dom().inner_html(button)?;
    let markup = format!(
        "{SPINNER_MARKUP}{}",
        escape_html_text(&config.processing_label)
    );
    page.dom_mut().set_inner_html(button, &markup)?;
    page.dom_mut().set_disabled(button, true)?;
    let reset_timer = page.set_timeout(config.button_reset_ms, BUTTON_RESET, move |page| {
        release_submit_button(page, button).map(|_| ())
    });
    page.set_expando(
        button,
        LOADING_STATE,
        LoadingState {
            original_html,
            reset_timer,
        },
    );
    Ok(())
}

pub fn is_loading(page: &Page, button: NodeId) -> bool {
    page.expando::<LoadingState>(button, LOADING_STATE).is_some()
}

/// Restores a submit button's markup and enabled state and cancels its reset
/// timer. Returns false when the button was not loading.
pub fn release_submit_button(page: &mut Page, button: NodeId) -> Result<bool> {
    let Some(state) = page.take_expando::<LoadingState>(button, LOADING_STATE) else {
        return Ok(false);
    };
    page.clear_timeout(state.reset_timer);
    page.dom_mut().set_inner_html(button, &state.original_html)?;
    page.dom_mut().set_disabled(button, false)?;
    debug!(button = %page.dom().node_label(button), "submit button restored");
    Ok(true)
}

pub fn register_pagination(
    page: &mut Page,
    root: NodeId,
    config: &Rc<EnhancerConfig>,
) -> Result<usize> {
    let mut bound = 0;
    for link in page.dom().select_in_subtree(root, PAGINATION_LINK_SELECTOR)? {
        let config = Rc::clone(config);
        if page.add_event_listener(link, "click", PAGINATION_CLICK, false, move |page, event| {
            if let Some(pagination) = page.dom().closest(event.current_target(), ".pagination")? {
                page.dom_mut()
                    .set_style(pagination, "opacity", &config.pagination_opacity)?;
            }
            Ok(())
        }) {
            bound += 1;
        }
    }
    Ok(bound)
}

/// Borders each responsive wrapper whose content overflows horizontally.
pub fn register_responsive_tables(
    page: &mut Page,
    root: NodeId,
    _config: &Rc<EnhancerConfig>,
) -> Result<usize> {
    let mut styled = 0;
    for table in page.dom().select_in_subtree(root, RESPONSIVE_TABLE_SELECTOR)? {
        let Some(wrapper) = page.dom().closest(table, ".table-responsive")? else {
            continue;
        };
        if !page.dom().layout(wrapper).overflows() || !page.mark_bound(wrapper, TABLE_BORDER) {
            continue;
        }
        page.dom_mut().set_style(wrapper, "border", "1px solid #dee2e6")?;
        page.dom_mut().set_style(wrapper, "border-radius", "0.375rem")?;
        styled += 1;
    }
    Ok(styled)
}

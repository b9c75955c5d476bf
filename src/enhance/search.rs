//! Search inputs: submit on Enter, submit after a pause in typing, and take
//! focus on load when empty.

use std::rc::Rc;

use tracing::debug;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::page::Page;
use crate::scheduler::TimerId;
use crate::Result;

pub const SEARCH_INPUT_SELECTOR: &str = r#"input[name="search"]"#;
pub const SEARCH_FORM_SELECTOR: &str = r#"form[action*="search"]"#;

const ON_ENTER: &str = "search.enter";
const ON_INPUT: &str = "search.debounce";
const DEBOUNCE_TIMER: &str = "search.debounce_timer";
const AUTOFOCUS: &str = "search.autofocus";

/// Binds Enter-to-submit and the debounced auto-submit.
pub fn register(page: &mut Page, root: NodeId, config: &Rc<EnhancerConfig>) -> Result<usize> {
    let mut bound = 0;
    let mut enter_inputs = Vec::new();
    for input in page.dom().select_in_subtree(root, SEARCH_INPUT_SELECTOR)? {
        // The form may enclose `root` rather than sit under it.
        if let Some(form) = page.dom().closest(input, SEARCH_FORM_SELECTOR)? {
            if page.dom().query_selector_within(form, SEARCH_INPUT_SELECTOR)? == Some(input) {
                enter_inputs.push((form, input));
            }
        }

        let config = Rc::clone(config);
        if page.add_event_listener(input, "input", ON_INPUT, false, move |page, event| {
            restart_debounce(page, event.current_target(), &config);
            Ok(())
        }) {
            bound += 1;
        }
    }

    for (form, input) in enter_inputs {
        page.add_event_listener(input, "keypress", ON_ENTER, false, move |page, event| {
            if event.key() == Some("Enter") {
                cancel_debounce(page, input);
                debug!(form = %page.dom().node_label(form), "search submitted on enter");
                page.submit_form_programmatically(form)?;
            }
            Ok(())
        });
    }
    Ok(bound)
}

/// Focuses every empty search input under `root`, so the last one keeps focus.
pub fn register_autofocus(
    page: &mut Page,
    root: NodeId,
    _config: &Rc<EnhancerConfig>,
) -> Result<usize> {
    let mut focused = 0;
    for input in page.dom().select_in_subtree(root, SEARCH_INPUT_SELECTOR)? {
        if !page.mark_bound(input, AUTOFOCUS) || !page.dom().value(input).is_empty() {
            continue;
        }
        page.focus_node(input)?;
        focused += 1;
    }
    Ok(focused)
}

fn cancel_debounce(page: &mut Page, input: NodeId) {
    if let Some(previous) = page.take_expando::<TimerId>(input, DEBOUNCE_TIMER) {
        page.clear_timeout(previous);
    }
}

fn restart_debounce(page: &mut Page, input: NodeId, config: &Rc<EnhancerConfig>) {
    cancel_debounce(page, input);
    let timer_config = Rc::clone(config);
    let timer = page.set_timeout(config.search_debounce_ms, ON_INPUT, move |page| {
        submit_after_pause(page, input, &timer_config)
    });
    page.set_expando(input, DEBOUNCE_TIMER, timer);
}

/// Returns the debounce timer waiting to submit for `input`, if any.
pub fn pending_submit(page: &Page, input: NodeId) -> Option<TimerId> {
    page.expando::<TimerId>(input, DEBOUNCE_TIMER).copied()
}

fn submit_after_pause(page: &mut Page, input: NodeId, config: &EnhancerConfig) -> Result<()> {
    page.take_expando::<TimerId>(input, DEBOUNCE_TIMER);
    if !page.dom().is_connected(input) {
        return Ok(());
    }
    let length = page.dom().value(input).chars().count();
    if !should_auto_submit(length, config.search_min_chars) {
        debug!(length, "search term too short to submit");
        return Ok(());
    }
    if let Some(form) = page.dom().closest(input, "form")? {
        page.submit_form_programmatically(form)?;
    }
    Ok(())
}

/// An empty term clears the search; otherwise it needs at least `min_chars`.
pub fn should_auto_submit(length: usize, min_chars: usize) -> bool {
    length == 0 || length >= min_chars
}

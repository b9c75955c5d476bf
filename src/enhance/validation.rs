//! Required-field checks at submit time and as the user edits.

use std::rc::Rc;

use tracing::debug;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::events::Event;
use crate::page::Page;
use crate::Result;

pub const REQUIRED_FIELD_SELECTOR: &str = "input[required], select[required], textarea[required]";

const ON_SUBMIT: &str = "validation.submit";
const ON_BLUR: &str = "validation.blur";
const ON_INPUT: &str = "validation.input";

pub fn register(page: &mut Page, root: NodeId, config: &Rc<EnhancerConfig>) -> Result<usize> {
    let mut bound = 0;
    for form in page.dom().select_in_subtree(root, "form")? {
        let config = Rc::clone(config);
        if page.add_event_listener(form, "submit", ON_SUBMIT, false, move |page, event| {
            on_submit(page, event, &config)
        }) {
            bound += 1;
        }
    }

    for field in page.dom().select_in_subtree(root, REQUIRED_FIELD_SELECTOR)? {
        let blur_config = Rc::clone(config);
        let added = page.add_event_listener(field, "blur", ON_BLUR, false, move |page, event| {
            mark_blank(page, event.current_target(), &blur_config)
        });
        let input_config = Rc::clone(config);
        page.add_event_listener(field, "input", ON_INPUT, false, move |page, event| {
            let field = event.current_target();
            if !is_blank(page, field) {
                page.dom_mut().class_remove(field, &input_config.invalid_class)?;
            }
            Ok(())
        });
        if added {
            bound += 1;
        }
    }
    Ok(bound)
}

fn on_submit(page: &mut Page, event: &mut Event, config: &EnhancerConfig) -> Result<()> {
    let form = event.current_target();
    if !validate_form(page, form, config)? {
        event.prevent_default();
    }
    Ok(())
}

/// Marks every blank `[required]` field in `form` and clears the rest. When any
/// field is blank the function returns false and focus moves to the first
/// marked field in document order, which may be one the server rendered
/// invalid.
pub fn validate_form(page: &mut Page, form: NodeId, config: &EnhancerConfig) -> Result<bool> {
    let mut any_blank = false;
    for field in page.dom().query_selector_all_within(form, "[required]")? {
        if is_blank(page, field) {
            page.dom_mut().class_add(field, &config.invalid_class)?;
            any_blank = true;
        } else {
            page.dom_mut().class_remove(field, &config.invalid_class)?;
        }
    }
    if !any_blank {
        return Ok(true);
    }

    debug!(form = %page.dom().node_label(form), "submission blocked by blank required fields");
    let first_marked = page
        .dom()
        .elements_in_subtree(form)
        .into_iter()
        .find(|node| *node != form && page.dom().has_class(*node, &config.invalid_class));
    if let Some(field) = first_marked {
        page.focus_node(field)?;
    }
    Ok(false)
}

fn mark_blank(page: &mut Page, field: NodeId, config: &EnhancerConfig) -> Result<()> {
    if is_blank(page, field) {
        page.dom_mut().class_add(field, &config.invalid_class)
    } else {
        page.dom_mut().class_remove(field, &config.invalid_class)
    }
}

fn is_blank(page: &Page, field: NodeId) -> bool {
    page.dom().value(field).trim().is_empty()
}

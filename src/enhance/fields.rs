use std::rc::Rc;
use std::sync::OnceLock;

use fancy_regex::Regex;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::page::Page;
use crate::Result;

pub const PRICE_INPUT_SELECTOR: &str = r#"input[type="number"][step="0.01"]"#;
pub const CATEGORY_SELECT_SELECTOR: &str = r#"select[name*="category"]"#;

const PRICE_CLAMP: &str = "fields.price_clamp";
const CATEGORY_CHANGE: &str = "fields.category_change";

fn leading_number() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^\s*([+-]?)(?:(Infinity)|([0-9]*)(?:\.([0-9]*))?(?:[eE]([+-]?[0-9]+))?)").ok()
        })
        .as_ref()
}

/// Parses the longest numeric prefix of `text` the way a browser's
/// `parseFloat` does, returning NaN when there is none.
pub fn parse_float(text: &str) -> f64 {
    let Some(pattern) = leading_number() else {
        return f64::NAN;
    };
    let Ok(Some(caps)) = pattern.captures(text) else {
        return f64::NAN;
    };
    let negative = caps.get(1).is_some_and(|sign| sign.as_str() == "-");
    let magnitude = if caps.get(2).is_some() {
        f64::INFINITY
    } else {
        let int = caps.get(3).map_or("", |m| m.as_str());
        let frac = caps.get(4).map_or("", |m| m.as_str());
        if int.is_empty() && frac.is_empty() {
            return f64::NAN;
        }
        let exponent = caps.get(5).map_or("0", |m| m.as_str());
        let literal = format!(
            "{}.{}e{exponent}",
            if int.is_empty() { "0" } else { int },
            if frac.is_empty() { "0" } else { frac },
        );
        literal.parse::<f64>().unwrap_or(f64::NAN)
    };
    if negative { -magnitude } else { magnitude }
}

/// Value a price field should hold after the user typed `value`, or `None`
/// when it stays as typed.
pub fn clamp_price(value: &str, config: &EnhancerConfig) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    (parse_float(value) < config.price_minimum).then(|| config.price_minimum_text())
}

pub fn register_price(page: &mut Page, root: NodeId, config: &Rc<EnhancerConfig>) -> Result<usize> {
    let mut bound = 0;
    for input in page.dom().select_in_subtree(root, PRICE_INPUT_SELECTOR)? {
        let config = Rc::clone(config);
        if page.add_event_listener(input, "input", PRICE_CLAMP, false, move |page, event| {
            let input = event.current_target();
            if let Some(clamped) = clamp_price(page.dom().value(input), &config) {
                page.dom_mut().set_value(input, &clamped)?;
            }
            Ok(())
        }) {
            bound += 1;
        }
    }
    Ok(bound)
}

pub fn register_category(
    page: &mut Page,
    root: NodeId,
    config: &Rc<EnhancerConfig>,
) -> Result<usize> {
    let mut bound = 0;
    for select in page.dom().select_in_subtree(root, CATEGORY_SELECT_SELECTOR)? {
        let config = Rc::clone(config);
        if page.add_event_listener(select, "change", CATEGORY_CHANGE, false, move |page, event| {
            let select = event.current_target();
            if !page.dom().value(select).is_empty() {
                page.dom_mut().class_remove(select, &config.invalid_class)?;
            }
            Ok(())
        }) {
            bound += 1;
        }
    }
    Ok(bound)
}

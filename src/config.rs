//! Tunables for the page behaviors.
//!
//! Every field has a default matching the store's stock script, so an empty
//! TOML document yields [`EnhancerConfig::default`].

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Delay before alerts present at load are closed.
    pub alert_dismiss_ms: u64,
    /// Delay before a submit button leaves its loading state.
    pub button_reset_ms: u64,
    /// How long a copy toast stays in the document.
    pub toast_lifetime_ms: u64,
    pub search_debounce_ms: u64,
    /// Shortest non-empty search term that triggers an automatic submit.
    pub search_min_chars: usize,
    pub price_minimum: f64,
    pub row_hover_color: String,
    pub pagination_opacity: String,
    pub invalid_class: String,
    pub processing_label: String,
    pub copy_success_message: String,
    pub copy_failure_message: String,
    /// Show a danger toast when the clipboard rejects a write.
    pub clipboard_failure_toast: bool,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            alert_dismiss_ms: 5000,
            button_reset_ms: 3000,
            toast_lifetime_ms: 3000,
            search_debounce_ms: 1000,
            search_min_chars: 2,
            price_minimum: 0.01,
            row_hover_color: "rgba(0, 0, 0, 0.05)".to_string(),
            pagination_opacity: "0.6".to_string(),
            invalid_class: "is-invalid".to_string(),
            processing_label: "Processing...".to_string(),
            copy_success_message: "Copied to clipboard!".to_string(),
            copy_failure_message: "Failed to copy to clipboard".to_string(),
            clipboard_failure_toast: true,
        }
    }
}

impl EnhancerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search_debounce_ms == 0 {
            return Err(Error::Config(
                "search_debounce_ms must be greater than zero".into(),
            ));
        }
        if !(self.price_minimum.is_finite() && self.price_minimum > 0.0) {
            return Err(Error::Config(format!(
                "price_minimum must be a positive number, got {}",
                self.price_minimum
            )));
        }
        if self.invalid_class.split_whitespace().count() != 1 {
            return Err(Error::Config(format!(
                "invalid_class must be a single class name, got {:?}",
                self.invalid_class
            )));
        }
        Ok(())
    }

    /// The value written into a price field that fell below the minimum.
    pub(crate) fn price_minimum_text(&self) -> String {
        self.price_minimum.to_string()
    }
}

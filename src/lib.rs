//! Progressive-enhancement behaviors for server-rendered store management
//! pages, together with the page model they run against.
//!
//! ```no_run
//! use store_enhancer::{EnhancerConfig, Page, PageEnhancer};
//!
//! # fn main() -> store_enhancer::Result<()> {
//! let mut page = Page::from_html("<body><div class='alert'>Saved</div></body>")?;
//! PageEnhancer::new(EnhancerConfig::default()).attach(&mut page)?;
//! page.advance_time(5000)?;
//! page.assert_not_exists(".alert")?;
//! # Ok(())
//! # }
//! ```

mod dom;
mod events;
mod html;
mod page;
mod scheduler;
mod selector;

pub mod config;
pub mod enhance;
pub mod platform;
pub mod toolkit;

pub use config::EnhancerConfig;
pub use dom::{Dom, LayoutBox, NodeId};
pub use enhance::{AttachReport, PageEnhancer};
pub use events::{Event, EventPhase, KeyInput};
pub use page::{Navigation, NavigationKind, Page, PageBuilder};
pub use platform::{BrowserPlatform, MockPlatform};
pub use scheduler::{PendingTimer, TimerId};
pub use toolkit::{BootstrapToolkit, Dismissible, ToastHost, Toolkit, TooltipHost, WidgetKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),

    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },

    #[error("assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}")]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("node {0} is not attached to the document")]
    DetachedNode(usize),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid config: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_context() {
        let err = Error::TypeMismatch {
            selector: "#name".into(),
            expected: "input or textarea".into(),
            actual: "div".into(),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for #name: expected input or textarea, actual div"
        );
        assert!(Error::SelectorNotFound(".alert".into())
            .to_string()
            .contains(".alert"));
    }

    #[test]
    fn url_and_toml_errors_convert() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::InvalidUrl(_)));

        let err: Error = toml::from_str::<EnhancerConfig>("search_debounce_ms = \"soon\"")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Config(_)));
    }
}

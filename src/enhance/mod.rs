//! The page behaviors and the enhancer that binds them.
//!
//! Each submodule exposes `register(page, root, config)`, which binds its
//! behavior to the matching elements under `root` (inclusive) and returns how
//! many were newly bound. Registration is idempotent: elements bound by an
//! earlier call are skipped.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::info;

use crate::config::EnhancerConfig;
use crate::dom::NodeId;
use crate::page::Page;
use crate::Result;

pub mod actions;
pub mod alerts;
pub mod delete_confirm;
pub mod feedback;
pub mod fields;
pub mod search;
pub mod shortcuts;
pub mod validation;
pub mod widgets;

/// Number of elements each behavior bound during one attach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachReport {
    bound: BTreeMap<&'static str, usize>,
}

impl AttachReport {
    fn record(&mut self, behavior: &'static str, count: usize) {
        *self.bound.entry(behavior).or_default() += count;
    }

    pub fn count(&self, behavior: &str) -> usize {
        self.bound.get(behavior).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.bound.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.bound.iter().map(|(behavior, count)| (*behavior, *count))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageEnhancer {
    config: Rc<EnhancerConfig>,
}

impl PageEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self {
            config: Rc::new(config),
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(Self::new(EnhancerConfig::from_toml_str(source)?))
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Binds every behavior to the whole document.
    pub fn attach(&self, page: &mut Page) -> Result<AttachReport> {
        let root = page.dom().root();
        self.attach_within(page, root)
    }

    /// Binds every behavior to the elements under `root`, for content
    /// rendered after the initial load.
    pub fn attach_within(&self, page: &mut Page, root: NodeId) -> Result<AttachReport> {
        self.config.validate()?;
        let config = &self.config;
        let mut report = AttachReport::default();

        page.run_in_task_context(|page| {
            report.record("alerts", alerts::register(page, root, config)?);
            report.record("delete_confirm", delete_confirm::register(page, root, config)?);
            report.record("validation", validation::register(page, root, config)?);
            report.record("search", search::register(page, root, config)?);
            report.record("row_hover", feedback::register_row_hover(page, root, config)?);
            report.record(
                "submit_loading",
                feedback::register_submit_loading(page, root, config)?,
            );
            report.record("pagination", feedback::register_pagination(page, root, config)?);
            report.record("widgets", widgets::register(page, root, config)?);
            report.record("search_autofocus", search::register_autofocus(page, root, config)?);
            report.record("price", fields::register_price(page, root, config)?);
            report.record("category", fields::register_category(page, root, config)?);
            report.record(
                "responsive_tables",
                feedback::register_responsive_tables(page, root, config)?,
            );
            report.record("shortcuts", shortcuts::register(page, root, config)?);
            report.record("actions", actions::register(page, root, config)?);
            Ok(())
        })?;

        info!(
            bound = report.total(),
            url = %page.url(),
            "store page enhancements attached"
        );
        Ok(report)
    }
}

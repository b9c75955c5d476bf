use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};
use url::Url;

use crate::dom::{Dom, LayoutBox, NodeId};
use crate::events::{Event, EventPhase, KeyInput, Listener, ListenerStore};
use crate::platform::{BrowserPlatform, MockPlatform};
use crate::scheduler::SchedulerState;
use crate::toolkit::{BootstrapToolkit, Toolkit};
use crate::{Error, Result};

const DEFAULT_PAGE_URL: &str = "http://localhost/";
const DISPATCH_STACK_SIZE: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    LinkFollowed,
    FormSubmitted,
}

/// A navigation the page requested. Navigations are recorded, never performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub kind: NavigationKind,
    pub method: String,
    pub url: Url,
}

#[derive(Debug)]
struct TraceState {
    enabled: bool,
    events: bool,
    timers: bool,
    logs: VecDeque<String>,
    log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

#[derive(Default)]
struct Expandos {
    values: HashMap<(NodeId, &'static str), Box<dyn Any>>,
}

impl fmt::Debug for Expandos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[derive(Default)]
pub struct PageBuilder {
    url: Option<String>,
    toolkit: Option<Box<dyn Toolkit>>,
    platform: Option<Box<dyn BrowserPlatform>>,
}

impl fmt::Debug for PageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBuilder")
            .field("url", &self.url)
            .field("toolkit", &self.toolkit.is_some())
            .field("platform", &self.platform.is_some())
            .finish()
    }
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn toolkit(mut self, toolkit: impl Toolkit + 'static) -> Self {
        self.toolkit = Some(Box::new(toolkit));
        self
    }

    pub fn platform(mut self, platform: impl BrowserPlatform + 'static) -> Self {
        self.platform = Some(Box::new(platform));
        self
    }

    pub fn build(self, html: &str) -> Result<Page> {
        let url = Url::parse(self.url.as_deref().unwrap_or(DEFAULT_PAGE_URL))?;
        let dom = Dom::parse(html)?;
        Ok(Page {
            dom,
            listeners: ListenerStore::default(),
            scheduler: SchedulerState::default(),
            expandos: Expandos::default(),
            bindings: HashSet::new(),
            navigations: Vec::new(),
            listener_errors: Vec::new(),
            trace_state: TraceState::default(),
            toolkit: self
                .toolkit
                .unwrap_or_else(|| Box::new(BootstrapToolkit::new())),
            platform: self
                .platform
                .unwrap_or_else(|| Box::new(MockPlatform::new())),
            url,
        })
    }
}

/// A loaded document together with the listeners, timers and services the
/// behaviors run against.
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) scheduler: SchedulerState,
    expandos: Expandos,
    bindings: HashSet<(NodeId, &'static str)>,
    navigations: Vec<Navigation>,
    listener_errors: Vec<Error>,
    trace_state: TraceState,
    toolkit: Box<dyn Toolkit>,
    platform: Box<dyn BrowserPlatform>,
    url: Url,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url.as_str())
            .field("now_ms", &self.scheduler.now_ms)
            .field("pending_timers", &self.scheduler.task_queue.len())
            .field("navigations", &self.navigations)
            .field("expandos", &self.expandos)
            .finish_non_exhaustive()
    }
}

impl Page {
    pub fn builder() -> PageBuilder {
        PageBuilder::new()
    }

    pub fn from_html(html: &str) -> Result<Self> {
        PageBuilder::new().build(html)
    }

    pub fn from_html_with_url(url: &str, html: &str) -> Result<Self> {
        PageBuilder::new().url(url).build(html)
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn resolve_url(&self, href: &str) -> Result<Url> {
        Ok(self.url.join(href.trim())?)
    }

    /// Element that receives appended overlays such as toasts.
    pub(crate) fn body_or_root(&self) -> NodeId {
        self.dom.body().unwrap_or_else(|| self.dom.root())
    }

    pub(crate) fn with_toolkit<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Toolkit, &mut Dom) -> Result<R>,
    ) -> Result<R> {
        f(self.toolkit.as_mut(), &mut self.dom)
    }

    pub(crate) fn platform_mut(&mut self) -> &mut dyn BrowserPlatform {
        self.platform.as_mut()
    }

    /// Adds a listener unless one with the same key and capture flag is already
    /// registered on `node` for `event`. Returns whether it was added.
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        key: &'static str,
        capture: bool,
        callback: impl Fn(&mut Page, &mut Event) -> Result<()> + 'static,
    ) -> bool {
        self.listeners.add(
            node,
            event,
            Listener {
                key,
                capture,
                callback: Rc::new(callback),
            },
        )
    }

    pub fn remove_event_listener(&mut self, node: NodeId, event: &str, key: &'static str) -> bool {
        self.listeners.remove(node, event, key)
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.listeners.count(node, event)
    }

    pub fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<Event> {
        let event = Event::new(event_type, target, self.scheduler.now_ms);
        self.dispatch_prepared_event(event)
    }

    pub(crate) fn dispatch_prepared_event(&mut self, mut event: Event) -> Result<Event> {
        let target = event.target;
        self.trace_event_line(format!(
            "[event] dispatch type={} target={}",
            event.event_type,
            self.dom.node_label(target)
        ));
        self.run_in_task_context(|page| {
            let mut path = Vec::new();
            let mut cursor = page.dom.parent(target);
            while let Some(node) = cursor {
                path.push(node);
                cursor = page.dom.parent(node);
            }
            path.reverse();

            event.phase = EventPhase::Capturing;
            for node in &path {
                event.current_target = *node;
                page.invoke_listeners(*node, &mut event, true);
                if event.propagation_stopped {
                    page.trace_event_done(&event, "propagation_stopped");
                    return Ok(());
                }
            }

            event.phase = EventPhase::AtTarget;
            event.current_target = target;
            page.invoke_listeners(target, &mut event, true);
            if !event.propagation_stopped {
                page.invoke_listeners(target, &mut event, false);
            }
            if event.propagation_stopped {
                page.trace_event_done(&event, "propagation_stopped");
                return Ok(());
            }

            if event.bubbles {
                event.phase = EventPhase::Bubbling;
                for node in path.iter().rev() {
                    event.current_target = *node;
                    page.invoke_listeners(*node, &mut event, false);
                    if event.propagation_stopped {
                        page.trace_event_done(&event, "propagation_stopped");
                        return Ok(());
                    }
                }
            }

            page.trace_event_done(&event, "completed");
            Ok(())
        })?;
        Ok(event)
    }

    fn invoke_listeners(&mut self, node: NodeId, event: &mut Event, capture: bool) {
        for listener in self.listeners.get(node, &event.event_type, capture) {
            if let Err(err) = (listener.callback)(self, event) {
                self.record_listener_error(listener.key, err);
            }
            if event.immediate_propagation_stopped {
                break;
            }
        }
    }

    fn trace_event_done(&mut self, event: &Event, outcome: &str) {
        self.trace_event_line(format!(
            "[event] done type={} target={} outcome={outcome} default_prevented={}",
            event.event_type,
            self.dom.node_label(event.target),
            event.default_prevented
        ));
    }

    pub(crate) fn record_listener_error(&mut self, key: &str, err: Error) {
        warn!(listener = key, error = %err, "listener failed");
        self.trace_line(format!("[error] listener={key} error={err}"));
        self.listener_errors.push(err);
    }

    /// Errors returned by listeners and timers since the last call.
    pub fn take_listener_errors(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.listener_errors)
    }

    pub fn listener_errors(&self) -> &[Error] {
        &self.listener_errors
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    /// Clicks `target` and, unless a listener cancels it, runs the activation
    /// behavior: links are followed and submit buttons submit their form.
    pub fn click_node(&mut self, target: NodeId) -> Result<()> {
        stacker::grow(DISPATCH_STACK_SIZE, || self.click_node_inner(target))
    }

    fn click_node_inner(&mut self, target: NodeId) -> Result<()> {
        if self.dom.is_disabled(target) {
            return Ok(());
        }
        let event = self.dispatch_event(target, "click")?;
        if event.default_prevented() {
            return Ok(());
        }

        if let Some(anchor) = self.dom.closest(target, "a[href]")? {
            return self.follow_link(anchor);
        }
        if let Some(button) = self.dom.closest(target, "button")? {
            let is_submit = self
                .dom
                .attr(button, "type")
                .is_none_or(|kind| kind.eq_ignore_ascii_case("submit"));
            if is_submit {
                if let Some(form) = self.dom.closest(button, "form")? {
                    return self.request_submit(form);
                }
            }
        }
        Ok(())
    }

    fn follow_link(&mut self, anchor: NodeId) -> Result<()> {
        let href = self.dom.attr(anchor, "href").unwrap_or_default().trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return Ok(());
        }
        let url = self.resolve_url(href)?;
        debug!(url = %url, "link followed");
        self.navigations.push(Navigation {
            kind: NavigationKind::LinkFollowed,
            method: "get".to_string(),
            url,
        });
        Ok(())
    }

    /// User-initiated submission: dispatches a cancelable `submit` and records
    /// the navigation unless a listener prevents it.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let form = self.select_one(selector)?;
        let form = self
            .dom
            .closest(form, "form")?
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form or form control".into(),
                actual: self.dom.node_label(form),
            })?;
        stacker::grow(DISPATCH_STACK_SIZE, || self.request_submit(form))
    }

    fn request_submit(&mut self, form: NodeId) -> Result<()> {
        let event = self.dispatch_event(form, "submit")?;
        if event.default_prevented() {
            debug!(form = %self.dom.node_label(form), "submission canceled");
            return Ok(());
        }
        self.record_form_submission(form)
    }

    /// Programmatic submission: no `submit` event fires and nothing can cancel it.
    pub fn submit_form_programmatically(&mut self, form: NodeId) -> Result<()> {
        if self.dom.tag_name(form) != Some("form") {
            return Err(Error::TypeMismatch {
                selector: self.dom.node_label(form),
                expected: "form".into(),
                actual: self.dom.tag_name(form).unwrap_or("non-element").to_string(),
            });
        }
        self.record_form_submission(form)
    }

    fn record_form_submission(&mut self, form: NodeId) -> Result<()> {
        let mut url = match self.dom.attr(form, "action").map(str::trim) {
            Some(action) if !action.is_empty() => self.resolve_url(action)?,
            _ => self.url.clone(),
        };
        let method = self
            .dom
            .attr(form, "method")
            .unwrap_or("get")
            .to_ascii_lowercase();
        if method == "get" {
            let pairs = self.form_data(form)?;
            url.set_fragment(None);
            if pairs.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(pairs);
            }
        }
        debug!(url = %url, method = %method, "form submitted");
        self.navigations.push(Navigation {
            kind: NavigationKind::FormSubmitted,
            method,
            url,
        });
        Ok(())
    }

    fn form_data(&self, form: NodeId) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for control in self
            .dom
            .select_in_subtree(form, "input[name], select[name], textarea[name]")?
        {
            if self.dom.is_disabled(control) {
                continue;
            }
            if self.dom.tag_name(control) == Some("input") {
                let kind = self
                    .dom
                    .attr(control, "type")
                    .unwrap_or("text")
                    .to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "button" | "reset" | "image" | "file" => continue,
                    "checkbox" | "radio" if !self.dom.has_attr(control, "checked") => continue,
                    _ => {}
                }
            }
            let name = self.dom.attr(control, "name").unwrap_or_default();
            pairs.push((name.to_string(), self.dom.value(control).to_string()));
        }
        Ok(pairs)
    }

    pub fn navigations(&self) -> &[Navigation] {
        &self.navigations
    }

    pub fn take_navigations(&mut self) -> Vec<Navigation> {
        std::mem::take(&mut self.navigations)
    }

    /// Replaces the value of a text control and dispatches `input`.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self.dom.tag_name(target).unwrap_or_default();
        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag.to_string(),
            });
        }
        if self.dom.is_disabled(target) {
            return Ok(());
        }
        self.dom.set_value(target, text)?;
        self.dispatch_event(target, "input")?;
        Ok(())
    }

    pub fn select_value(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self.dom.tag_name(target).unwrap_or_default();
        if tag != "select" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "select".into(),
                actual: tag.to_string(),
            });
        }
        if !self.dom.option_values(target).iter().any(|option| option == value) {
            return Err(Error::Runtime(format!(
                "{selector} has no option with value {value:?}"
            )));
        }
        if self.dom.is_disabled(target) {
            return Ok(());
        }
        self.dom.set_value(target, value)?;
        self.dispatch_event(target, "input")?;
        self.dispatch_event(target, "change")?;
        Ok(())
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(DISPATCH_STACK_SIZE, || self.focus_node(target))
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(DISPATCH_STACK_SIZE, || self.blur_node(target))
    }

    pub fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.is_disabled(node) || self.dom.active_element() == Some(node) {
            return Ok(());
        }
        if let Some(current) = self.dom.active_element() {
            self.blur_node(current)?;
        }
        self.dom.set_active_element(Some(node));
        self.dispatch_event(node, "focus")?;
        Ok(())
    }

    /// Blurs `node` if it has focus; otherwise nothing happens.
    pub fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.active_element() != Some(node) {
            return Ok(());
        }
        self.dom.set_active_element(None);
        self.dispatch_event(node, "blur")?;
        Ok(())
    }

    /// Presses a key on the element: `keydown`, then `keypress` for Enter and
    /// printable keys. Returns the `keydown` event.
    pub fn press_key(&mut self, selector: &str, key: KeyInput) -> Result<Event> {
        let target = self.select_one(selector)?;
        stacker::grow(DISPATCH_STACK_SIZE, || self.press_key_on(target, key))
    }

    /// Presses a key with focus wherever it currently is.
    pub fn press_global_key(&mut self, key: KeyInput) -> Result<Event> {
        let target = self
            .dom
            .active_element()
            .unwrap_or_else(|| self.body_or_root());
        stacker::grow(DISPATCH_STACK_SIZE, || self.press_key_on(target, key))
    }

    fn press_key_on(&mut self, target: NodeId, key: KeyInput) -> Result<Event> {
        let produces_keypress = key.produces_keypress();
        let keydown = Event::new("keydown", target, self.scheduler.now_ms).with_key(key.clone());
        let keydown = self.dispatch_prepared_event(keydown)?;
        if !keydown.default_prevented() && produces_keypress {
            let keypress = Event::new("keypress", target, self.scheduler.now_ms).with_key(key);
            self.dispatch_prepared_event(keypress)?;
        }
        Ok(keydown)
    }

    pub fn hover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, "mouseenter")?;
        Ok(())
    }

    pub fn unhover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, "mouseleave")?;
        Ok(())
    }

    /// Sets the layout metrics a rendering engine would report for the element.
    pub fn set_layout(&mut self, selector: &str, layout: LayoutBox) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.set_layout(target, layout)
    }

    pub fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.has_class(target, class_name);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("has class {class_name}: {expected}"),
                actual: format!("has class {class_name}: {actual}"),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_not_exists(&self, selector: &str) -> Result<()> {
        if let Some(found) = self.dom.query_selector(selector)? {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: "no matching element".into(),
                actual: "element present".into(),
                dom_snippet: self.node_snippet(found),
            });
        }
        Ok(())
    }

    fn node_snippet(&self, node: NodeId) -> String {
        let html = self.dom.outer_html(node).unwrap_or_default();
        match html.char_indices().nth(200) {
            Some((idx, _)) => format!("{}...", &html[..idx]),
            None => html,
        }
    }

    pub(crate) fn set_expando<T: Any>(&mut self, node: NodeId, key: &'static str, value: T) {
        self.expandos.values.insert((node, key), Box::new(value));
    }

    pub(crate) fn expando<T: Any>(&self, node: NodeId, key: &'static str) -> Option<&T> {
        self.expandos
            .values
            .get(&(node, key))
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub(crate) fn take_expando<T: Any>(&mut self, node: NodeId, key: &'static str) -> Option<T> {
        let value = self.expandos.values.remove(&(node, key))?;
        match value.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(value) => {
                self.expandos.values.insert((node, key), value);
                None
            }
        }
    }

    /// Marks `behavior` as bound to `node`. Returns false when it already was.
    pub(crate) fn mark_bound(&mut self, node: NodeId, behavior: &'static str) -> bool {
        self.bindings.insert((node, behavior))
    }

    /// Detaches `node` and drops the listeners, expandos and binding marks of
    /// its subtree. Returns false when it was already detached.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        if !self.dom.detach(node) {
            return false;
        }
        self.forget_subtree(node);
        true
    }

    /// Replaces the children of `node` with parsed `html`, dropping the state
    /// held for the replaced subtree.
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<()> {
        let previous = self.dom.children(node).to_vec();
        self.dom.set_inner_html(node, html)?;
        for child in previous {
            self.forget_subtree(child);
        }
        if let Some(active) = self.dom.active_element() {
            if !self.dom.is_connected(active) {
                self.dom.set_active_element(None);
            }
        }
        Ok(())
    }

    /// Drops per-node state for a subtree that has left the document.
    pub(crate) fn forget_subtree(&mut self, node: NodeId) {
        let nodes = self.dom.elements_in_subtree(node).into_iter().collect::<HashSet<_>>();
        if nodes.is_empty() {
            return;
        }
        for id in &nodes {
            self.listeners.remove_node(*id);
        }
        self.bindings.retain(|(id, _)| !nodes.contains(id));
        self.expandos.values.retain(|(id, _), _| !nodes.contains(id));
        debug!(nodes = nodes.len(), "state dropped for removed subtree");
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_state.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_state.timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.timers {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_state.enabled {
            trace!("{line}");
            if self.trace_state.logs.len() >= self.trace_state.log_limit {
                self.trace_state.logs.pop_front();
            }
            self.trace_state.logs.push_back(line);
        }
    }
}

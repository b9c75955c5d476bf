//! Browser services the behaviors consume: blocking confirmation, the print
//! dialog and the asynchronous clipboard.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::{Error, Result};

pub trait BrowserPlatform {
    /// Shows a blocking yes/no dialog and returns the user's answer.
    fn confirm(&mut self, message: &str) -> bool;

    fn print(&mut self);

    /// Writes text to the system clipboard. An error means the write was rejected.
    fn write_clipboard(&mut self, text: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct MockPlatformState {
    confirm_messages: Vec<String>,
    confirm_responses: VecDeque<bool>,
    default_confirm_response: bool,
    print_calls: usize,
    clipboard_text: Option<String>,
    clipboard_writes: Vec<String>,
    reject_clipboard: bool,
}

/// In-memory platform for tests and headless hosts.
///
/// Clones share state, so a test can keep a handle after passing one to the page.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Rc<RefCell<MockPlatformState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the answer for the next confirmation; unqueued prompts use the default.
    pub fn enqueue_confirm_response(&self, accepted: bool) {
        self.state.borrow_mut().confirm_responses.push_back(accepted);
    }

    pub fn set_default_confirm_response(&self, accepted: bool) {
        self.state.borrow_mut().default_confirm_response = accepted;
    }

    pub fn confirm_messages(&self) -> Vec<String> {
        self.state.borrow().confirm_messages.clone()
    }

    pub fn print_count(&self) -> usize {
        self.state.borrow().print_calls
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.state.borrow().clipboard_text.clone()
    }

    /// Every attempted clipboard write, rejected ones included.
    pub fn clipboard_writes(&self) -> Vec<String> {
        self.state.borrow().clipboard_writes.clone()
    }

    pub fn fail_clipboard_writes(&self, reject: bool) {
        self.state.borrow_mut().reject_clipboard = reject;
    }
}

impl BrowserPlatform for MockPlatform {
    fn confirm(&mut self, message: &str) -> bool {
        let mut state = self.state.borrow_mut();
        state.confirm_messages.push(message.to_string());
        let fallback = state.default_confirm_response;
        state.confirm_responses.pop_front().unwrap_or(fallback)
    }

    fn print(&mut self) {
        self.state.borrow_mut().print_calls += 1;
    }

    fn write_clipboard(&mut self, text: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.clipboard_writes.push(text.to_string());
        if state.reject_clipboard {
            return Err(Error::Runtime("clipboard write rejected".into()));
        }
        state.clipboard_text = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_confirm_responses_are_used_before_the_default() {
        let handle = MockPlatform::new();
        let mut platform = handle.clone();
        handle.enqueue_confirm_response(true);
        assert!(platform.confirm("first?"));
        assert!(!platform.confirm("second?"));
        handle.set_default_confirm_response(true);
        assert!(platform.confirm("third?"));
        assert_eq!(handle.confirm_messages(), vec!["first?", "second?", "third?"]);
    }

    #[test]
    fn rejected_clipboard_writes_leave_the_clipboard_untouched() {
        let handle = MockPlatform::new();
        let mut platform = handle.clone();
        platform.write_clipboard("SKU-1").expect("write");
        handle.fail_clipboard_writes(true);
        assert!(platform.write_clipboard("SKU-2").is_err());
        assert_eq!(handle.clipboard_text().as_deref(), Some("SKU-1"));
        assert_eq!(handle.clipboard_writes(), vec!["SKU-1", "SKU-2"]);
    }
}

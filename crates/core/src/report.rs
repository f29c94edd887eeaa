//! User-facing error and status reporting.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use tracing::error;

/// 顯示訊息給使用者的協作者。 / Where blocking messages and status lines go.
pub trait Reporter {
    /// Blocking, user-facing error message.
    fn show_error(&mut self, message: &str);

    /// Non-blocking status line.
    fn set_status(&mut self, message: &str);
}

/// 統一的錯誤回報入口。 / Single funnel for user-facing failures: records
/// the full error chain in the diagnostic log, then shows `message`.
pub fn report_error(reporter: &mut dyn Reporter, message: &str, err: &dyn Error) {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    error!(%message, error = %chain, "reported error");
    reporter.show_error(message);
}

/// Records every message; used headless and in tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageLog {
    pub errors: Vec<String>,
    pub statuses: Vec<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }
}

impl Reporter for MessageLog {
    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn set_status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }
}

impl<R: Reporter> Reporter for Rc<RefCell<R>> {
    fn show_error(&mut self, message: &str) {
        self.borrow_mut().show_error(message);
    }

    fn set_status(&mut self, message: &str) {
        self.borrow_mut().set_status(message);
    }
}

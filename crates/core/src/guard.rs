use std::cell::Cell;
use std::rc::Rc;

/// 防止重入的旗標。 / Reentrancy flag for one kind of programmatic pane
/// manipulation.
///
/// Clones share the flag, so a toolkit callback can hold a clone and drop
/// the echo it receives while the owning operation is in progress.
#[derive(Clone, Debug, Default)]
pub struct Guard {
    name: &'static str,
    active: Rc<Cell<bool>>,
}

impl Guard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            active: Rc::new(Cell::new(false)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// 進入受保護區段。 / Marks the operation as in progress until the
    /// returned scope is dropped.
    #[must_use = "the guard is released as soon as the scope is dropped"]
    pub fn enter(&self) -> GuardScope {
        let previous = self.active.replace(true);
        GuardScope {
            flag: self.active.clone(),
            previous,
        }
    }
}

/// Restores the guard's previous value on drop.
#[derive(Debug)]
pub struct GuardScope {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

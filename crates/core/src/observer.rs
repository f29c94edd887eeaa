//! 通用的訂閱/通知註冊表。 / Generic publish/subscribe registry.
//!
//! Subscriptions can be suspended individually, which is how the format
//! mirror silences a control's own change signal while it pushes editor
//! state into that control.

use std::fmt;

/// 訂閱的識別碼。 / Handle returned by [`Registry::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber<T> {
    id: SubscriptionId,
    suspended: u32,
    callback: Box<dyn FnMut(&T)>,
}

/// 事件的訂閱者清單。 / Ordered list of subscribers for events of type `T`.
pub struct Registry<T> {
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suspended = self.subscribers.iter().filter(|s| s.suspended > 0).count();
        f.debug_struct("Registry")
            .field("subscribers", &self.subscribers.len())
            .field("suspended", &suspended)
            .finish()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            subscribers: Vec::new(),
        }
    }

    /// 註冊新的回呼。 / Registers a callback; subscribers run in subscription order.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&T) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            suspended: 0,
            callback: Box::new(callback),
        });
        id
    }

    /// 移除訂閱。 / Removes a subscription, returning whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != id);
        before != self.subscribers.len()
    }

    /// Suspends delivery to `id`. Suspensions nest; each needs a matching
    /// [`resume`](Self::resume).
    pub fn suspend(&mut self, id: SubscriptionId) -> bool {
        match self.find_mut(id) {
            Some(sub) => {
                sub.suspended += 1;
                true
            }
            None => false,
        }
    }

    pub fn resume(&mut self, id: SubscriptionId) -> bool {
        match self.find_mut(id) {
            Some(sub) => {
                sub.suspended = sub.suspended.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    pub fn is_suspended(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .iter()
            .any(|sub| sub.id == id && sub.suspended > 0)
    }

    /// 在暫停指定訂閱期間執行 `op`。 / Runs `op` with the listed subscriptions
    /// suspended and resumes them afterwards.
    pub fn with_suspended<R, F>(&mut self, ids: &[SubscriptionId], op: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        for id in ids {
            self.suspend(*id);
        }
        let result = op(self);
        for id in ids {
            self.resume(*id);
        }
        result
    }

    /// 發送事件給所有未暫停的訂閱者。 / Delivers `event` to every active
    /// subscriber and returns how many received it.
    pub fn emit(&mut self, event: &T) -> usize {
        let mut delivered = 0;
        for sub in self.subscribers.iter_mut().filter(|sub| sub.suspended == 0) {
            (sub.callback)(event);
            delivered += 1;
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    fn find_mut(&mut self, id: SubscriptionId) -> Option<&mut Subscriber<T>> {
        self.subscribers.iter_mut().find(|sub| sub.id == id)
    }
}

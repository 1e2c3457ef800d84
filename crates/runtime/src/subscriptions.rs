/// Named teardown actions (timer handles, event listeners) owned by a view.
///
/// Every registered teardown runs exactly once: on [`Subscriptions::cancel`],
/// on [`Subscriptions::dispose`], or when the set is dropped. Teardowns run in
/// reverse registration order.
#[derive(Default)]
pub struct Subscriptions {
    entries: Vec<(&'static str, Box<dyn FnOnce()>)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a teardown. An existing entry with the same name is torn
    /// down first.
    pub fn insert(&mut self, name: &'static str, teardown: impl FnOnce() + 'static) {
        self.cancel(name);
        self.entries.push((name, Box::new(teardown)));
    }

    /// Keeps `value` alive until the entry is cancelled; dropping it is the
    /// teardown. Suited to handles that cancel on drop, like interval timers.
    pub fn hold<T: 'static>(&mut self, name: &'static str, value: T) {
        self.insert(name, move || drop(value));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| *n == name)
    }

    /// Returns `true` if an entry was torn down.
    pub fn cancel(&mut self, name: &str) -> bool {
        let Some(pos) = self.entries.iter().position(|(n, _)| *n == name) else {
            return false;
        };
        let (_, teardown) = self.entries.remove(pos);
        teardown();
        true
    }

    pub fn dispose(&mut self) {
        while let Some((name, teardown)) = self.entries.pop() {
            tracing::trace!(subscription = name, "teardown");
            teardown();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(n, _)| n))
            .finish()
    }
}

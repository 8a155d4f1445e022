use std::sync::Arc;

use super::store::Store;
use super::subscription::Subscription;

/// A read-only store computed from another store.
///
/// The derived value is recomputed every time the source is notified.
/// Dropping the last handle releases the subscription on the source.
///
/// # Examples
///
/// ```
/// use list_store::Store;
///
/// let names = Store::new(vec!["a".to_string(), "b".to_string()]);
/// let count = names.map(|names| names.len());
///
/// assert_eq!(count.get(), 2);
/// names.modify(|names| names.push("c".to_string()));
/// assert_eq!(count.get(), 3);
/// ```
pub struct Derived<T> {
    store: Store<T>,
    // Source subscriptions, nearest first.
    upstream: Vec<Arc<Subscription>>,
}

impl<T: Clone + Send + Sync + 'static> Derived<T> {
    pub(crate) fn new<S, F>(source: &Store<S>, f: F, mut upstream: Vec<Arc<Subscription>>) -> Self
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let store = Store::new(source.read(&f));
        let target = store.clone();

        let subscription = source.subscribe(move |value| target.set(f(value)));
        upstream.insert(0, Arc::new(subscription));

        Self { store, upstream }
    }

    /// Get a clone of the current derived value.
    pub fn get(&self) -> T {
        self.store.get()
    }

    /// Read the derived value without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.store.read(f)
    }

    /// Subscribe to changes of the derived value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    /// Derive again from this value.
    pub fn map<U, F>(&self, f: F) -> Derived<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Derived::new(&self.store, f, self.upstream.clone())
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            upstream: self.upstream.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived").field("store", &self.store).finish()
    }
}

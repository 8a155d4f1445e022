use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use super::derived::Derived;
use super::subscription::{Registry, Subscription};

pub(crate) type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A subscriber waiting to be called with a specific value, tagged with the
/// removal count observed before it was queued.
type Pending<T> = (usize, Callback<T>, T, usize);

struct Shared<T> {
    state: RwLock<T>,
    subscribers: RwLock<Vec<(usize, Callback<T>)>>,
    // Non-empty while a notification round is being delivered.
    queue: Mutex<VecDeque<Pending<T>>>,
    next_id: AtomicUsize,
    // Bumped on every unsubscribe.
    removals: AtomicUsize,
}

/// An observable value container.
///
/// Every mutation notifies the registered subscribers synchronously, in
/// registration order, before returning to the caller. Handles are cheap
/// to clone and share the same state.
///
/// The store is `Send + Sync`, but delivery is only synchronous on the thread
/// that drains a notification round. A mutation from another thread while a
/// round is draining is queued, and that call returns before its subscribers
/// have run; the draining thread delivers them.
///
/// # Examples
///
/// ```
/// use list_store::Store;
/// use std::sync::{Arc, Mutex};
///
/// let store = Store::new(1);
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sub = store.subscribe({
///     let seen = seen.clone();
///     move |value: &i32| seen.lock().unwrap().push(*value)
/// });
///
/// store.set(2);
/// store.update(|n| n * 10);
/// sub.unsubscribe();
/// store.set(3);
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 20]);
/// ```
pub struct Store<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        debug!(value_type = std::any::type_name::<T>(), "creating store");
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(initial),
                subscribers: RwLock::new(Vec::new()),
                queue: Mutex::new(VecDeque::new()),
                next_id: AtomicUsize::new(0),
                removals: AtomicUsize::new(0),
            }),
        }
    }

    /// Get a clone of the current state.
    pub fn get(&self) -> T {
        read(&self.shared.state).clone()
    }

    /// Read state without cloning it.
    ///
    /// `f` runs under the state's read lock and must not use this store
    /// through another handle. Use [`Store::get`] when it needs to.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = read(&self.shared.state);
        f(&state)
    }

    /// Replace the state and notify every subscriber.
    pub fn set(&self, new_state: T) {
        *write(&self.shared.state) = new_state;
        self.notify();
    }

    /// Replace the state with the result of `f` applied to the current state.
    ///
    /// `f` runs on a snapshot with no lock held, so it may read the store.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.get());
        self.set(next);
    }

    /// Mutate a copy of the state in place, then store it and notify.
    pub fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Subscribe to state changes.
    ///
    /// The callback runs once right away with the current state, then after
    /// every `set`, `update` or `modify`. It stays registered until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let callback: Callback<T> = Arc::new(callback);

        let count = {
            let mut subscribers = write(&self.shared.subscribers);
            subscribers.push((id, Arc::clone(&callback)));
            subscribers.len()
        };
        debug!(subscriber = id, subscribers = count, "subscribed");

        let current = self.get();
        callback(&current);

        let registry: Arc<dyn Registry + Send + Sync> = self.shared.clone();
        Subscription::new(id, Arc::downgrade(&registry))
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        read(&self.shared.subscribers).len()
    }

    /// Create a read-only store that tracks `f` applied to this store's state.
    pub fn map<U, F>(&self, f: F) -> Derived<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Derived::new(self, f, Vec::new())
    }

    /// Queue the current state for every subscriber and drain the queue.
    ///
    /// A mutation made from inside a callback only enqueues; the round that
    /// is already draining delivers it, so every subscriber sees values in
    /// the order they were set.
    fn notify(&self) {
        let value = self.get();
        let removals = self.shared.removals.load(Ordering::SeqCst);
        let subscribers = read(&self.shared.subscribers).clone();
        trace!(subscribers = subscribers.len(), "notifying");

        let already_draining = {
            let mut queue = lock(&self.shared.queue);
            let draining = !queue.is_empty();
            queue.extend(
                subscribers
                    .into_iter()
                    .map(|(id, callback)| (id, callback, value.clone(), removals)),
            );
            draining
        };
        if already_draining {
            return;
        }

        let _reset = QueueReset(&self.shared.queue);
        loop {
            let next = lock(&self.shared.queue).front().cloned();
            let Some((id, callback, value, queued_at)) = next else {
                break;
            };
            if self.is_live(id, queued_at) {
                callback(&value);
            }
            lock(&self.shared.queue).pop_front();
        }
    }

    /// Whether subscriber `id` is still registered. Only scans when something
    /// was unsubscribed since the entry was queued.
    fn is_live(&self, id: usize, queued_at: usize) -> bool {
        if self.shared.removals.load(Ordering::SeqCst) == queued_at {
            return true;
        }
        read(&self.shared.subscribers)
            .iter()
            .any(|(registered, _)| *registered == id)
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &*read(&self.shared.state))
            .field("subscribers", &read(&self.shared.subscribers).len())
            .finish()
    }
}

impl<T: Send + Sync> Registry for Shared<T> {
    fn remove(&self, id: usize) {
        let mut subscribers = write(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(registered, _)| *registered != id);
        if subscribers.len() != before {
            self.removals.fetch_add(1, Ordering::SeqCst);
            debug!(subscriber = id, subscribers = subscribers.len(), "unsubscribed");
        }
    }
}

/// Empties the pending queue when a drain finishes, including by unwinding
/// out of a panicking subscriber.
struct QueueReset<'a, T>(&'a Mutex<VecDeque<Pending<T>>>);

impl<T> Drop for QueueReset<'_, T> {
    fn drop(&mut self) {
        lock(self.0).clear();
    }
}

// A panicking subscriber cannot leave the state half-written, so poisoned
// locks are recovered instead of propagated.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct AppState {
        count: usize,
        name: String,
    }

    fn app_state() -> AppState {
        AppState {
            count: 0,
            name: "test".to_string(),
        }
    }

    #[test]
    fn store_get_set() {
        let store = Store::new(app_state());

        assert_eq!(store.get().count, 0);

        store.set(AppState {
            count: 42,
            name: "updated".to_string(),
        });

        assert_eq!(store.get().count, 42);
        assert_eq!(store.get().name, "updated");
    }

    #[test]
    fn store_update_replaces_with_result() {
        let store = Store::new(app_state());

        store.update(|state| AppState {
            count: state.count + 10,
            ..state.clone()
        });

        assert_eq!(store.get().count, 10);
        assert_eq!(store.get().name, "test");
    }

    #[test]
    fn store_modify_in_place() {
        let store = Store::new(app_state());

        store.modify(|state| state.count += 3);
        store.modify(|state| state.count += 3);

        assert_eq!(store.get().count, 6);
    }

    #[test]
    fn store_subscribe_calls_immediately_then_per_mutation() {
        let store = Store::new(app_state());

        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let _sub = store.subscribe(move |_state| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        store.modify(|state| state.count += 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);

        store.set(app_state());
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn set_with_equal_value_still_notifies() {
        let store = Store::new(7);
        let calls = Arc::new(AtomicUsize::new(0));

        let _sub = store.subscribe({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        store.set(7);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clones_share_state_and_subscribers() {
        let store = Store::new(1);
        let other = store.clone();
        let _sub = store.subscribe(|_| {});

        other.set(5);

        assert_eq!(store.get(), 5);
        assert_eq!(other.subscriber_count(), 1);
    }

    #[test]
    fn read_borrows_without_cloning() {
        let store = Store::new(vec![1, 2, 3]);
        assert_eq!(store.read(|v| v.iter().sum::<i32>()), 6);
    }

    #[test]
    fn subscriber_may_mutate_from_callback() {
        let store = Store::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _bump = store.subscribe({
            let store = store.clone();
            move |n: &i32| {
                if *n == 1 {
                    store.set(2);
                }
            }
        });
        let _log = store.subscribe({
            let seen = seen.clone();
            move |n: &i32| seen.lock().unwrap().push(*n)
        });

        store.set(1);

        assert_eq!(store.get(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribed_mid_round_is_skipped() {
        let store = Store::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let _killer = store.subscribe({
            let victim = victim.clone();
            move |n: &i32| {
                if *n == 1 {
                    if let Some(sub) = victim.lock().unwrap().take() {
                        sub.unsubscribe();
                    }
                }
            }
        });
        let sub = store.subscribe({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        *victim.lock().unwrap() = Some(sub);

        store.set(1);

        // Only the immediate call on subscribe.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn update_transform_can_read_the_store() {
        let store = Store::new(vec![1, 2]);
        let handle = store.clone();

        store.update(|current| {
            let mut next = current.clone();
            next.push(handle.get().len() + 1);
            next
        });

        assert_eq!(store.get(), vec![1, 2, 3]);
    }

    #[test]
    fn modify_closure_can_read_the_store() {
        let store = Store::new(vec![1, 2]);
        let handle = store.clone();

        store.modify(|current| current.push(handle.read(|v| v.len()) + 1));

        assert_eq!(store.get(), vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribing_another_subscriber_mid_round_keeps_the_rest() {
        let store = Store::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        *victim.lock().unwrap() = Some(store.subscribe(|_| {}));
        let _killer = store.subscribe({
            let victim = victim.clone();
            move |n: &i32| {
                if *n == 1 {
                    drop(victim.lock().unwrap().take());
                }
            }
        });
        let _counter = store.subscribe({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.set(1);
        store.set(2);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.subscriber_count(), 2);
    }

    #[test]
    fn panicking_subscriber_leaves_store_usable() {
        let store = Store::new(0);
        let calls = Arc::new(AtomicUsize::new(0));

        let _sub = store.subscribe({
            let calls = calls.clone();
            move |n: &i32| {
                calls.fetch_add(1, Ordering::SeqCst);
                if *n == 1 {
                    panic!("subscriber failed");
                }
            }
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| store.set(1)));
        assert!(result.is_err());
        assert_eq!(store.get(), 1);

        store.set(2);
        assert_eq!(store.get(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn default_uses_default_state() {
        let store: Store<Vec<String>> = Store::default();
        assert!(store.get().is_empty());
    }
}

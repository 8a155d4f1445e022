//! Observable value containers.
//!
//! A [`Store`] holds a value, hands out clones of it and calls its
//! subscribers synchronously whenever it is replaced. [`Derived`] stores
//! follow another store through a function.

mod derived;
mod store;
mod subscription;

pub use derived::Derived;
pub use store::Store;
pub use subscription::Subscription;

/// A value that can be read and observed.
pub trait Readable<T> {
    /// Clone of the current value.
    fn get(&self) -> T;

    /// Register `callback`; it runs immediately with the current value and
    /// again after every change.
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static;
}

/// A [`Readable`] value that can also be replaced.
pub trait Writable<T>: Readable<T> {
    /// Replace the value and notify subscribers.
    fn set(&self, value: T);

    /// Replace the value with `f(&current)` and notify subscribers.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T;
}

impl<T: Clone + Send + Sync + 'static> Readable<T> for Store<T> {
    fn get(&self) -> T {
        Store::get(self)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Store::subscribe(self, callback)
    }
}

impl<T: Clone + Send + Sync + 'static> Writable<T> for Store<T> {
    fn set(&self, value: T) {
        Store::set(self, value)
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        Store::update(self, f)
    }
}

impl<T: Clone + Send + Sync + 'static> Readable<T> for Derived<T> {
    fn get(&self) -> T {
        Derived::get(self)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Derived::subscribe(self, callback)
    }
}

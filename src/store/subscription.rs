use std::sync::Weak;

/// Something subscribers can be removed from.
pub(crate) trait Registry {
    fn remove(&self, id: usize);
}

/// RAII handle for a store subscriber.
///
/// Dropping the handle deregisters the callback. Use [`Subscription::detach`]
/// to keep the callback registered for as long as the store lives.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: usize,
    registry: Option<Weak<dyn Registry + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(id: usize, registry: Weak<dyn Registry + Send + Sync>) -> Self {
        Self {
            id,
            registry: Some(registry),
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the callback registered until the store itself is dropped.
    pub fn detach(mut self) {
        self.registry = None;
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.registry.is_some())
            .finish()
    }
}

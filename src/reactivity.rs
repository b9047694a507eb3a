//! Hooks into the host's reactive runtime.
//!
//! The form store never talks to a concrete UI runtime. Hosts hand in a
//! [`Batch`] strategy through [`ReactivityDeps`] and observe changes through
//! [`Notifier`] subscriptions.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Runs a group of state writes as one observable update.
///
/// Implementations must call `mutation` exactly once before returning.
pub trait Batch: Send + Sync {
    fn batch(&self, mutation: &mut dyn FnMut());
}

impl<F> Batch for F
where
    F: Fn(&mut dyn FnMut()) + Send + Sync,
{
    fn batch(&self, mutation: &mut dyn FnMut()) {
        (self)(mutation)
    }
}

/// Runs the mutation right away. Every write inside is observed on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateBatch;

impl Batch for ImmediateBatch {
    fn batch(&self, mutation: &mut dyn FnMut()) {
        mutation();
    }
}

/// Functions the submit lifecycle borrows from the host runtime.
#[derive(Clone, Default)]
pub struct ReactivityDeps {
    pub batch: Option<Arc<dyn Batch>>,
}

impl ReactivityDeps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(batch: impl Batch + 'static) -> Self {
        Self {
            batch: Some(Arc::new(batch)),
        }
    }

    pub fn run_batch(&self, mutation: impl FnOnce()) {
        let mut mutation = Some(mutation);
        let mut run_once = || {
            if let Some(mutation) = mutation.take() {
                mutation();
            }
        };
        match &self.batch {
            Some(batch) => batch.batch(&mut run_once),
            None => ImmediateBatch.batch(&mut run_once),
        }
    }
}

impl std::fmt::Debug for ReactivityDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactivityDeps")
            .field("batch", &self.batch.as_ref().map(|_| "<batch>"))
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(pub u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

struct NotifierInner {
    next_id: AtomicU64,
    depth: AtomicUsize,
    pending: AtomicBool,
    listeners: RwLock<BTreeMap<SubscriptionId, Listener>>,
}

/// Change fan-out for a form store.
///
/// While a batch is open, notifications are held back and flushed once when
/// the outermost batch closes.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                next_id: AtomicU64::new(1),
                depth: AtomicUsize::new(0),
                pending: AtomicBool::new(false),
                listeners: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let mut listeners = match self.inner.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.insert(id, Arc::new(listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = match self.inner.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.remove(&id).is_some()
    }

    pub fn is_batching(&self) -> bool {
        self.inner.depth.load(Ordering::SeqCst) > 0
    }

    pub fn notify(&self) {
        if self.is_batching() {
            self.inner.pending.store(true, Ordering::SeqCst);
            return;
        }
        self.emit();
    }

    fn emit(&self) {
        // Clone out so listeners may subscribe or read the store re-entrantly.
        let listeners = {
            let listeners = match self.inner.listeners.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            listeners.values().cloned().collect::<Vec<_>>()
        };
        tracing::trace!(listeners = listeners.len(), "emitting form change");
        for listener in listeners {
            listener();
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("depth", &self.inner.depth.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

struct BatchScope<'a> {
    notifier: &'a Notifier,
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        let previous = self.notifier.inner.depth.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 && self.notifier.inner.pending.swap(false, Ordering::SeqCst) {
            self.notifier.emit();
        }
    }
}

impl Batch for Notifier {
    fn batch(&self, mutation: &mut dyn FnMut()) {
        self.inner.depth.fetch_add(1, Ordering::SeqCst);
        let _scope = BatchScope { notifier: self };
        mutation();
    }
}

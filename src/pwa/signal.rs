//! Push-based state cells that replay their latest value to new subscribers.
//!
//! A [`Signal`] owns a value and a list of observers. Every [`Signal::set`]
//! stores the value and notifies current observers; a new subscriber receives
//! the stored value immediately. [`Signal::once_when`] registers a single-use
//! consumer that is dropped right after it runs. The facade hands out
//! read-only [`Observable`] views so only it can mutate its flags.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::util::subscribe::{PartialObserver, Unsubscribe};

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + 'static>;
type OnceCallback<T> = Box<dyn FnOnce(&T) + Send + 'static>;

pub struct Signal<T> {
    state: Arc<Mutex<SignalState<T>>>,
}

struct SignalState<T> {
    value: T,
    next_id: u64,
    observers: Vec<ObserverEntry<T>>,
    latches: Vec<LatchEntry<T>>,
}

struct ObserverEntry<T> {
    id: u64,
    observer: PartialObserver<T>,
}

struct LatchEntry<T> {
    id: u64,
    predicate: Predicate<T>,
    callback: OnceCallback<T>,
}

impl<T> SignalState<T> {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove(&mut self, id: u64) {
        self.observers.retain(|entry| entry.id != id);
        self.latches.retain(|entry| entry.id != id);
    }
}

impl<T: Clone> SignalState<T> {
    /// Stores `value` and collects what must be notified once the lock is released.
    fn store(&mut self, value: &T) -> PendingNotifications<T> {
        self.value = value.clone();
        let observers = self
            .observers
            .iter()
            .map(|entry| entry.observer.clone())
            .collect();
        let (fired, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.latches)
            .into_iter()
            .partition(|entry| (entry.predicate)(value));
        self.latches = pending;
        PendingNotifications { observers, fired }
    }
}

struct PendingNotifications<T> {
    observers: Vec<PartialObserver<T>>,
    fired: Vec<LatchEntry<T>>,
}

impl<T> PendingNotifications<T> {
    fn deliver(self, value: &T) {
        for observer in self.observers {
            observer.notify(value);
        }
        for latch in self.fired {
            (latch.callback)(value);
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(SignalState {
                value: initial,
                next_id: 0,
                observers: Vec::new(),
                latches: Vec::new(),
            })),
        }
    }

    /// Returns a clone of the current value.
    pub fn value(&self) -> T {
        self.state.lock().unwrap().value.clone()
    }

    /// Stores `value` and notifies every observer, then runs matching single-use consumers.
    pub fn set(&self, value: T) {
        let pending = {
            let mut state = self.state.lock().unwrap();
            state.store(&value)
        };
        pending.deliver(&value);
    }

    /// Stores `value` only when `f` accepts the transition from the current value.
    ///
    /// The check and the store happen under one lock, so concurrent callers
    /// cannot both accept the same transition. Returns `true` when the value was
    /// updated and observers were notified.
    pub fn set_if<F>(&self, value: T, f: F) -> bool
    where
        F: FnOnce(&T) -> bool,
    {
        let pending = {
            let mut state = self.state.lock().unwrap();
            if !f(&state.value) {
                return false;
            }
            state.store(&value)
        };
        pending.deliver(&value);
        true
    }

    /// Registers an observer and immediately replays the current value to it.
    pub fn subscribe(&self, observer: PartialObserver<T>) -> Subscription {
        let (id, current) = {
            let mut state = self.state.lock().unwrap();
            let id = state.allocate_id();
            state.observers.push(ObserverEntry {
                id,
                observer: observer.clone(),
            });
            (id, state.value.clone())
        };
        observer.notify(&current);
        self.subscription_for(id)
    }

    /// Convenience wrapper around [`Signal::subscribe`] for a `next` callback only.
    pub fn subscribe_fn<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe(PartialObserver::new().with_next(callback))
    }

    /// Runs `callback` once, the first time the value satisfies `predicate`.
    ///
    /// When the current value already satisfies it the callback runs before this
    /// returns and the returned subscription is inert.
    pub fn once_when<P, F>(&self, predicate: P, callback: F) -> Subscription
    where
        P: Fn(&T) -> bool + Send + 'static,
        F: FnOnce(&T) + Send + 'static,
    {
        let mut state = self.state.lock().unwrap();
        if predicate(&state.value) {
            let current = state.value.clone();
            drop(state);
            callback(&current);
            return Subscription::inert();
        }

        let id = state.allocate_id();
        state.latches.push(LatchEntry {
            id,
            predicate: Box::new(predicate),
            callback: Box::new(callback),
        });
        drop(state);
        self.subscription_for(id)
    }

    /// Notifies observers that no further values will arrive and drops every registration.
    pub fn complete(&self) {
        let observers = {
            let mut state = self.state.lock().unwrap();
            state.latches.clear();
            std::mem::take(&mut state.observers)
        };
        for entry in observers {
            entry.observer.finish();
        }
    }

    /// Number of observers and pending single-use consumers.
    pub fn listener_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.observers.len() + state.latches.len()
    }

    /// Read-only view for consumers that must not publish values.
    pub fn observable(&self) -> Observable<T> {
        Observable {
            signal: self.clone(),
        }
    }

    fn subscription_for(&self, id: u64) -> Subscription {
        let weak: Weak<Mutex<SignalState<T>>> = Arc::downgrade(&self.state);
        Subscription::new(Box::new(move || {
            if let Some(state) = weak.upgrade() {
                state.lock().unwrap().remove(id);
            }
        }))
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for Signal<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("Signal")
            .field("value", &state.value)
            .field("observers", &state.observers.len())
            .field("latches", &state.latches.len())
            .finish()
    }
}

/// Read-only handle over a [`Signal`].
#[derive(Clone)]
pub struct Observable<T> {
    signal: Signal<T>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn value(&self) -> T {
        self.signal.value()
    }

    pub fn subscribe(&self, observer: PartialObserver<T>) -> Subscription {
        self.signal.subscribe(observer)
    }

    pub fn subscribe_fn<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.signal.subscribe_fn(callback)
    }
}

impl<T> fmt::Debug for Observable<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&self.signal).finish()
    }
}

/// Handle returned by signal registrations. Dropping it keeps the registration alive;
/// call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    pub(crate) fn new(unsubscribe: Unsubscribe) -> Self {
        Self {
            unsubscribe: Some(unsubscribe),
        }
    }

    pub(crate) fn inert() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

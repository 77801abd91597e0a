//! State-change channels
//!
//! A [`StateChannel`] fans published values out to its observers, dropping
//! every value its [`EqualityPolicy`] judges a duplicate of the previous one.
//! Channels derived with [`StateChannel::project`] keep their own policy and
//! their own memory of the last value, so each level of a projection chain
//! filters independently.
//!
//! # Delivery semantics
//!
//! - A new observer is called immediately with the latest published value (if
//!   any), then once per non-duplicate publish.
//! - Observers are called in subscription order, on the publishing thread.
//! - After [`Subscription::cancel`] returns, the observer is never called
//!   again. A delivery running on another thread is waited for.

use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::equality::{EqualityPolicy, ValueEquality};

type Observer<T> = Box<dyn Fn(&T) + Send + Sync>;

/// One registered observer
struct Slot<T> {
    id: u64,
    /// Held for the whole duration of a delivery, so `deactivate` from another
    /// thread blocks until the observer has returned.
    active: ReentrantMutex<Cell<bool>>,
    observer: Observer<T>,
}

impl<T> Slot<T> {
    fn deliver(&self, value: &T) {
        let active = self.active.lock();
        if active.get() {
            (self.observer)(value);
        }
    }
}

/// Type-erased control over a slot, held by [`Subscription`]
trait SlotControl: Send + Sync {
    fn id(&self) -> u64;
    fn deactivate(&self);
    fn is_active(&self) -> bool;
}

impl<T: Send> SlotControl for Slot<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn deactivate(&self) {
        self.active.lock().set(false);
    }

    fn is_active(&self) -> bool {
        self.active.lock().get()
    }
}

/// Type-erased removal of a slot from its channel
trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

struct Registry<T> {
    latest: Option<T>,
    slots: Vec<Arc<Slot<T>>>,
    next_id: u64,
}

struct Inner<T> {
    policy: Box<dyn EqualityPolicy<T>>,
    /// Serializes publish and subscribe-replay so observers see values in
    /// publish order. Re-entrant so observers may publish or subscribe.
    delivery: ReentrantMutex<()>,
    registry: Mutex<Registry<T>>,
    /// Feed from the parent channel, for projected channels
    upstream: Mutex<Option<Subscription>>,
}

impl<T: Send> Unsubscribe for Inner<T> {
    fn unsubscribe(&self, id: u64) {
        self.registry.lock().slots.retain(|slot| slot.id != id);
    }
}

/// Subscribable, deduplicated stream of values
///
/// Cloning a channel is cheap and yields another handle to the same stream.
pub struct StateChannel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for StateChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for StateChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("StateChannel")
            .field("subscribers", &registry.slots.len())
            .field("has_value", &registry.latest.is_some())
            .finish()
    }
}

impl<T> StateChannel<T>
where
    T: Clone + Send + 'static,
{
    /// Create a channel with the given policy, optionally seeded with a value
    /// that new observers receive on subscribe.
    pub(crate) fn new<P>(policy: P, initial: Option<T>) -> Self
    where
        P: EqualityPolicy<T> + 'static,
    {
        Self::with_boxed_policy(Box::new(policy), initial)
    }

    pub(crate) fn with_boxed_policy(policy: Box<dyn EqualityPolicy<T>>, initial: Option<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                delivery: ReentrantMutex::new(()),
                registry: Mutex::new(Registry {
                    latest: initial,
                    slots: Vec::new(),
                    next_id: 0,
                }),
                upstream: Mutex::new(None),
            }),
        }
    }

    /// Publish a value to every observer unless it duplicates the last one.
    ///
    /// Returns `true` when the value was delivered.
    pub(crate) fn publish(&self, value: T) -> bool {
        let _delivery = self.inner.delivery.lock();
        // The policy runs unlocked so it may call back into this channel
        let previous = self.inner.registry.lock().latest.clone();
        if let Some(previous) = &previous {
            if self.inner.policy.is_duplicate(previous, &value) {
                log::trace!("Suppressed duplicate value");
                return false;
            }
        }
        let slots = {
            let mut registry = self.inner.registry.lock();
            registry.latest = Some(value.clone());
            registry.slots.clone()
        };

        log::trace!("Delivering value to {} observer(s)", slots.len());
        for slot in &slots {
            slot.deliver(&value);
        }
        true
    }

    /// Register an observer.
    ///
    /// The observer is called right away with the latest value, if the channel
    /// has one, and afterwards for every non-duplicate value. Dropping the
    /// returned [`Subscription`] cancels it.
    #[must_use = "dropping the subscription cancels it immediately"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _delivery = self.inner.delivery.lock();
        let (slot, latest) = {
            let mut registry = self.inner.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            let slot = Arc::new(Slot {
                id,
                active: ReentrantMutex::new(Cell::new(true)),
                observer: Box::new(observer),
            });
            registry.slots.push(Arc::clone(&slot));
            (slot, registry.latest.clone())
        };

        if let Some(value) = latest {
            slot.deliver(&value);
        }

        let channel: Weak<dyn Unsubscribe> = Arc::downgrade(&self.inner) as Weak<dyn Unsubscribe>;
        Subscription {
            slot,
            channel,
            detached: false,
        }
    }

    /// Derive a channel of `accessor(value)`, deduplicated by `PartialEq`.
    ///
    /// The derived channel stays subscribed to this one for as long as any
    /// handle to it is alive.
    pub fn project<U, F>(&self, accessor: F) -> StateChannel<U>
    where
        U: PartialEq + Clone + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.project_with(accessor, ValueEquality)
    }

    /// Derive a channel of `accessor(value)` with an explicit equality policy.
    pub fn project_with<U, F, P>(&self, accessor: F, policy: P) -> StateChannel<U>
    where
        U: Clone + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
        P: EqualityPolicy<U> + 'static,
    {
        let projected = StateChannel::new(policy, None);
        let target = Arc::downgrade(&projected.inner);
        let upstream = self.subscribe(move |value: &T| {
            if let Some(inner) = target.upgrade() {
                StateChannel { inner }.publish(accessor(value));
            }
        });
        *projected.inner.upstream.lock() = Some(upstream);
        projected
    }

    /// The most recently delivered value
    pub fn latest(&self) -> Option<T> {
        self.inner.registry.lock().latest.clone()
    }

    /// Number of registered observers
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().slots.len()
    }
}

/// Handle to a registered observer
///
/// Dropping the handle cancels the subscription; call [`detach`](Self::detach)
/// to keep the observer registered for the lifetime of the channel instead.
pub struct Subscription {
    slot: Arc<dyn SlotControl>,
    channel: Weak<dyn Unsubscribe>,
    detached: bool,
}

impl Subscription {
    /// Stop delivery to this observer.
    ///
    /// Idempotent, and safe to call from inside the observer itself. Other
    /// observers of the same channel are unaffected.
    pub fn cancel(&self) {
        self.slot.deactivate();
        if let Some(channel) = self.channel.upgrade() {
            channel.unsubscribe(self.slot.id());
        }
    }

    /// Whether the observer still receives values
    pub fn is_active(&self) -> bool {
        self.slot.is_active() && self.channel.strong_count() > 0
    }

    /// Keep the observer registered until the channel itself is dropped.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.slot.id())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::NeverEqual;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &T| sink.lock().push(value.clone()))
    }

    #[test]
    fn test_subscribe_replays_latest() {
        let channel = StateChannel::new(ValueEquality, Some(4));
        let (seen, observer) = recorder();
        let _sub = channel.subscribe(observer);
        assert_eq!(*seen.lock(), vec![4]);
    }

    #[test]
    fn test_unseeded_channel_waits_for_first_value() {
        let channel = StateChannel::new(ValueEquality, None);
        let (seen, observer) = recorder::<i32>();
        let _sub = channel.subscribe(observer);
        assert!(seen.lock().is_empty());

        channel.publish(1);
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_policy_may_inspect_its_channel() {
        let handle: Arc<OnceLock<StateChannel<i32>>> = Arc::new(OnceLock::new());
        let inspected = Arc::new(Mutex::new(Vec::new()));
        let policy = {
            let handle = Arc::clone(&handle);
            let inspected = Arc::clone(&inspected);
            move |previous: &i32, next: &i32| {
                if let Some(channel) = handle.get() {
                    inspected.lock().push((channel.latest(), channel.subscriber_count()));
                    let _ = format!("{channel:?}");
                }
                previous == next
            }
        };
        let channel = StateChannel::new(policy, Some(0));
        handle.set(channel.clone()).unwrap();
        let (seen, observer) = recorder();
        let _sub = channel.subscribe(observer);

        assert!(channel.publish(1));
        assert!(!channel.publish(1));
        assert_eq!(*seen.lock(), vec![0, 1]);
        assert_eq!(*inspected.lock(), vec![(Some(0), 1), (Some(1), 1)]);
    }

    #[test]
    fn test_consecutive_duplicates_suppressed() {
        let channel = StateChannel::new(ValueEquality, Some(0));
        let (seen, observer) = recorder();
        let _sub = channel.subscribe(observer);

        assert!(channel.publish(6));
        assert!(!channel.publish(6));
        assert!(channel.publish(7));
        assert!(channel.publish(6));
        assert_eq!(*seen.lock(), vec![0, 6, 7, 6]);
    }

    #[test]
    fn test_never_equal_delivers_everything() {
        let channel = StateChannel::new(NeverEqual, Some(1));
        let (seen, observer) = recorder();
        let _sub = channel.subscribe(observer);

        channel.publish(1);
        channel.publish(1);
        assert_eq!(*seen.lock(), vec![1, 1, 1]);
    }

    #[test]
    fn test_cancel_is_idempotent_and_isolated() {
        let channel = StateChannel::new(ValueEquality, Some(0));
        let (first_seen, first) = recorder();
        let (second_seen, second) = recorder();
        let first_sub = channel.subscribe(first);
        let _second_sub = channel.subscribe(second);
        assert_eq!(channel.subscriber_count(), 2);

        first_sub.cancel();
        first_sub.cancel();
        assert!(!first_sub.is_active());
        assert_eq!(channel.subscriber_count(), 1);

        channel.publish(1);
        assert_eq!(*first_seen.lock(), vec![0]);
        assert_eq!(*second_seen.lock(), vec![0, 1]);
    }

    #[test]
    fn test_drop_cancels_and_detach_keeps() {
        let channel = StateChannel::new(ValueEquality, Some(0));
        let dropped = Arc::new(AtomicUsize::new(0));
        let detached = Arc::new(AtomicUsize::new(0));

        {
            let counter = Arc::clone(&dropped);
            let _sub = channel.subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        let counter = Arc::clone(&detached);
        channel
            .subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .detach();

        channel.publish(1);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
        assert_eq!(detached.load(Ordering::SeqCst), 2);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[test]
    fn test_cancel_from_inside_observer() {
        let channel = StateChannel::new(ValueEquality, Some(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let counter = Arc::clone(&calls);
        let own = Arc::clone(&handle);
        let sub = channel.subscribe(move |value: &i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            if *value == 1 {
                if let Some(sub) = own.lock().as_ref() {
                    sub.cancel();
                }
            }
        });
        *handle.lock() = Some(sub);

        channel.publish(1);
        channel.publish(2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_projection_dedups_independently() {
        #[derive(Debug, Clone, PartialEq)]
        struct Pair {
            left: i32,
            right: i32,
        }

        let channel = StateChannel::new(NeverEqual, Some(Pair { left: 0, right: 0 }));
        let left = channel.project(|pair: &Pair| pair.left);
        let right = channel.project(|pair: &Pair| pair.right);
        let (left_seen, left_observer) = recorder();
        let (right_seen, right_observer) = recorder();
        let _left_sub = left.subscribe(left_observer);
        let _right_sub = right.subscribe(right_observer);

        channel.publish(Pair { left: 1, right: 0 });
        channel.publish(Pair { left: 1, right: 5 });
        channel.publish(Pair { left: 1, right: 5 });

        assert_eq!(*left_seen.lock(), vec![0, 1]);
        assert_eq!(*right_seen.lock(), vec![0, 5]);
        assert_eq!(right.latest(), Some(5));
    }

    #[test]
    fn test_chained_projection_stops_invisible_changes() {
        let channel = StateChannel::new(ValueEquality, Some((0u32, String::from("a"))));
        let number = channel.project(|state: &(u32, String)| state.0);
        let parity = number.project(|n: &u32| n % 2);
        let (seen, observer) = recorder();
        let _sub = parity.subscribe(observer);

        channel.publish((2, "a".into()));
        channel.publish((2, "b".into()));
        channel.publish((3, "b".into()));

        assert_eq!(*seen.lock(), vec![0, 1]);
        assert_eq!(number.latest(), Some(3));
    }

    #[test]
    fn test_dropping_projection_unsubscribes_upstream() {
        let channel = StateChannel::new(ValueEquality, Some(1));
        let projected = channel.project(|n: &i32| n * 10);
        assert_eq!(channel.subscriber_count(), 1);

        drop(projected);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_cancel_waits_for_inflight_delivery() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let channel = StateChannel::new(NeverEqual, None);
        let (entered_tx, entered_rx) = mpsc::channel();
        let finished = Arc::new(AtomicUsize::new(0));

        let done = Arc::clone(&finished);
        let sub = channel.subscribe(move |_: &i32| {
            let _ = entered_tx.send(());
            thread::sleep(Duration::from_millis(50));
            done.fetch_add(1, Ordering::SeqCst);
        });

        let publisher = {
            let channel = channel.clone();
            thread::spawn(move || channel.publish(1))
        };
        entered_rx.recv().unwrap();
        sub.cancel();
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        publisher.join().unwrap();
        channel.publish(2);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}

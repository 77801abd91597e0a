//! Store - owns the canonical state and runs the action cascade
//!
//! One call to [`Store::send`] drains the incoming action and every follow-up
//! action the reducer emits (transitively) against a private working copy of
//! the state. Only when the cascade is fully drained is the working copy
//! committed and published, so observers see at most one notification per
//! top-level `send`, never the intermediate states.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, ReentrantMutex};

use crate::channel::{StateChannel, Subscription};
use crate::config::{CascadeOrder, StoreConfig};
use crate::equality::{EqualityPolicy, NeverEqual, ValueEquality};
use crate::error::StoreError;
use crate::reducer::Reducer;

/// Outcome of one top-level [`Store::try_send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeReport {
    /// Actions run through the reducer, the top-level one included
    pub processed: usize,
    /// Whether the committed state reached the store's observers
    pub published: bool,
    /// The action was sent from inside an observer and queued until the
    /// current notification finished
    pub deferred: bool,
}

/// Holds the state and drives it through a single reducer
///
/// ```
/// use unistate::{reducer, Store};
///
/// #[derive(Debug)]
/// enum Action {
///     Increment,
///     SetValue(i32),
/// }
///
/// let store = Store::new(
///     0,
///     reducer(|state: &mut i32, action: Action| match action {
///         Action::Increment => vec![Action::SetValue(*state + 1)],
///         Action::SetValue(value) => {
///             *state = value;
///             vec![]
///         }
///     }),
/// );
/// store.send(Action::Increment);
/// assert_eq!(store.state(), 1);
/// ```
pub struct Store<S, A> {
    reducer: Box<dyn Reducer<S, A>>,
    config: StoreConfig,
    state: Mutex<S>,
    /// Serializes clone -> reduce -> commit -> publish across callers.
    sending: ReentrantMutex<()>,
    /// Set while a top-level cascade or its notification is in progress.
    busy: AtomicBool,
    /// Actions sent from observers during a notification
    deferred: Mutex<VecDeque<A>>,
    channel: StateChannel<S>,
}

/// Builder for [`Store`] with a custom equality policy or config
pub struct StoreBuilder<S, A> {
    initial: S,
    reducer: Box<dyn Reducer<S, A>>,
    policy: Box<dyn EqualityPolicy<S>>,
    config: StoreConfig,
}

impl<S, A> StoreBuilder<S, A>
where
    S: Clone + Send + 'static,
    A: 'static,
{
    /// Decide duplicates with `policy`
    pub fn equality<P>(mut self, policy: P) -> Self
    where
        P: EqualityPolicy<S> + 'static,
    {
        self.policy = Box::new(policy);
        self
    }

    /// Decide duplicates with `PartialEq`
    pub fn value_equality(self) -> Self
    where
        S: PartialEq,
    {
        self.equality(ValueEquality)
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Store<S, A> {
        log::debug!(
            "Creating store (order: {:?}, max depth: {:?})",
            self.config.cascade_order,
            self.config.max_cascade_depth
        );
        Store {
            reducer: self.reducer,
            config: self.config,
            channel: StateChannel::with_boxed_policy(self.policy, Some(self.initial.clone())),
            state: Mutex::new(self.initial),
            sending: ReentrantMutex::new(()),
            busy: AtomicBool::new(false),
            deferred: Mutex::new(VecDeque::new()),
        }
    }
}

impl<S, A> Store<S, A>
where
    S: Clone + Send + 'static,
    A: 'static,
{
    /// Create a store that suppresses notifications for unchanged state
    pub fn new<R>(initial: S, reducer: R) -> Self
    where
        S: PartialEq,
        R: Reducer<S, A> + 'static,
    {
        Self::builder(initial, reducer).value_equality().build()
    }

    /// Start building a store.
    ///
    /// Without further configuration every committed state is published
    /// ([`NeverEqual`]), since `S` may have no notion of equality.
    pub fn builder<R>(initial: S, reducer: R) -> StoreBuilder<S, A>
    where
        R: Reducer<S, A> + 'static,
    {
        StoreBuilder {
            initial,
            reducer: Box::new(reducer),
            policy: Box::new(NeverEqual),
            config: StoreConfig::default(),
        }
    }

    /// Snapshot of the canonical state
    pub fn state(&self) -> S {
        self.state.lock().clone()
    }

    /// Borrow the canonical state without cloning it.
    ///
    /// Do not call [`send`](Self::send) from `f`.
    pub fn with_state<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.state.lock())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Process `action` and all its follow-ups, then publish once.
    ///
    /// A cascade that exceeds `max_cascade_depth` is discarded and logged;
    /// use [`try_send`](Self::try_send) to observe that case.
    pub fn send(&self, action: A) {
        if let Err(err) = self.try_send(action) {
            log::error!("Discarded cascade: {}", err);
        }
    }

    /// Like [`send`](Self::send), but reports what happened.
    ///
    /// Sending from inside an observer does not nest: the action is queued
    /// and processed as its own top-level action once the current
    /// notification has reached every observer.
    pub fn try_send(&self, action: A) -> Result<CascadeReport, StoreError> {
        let _sending = self.sending.lock();
        if self.busy.swap(true, Ordering::AcqRel) {
            log::trace!("Deferring action sent during notification");
            self.deferred.lock().push_back(action);
            return Ok(CascadeReport {
                deferred: true,
                ..CascadeReport::default()
            });
        }
        let _busy = BusyGuard {
            busy: &self.busy,
            deferred: &self.deferred,
        };

        let report = self.commit(action);

        loop {
            let Some(next) = self.deferred.lock().pop_front() else {
                break;
            };
            if let Err(err) = self.commit(next) {
                log::error!("Discarded deferred cascade: {}", err);
            }
        }

        report
    }

    fn commit(&self, action: A) -> Result<CascadeReport, StoreError> {
        let mut working = self.state.lock().clone();
        let processed = self.run_cascade(&mut working, action)?;

        *self.state.lock() = working.clone();
        let published = self.channel.publish(working);
        log::debug!(
            "Committed cascade of {} action(s), published: {}",
            processed,
            published
        );
        Ok(CascadeReport {
            processed,
            published,
            deferred: false,
        })
    }

    /// Drain `action` and its follow-ups into `working`.
    fn run_cascade(&self, working: &mut S, action: A) -> Result<usize, StoreError> {
        let mut pending = VecDeque::from([(action, 0usize)]);
        let mut processed = 0;

        while let Some((action, depth)) = pending.pop_front() {
            if let Some(limit) = self.config.max_cascade_depth {
                if depth > limit {
                    log::warn!("Cascade reached depth {} (limit {})", depth, limit);
                    return Err(StoreError::CascadeDepthExceeded { limit });
                }
            }

            let follow_ups = self.reducer.reduce(working, action);
            processed += 1;
            log::trace!(
                "Cascade step {} at depth {} emitted {} follow-up(s)",
                processed,
                depth,
                follow_ups.len()
            );

            let next_depth = depth + 1;
            match self.config.cascade_order {
                CascadeOrder::DepthFirst => {
                    for follow_up in follow_ups.into_iter().rev() {
                        pending.push_front((follow_up, next_depth));
                    }
                }
                CascadeOrder::BreadthFirst => {
                    pending.extend(follow_ups.into_iter().map(|a| (a, next_depth)));
                }
            }
        }

        Ok(processed)
    }

    /// Observe committed states. See [`StateChannel::subscribe`].
    #[must_use = "dropping the subscription cancels it immediately"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.channel.subscribe(observer)
    }

    /// Derived channel over part of the state, deduplicated by `PartialEq`
    pub fn project<U, F>(&self, accessor: F) -> StateChannel<U>
    where
        U: PartialEq + Clone + Send + 'static,
        F: Fn(&S) -> U + Send + Sync + 'static,
    {
        self.channel.project(accessor)
    }

    /// Derived channel over part of the state with an explicit policy
    pub fn project_with<U, F, P>(&self, accessor: F, policy: P) -> StateChannel<U>
    where
        U: Clone + Send + 'static,
        F: Fn(&S) -> U + Send + Sync + 'static,
        P: EqualityPolicy<U> + 'static,
    {
        self.channel.project_with(accessor, policy)
    }

    /// Handle to the store's root channel
    pub fn channel(&self) -> StateChannel<S> {
        self.channel.clone()
    }
}

impl<S, A> fmt::Debug for Store<S, A>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.state.lock())
            .field("config", &self.config)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Clears the busy flag even if the reducer panics.
/// Marks a send as in progress. Actions still queued when a reducer or
/// observer panics belong to the aborted send and are dropped with it.
struct BusyGuard<'a, A> {
    busy: &'a AtomicBool,
    deferred: &'a Mutex<VecDeque<A>>,
}

impl<A> Drop for BusyGuard<'_, A> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let dropped = std::mem::take(&mut *self.deferred.lock());
            if !dropped.is_empty() {
                log::warn!("Dropped {} deferred action(s) after a panic", dropped.len());
            }
        }
        self.busy.store(false, Ordering::Release);
    }
}

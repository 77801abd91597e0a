//! Reducers
//!
//! A reducer is the only code allowed to change a store's state. It receives
//! the working copy of the state plus one action, mutates the state in place,
//! and returns the follow-up actions that the store drains before publishing.

use std::marker::PhantomData;
use std::sync::Arc;

/// Pure state transition driven by one action
///
/// Given the same state and action, a reducer must produce the same state and
/// the same follow-ups. An action a reducer does not handle should leave the
/// state untouched and return no follow-ups.
pub trait Reducer<S, A>: Send + Sync {
    /// Apply `action` to `state` and return the follow-up actions in order.
    fn reduce(&self, state: &mut S, action: A) -> Vec<A>;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(&mut S, A) -> Vec<A> + Send + Sync,
{
    fn reduce(&self, state: &mut S, action: A) -> Vec<A> {
        self(state, action)
    }
}

impl<S, A> Reducer<S, A> for Box<dyn Reducer<S, A>> {
    fn reduce(&self, state: &mut S, action: A) -> Vec<A> {
        (**self).reduce(state, action)
    }
}

/// A reducer shared between several owners.
///
/// `Arc<R>` cannot implement [`Reducer`] next to the closure impl, so shared
/// reducers go through this handle instead. Cloning it clones the `Arc`.
///
/// ```
/// use std::sync::Arc;
/// use unistate::{Reducer, Shared};
///
/// let inc = Shared::new(Arc::new(|state: &mut i32, _action: ()| {
///     *state += 1;
///     vec![]
/// }));
/// let other = inc.clone();
/// let mut value = 0;
/// inc.reduce(&mut value, ());
/// other.reduce(&mut value, ());
/// assert_eq!(value, 2);
/// ```
pub struct Shared<R: ?Sized>(Arc<R>);

impl<R: ?Sized> Shared<R> {
    pub fn new(reducer: Arc<R>) -> Self {
        Self(reducer)
    }
}

impl<R: ?Sized> Clone for Shared<R> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<R: ?Sized> From<Arc<R>> for Shared<R> {
    fn from(reducer: Arc<R>) -> Self {
        Self(reducer)
    }
}

impl<S, A, R> Reducer<S, A> for Shared<R>
where
    R: Reducer<S, A> + ?Sized,
{
    fn reduce(&self, state: &mut S, action: A) -> Vec<A> {
        self.0.reduce(state, action)
    }
}

/// Pin a closure to the reducer signature so its argument types are inferred.
///
/// ```
/// use unistate::{reducer, Reducer};
///
/// let double = reducer(|state: &mut i32, _action: ()| {
///     *state *= 2;
///     vec![]
/// });
/// let mut value = 21;
/// assert!(double.reduce(&mut value, ()).is_empty());
/// assert_eq!(value, 42);
/// ```
pub fn reducer<S, A, F>(f: F) -> F
where
    F: Fn(&mut S, A) -> Vec<A> + Send + Sync,
{
    f
}

/// Two reducers run in sequence on every action. See [`combine`].
#[derive(Debug, Clone)]
pub struct Combined<R1, R2> {
    first: R1,
    second: R2,
}

/// Run `first` and then `second` on every action.
///
/// Both see the same action; `second` sees the state as `first` left it.
/// Follow-ups are concatenated, `first`'s before `second`'s.
pub fn combine<R1, R2>(first: R1, second: R2) -> Combined<R1, R2> {
    Combined { first, second }
}

impl<S, A, R1, R2> Reducer<S, A> for Combined<R1, R2>
where
    A: Clone,
    R1: Reducer<S, A>,
    R2: Reducer<S, A>,
{
    fn reduce(&self, state: &mut S, action: A) -> Vec<A> {
        let mut follow_ups = self.first.reduce(state, action.clone());
        follow_ups.extend(self.second.reduce(state, action));
        follow_ups
    }
}

/// A child reducer lifted into a parent state and action. See [`scope`].
pub struct Scoped<R, L, E, M, C, CA> {
    inner: R,
    child: L,
    extract: E,
    embed: M,
    _child: PhantomData<fn(&mut C, CA)>,
}

/// Lift a reducer over a child state and child action into the parent.
///
/// - `child` selects the child state inside the parent state
/// - `extract` picks the child action out of a parent action; `None` makes the
///   parent action a no-op for this reducer
/// - `embed` turns the child's follow-ups back into parent actions
pub fn scope<S, A, C, CA, R, L, E, M>(
    inner: R,
    child: L,
    extract: E,
    embed: M,
) -> Scoped<R, L, E, M, C, CA>
where
    R: Reducer<C, CA>,
    L: Fn(&mut S) -> &mut C + Send + Sync,
    E: Fn(A) -> Option<CA> + Send + Sync,
    M: Fn(CA) -> A + Send + Sync,
{
    Scoped {
        inner,
        child,
        extract,
        embed,
        _child: PhantomData,
    }
}

impl<S, A, C, CA, R, L, E, M> Reducer<S, A> for Scoped<R, L, E, M, C, CA>
where
    R: Reducer<C, CA>,
    L: Fn(&mut S) -> &mut C + Send + Sync,
    E: Fn(A) -> Option<CA> + Send + Sync,
    M: Fn(CA) -> A + Send + Sync,
{
    fn reduce(&self, state: &mut S, action: A) -> Vec<A> {
        let Some(child_action) = (self.extract)(action) else {
            return Vec::new();
        };
        self.inner
            .reduce((self.child)(state), child_action)
            .into_iter()
            .map(&self.embed)
            .collect()
    }
}

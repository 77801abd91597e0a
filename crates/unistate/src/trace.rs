//! Tracing reducer (decorator pattern)
//!
//! Wraps any [`Reducer`] and reports every action it handles together with a
//! diff of a chosen slice of the state. The wrapper calls the inner reducer
//! exactly once and returns its follow-ups untouched, so a store behaves the
//! same with or without it. Whether to wrap is the caller's decision, e.g.
//! only in debug builds.

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::diff::render_diff;
use crate::reducer::Reducer;

/// Log target used by [`log_sink`]
pub const TRACE_TARGET: &str = "unistate::trace";

/// Reducer that traces actions and state changes of an inner reducer
pub struct Traced<R, P, K, L> {
    inner: R,
    projection: P,
    sink: K,
    _projected: PhantomData<fn() -> L>,
}

/// Wrap `inner` so every action is reported to `sink`.
///
/// `projection` picks the part of the state worth diffing; it is rendered
/// with `{:#?}` before and after the inner reducer runs.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use unistate::{reducer, with_tracing, Reducer};
///
/// let messages = Arc::new(Mutex::new(Vec::new()));
/// let sink = {
///     let messages = Arc::clone(&messages);
///     move |message: &str| messages.lock().unwrap().push(message.to_string())
/// };
/// let inner = reducer(|state: &mut i32, delta: i32| {
///     *state += delta;
///     vec![]
/// });
/// let traced = with_tracing(inner, |state: &i32| *state, sink);
///
/// let mut state = 0;
/// traced.reduce(&mut state, 2);
/// assert_eq!(messages.lock().unwrap()[0], "received action:\n  2\n- 0\n+ 2");
/// ```
pub fn with_tracing<S, A, L, R, P, K>(inner: R, projection: P, sink: K) -> Traced<R, P, K, L>
where
    A: Debug,
    L: Debug,
    R: Reducer<S, A>,
    P: Fn(&S) -> L + Send + Sync,
    K: Fn(&str) + Send + Sync,
{
    Traced {
        inner,
        projection,
        sink,
        _projected: PhantomData,
    }
}

/// Sink that forwards trace messages to the `log` facade at debug level
pub fn log_sink() -> impl Fn(&str) + Send + Sync + Clone {
    |message: &str| log::debug!(target: TRACE_TARGET, "{}", message)
}

impl<R, P, K, L> Traced<R, P, K, L> {
    /// The wrapped reducer
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<S, A, L, R, P, K> Reducer<S, A> for Traced<R, P, K, L>
where
    A: Debug,
    L: Debug,
    R: Reducer<S, A>,
    P: Fn(&S) -> L + Send + Sync,
    K: Fn(&str) + Send + Sync,
{
    fn reduce(&self, state: &mut S, action: A) -> Vec<A> {
        let rendered_action = format!("{:?}", action);
        let before = format!("{:#?}", (self.projection)(state));

        let follow_ups = self.inner.reduce(state, action);

        let after = format!("{:#?}", (self.projection)(state));
        let mut message = format!("received action:\n{}", indent(&rendered_action));
        match render_diff(&before, &after) {
            Some(diff) => {
                message.push('\n');
                message.push_str(&diff);
            }
            None => message.push_str("\n  (No state changes)"),
        }
        if !follow_ups.is_empty() {
            message.push_str(&format!("\n  follow-ups: {:?}", follow_ups));
        }

        (self.sink)(&message);
        follow_ups
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Increment,
        IncrementTwice,
        SetValue(i64),
    }

    fn counter(state: &mut i64, action: CounterAction) -> Vec<CounterAction> {
        match action {
            CounterAction::Increment => vec![CounterAction::SetValue(*state + 1)],
            CounterAction::IncrementTwice => {
                vec![CounterAction::Increment, CounterAction::Increment]
            }
            CounterAction::SetValue(value) => {
                *state = value;
                vec![]
            }
        }
    }

    fn collecting_sink() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        (messages, move |message: &str| {
            sink.lock().push(message.to_string())
        })
    }

    #[test]
    fn test_trace_messages() {
        let (messages, sink) = collecting_sink();
        let traced = with_tracing(counter, |state: &i64| *state, sink);

        let mut state = 0;
        let follow_ups = traced.reduce(&mut state, CounterAction::Increment);
        assert_eq!(follow_ups, vec![CounterAction::SetValue(1)]);
        traced.reduce(&mut state, CounterAction::SetValue(1));

        assert_eq!(
            *messages.lock(),
            vec![
                "received action:\n  Increment\n  (No state changes)\n  follow-ups: [SetValue(1)]"
                    .to_string(),
                "received action:\n  SetValue(1)\n- 0\n+ 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_tracing_is_transparent_to_store() {
        let script = [
            CounterAction::IncrementTwice,
            CounterAction::SetValue(7),
            CounterAction::SetValue(7),
            CounterAction::Increment,
        ];

        let plain = Store::new(0, counter);
        let (messages, sink) = collecting_sink();
        let traced = Store::new(0, with_tracing(counter, |state: &i64| *state, sink));

        let record = |store: &Store<i64, CounterAction>| {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let target = Arc::clone(&seen);
            let sub = store.subscribe(move |state: &i64| target.lock().push(*state));
            (seen, sub)
        };
        let (plain_seen, _plain_sub) = record(&plain);
        let (traced_seen, _traced_sub) = record(&traced);

        for action in script {
            plain.send(action.clone());
            traced.send(action);
        }

        assert_eq!(*plain_seen.lock(), *traced_seen.lock());
        assert_eq!(*traced_seen.lock(), vec![0, 2, 7, 8]);
        // one message per reducer call: 5 + 1 + 1 + 2
        assert_eq!(messages.lock().len(), 9);
    }

    #[test]
    fn test_struct_projection_diff() {
        #[derive(Debug, Default)]
        struct App {
            count: i64,
            secret: String,
        }

        let (messages, sink) = collecting_sink();
        let inner = crate::reducer::reducer(|app: &mut App, action: CounterAction| {
            if let CounterAction::SetValue(value) = action {
                app.count = value;
                app.secret = "changed".into();
            }
            vec![]
        });
        // only the count is part of the traced projection
        let traced = with_tracing(inner, |app: &App| app.count, sink);

        let mut app = App::default();
        traced.reduce(&mut app, CounterAction::SetValue(3));
        assert_eq!(app.secret, "changed");
        assert_eq!(
            messages.lock()[0],
            "received action:\n  SetValue(3)\n- 0\n+ 3"
        );
    }
}

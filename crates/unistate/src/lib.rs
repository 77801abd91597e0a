//! # unistate
//!
//! A small unidirectional state store. The state lives in a [`Store`] and
//! changes only through a [`Reducer`] driven by actions.
//!
//! ## Action Cascades
//!
//! A reducer may answer an action with follow-up actions. The store drains
//! that whole cascade against a private working copy and commits once, so a
//! single [`Store::send`] yields at most one notification no matter how many
//! follow-ups ran:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use unistate::{reducer, Store};
//!
//! #[derive(Debug)]
//! enum Action {
//!     IncrementTwice,
//!     Increment,
//!     SetValue(i64),
//! }
//!
//! let store = Store::new(
//!     0,
//!     reducer(|state: &mut i64, action: Action| match action {
//!         Action::IncrementTwice => vec![Action::Increment, Action::Increment],
//!         Action::Increment => vec![Action::SetValue(*state + 1)],
//!         Action::SetValue(value) => {
//!             *state = value;
//!             vec![]
//!         }
//!     }),
//! );
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let _sub = store.subscribe(move |state: &i64| sink.lock().unwrap().push(*state));
//!
//! store.send(Action::IncrementTwice);
//! assert_eq!(*seen.lock().unwrap(), vec![0, 2]);
//! ```
//!
//! ## Channels
//!
//! Observers subscribe to a [`StateChannel`], which suppresses consecutive
//! duplicates according to an [`EqualityPolicy`]. [`StateChannel::project`]
//! derives independent channels over parts of the state.
//!
//! ## Composition
//!
//! Reducers compose by wrapping before the store is built: [`combine`],
//! [`scope`] and the tracing decorator [`with_tracing`].

pub mod channel;
pub mod config;
pub mod diff;
pub mod equality;
pub mod error;
pub mod reducer;
pub mod store;
pub mod trace;

// Re-export commonly used types
pub use channel::{StateChannel, Subscription};
pub use config::{CascadeOrder, StoreConfig};
pub use equality::{EqualityPolicy, NeverEqual, ValueEquality};
pub use error::{ConfigError, StoreError};
pub use reducer::{combine, reducer, scope, Combined, Reducer, Scoped, Shared};
pub use store::{CascadeReport, Store, StoreBuilder};
pub use trace::{log_sink, with_tracing, Traced};

//! Equality policies
//!
//! A channel consults its policy to decide whether a freshly published value
//! is a duplicate of the previous one. Duplicates are not delivered.

/// Decides whether two consecutive values count as the same for notification
/// purposes.
///
/// Implementations must be pure, reflexive and symmetric. Transitivity is not
/// required, but repeated calls on the same inputs must agree.
///
/// Any `Fn(&T, &T) -> bool + Send + Sync` closure is a policy:
///
/// ```
/// use unistate::EqualityPolicy;
///
/// let within_one = |a: &i32, b: &i32| (a - b).abs() <= 1;
/// assert!(within_one.is_duplicate(&3, &4));
/// assert!(!within_one.is_duplicate(&3, &5));
/// ```
pub trait EqualityPolicy<T: ?Sized>: Send + Sync {
    /// Returns `true` when `next` should be suppressed after `previous`.
    fn is_duplicate(&self, previous: &T, next: &T) -> bool;
}

/// Structural equality via [`PartialEq`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueEquality;

impl<T: PartialEq + ?Sized> EqualityPolicy<T> for ValueEquality {
    fn is_duplicate(&self, previous: &T, next: &T) -> bool {
        previous == next
    }
}

/// Treats every value as new, so every publish notifies.
///
/// The fallback for state types without a meaningful notion of equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEqual;

impl<T: ?Sized> EqualityPolicy<T> for NeverEqual {
    fn is_duplicate(&self, _previous: &T, _next: &T) -> bool {
        false
    }
}

impl<T: ?Sized, F> EqualityPolicy<T> for F
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    fn is_duplicate(&self, previous: &T, next: &T) -> bool {
        self(previous, next)
    }
}

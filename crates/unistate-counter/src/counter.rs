//! Counter state, actions and reducer

/// Counter state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterState {
    pub count: i64,
    /// Previous values, oldest first
    pub history: Vec<i64>,
}

/// Counter actions
#[derive(Debug, Clone, PartialEq)]
pub enum CounterAction {
    Increment,
    Decrement,
    /// Two increments, published as one change
    IncrementTwice,
    SetValue(i64),
    DoNothing,
    Reset,
}

/// Reducer for the counter.
///
/// Every change of `count` funnels through `SetValue`, so the history is
/// kept in one place.
pub fn reduce(state: &mut CounterState, action: CounterAction) -> Vec<CounterAction> {
    match action {
        CounterAction::Increment => vec![CounterAction::SetValue(state.count + 1)],
        CounterAction::Decrement => vec![CounterAction::SetValue(state.count - 1)],
        CounterAction::IncrementTwice => {
            vec![CounterAction::Increment, CounterAction::Increment]
        }
        CounterAction::SetValue(value) => {
            if value != state.count {
                state.history.push(state.count);
                state.count = value;
            }
            vec![]
        }
        CounterAction::DoNothing => vec![],
        CounterAction::Reset => {
            state.history.clear();
            state.count = 0;
            vec![]
        }
    }
}

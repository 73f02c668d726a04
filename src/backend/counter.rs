use super::ViewModel;
use crate::proto::Value;
use crate::BackendError;

pub const COUNTER_TYPE: &str = "counter";
pub const COUNT_PROPERTY: &str = "count";

/// Counter view-model: one `count` property and four actions.
///
/// | action      | args      | result    |
/// |-------------|-----------|-----------|
/// | `increment` | -         | new count |
/// | `decrement` | -         | new count |
/// | `add`       | `[n:int]` | new count |
/// | `reset`     | -         | `0`       |
pub fn counter() -> ViewModel {
    ViewModel::builder(COUNTER_TYPE)
        .property(COUNT_PROPERTY, 0i64)
        .action("increment", |vm, _| step(vm, 1))
        .action("decrement", |vm, _| step(vm, -1))
        .action("add", |vm, args| {
            let delta = args.first().and_then(Value::as_i64).ok_or_else(|| {
                BackendError::ExecutionFailed(format!(
                    "add expects one integer argument, got [{}]",
                    args.iter().map(Value::kind).collect::<Vec<_>>().join(", ")
                ))
            })?;
            step(vm, delta)
        })
        .action("reset", |vm, _| {
            vm.set_prop(COUNT_PROPERTY, 0i64);
            Ok(Value::Int(0))
        })
        .build()
}

fn step(
    vm: &ViewModel,
    delta: i64,
) -> std::result::Result<Value, BackendError> {
    vm.atomically(|vm| {
        let current = vm.get_prop(COUNT_PROPERTY).and_then(|v| v.as_i64()).unwrap_or(0);
        let next = current
            .checked_add(delta)
            .ok_or_else(|| BackendError::ExecutionFailed("counter overflow".to_string()))?;
        vm.set_prop(COUNT_PROPERTY, next);
        Ok(Value::Int(next))
    })
}

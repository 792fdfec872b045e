use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Queue of the overrides applied to every method.
const GLOBAL_OVERRIDE_KEY: &str = "global";

/// A response forced on the mock node.
#[derive(Debug, derive_more::Display, Clone)]
pub enum CallResponse {
    /// Fail as if the node couldn't be reached.
    #[display("Transport error: {_0}")]
    Error(String),
    /// Answer with a JSON-RPC error object.
    #[display("Node error {code}: {message}")]
    NodeError { code: i64, message: String },
    /// Answer with `null`, e.g. a receipt that isn't available yet.
    Null,
    /// Answer normally.
    Success,
    /// Fail with a transport error on every `frequency`-th call.
    #[display("FailEachNth: {error} every {frequency} requests")]
    FailEachNth { error: String, frequency: usize },
}

impl CallResponse {
    /// The error object a node returns when a filter id is unknown to it.
    pub fn filter_not_found() -> Self {
        CallResponse::NodeError {
            code: -32000,
            message: "filter not found".to_string(),
        }
    }

    /// The error object a node returns for a method it doesn't implement.
    pub fn method_not_found() -> Self {
        CallResponse::NodeError {
            code: -32601,
            message: "the method does not exist/is not available".to_string(),
        }
    }
}

/// How long a forced response stays in place.
#[derive(Debug, derive_more::Display, Clone)]
pub enum CallOverride {
    #[display("once -> {}", _0)]
    Once(CallResponse),
    #[display("until {until:?} -> {response}")]
    Until {
        response: CallResponse,
        until: std::time::Instant,
    },
    #[display("{n} times -> {response}")]
    NTimes { response: CallResponse, n: usize },
    #[display("always -> {}", _0)]
    Always(CallResponse),
}

impl CallOverride {
    fn response(&self) -> &CallResponse {
        match self {
            CallOverride::Once(response)
            | CallOverride::Until { response, .. }
            | CallOverride::NTimes { response, .. }
            | CallOverride::Always(response) => response,
        }
    }

    /// Whether the override still applies after `applied` uses.
    fn is_live(&self, applied: usize) -> bool {
        match self {
            CallOverride::Once(_) => applied < 1,
            CallOverride::Until { until, .. } => std::time::Instant::now() < *until,
            CallOverride::NTimes { n, .. } => applied < *n,
            CallOverride::Always(_) => true,
        }
    }
}

/// An override taken for one call, with the number of calls it has answered so far
/// including this one.
#[derive(Debug, Clone)]
pub struct ActiveOverride {
    pub response: CallOverride,
    pub endpoint_name: String,
    pub call_count: usize,
}

impl ActiveOverride {
    pub fn response(&self) -> &CallResponse {
        self.response.response()
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    /// Queued overrides per method name, plus the [`GLOBAL_OVERRIDE_KEY`] queue.
    overrides: HashMap<String, Vec<ActiveOverride>>,
    calls: HashMap<String, usize>,
}

impl ControllerState {
    fn apply_first(&mut self, key: &str) -> Option<ActiveOverride> {
        let queue = self.overrides.get_mut(key)?;
        queue.retain(|o| o.response.is_live(o.call_count));
        let active = queue.first_mut()?;
        active.call_count += 1;
        let taken = active.clone();
        queue.retain(|o| o.response.is_live(o.call_count));
        Some(taken)
    }
}

/// Forces responses of the mock node and counts the calls it receives.
#[derive(Debug, Default, Clone)]
pub struct MockController {
    state: Arc<Mutex<ControllerState>>,
}

impl MockController {
    pub fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues an override applied to every method, ahead of method-specific ones.
    pub fn global_override(&self, rpc_override: CallOverride) {
        self.override_rpc(GLOBAL_OVERRIDE_KEY, rpc_override);
    }

    pub fn override_rpc(&self, rpc_name: &str, rpc_override: CallOverride) {
        log::debug!("Overriding {rpc_name}: {rpc_override}");
        self.lock()
            .overrides
            .entry(rpc_name.to_string())
            .or_default()
            .push(ActiveOverride {
                response: rpc_override,
                endpoint_name: rpc_name.to_string(),
                call_count: 0,
            });
    }

    /// The override answering the next call of `rpc_name`, if any.
    pub fn take_next_override(&self, rpc_name: &str) -> Option<ActiveOverride> {
        let mut state = self.lock();
        if let Some(mut global) = state.apply_first(GLOBAL_OVERRIDE_KEY) {
            global.endpoint_name = format!("{GLOBAL_OVERRIDE_KEY}: {rpc_name}");
            return Some(global);
        }
        state.apply_first(rpc_name)
    }

    pub fn record_call(&self, rpc_name: &str) {
        *self.lock().calls.entry(rpc_name.to_string()).or_default() += 1;
    }

    /// Number of times `rpc_name` was called, overridden or not.
    pub fn call_count(&self, rpc_name: &str) -> usize {
        self.lock().calls.get(rpc_name).copied().unwrap_or_default()
    }

    pub fn reset_call_counts(&self) {
        self.lock().calls.clear();
    }
}

/// Whether the `call_count`-th call fails when every `frequency`-th one does.
pub fn should_fail(frequency: usize, call_count: usize) -> bool {
    call_count > 0 && call_count % frequency == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_expire() {
        let controller = MockController::new();
        controller.override_rpc("eth_call", CallOverride::Once(CallResponse::Null));
        controller.override_rpc(
            "eth_getLogs",
            CallOverride::NTimes {
                response: CallResponse::Null,
                n: 2,
            },
        );

        assert!(controller.take_next_override("eth_call").is_some());
        assert!(controller.take_next_override("eth_call").is_none());
        assert!(controller.take_next_override("eth_getLogs").is_some());
        assert!(controller.take_next_override("eth_getLogs").is_some());
        assert!(controller.take_next_override("eth_getLogs").is_none());
    }

    #[test]
    fn global_overrides_win() {
        let controller = MockController::new();
        controller.override_rpc("eth_call", CallOverride::Always(CallResponse::Null));
        controller.global_override(CallOverride::Once(CallResponse::Error("down".to_string())));

        let first = controller.take_next_override("eth_call").unwrap();
        assert!(matches!(first.response(), CallResponse::Error(_)));
        let second = controller.take_next_override("eth_call").unwrap();
        assert!(matches!(second.response(), CallResponse::Null));
    }
}

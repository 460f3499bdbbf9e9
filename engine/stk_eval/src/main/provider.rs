//! Component providers: the external layer that turns a component
//! instance's inputs into result values.

use stk_ir::ComponentInstanceAddr;
use stk_value::Value;

/// A provider could not produce results for a component instance.
#[derive(Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        ProviderError {
            message: message.into(),
        }
    }
}

/// Produces component results. Called at most once per component instance
/// and phase; implementations may block on I/O.
pub trait ComponentProvider: Send + Sync {
    /// Planned result of an instance. Values not known until apply should
    /// be unknown.
    fn plan(&self, addr: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError>;

    /// Result after applying the instance.
    fn apply(&self, addr: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError>;
}

/// Echoes each instance's inputs back as its result.
#[derive(Copy, Clone, Default, Debug)]
pub struct PassthroughProvider;

impl ComponentProvider for PassthroughProvider {
    fn plan(&self, _addr: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError> {
        Ok(inputs.clone())
    }

    fn apply(&self, _addr: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError> {
        Ok(inputs.clone())
    }
}

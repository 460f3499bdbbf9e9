//! Changes reported to the driver by the plan and apply hooks.

use stk_ir::{Address, ComponentInstanceAddr, InstanceKey};
use stk_value::Value;

#[derive(Clone, PartialEq, Debug)]
pub enum PlannedChange {
    ComponentInstance {
        addr: ComponentInstanceAddr,
        inputs: Value,
        planned: Value,
    },
    /// A root output value. Embedded outputs are internal to their caller.
    OutputValue { addr: Address, value: Value },
}

#[derive(Clone, PartialEq, Debug)]
pub enum AppliedChange {
    ComponentInstance {
        addr: ComponentInstanceAddr,
        result: Value,
    },
    OutputValue { addr: Address, value: Value },
}

impl PlannedChange {
    /// Key the walks sort changes by.
    pub fn order_key(&self) -> (&Address, Option<&InstanceKey>) {
        match self {
            PlannedChange::ComponentInstance { addr, .. } => (&addr.component, addr.key.as_ref()),
            PlannedChange::OutputValue { addr, .. } => (addr, None),
        }
    }
}

impl AppliedChange {
    pub fn order_key(&self) -> (&Address, Option<&InstanceKey>) {
        match self {
            AppliedChange::ComponentInstance { addr, .. } => (&addr.component, addr.key.as_ref()),
            AppliedChange::OutputValue { addr, .. } => (addr, None),
        }
    }
}

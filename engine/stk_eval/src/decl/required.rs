use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use stk_ir::{Address, DeclKind};

use super::Declaration;
use crate::main::Main;

/// Components `referrer` depends on, directly or through other
/// declarations.
///
/// The walk follows `references()` and stops at components: what a
/// component itself depends on is its own concern. Each address is visited
/// once, so cyclic references terminate.
pub fn required_components(main: &Main, referrer: &Address) -> BTreeSet<Address> {
    let mut required = BTreeSet::new();
    let Some(decl) = main.declaration(referrer) else {
        return required;
    };
    let mut seen = FxHashSet::default();
    seen.insert(referrer.clone());
    let mut pending = decl.references();
    while let Some(addr) = pending.pop() {
        if !seen.insert(addr.clone()) {
            continue;
        }
        if addr.kind() == DeclKind::Component {
            required.insert(addr);
            continue;
        }
        if let Some(decl) = main.declaration(&addr) {
            pending.extend(decl.references());
        }
    }
    required
}

//! Contract-violation reporting.
//!
//! A contract violation means a compiler pass and the schema tables disagree
//! (an item outside the kind's schema, an undeclared retag, a write into a
//! frozen arena, an unset mandatory reference). There is no recovery path:
//! the process panics with a message naming the offending kind and item.

use std::fmt;

/// Aborts with `message`, followed by the rendered trace if there is one.
#[cold]
#[inline(never)]
#[track_caller]
pub fn contract_violation(message: fmt::Arguments<'_>, trace: &str) -> ! {
    if trace.is_empty() {
        panic!("{message}")
    } else {
        panic!("{message}\n{trace}")
    }
}

//! Capability policy shared by every validation strategy
//!
//! A snippet may only name the presentation builder, its own variables, the
//! layout/numeric helpers and the resource locator. Anything that reaches
//! the network, storage, the host page or a code-evaluation primitive is
//! banned outright.

use deckscript_interp::resource::RESOURCE_LOCATORS;
use deckscript_interp::{Helper, Operation};

/// Network primitives
pub const NETWORK: &[&str] = &["fetch", "XMLHttpRequest", "WebSocket", "EventSource"];

/// Persistent storage primitives
pub const STORAGE: &[&str] = &["localStorage", "sessionStorage", "indexedDB", "caches"];

/// Ambient host objects
pub const AMBIENT: &[&str] = &[
    "document",
    "window",
    "navigator",
    "globalThis",
    "self",
    "location",
    "process",
];

/// Dynamic code evaluation and scheduling
pub const DYNAMIC_CODE: &[&str] = &[
    "eval",
    "Function",
    "setTimeout",
    "setInterval",
    "importScripts",
    "require",
];

/// Members that reach an object's prototype chain
pub const BANNED_MEMBERS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Method suffixes callable on any receiver
pub const ITERATION_METHODS: &[&str] = &["forEach", "push"];

/// Every banned identifier
pub fn banned_identifiers() -> impl Iterator<Item = &'static str> {
    NETWORK
        .iter()
        .chain(STORAGE)
        .chain(AMBIENT)
        .chain(DYNAMIC_CODE)
        .copied()
}

/// Whether `name` is a banned capability identifier
#[must_use]
pub fn is_banned_identifier(name: &str) -> bool {
    banned_identifiers().any(|banned| banned == name)
}

/// Whether `name` is a banned prototype member
#[must_use]
pub fn is_banned_member(name: &str) -> bool {
    BANNED_MEMBERS.contains(&name)
}

/// Whether a fully-qualified callee may be called
///
/// Accepted: helpers and resource locators by exact name, `forEach`/`push`
/// on any receiver, and a whitelisted operation on a plain identifier
/// receiver (`slide.addText`).
#[must_use]
pub fn is_allowed_callee(callee: &str) -> bool {
    if Helper::from_name(callee).is_some() || RESOURCE_LOCATORS.contains(&callee) {
        return true;
    }
    match callee.rsplit_once('.') {
        Some((_, method)) if ITERATION_METHODS.contains(&method) => true,
        Some((receiver, method)) => {
            !receiver.contains('.')
                && !is_banned_identifier(receiver)
                && Operation::from_method(method).is_some()
        }
        None => false,
    }
}

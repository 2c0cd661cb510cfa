//! Action-handler dispatch (spec §4.B `add_resource_event_handler`).
//!
//! A handler is invoked on server-driven read (before the value is
//! returned), write (after the new value is stored), or execute. The
//! argument list it receives is a plain borrow rather than a stored
//! reference: the source's "valid only for the duration of the call"
//! constraint on the argument-list reference is exactly what Rust's borrow
//! checker already enforces, so there is nothing further to model.

use conn_types::{AssetDataPath, Value};

/// Which kind of access triggered a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Read,
    Write,
    Execute,
}

/// Argument list handed to a handler. Populated from the CBOR execute
/// payload for `ActionKind::Execute`; empty for read/write invocations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgList {
    args: Vec<(String, Value)>,
}

impl ArgList {
    pub fn new(args: Vec<(String, Value)>) -> Self {
        Self { args }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.args.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// A registered handler. Owns the user closure and its context together so
/// the registry can invoke it without the caller juggling a separate
/// context pointer, the way `conn_pushqueue`'s `(done_fn, ctx)` pair is
/// bundled at the call site instead.
pub struct Handler<Ctx> {
    callback: Box<dyn FnMut(&AssetDataPath, ActionKind, &ArgList, &mut Ctx)>,
}

impl<Ctx> Handler<Ctx> {
    pub fn new(callback: impl FnMut(&AssetDataPath, ActionKind, &ArgList, &mut Ctx) + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn invoke(&mut self, path: &AssetDataPath, kind: ActionKind, args: &ArgList, ctx: &mut Ctx) {
        (self.callback)(path, kind, args, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn arg_list_lookup_by_name() {
        let args = ArgList::new(vec![("count".to_string(), Value::Int(3))]);
        assert_eq!(args.get("count"), Some(&Value::Int(3)));
        assert_eq!(args.get("missing"), None);
    }

    #[test]
    fn handler_invocation_mutates_external_context() {
        let mut calls = Vec::new();
        let mut handler = Handler::new(|path, kind, _args, ctx: &mut Vec<String>| {
            ctx.push(format!("{path} {kind:?}"));
        });
        let path = AssetDataPath::from_str("/asset/value").unwrap();
        handler.invoke(&path, ActionKind::Write, &ArgList::empty(), &mut calls);
        assert_eq!(calls, vec!["/asset/value Write".to_string()]);
    }
}

//! Display form of runtime values
//!
//! Values render in a JSON-like notation: `true`, `42`, `1.5`, `"text"`,
//! `[a, b]` for lists and arrays, `{"k": v}` for maps. A container reached
//! again while it is being rendered prints as `[...]` or `{...}`.

use std::collections::HashSet;

use crate::context::Context;
use crate::error::RuntimeResult;
use crate::handle::Handle;
use crate::value::Value;

/// Pending rendering work. Processed from a stack, so nesting depth is
/// bounded by the heap rather than the call stack.
enum Frame {
    Value(Handle),
    Text(&'static str),
    Close(Handle, char),
}

impl Context {
    pub fn render(&self, handle: Handle) -> RuntimeResult<String> {
        let mut out = String::new();
        let mut open = HashSet::new();
        let mut stack = vec![Frame::Value(handle)];

        while let Some(frame) = stack.pop() {
            let handle = match frame {
                Frame::Value(handle) => handle,
                Frame::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Frame::Close(handle, delimiter) => {
                    open.remove(&handle);
                    out.push(delimiter);
                    continue;
                }
            };

            match self.universe.get(handle)? {
                Value::Int(n) => out.push_str(&n.to_string()),
                Value::Float(f) => out.push_str(&format!("{f:?}")),
                Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
                Value::String(s) => out.push_str(&format!("{:?}", s.as_str())),
                Value::List(_) | Value::Array(_) if open.contains(&handle) => out.push_str("[...]"),
                Value::Map(_) if open.contains(&handle) => out.push_str("{...}"),
                Value::List(list) => {
                    open.insert(handle);
                    push_sequence(&mut stack, &mut out, handle, list.items());
                }
                Value::Array(array) => {
                    open.insert(handle);
                    push_sequence(&mut stack, &mut out, handle, array.items());
                }
                Value::Map(map) => {
                    open.insert(handle);
                    out.push('{');
                    stack.push(Frame::Close(handle, '}'));
                    let entries: Vec<_> = map.entries().collect();
                    for (i, &(key, value)) in entries.iter().enumerate().rev() {
                        stack.push(Frame::Value(value));
                        stack.push(Frame::Text(": "));
                        stack.push(Frame::Value(key));
                        if i > 0 {
                            stack.push(Frame::Text(", "));
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Open a sequence and schedule its items, first item on top.
fn push_sequence(stack: &mut Vec<Frame>, out: &mut String, handle: Handle, items: &[Handle]) {
    out.push('[');
    stack.push(Frame::Close(handle, ']'));
    for (i, &item) in items.iter().enumerate().rev() {
        stack.push(Frame::Value(item));
        if i > 0 {
            stack.push(Frame::Text(", "));
        }
    }
}

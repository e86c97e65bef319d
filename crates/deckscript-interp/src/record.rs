//! Whitelisted operations and extracted call records

use crate::env::Environment;
use serde::Serialize;
use std::fmt;

/// Closed set of presentation-building operations a snippet may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// `addSlide(options?)`
    AddSlide,
    /// `addText(text, options)`
    AddText,
    /// `addShape(kind, options)`
    AddShape,
    /// `addImage(options)`
    AddImage,
    /// `addTable(rows, options?)`
    AddTable,
    /// `addChart(kind, data, options?)`
    AddChart,
}

impl Operation {
    /// Every operation, in table order
    pub const ALL: [Operation; 6] = [
        Operation::AddSlide,
        Operation::AddText,
        Operation::AddShape,
        Operation::AddImage,
        Operation::AddTable,
        Operation::AddChart,
    ];

    /// Method name as written in snippets
    #[inline]
    #[must_use]
    pub fn method_name(self) -> &'static str {
        match self {
            Operation::AddSlide => "addSlide",
            Operation::AddText => "addText",
            Operation::AddShape => "addShape",
            Operation::AddImage => "addImage",
            Operation::AddTable => "addTable",
            Operation::AddChart => "addChart",
        }
    }

    /// Resolve a method name against the table
    #[must_use]
    pub fn from_method(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.method_name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// One extracted, not-yet-dispatched operation invocation
///
/// Immutable once created; consumed exactly once by the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    operation: Operation,
    receiver: String,
    binding: Option<String>,
    args: Vec<String>,
    offset: usize,
    #[serde(skip)]
    env: Environment,
}

impl CallRecord {
    /// Create a record
    #[must_use]
    pub fn new(
        operation: Operation,
        receiver: impl Into<String>,
        args: Vec<String>,
        env: Environment,
    ) -> Self {
        Self {
            operation,
            receiver: receiver.into(),
            binding: None,
            args,
            offset: 0,
            env,
        }
    }

    /// Variable the call result was assigned to
    #[must_use]
    pub fn with_binding(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }

    /// Byte offset of the call in the cleaned snippet
    #[must_use]
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Operation invoked
    #[inline]
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Receiver identifier (`slide` in `slide.addText(...)`)
    #[inline]
    #[must_use]
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Binding name for `const s = pptx.addSlide()`
    #[inline]
    #[must_use]
    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    /// Raw argument expression texts
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Byte offset in the cleaned snippet
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Environment captured when the call was reached
    #[inline]
    #[must_use]
    pub fn env(&self) -> &Environment {
        &self.env
    }
}

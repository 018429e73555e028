pub use crate::diagnostics::{ErrorContext, SourceArc, YantraError};

pub mod analysis;
pub mod ast;
pub mod cli;
pub mod compiler;
pub mod diagnostics;
pub mod emit;
pub mod macros;
pub mod namespaces;
pub mod syntax;

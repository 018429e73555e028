//! Unified diagnostic system for the Yantra compiler.
//!
//! All errors produced by any stage of the compilation pipeline are
//! represented by [`YantraError`]. Construction goes through the helper
//! functions at the bottom of this module; each helper fills the
//! [`ErrorContext`] with the offending form and its span so a failure is
//! diagnosable without any unwind machinery beyond the single abort.
//!
//! Source text is attached in a second enrichment phase: the stages only
//! know spans, and the driver calls [`YantraError::with_source`] once it can
//! name the source the spans index into.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::ast::{Form, Span};

/// Shared handle to a named source for miette rendering.
pub type SourceArc = Arc<NamedSource<String>>;

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The source the span indexes into, when known.
    pub source: Option<SourceArc>,
    /// The primary span for this error.
    pub span: Option<Span>,
    /// The offending form, pretty-printed.
    pub form: Option<String>,
    /// An optional help message.
    pub help: Option<String>,
}

/// Unified error type for all compiler failure modes.
#[derive(Debug, Error)]
pub enum YantraError {
    #[error("Parse error: {message}")]
    Parse { message: String, ctx: ErrorContext },
    #[error("Syntax error: {message}")]
    Syntax { message: String, ctx: ErrorContext },
    #[error("Scope error: {message}")]
    Scope { message: String, ctx: ErrorContext },
    #[error("Syntax-quote error: {message}")]
    SyntaxQuote { message: String, ctx: ErrorContext },
    #[error("Expansion error: {message}")]
    Expansion { message: String, ctx: ErrorContext },
    #[error("IO error: {message}")]
    Io { message: String, ctx: ErrorContext },
}

impl YantraError {
    fn ctx(&self) -> &ErrorContext {
        match self {
            YantraError::Parse { ctx, .. }
            | YantraError::Syntax { ctx, .. }
            | YantraError::Scope { ctx, .. }
            | YantraError::SyntaxQuote { ctx, .. }
            | YantraError::Expansion { ctx, .. }
            | YantraError::Io { ctx, .. } => ctx,
        }
    }

    fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            YantraError::Parse { ctx, .. }
            | YantraError::Syntax { ctx, .. }
            | YantraError::Scope { ctx, .. }
            | YantraError::SyntaxQuote { ctx, .. }
            | YantraError::Expansion { ctx, .. }
            | YantraError::Io { ctx, .. } => ctx,
        }
    }

    fn message(&self) -> &str {
        match self {
            YantraError::Parse { message, .. }
            | YantraError::Syntax { message, .. }
            | YantraError::Scope { message, .. }
            | YantraError::SyntaxQuote { message, .. }
            | YantraError::Expansion { message, .. }
            | YantraError::Io { message, .. } => message,
        }
    }

    /// Attaches the named source the error's span indexes into, unless an
    /// earlier stage already attached one.
    pub fn with_source(mut self, source: &SourceArc) -> Self {
        let ctx = self.ctx_mut();
        if ctx.source.is_none() {
            ctx.source = Some(Arc::clone(source));
        }
        self
    }

    /// Returns a semantic error code, useful for stable test matching
    /// independent of user-facing message changes.
    pub fn error_code(&self) -> &'static str {
        match self {
            YantraError::Parse { .. } => "PARSE_ERROR",
            YantraError::Syntax { .. } => "SYNTAX_ERROR",
            YantraError::Scope { .. } => "SCOPE_ERROR",
            YantraError::SyntaxQuote { .. } => "SYNTAX_QUOTE_ERROR",
            YantraError::Expansion { .. } => "EXPANSION_ERROR",
            YantraError::Io { .. } => "IO_ERROR",
        }
    }
}

impl Diagnostic for YantraError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(self.error_code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let ctx = self.ctx();
        match (&ctx.help, &ctx.form) {
            (Some(help), _) => Some(Box::new(help.clone())),
            (None, Some(form)) => Some(Box::new(format!("offending form: {}", form))),
            (None, None) => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.ctx().span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(self.message().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

// ============================================================================
// CONSTRUCTION HELPERS
// ============================================================================
//
// All error construction outside this module goes through these helpers.
// Helpers taking a form capture both its pretty-printed text and its span.

fn form_ctx(form: Option<&Form>) -> ErrorContext {
    ErrorContext {
        source: None,
        span: form.and_then(|f| f.span()),
        form: form.map(|f| f.pretty()),
        help: None,
    }
}

/// Constructs a parse error (malformed input rejected by the reader).
pub fn parse_error(msg: impl Into<String>, span: Option<Span>) -> YantraError {
    YantraError::Parse {
        message: msg.into(),
        ctx: ErrorContext {
            span,
            ..ErrorContext::default()
        },
    }
}

/// Constructs a syntax error (a special form with a structurally invalid
/// shape: odd-length bindings, malformed fn clause, non-vector bindings).
pub fn syntax_error(msg: impl Into<String>, form: Option<&Form>) -> YantraError {
    YantraError::Syntax {
        message: msg.into(),
        ctx: form_ctx(form),
    }
}

/// Constructs a scope error (`recur` without an active recur point).
pub fn scope_error(msg: impl Into<String>, form: Option<&Form>) -> YantraError {
    YantraError::Scope {
        message: msg.into(),
        ctx: form_ctx(form),
    }
}

/// Constructs a syntax-quote error (`unquote-splice` with nothing to splice
/// into, or a malformed unquote shape).
pub fn syntax_quote_error(msg: impl Into<String>, form: Option<&Form>) -> YantraError {
    YantraError::SyntaxQuote {
        message: msg.into(),
        ctx: form_ctx(form),
    }
}

/// Constructs an expansion error (budget exhaustion, or a failure raised by
/// an externally supplied macro function).
pub fn expansion_error(msg: impl Into<String>, form: Option<&Form>) -> YantraError {
    YantraError::Expansion {
        message: msg.into(),
        ctx: form_ctx(form),
    }
}

/// Constructs an IO error (file or system IO failure in the driver).
pub fn io_error(msg: impl Into<String>) -> YantraError {
    YantraError::Io {
        message: msg.into(),
        ctx: ErrorContext::default(),
    }
}

/// Converts a source string into a shared `NamedSource` for error contexts.
pub fn to_error_source(name: impl AsRef<str>, source: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(
        name.as_ref(),
        source.as_ref().to_string(),
    ))
}

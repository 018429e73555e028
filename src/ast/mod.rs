//! AST module for the Yantra compiler
//!
//! This module provides the core source-tree types: the `Form` value read
//! from source, its category tags, and the span metadata carried through
//! every pipeline stage.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::diagnostics::YantraError;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a span in the source code.
///
/// All forms carry a span for source tracking; enables better errors and
/// explainability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Side metadata attached to a form. Metadata is never inherited implicitly:
/// every transformation that rebuilds a form decides what to carry, and the
/// single merge rule lives in [`Meta::merged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Meta {
    pub span: Option<Span>,
}

impl Meta {
    pub fn from_span(span: Span) -> Self {
        Meta { span: Some(span) }
    }

    /// Union of two metadata values, preferring `self` where both define a
    /// key. Used when a macro's replacement form re-merges the call site's
    /// metadata.
    pub fn merged(self, older: Meta) -> Meta {
        Meta {
            span: self.span.or(older.span),
        }
    }
}

/// An interned-by-value symbol, optionally namespace-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub ns: Option<String>,
    pub name: String,
}

impl Symbol {
    pub fn simple(name: impl Into<String>) -> Self {
        Symbol {
            ns: None,
            name: name.into(),
        }
    }

    pub fn qualified(ns: impl Into<String>, name: impl Into<String>) -> Self {
        Symbol {
            ns: Some(ns.into()),
            name: name.into(),
        }
    }

    /// Parses `ns/name` text. A bare `/` is the division symbol, not a
    /// namespace separator.
    pub fn parse(text: &str) -> Self {
        match text.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => {
                Symbol::qualified(ns, name)
            }
            _ => Symbol::simple(text),
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A keyword, optionally namespace-qualified. Printed with a leading colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
    pub ns: Option<String>,
    pub name: String,
}

impl Keyword {
    pub fn simple(name: impl Into<String>) -> Self {
        Keyword {
            ns: None,
            name: name.into(),
        }
    }

    /// Parses keyword text without its leading colon.
    pub fn parse(text: &str) -> Self {
        match text.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Keyword {
                ns: Some(ns.to_string()),
                name: name.to_string(),
            },
            _ => Keyword::simple(text),
        }
    }

    /// The keyword's full textual name, without the colon.
    pub fn qualified_name(&self) -> String {
        match &self.ns {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ":{}", self.qualified_name())
    }
}

/// Category tag for a form. Collections carry ordered children; atoms carry
/// a literal payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Symbol,
    Keyword,
    List,
    Vector,
    Map,
    Set,
    Str,
    Number,
    Bool,
    Nil,
}

impl Category {
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Category::List | Category::Vector | Category::Map | Category::Set
        )
    }
}

/// The closed union of form payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormKind {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Symbol(Symbol),
    Keyword(Keyword),
    List(Vector<Form>),
    Vector(Vector<Form>),
    Map(Vector<(Form, Form)>),
    Set(Vector<Form>),
}

/// The core tree value read from source. Metadata travels as an explicit
/// field, so rebuilding a form propagates it by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub kind: FormKind,
    pub meta: Meta,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Form {
    pub fn new(kind: FormKind) -> Self {
        Form {
            kind,
            meta: Meta::default(),
        }
    }

    pub fn nil() -> Self {
        Form::new(FormKind::Nil)
    }

    pub fn boolean(value: bool) -> Self {
        Form::new(FormKind::Bool(value))
    }

    pub fn number(value: f64) -> Self {
        Form::new(FormKind::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Form::new(FormKind::Str(value.into()))
    }

    pub fn symbol(name: &str) -> Self {
        Form::new(FormKind::Symbol(Symbol::parse(name)))
    }

    pub fn keyword(name: &str) -> Self {
        Form::new(FormKind::Keyword(Keyword::parse(name)))
    }

    pub fn list(items: impl IntoIterator<Item = Form>) -> Self {
        Form::new(FormKind::List(items.into_iter().collect()))
    }

    pub fn vector(items: impl IntoIterator<Item = Form>) -> Self {
        Form::new(FormKind::Vector(items.into_iter().collect()))
    }

    pub fn map(pairs: impl IntoIterator<Item = (Form, Form)>) -> Self {
        Form::new(FormKind::Map(pairs.into_iter().collect()))
    }

    pub fn set(items: impl IntoIterator<Item = Form>) -> Self {
        Form::new(FormKind::Set(items.into_iter().collect()))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.meta.span = Some(span);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn span(&self) -> Option<Span> {
        self.meta.span
    }

    /// Returns the category of this form.
    pub fn category(&self) -> Category {
        match &self.kind {
            FormKind::Nil => Category::Nil,
            FormKind::Bool(_) => Category::Bool,
            FormKind::Number(_) => Category::Number,
            FormKind::Str(_) => Category::Str,
            FormKind::Symbol(_) => Category::Symbol,
            FormKind::Keyword(_) => Category::Keyword,
            FormKind::List(_) => Category::List,
            FormKind::Vector(_) => Category::Vector,
            FormKind::Map(_) => Category::Map,
            FormKind::Set(_) => Category::Set,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            FormKind::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vector<Form>> {
        match &self.kind {
            FormKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Vector<Form>> {
        match &self.kind {
            FormKind::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// The head symbol of a non-empty list form, if any.
    pub fn head_symbol(&self) -> Option<&Symbol> {
        self.as_list()?.front()?.as_symbol()
    }

    /// True when this form is a non-empty list headed by the given bare
    /// (unqualified) symbol name.
    pub fn is_call_to(&self, name: &str) -> bool {
        matches!(self.head_symbol(), Some(sym) if sym.ns.is_none() && sym.name == name)
    }

    /// Generic child fold: rebuilds this form with every direct child passed
    /// through `f`, preserving collection category and metadata. Map keys and
    /// values are transformed independently while preserving pairing. Atoms
    /// pass through untouched.
    pub fn map_children<F>(&self, mut f: F) -> Result<Form, YantraError>
    where
        F: FnMut(&Form) -> Result<Form, YantraError>,
    {
        let kind = match &self.kind {
            FormKind::List(items) => {
                FormKind::List(items.iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            FormKind::Vector(items) => {
                FormKind::Vector(items.iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            FormKind::Set(items) => {
                FormKind::Set(items.iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            FormKind::Map(pairs) => FormKind::Map(
                pairs
                    .iter()
                    .map(|(k, v)| Ok((f(k)?, f(v)?)))
                    .collect::<Result<_, YantraError>>()?,
            ),
            _ => return Ok(self.clone()),
        };
        Ok(Form {
            kind,
            meta: self.meta,
        })
    }

    /// Pretty-prints the form as source text.
    pub fn pretty(&self) -> String {
        match &self.kind {
            FormKind::Nil => "nil".to_string(),
            FormKind::Bool(b) => b.to_string(),
            FormKind::Number(n) => format_number(*n),
            FormKind::Str(s) => format!("\"{}\"", s),
            FormKind::Symbol(sym) => sym.to_string(),
            FormKind::Keyword(kw) => kw.to_string(),
            FormKind::List(items) => format!("({})", pretty_items(items.iter())),
            FormKind::Vector(items) => format!("[{}]", pretty_items(items.iter())),
            FormKind::Set(items) => format!("#{{{}}}", pretty_items(items.iter())),
            FormKind::Map(pairs) => {
                let inner = pairs
                    .iter()
                    .map(|(k, v)| format!("{} {}", k.pretty(), v.pretty()))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{{{}}}", inner)
            }
        }
    }
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

fn pretty_items<'a>(items: impl Iterator<Item = &'a Form>) -> String {
    items.map(|f| f.pretty()).collect::<Vec<_>>().join(" ")
}

/// Renders a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_parse_splits_on_first_slash() {
        let sym = Symbol::parse("strlib/join");
        assert_eq!(sym.ns.as_deref(), Some("strlib"));
        assert_eq!(sym.name, "join");
    }

    #[test]
    fn bare_slash_is_the_division_symbol() {
        let sym = Symbol::parse("/");
        assert!(sym.ns.is_none());
        assert_eq!(sym.name, "/");
    }

    #[test]
    fn map_children_preserves_category_and_meta() {
        let form = Form::vector([Form::number(1.0), Form::number(2.0)])
            .with_span(Span { start: 3, end: 9 });
        let doubled = form
            .map_children(|child| match child.kind {
                FormKind::Number(n) => Ok(Form::number(n * 2.0)),
                _ => Ok(child.clone()),
            })
            .unwrap();
        assert_eq!(doubled.category(), Category::Vector);
        assert_eq!(doubled.span(), Some(Span { start: 3, end: 9 }));
        assert_eq!(doubled.as_vector().unwrap()[0], Form::number(2.0));
    }

    #[test]
    fn pretty_round_trips_shapes() {
        let form = Form::list([
            Form::symbol("f"),
            Form::keyword("k"),
            Form::string("s"),
            Form::nil(),
        ]);
        assert_eq!(form.pretty(), "(f :k \"s\" nil)");
    }
}

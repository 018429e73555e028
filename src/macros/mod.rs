//! # Yantra Macro Expansion System
//!
//! This module is responsible for the purely syntactic transformation of
//! forms before analysis. Macros are opaque functions supplied by the host:
//! they receive unevaluated argument forms and return a replacement form.
//!
//! ## Core Principles
//!
//! - **Syntactic Only**: expansion operates on [`Form`] trees. It has no
//!   access to namespaces or analysis state.
//! - **Pure Transformation**: one expansion step is
//!   `(&Form) -> Result<Form, YantraError>`; the full expansion is the fixed
//!   point of that step.
//! - **Bounded**: the fixed-point loop carries an explicit budget. A macro
//!   that keeps growing its own output is reported as an `Expansion` error
//!   instead of hanging the compiler.
//!
//! **INVARIANT:** every transformation that produces a replacement form must
//! re-merge the original form's metadata. The merge is a union that prefers
//! the replacement's own metadata where both define a key.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{Form, FormKind, Symbol};
use crate::diagnostics::{expansion_error, YantraError};

pub mod syntax_quote;

pub use syntax_quote::syntax_quote;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A macro is an opaque function from argument forms to a replacement form.
pub type MacroFn = Arc<dyn Fn(&[Form]) -> Result<Form, YantraError>>;

/// Macro registry keyed by head-symbol text. Owned and populated by the
/// host; the expander only reads it.
#[derive(Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<String, MacroFn>,
}

/// Default bound on the expansion fixed-point loop.
pub const DEFAULT_EXPANSION_BUDGET: usize = 128;

impl MacroRegistry {
    /// Creates a new, empty macro registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a macro under the given head-symbol name.
    ///
    /// # Returns
    /// `Some(old_macro)` if a macro with this name was already registered,
    /// `None` otherwise. This allows callers to detect silent overwrites.
    pub fn register(&mut self, name: &str, func: MacroFn) -> Option<MacroFn> {
        self.macros.insert(name.to_string(), func)
    }

    pub fn get(&self, name: &str) -> Option<&MacroFn> {
        self.macros.get(name)
    }

    /// Checks if a macro with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Returns the number of registered macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Returns an iterator over macro names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.macros.keys()
    }
}

impl std::fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.macros.keys().collect();
        names.sort();
        f.debug_struct("MacroRegistry").field("macros", &names).finish()
    }
}

// ============================================================================
// EXPANSION CORE
// ============================================================================

/// Applies the macro registered for the form's head symbol, if any, and
/// re-merges the original form's metadata into the replacement. Forms
/// without a registered macro head pass through unchanged.
pub fn expand_macro(form: &Form, macros: &MacroRegistry) -> Result<Form, YantraError> {
    let Some(head) = form.head_symbol() else {
        return Ok(form.clone());
    };
    let Some(func) = macros.get(&head.to_string()) else {
        return Ok(form.clone());
    };

    let items = form.as_list().expect("symbol-headed form is a list");
    let args: Vec<Form> = items.iter().skip(1).cloned().collect();
    log::trace!("expanding macro {}", head);
    let replacement = func(&args)?;
    let merged = replacement.meta.merged(form.meta);
    Ok(replacement.with_meta(merged))
}

/// Rewrites constructor sugar: `(Ctor. args...)` becomes `(new Ctor args...)`,
/// preserving any namespace qualifier on `Ctor`. Heads whose name is a lone
/// dot, or does not end in one, are untouched.
pub fn desugar_new(form: &Form) -> Form {
    let Some(head) = form.head_symbol() else {
        return form.clone();
    };
    if head.name.len() < 2 || !head.name.ends_with('.') {
        return form.clone();
    }

    let items = form.as_list().expect("symbol-headed form is a list");
    let head_meta = items[0].meta;
    let ctor = Symbol {
        ns: head.ns.clone(),
        name: head.name[..head.name.len() - 1].to_string(),
    };

    let mut rebuilt = Vec::with_capacity(items.len() + 1);
    rebuilt.push(Form::symbol("new").with_meta(head_meta));
    rebuilt.push(Form::new(FormKind::Symbol(ctor)).with_meta(head_meta));
    rebuilt.extend(items.iter().skip(1).cloned());
    Form::list(rebuilt).with_meta(form.meta)
}

/// One expansion step. Applicable only to non-empty, symbol-headed lists:
/// `syntax-quote` heads translate through the quoting rewriter, everything
/// else goes through macro application and constructor desugaring.
pub fn expand_once(
    form: &Form,
    macros: &MacroRegistry,
    budget: usize,
) -> Result<Form, YantraError> {
    let Some(head) = form.head_symbol() else {
        return Ok(form.clone());
    };
    if head.ns.is_none() && head.name == "syntax-quote" {
        return syntax_quote::translate_call(form, macros, budget);
    }

    let expanded = expand_macro(form, macros)?;
    Ok(desugar_new(&expanded))
}

/// Repeats [`expand_once`] until the output equals the input, or the budget
/// is exhausted.
pub fn expand(form: &Form, macros: &MacroRegistry, budget: usize) -> Result<Form, YantraError> {
    let mut current = form.clone();
    for _ in 0..budget {
        let next = expand_once(&current, macros, budget)?;
        if next == current {
            return Ok(current);
        }
        current = next;
    }
    Err(expansion_error(
        format!("Macro expansion budget ({}) exhausted", budget),
        Some(form),
    ))
}

/// Expands the form to its fixed point, then recurses into children through
/// the generic [`Form::map_children`] fold: map keys and values expand
/// independently, other collections expand element-wise preserving order and
/// category, atoms pass through. Metadata is carried by construction.
pub fn expand_all(
    form: &Form,
    macros: &MacroRegistry,
    budget: usize,
) -> Result<Form, YantraError> {
    let expanded = expand(form, macros, budget)?;
    expanded.map_children(|child| expand_all(child, macros, budget))
}

//! Syntax-quote translation.
//!
//! A syntax-quoted form becomes an expression that, evaluated by the emitted
//! program, reconstructs the form as literal data except where `unquote` or
//! `unquote-splice` substitutes computed values. Collections rewrite into a
//! concatenation of one-item segments so spliced sequences can flow into the
//! surrounding elements; the category-appropriate constructor finishes the
//! rebuild. The helper names used here (`list`, `seq`, `concat`, `apply`,
//! `hash-map`, `hash-set`) are all members of the core refer table, so they
//! resolve like any other core binding.

use crate::ast::{Form, FormKind};
use crate::diagnostics::{syntax_quote_error, YantraError};
use crate::macros::{expand_all, MacroRegistry};

/// Translates a `(syntax-quote form)` call. Invoked by the expander's
/// one-step rule.
pub(crate) fn translate_call(
    form: &Form,
    macros: &MacroRegistry,
    budget: usize,
) -> Result<Form, YantraError> {
    let items = form.as_list().expect("syntax-quote head implies a list");
    if items.len() != 2 {
        return Err(syntax_quote_error(
            "syntax-quote expects exactly one form",
            Some(form),
        ));
    }
    syntax_quote(&items[1], macros, budget)
}

/// Produces the reconstruction expression for one quoted form.
pub fn syntax_quote(
    form: &Form,
    macros: &MacroRegistry,
    budget: usize,
) -> Result<Form, YantraError> {
    if form.is_call_to("unquote") {
        return expand_all(&unquote_argument(form)?, macros, budget);
    }
    if form.is_call_to("unquote-splice") {
        return Err(syntax_quote_error(
            "unquote-splice is only meaningful inside a quoted collection",
            Some(form),
        ));
    }

    match &form.kind {
        // A quoted symbol is data, not a variable reference.
        FormKind::Symbol(_) => Ok(quote_wrap(form)),
        FormKind::List(items) if !items.is_empty() => {
            let concat = concat_segments(items.iter(), macros, budget)?;
            Ok(apply_constructor("list", concat).with_meta(form.meta))
        }
        FormKind::Vector(items) if !items.is_empty() => {
            // Vectors are finished by the concatenation itself.
            Ok(concat_segments(items.iter(), macros, budget)?.with_meta(form.meta))
        }
        FormKind::Set(items) if !items.is_empty() => {
            let concat = concat_segments(items.iter(), macros, budget)?;
            Ok(apply_constructor("hash-set", concat).with_meta(form.meta))
        }
        FormKind::Map(pairs) if !pairs.is_empty() => {
            // Maps flatten to an interleaved key/value sequence before
            // element-wise treatment.
            let flattened: Vec<Form> = pairs
                .iter()
                .flat_map(|(k, v)| [k.clone(), v.clone()])
                .collect();
            let concat = concat_segments(flattened.iter(), macros, budget)?;
            Ok(apply_constructor("hash-map", concat).with_meta(form.meta))
        }
        // Remaining atoms and empty collections are self-evaluating.
        _ => Ok(form.clone()),
    }
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

fn quote_wrap(form: &Form) -> Form {
    Form::list([Form::symbol("quote"), form.clone()]).with_meta(form.meta)
}

/// The sole argument of an `(unquote x)` / `(unquote-splice x)` form.
fn unquote_argument(form: &Form) -> Result<Form, YantraError> {
    let items = form.as_list().expect("unquote marker implies a list");
    if items.len() != 2 {
        return Err(syntax_quote_error(
            "unquote expects exactly one form",
            Some(form),
        ));
    }
    Ok(items[1].clone())
}

/// Turns each element into a one-item sequence segment and concatenates the
/// segments: plain elements recurse through syntax-quote, unquoted elements
/// substitute their value, spliced elements coerce their sequence value into
/// place.
fn concat_segments<'a>(
    elements: impl Iterator<Item = &'a Form>,
    macros: &MacroRegistry,
    budget: usize,
) -> Result<Form, YantraError> {
    let mut call = vec![Form::symbol("concat")];
    for element in elements {
        call.push(segment(element, macros, budget)?);
    }
    Ok(Form::list(call))
}

fn segment(element: &Form, macros: &MacroRegistry, budget: usize) -> Result<Form, YantraError> {
    if element.is_call_to("unquote") {
        let value = expand_all(&unquote_argument(element)?, macros, budget)?;
        return Ok(Form::list([Form::symbol("list"), value]));
    }
    if element.is_call_to("unquote-splice") {
        let value = expand_all(&unquote_argument(element)?, macros, budget)?;
        return Ok(Form::list([Form::symbol("seq"), value]));
    }
    Ok(Form::list([
        Form::symbol("list"),
        syntax_quote(element, macros, budget)?,
    ]))
}

fn apply_constructor(ctor: &str, concat: Form) -> Form {
    Form::list([Form::symbol("apply"), Form::symbol(ctor), concat])
}

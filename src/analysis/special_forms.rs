//! Special-form analyzers.
//!
//! One function per form. Each validates the form's shape first (structural
//! failures are fatal `Syntax` errors), then analyzes sub-forms under the
//! environment the form's semantics dictate.

use std::sync::Arc;

use crate::ast::Form;
use crate::diagnostics::{scope_error, syntax_error, YantraError};

use super::{Analyzer, Binding, Context, Env, FnClause, Node, Op, RecurPoint};

/// Dispatches a bare head-symbol name to its analyzer. Returns `None` when
/// the name is not a special form, leaving the list to invocation analysis.
pub fn dispatch(
    analyzer: &Analyzer,
    env: &Env,
    node: &Node,
    head: &str,
) -> Result<Option<Node>, YantraError> {
    let analyzed = match head {
        "aget" => analyze_aget(analyzer, env, node)?,
        "aset" => analyze_aset(analyzer, env, node)?,
        "def" => analyze_def(analyzer, env, node)?,
        "do" => analyze_do(analyzer, env, node)?,
        "fn" => analyze_fn(analyzer, env, node)?,
        "if" => analyze_if(analyzer, env, node)?,
        "let" => analyze_let(analyzer, env, node, false)?,
        "loop" => analyze_let(analyzer, env, node, true)?,
        "new" => analyze_new(analyzer, env, node)?,
        "quote" => analyze_quote(analyzer, env, node)?,
        "recur" => analyze_recur(analyzer, env, node)?,
        "throw" => analyze_throw(analyzer, env, node)?,
        _ => return Ok(None),
    };
    Ok(Some(analyzed))
}

// ============================================================================
// INDIVIDUAL ANALYZERS
// ============================================================================

fn analyze_aget(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    if items.len() < 2 {
        return Err(syntax_error("aget requires a target", Some(&node.form)));
    }
    let arg_env = env.expr();
    let target = analyzer.analyze_form(&arg_env, &items[1])?;
    let fields = items
        .iter()
        .skip(2)
        .map(|field| analyzer.analyze_form(&arg_env, field))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(with_op(
        node,
        env,
        Op::Aget {
            target: Box::new(target),
            fields,
        },
    ))
}

fn analyze_aset(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    if items.len() < 3 {
        return Err(syntax_error(
            "aset requires a target and a value",
            Some(&node.form),
        ));
    }
    let arg_env = env.expr();
    let target = analyzer.analyze_form(&arg_env, &items[1])?;
    let fields = items
        .iter()
        .skip(2)
        .take(items.len() - 3)
        .map(|field| analyzer.analyze_form(&arg_env, field))
        .collect::<Result<Vec<_>, _>>()?;
    let value = analyzer.analyze_form(&arg_env, items.back().expect("len checked"))?;
    Ok(with_op(
        node,
        env,
        Op::Aset {
            target: Box::new(target),
            fields,
            value: Box::new(value),
        },
    ))
}

fn analyze_def(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    let name_form = items
        .get(1)
        .ok_or_else(|| syntax_error("def requires a name", Some(&node.form)))?;
    if name_form.as_symbol().is_none() {
        return Err(syntax_error("def name must be a symbol", Some(name_form)));
    }

    let arg_env = env.expr();
    let name = analyzer.analyze_form(&arg_env, name_form)?;
    // A missing initializer defaults to a nil literal.
    let init_form = items.get(2).cloned().unwrap_or_else(Form::nil);
    let init = analyzer.analyze_form(&arg_env, &init_form)?;
    Ok(with_op(
        node,
        env,
        Op::Def {
            name: Box::new(name),
            init: Box::new(init),
        },
    ))
}

fn analyze_do(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    let body = analyzer.analyze_block(env, items.iter().skip(1))?;
    Ok(with_op(node, env, Op::Do { body }))
}

fn analyze_if(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    if items.len() < 3 || items.len() > 4 {
        return Err(syntax_error(
            "if takes a test, a then branch, and an optional else branch",
            Some(&node.form),
        ));
    }
    let test = analyzer.analyze_form(&env.expr(), &items[1])?;
    // Branches keep the enclosing context: value-producing position
    // propagates through the conditional unchanged.
    let then = analyzer.analyze_form(env, &items[2])?;
    let els_form = items.get(3).cloned().unwrap_or_else(Form::nil);
    let els = analyzer.analyze_form(env, &els_form)?;
    Ok(with_op(
        node,
        env,
        Op::If {
            test: Box::new(test),
            then: Box::new(then),
            els: Box::new(els),
        },
    ))
}

fn analyze_fn(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    let mut rest = items.iter().skip(1).peekable();

    // An optional self-reference name is accepted but unused.
    if matches!(rest.peek(), Some(form) if form.as_symbol().is_some()) {
        rest.next();
    }

    let mut clauses: Vec<FnClause> = Vec::new();
    if rest.peek().is_none() {
        return Err(syntax_error(
            "fn requires a params vector or at least one clause",
            Some(&node.form),
        ));
    }
    let bare_params = matches!(rest.peek(), Some(form) if form.as_vector().is_some());
    if bare_params {
        // Bare params vector: a single clause whose body is the remainder.
        let params = rest.next().expect("peeked");
        let body: Vec<Form> = rest.cloned().collect();
        clauses.push(analyze_clause(analyzer, env, params, &body)?);
    } else {
        // One or more (params body...) groups.
        for group in rest {
            let group_items = group.as_list().ok_or_else(|| {
                syntax_error("fn clause must be a (params body...) list", Some(group))
            })?;
            let params = group_items.front().ok_or_else(|| {
                syntax_error("fn clause is missing its params vector", Some(group))
            })?;
            let body: Vec<Form> = group_items.iter().skip(1).cloned().collect();
            clauses.push(analyze_clause(analyzer, env, params, &body)?);
        }
    }

    // Clauses are keyed by fixed parameter count; a duplicate count silently
    // overwrites the earlier clause unless strict arity checking is on.
    let mut keyed: Vec<FnClause> = Vec::with_capacity(clauses.len());
    for clause in clauses {
        if let Some(slot) = keyed.iter_mut().find(|c| c.arity() == clause.arity()) {
            if analyzer.strict_arity {
                return Err(syntax_error(
                    format!("duplicate fn clause for arity {}", clause.arity()),
                    Some(&node.form),
                ));
            }
            *slot = clause;
        } else {
            keyed.push(clause);
        }
    }
    keyed.sort_by_key(FnClause::arity);

    Ok(with_op(node, env, Op::Fn { clauses: keyed }))
}

fn analyze_clause(
    analyzer: &Analyzer,
    env: &Env,
    params_form: &Form,
    body: &[Form],
) -> Result<FnClause, YantraError> {
    let params = params_form
        .as_vector()
        .ok_or_else(|| syntax_error("fn params must be a vector", Some(params_form)))?;

    let mut fixed: Vec<String> = Vec::new();
    let mut rest: Option<String> = None;
    let mut saw_amp = false;
    for param in params {
        let sym = param
            .as_symbol()
            .filter(|s| s.ns.is_none())
            .ok_or_else(|| syntax_error("fn params must be bare symbols", Some(param)))?;
        if sym.name == "&" {
            if saw_amp {
                return Err(syntax_error("fn params allow a single &", Some(params_form)));
            }
            saw_amp = true;
            continue;
        }
        if saw_amp {
            if rest.is_some() {
                return Err(syntax_error(
                    "& must precede exactly one rest param",
                    Some(params_form),
                ));
            }
            rest = Some(sym.name.clone());
        } else {
            fixed.push(sym.name.clone());
        }
    }
    if saw_amp && rest.is_none() {
        return Err(syntax_error(
            "& must precede a rest param",
            Some(params_form),
        ));
    }

    let mut clause_env = env.clone();
    for name in fixed.iter().chain(rest.iter()) {
        clause_env = clause_env.with_local(name);
    }
    let mut names = fixed.clone();
    names.extend(rest.clone());
    // Each clause is a recur point over its declared parameters; the body
    // sits in return position.
    let clause_env = clause_env
        .with_recur_point(Arc::new(RecurPoint { names }))
        .with_context(Context::Return);

    let body = analyzer.analyze_block(&clause_env, body.iter())?;
    Ok(FnClause { fixed, rest, body })
}

fn analyze_let(
    analyzer: &Analyzer,
    env: &Env,
    node: &Node,
    is_loop: bool,
) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    let head = if is_loop { "loop" } else { "let" };
    let bindings_form = items
        .get(1)
        .ok_or_else(|| syntax_error(format!("{} requires a bindings vector", head), Some(&node.form)))?;
    let binding_forms = bindings_form.as_vector().ok_or_else(|| {
        syntax_error(format!("{} bindings must be a vector", head), Some(bindings_form))
    })?;
    if binding_forms.len() % 2 != 0 {
        return Err(syntax_error(
            format!("{} bindings require an even number of forms", head),
            Some(bindings_form),
        ));
    }

    // Each binding's name is visible to later bindings and to the body.
    let mut scope = env.clone();
    let mut bindings = Vec::with_capacity(binding_forms.len() / 2);
    let mut iter = binding_forms.iter();
    while let (Some(name_form), Some(init_form)) = (iter.next(), iter.next()) {
        let name = name_form
            .as_symbol()
            .filter(|s| s.ns.is_none())
            .ok_or_else(|| syntax_error("binding names must be bare symbols", Some(name_form)))?
            .name
            .clone();
        let init = analyzer.analyze_form(&scope.expr(), init_form)?;
        scope = scope.with_local(&name);
        bindings.push(Binding { name, init });
    }

    let body_env = if is_loop {
        let names = bindings.iter().map(|b| b.name.clone()).collect();
        scope.with_recur_point(Arc::new(RecurPoint { names }))
    } else {
        scope
    };
    let body = analyzer.analyze_block(&body_env, items.iter().skip(2))?;

    let op = if is_loop {
        Op::Loop { bindings, body }
    } else {
        Op::Let { bindings, body }
    };
    Ok(with_op(node, env, op))
}

fn analyze_new(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    if items.len() < 2 {
        return Err(syntax_error("new requires a constructor", Some(&node.form)));
    }
    let arg_env = env.expr();
    let ctor = analyzer.analyze_form(&arg_env, &items[1])?;
    let args = items
        .iter()
        .skip(2)
        .map(|arg| analyzer.analyze_form(&arg_env, arg))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(with_op(
        node,
        env,
        Op::New {
            ctor: Box::new(ctor),
            args,
        },
    ))
}

fn analyze_quote(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    if items.len() != 2 {
        return Err(syntax_error("quote takes exactly one form", Some(&node.form)));
    }
    // Quoting suppresses resolution and invocation semantics; the context is
    // preserved so the quoted data renders correctly in its position.
    let quoted = analyzer.analyze_form(&env.with_quoted(), &items[1])?;
    Ok(with_op(node, env, Op::Quote(Box::new(quoted))))
}

fn analyze_recur(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let Some(point) = &env.recur_point else {
        return Err(scope_error(
            "recur is only valid inside a loop or fn clause",
            Some(&node.form),
        ));
    };

    let items = node.form.as_list().expect("special form is a list");
    let arg_env = env.expr();
    let args = items
        .iter()
        .skip(1)
        .map(|arg| analyzer.analyze_form(&arg_env, arg))
        .collect::<Result<Vec<_>, _>>()?;

    if analyzer.strict_arity && args.len() != point.names.len() {
        return Err(syntax_error(
            format!(
                "recur carries {} args but its recur point binds {}",
                args.len(),
                point.names.len()
            ),
            Some(&node.form),
        ));
    }

    Ok(with_op(
        node,
        env,
        Op::Recur {
            args,
            targets: point.names.clone(),
        },
    ))
}

fn analyze_throw(analyzer: &Analyzer, env: &Env, node: &Node) -> Result<Node, YantraError> {
    let items = node.form.as_list().expect("special form is a list");
    if items.len() != 2 {
        return Err(syntax_error(
            "throw takes exactly one expression",
            Some(&node.form),
        ));
    }
    let thrown = analyzer.analyze_form(&env.expr(), &items[1])?;
    Ok(with_op(node, env, Op::Throw(Box::new(thrown))))
}

// ============================================================================
// HELPERS
// ============================================================================

fn with_op(node: &Node, env: &Env, op: Op) -> Node {
    Node {
        op,
        form: node.form.clone(),
        env: env.clone(),
    }
}

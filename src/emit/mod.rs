//! Code emission: analyzed AST nodes become JavaScript text.
//!
//! Emission is driven entirely by each node's operation and the context its
//! environment recorded during analysis. Expression-shaped operations pick
//! up a `return` prefix in return position; statement positions append a
//! terminator unless the operation renders self-delimiting block syntax.
//! The closed [`Op`] union leaves emission no failure path.
//!
//! Strings render quoted with no internal escaping; callers guarantee
//! content safety. (Known limitation.)

use sha2::{Digest, Sha256};

use crate::analysis::{Binding, Context, FnClause, Node, Op};
use crate::ast::{format_number, FormKind, Keyword, Symbol};

pub mod escape;

pub use escape::{escape_identifier, symbol_path};

/// The runtime object the emitted program resolves literal constructors
/// against.
pub const RUNTIME_GLOBAL: &str = "RT";

// ============================================================================
// CENTRAL DISPATCH
// ============================================================================

/// Renders one node. The fragment for a top-level form is independently
/// valid; newline-joining fragments in order yields a complete program.
pub fn emit(node: &Node) -> String {
    // Quoted data delegates wholly to the quoted sub-node, which carries the
    // same context and the quoted environment.
    if let Op::Quote(inner) = &node.op {
        return emit(inner);
    }

    let rendered = render(node);

    let rendered = if node.env.context == Context::Return && is_expression_op(&node.op) {
        format!("return {}", rendered)
    } else {
        rendered
    };

    if node.env.context != Context::Expr && !is_self_delimiting(&node.op) {
        format!("{};", rendered)
    } else {
        rendered
    }
}

/// Operations whose rendering is itself an expression; these take the
/// uniform `return` prefix in return position.
fn is_expression_op(op: &Op) -> bool {
    matches!(
        op,
        Op::Aget { .. } | Op::Aset { .. } | Op::Const(_) | Op::Coll(_) | Op::Fn { .. } | Op::New { .. }
    )
}

/// Operations that render self-delimiting statement blocks and take no
/// appended terminator.
fn is_self_delimiting(op: &Op) -> bool {
    matches!(
        op,
        Op::If { .. } | Op::Let { .. } | Op::Loop { .. } | Op::Do { .. }
    )
}

fn render(node: &Node) -> String {
    match &node.op {
        Op::Const(_) => render_const(node),
        Op::Coll(children) => render_coll(node, children),
        Op::Aget { target, fields } => render_access(target, fields),
        Op::Aset {
            target,
            fields,
            value,
        } => format!("{} = {}", render_access(target, fields), emit(value)),
        Op::Def { name, init } => format!("{} = {}", emit(name), emit(init)),
        Op::Do { body } => render_do(node, body),
        Op::Fn { clauses } => render_fn(clauses),
        Op::If { test, then, els } => render_if(node, test, then, els),
        Op::Invoke { callee, args } => render_invoke(node, callee, args),
        Op::Let { bindings, body } => render_let(node, bindings, body),
        Op::Loop { bindings, body } => render_loop(node, bindings, body),
        Op::New { ctor, args } => format!("new {}({})", emit(ctor), join_args(args)),
        Op::Quote(_) => unreachable!("quote is unwrapped by emit"),
        Op::Recur { args, targets } => render_recur(args, targets),
        Op::Throw(expr) => format!("throw {}", emit(expr)),
    }
}

// ============================================================================
// LITERALS
// ============================================================================

fn render_const(node: &Node) -> String {
    match &node.form.kind {
        FormKind::Nil => "null".to_string(),
        FormKind::Bool(b) => b.to_string(),
        FormKind::Number(n) => format_number(*n),
        FormKind::Str(s) => format!("\"{}\"", s),
        FormKind::Symbol(sym) => {
            if node.env.quoted {
                symbol_literal(sym)
            } else {
                symbol_path(sym)
            }
        }
        FormKind::Keyword(kw) => keyword_literal(kw),
        other => unreachable!("collection {:?} reached const rendering", other),
    }
}

fn render_coll(node: &Node, children: &[Node]) -> String {
    let ctor = match node.form.kind {
        FormKind::Vector(_) => "vector",
        FormKind::Map(_) => "hashMap",
        FormKind::Set(_) => "hashSet",
        _ => "list",
    };
    format!("{}.{}({})", RUNTIME_GLOBAL, ctor, join_args(children))
}

/// A quoted symbol is runtime data: namespace, name, and hash.
fn symbol_literal(sym: &Symbol) -> String {
    let ns = match &sym.ns {
        Some(ns) => format!("\"{}\"", ns),
        None => "null".to_string(),
    };
    format!(
        "{}.symbol({}, \"{}\", {})",
        RUNTIME_GLOBAL,
        ns,
        sym.name,
        literal_hash(&sym.to_string())
    )
}

/// Keywords always render as a runtime construction call carrying the full
/// textual name and its hash.
fn keyword_literal(kw: &Keyword) -> String {
    let name = kw.qualified_name();
    format!(
        "{}.keyword(\"{}\", {})",
        RUNTIME_GLOBAL,
        name,
        literal_hash(&name)
    )
}

/// First four big-endian bytes of SHA-256 over the literal's text.
fn literal_hash(text: &str) -> u32 {
    let digest = Sha256::digest(text.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

// ============================================================================
// COMPOUND FORMS
// ============================================================================

fn join_args(nodes: &[Node]) -> String {
    nodes.iter().map(emit).collect::<Vec<_>>().join(", ")
}

fn join_statements(nodes: &[Node]) -> String {
    nodes.iter().map(emit).collect::<Vec<_>>().join("\n")
}

fn render_access(target: &Node, fields: &[Node]) -> String {
    let mut out = emit(target);
    for field in fields {
        out.push('[');
        out.push_str(&emit(field));
        out.push(']');
    }
    out
}

fn render_invoke(node: &Node, callee: &Node, args: &[Node]) -> String {
    let head = emit(callee);
    // A function literal in call position needs grouping parentheses.
    let head = if matches!(callee.op, Op::Fn { .. }) {
        format!("({})", head)
    } else {
        head
    };
    let call = format!("{}({})", head, join_args(args));
    // Invocations manage their own return prefix, like the block forms: the
    // call's value is what the surrounding function yields.
    if node.env.context == Context::Return {
        format!("return {}", call)
    } else {
        call
    }
}

/// `do` renders as plain statements in statement-like context; in expression
/// context the block is wrapped in an immediately invoked function so it
/// yields a single value.
fn render_do(node: &Node, body: &[Node]) -> String {
    let statements = join_statements(body);
    if node.env.context == Context::Expr {
        iife(&statements)
    } else {
        statements
    }
}

fn render_if(node: &Node, test: &Node, then: &Node, els: &Node) -> String {
    if node.env.context == Context::Expr {
        format!("({} ? {} : {})", emit(test), emit(then), emit(els))
    } else {
        format!(
            "if ({}) {{\n{}\n}} else {{\n{}\n}}",
            emit(test),
            emit(then),
            emit(els)
        )
    }
}

fn render_bindings(bindings: &[Binding]) -> String {
    bindings
        .iter()
        .map(|b| format!("var {} = {};", escape_identifier(&b.name), emit(&b.init)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_let(node: &Node, bindings: &[Binding], body: &[Node]) -> String {
    let block = join_nonempty(&[render_bindings(bindings), join_statements(body)]);
    if node.env.context == Context::Expr {
        iife(&block)
    } else {
        block
    }
}

/// Bindings initialize once; iteration happens only through `recur`, so the
/// unconditional loop always ends in an explicit break.
fn render_loop(node: &Node, bindings: &[Binding], body: &[Node]) -> String {
    let block = join_nonempty(&[
        render_bindings(bindings),
        format!("while (true) {{\n{}\nbreak;\n}}", join_statements(body)),
    ]);
    if node.env.context == Context::Expr {
        iife(&block)
    } else {
        block
    }
}

/// Re-assigns the recur point's bindings positionally, truncated to the
/// shorter of targets and supplied args, then continues the nearest loop.
fn render_recur(args: &[Node], targets: &[String]) -> String {
    let mut lines: Vec<String> = targets
        .iter()
        .zip(args.iter())
        .map(|(target, arg)| format!("{} = {};", escape_identifier(target), emit(arg)))
        .collect();
    lines.push("continue".to_string());
    lines.join("\n")
}

fn render_fn(clauses: &[FnClause]) -> String {
    match clauses {
        [] => "function () {\n}".to_string(),
        [clause] => render_single_clause(clause),
        _ => render_dispatching_fn(clauses),
    }
}

fn render_single_clause(clause: &FnClause) -> String {
    let params = clause
        .fixed
        .iter()
        .map(|p| escape_identifier(p))
        .collect::<Vec<_>>()
        .join(", ");
    let mut parts = Vec::new();
    if let Some(rest) = &clause.rest {
        parts.push(rest_binding(rest, clause.fixed.len()));
    }
    parts.push(join_statements(&clause.body));
    format!("function ({}) {{\n{}\n}}", params, join_nonempty(&parts))
}

/// Multiple arities switch on the runtime argument count. Each clause binds
/// its parameters from the positional arguments collection; a variadic
/// clause becomes the default branch, and unmatched counts raise a runtime
/// arity error.
fn render_dispatching_fn(clauses: &[FnClause]) -> String {
    let mut cases = Vec::new();
    for clause in clauses {
        let label = if clause.is_variadic() {
            "default:".to_string()
        } else {
            format!("case {}:", clause.arity())
        };
        let mut lines = vec![label];
        for (index, param) in clause.fixed.iter().enumerate() {
            lines.push(format!(
                "var {} = arguments[{}];",
                escape_identifier(param),
                index
            ));
        }
        if let Some(rest) = &clause.rest {
            lines.push(rest_binding(rest, clause.fixed.len()));
        }
        lines.push(join_statements(&clause.body));
        cases.push(join_nonempty(&lines));
    }
    format!(
        "function () {{\nswitch (arguments.length) {{\n{}\n}}\nthrow new Error(\"Invalid arity: \" + arguments.length);\n}}",
        cases.join("\n")
    )
}

fn rest_binding(name: &str, fixed_count: usize) -> String {
    format!(
        "var {} = Array.prototype.slice.call(arguments, {});",
        escape_identifier(name),
        fixed_count
    )
}

fn iife(body: &str) -> String {
    format!("(function () {{\n{}\n}})()", body)
}

fn join_nonempty(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

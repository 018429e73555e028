//! Semantic analysis: classified [`Form`] trees become annotated AST nodes.
//!
//! Analysis threads an [`Env`] through nested scopes. The environment is a
//! value: child scopes derive extended copies, nothing is mutated in place.
//! Special forms dispatch through a closed match in
//! [`special_forms`]; everything else is a constant, a collection, or an
//! invocation.

use std::sync::Arc;

use im::OrdSet;
use serde::Serialize;

use crate::ast::{Category, Form, FormKind};
use crate::diagnostics::YantraError;
use crate::namespaces::NamespaceStore;

pub mod special_forms;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Where a node's emitted text will sit. Context alone decides between
/// expression- and statement-shaped rendering downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Context {
    Statement,
    Expr,
    Return,
}

/// The innermost loop or fn clause eligible to receive a tail `recur`:
/// the ordered names `recur` re-binds positionally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurPoint {
    pub names: Vec<String>,
}

/// Analysis environment. Derived, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Env {
    pub context: Context,
    pub locals: OrdSet<String>,
    pub quoted: bool,
    pub recur_point: Option<Arc<RecurPoint>>,
}

impl Env {
    /// The environment of a top-level form: statement position, no locals.
    pub fn top() -> Self {
        Env {
            context: Context::Statement,
            locals: OrdSet::new(),
            quoted: false,
            recur_point: None,
        }
    }

    pub fn with_context(&self, context: Context) -> Self {
        Env {
            context,
            ..self.clone()
        }
    }

    pub fn expr(&self) -> Self {
        self.with_context(Context::Expr)
    }

    pub fn with_local(&self, name: &str) -> Self {
        let mut derived = self.clone();
        derived.locals.insert(name.to_string());
        derived
    }

    pub fn with_quoted(&self) -> Self {
        Env {
            quoted: true,
            ..self.clone()
        }
    }

    pub fn with_recur_point(&self, point: Arc<RecurPoint>) -> Self {
        Env {
            recur_point: Some(point),
            ..self.clone()
        }
    }
}

/// One `let`/`loop` binding: the local's name and its analyzed initializer.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub name: String,
    pub init: Node,
}

/// One fn arity clause. Clauses are keyed by fixed parameter count.
#[derive(Debug, Clone, Serialize)]
pub struct FnClause {
    pub fixed: Vec<String>,
    pub rest: Option<String>,
    pub body: Vec<Node>,
}

impl FnClause {
    pub fn arity(&self) -> usize {
        self.fixed.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.rest.is_some()
    }
}

/// The closed union of AST operations. Special operations carry role-labeled
/// analyzed sub-nodes.
#[derive(Debug, Clone, Serialize)]
pub enum Op {
    /// An atomic literal, sub-tagged by its category.
    Const(Category),
    /// A generic collection whose children are analyzed independently.
    /// Map children are flattened to interleaved key/value order.
    Coll(Vec<Node>),
    Aget {
        target: Box<Node>,
        fields: Vec<Node>,
    },
    Aset {
        target: Box<Node>,
        fields: Vec<Node>,
        value: Box<Node>,
    },
    Def {
        name: Box<Node>,
        init: Box<Node>,
    },
    Do {
        body: Vec<Node>,
    },
    Fn {
        clauses: Vec<FnClause>,
    },
    If {
        test: Box<Node>,
        then: Box<Node>,
        els: Box<Node>,
    },
    Invoke {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Let {
        bindings: Vec<Binding>,
        body: Vec<Node>,
    },
    Loop {
        bindings: Vec<Binding>,
        body: Vec<Node>,
    },
    New {
        ctor: Box<Node>,
        args: Vec<Node>,
    },
    Quote(Box<Node>),
    Recur {
        args: Vec<Node>,
        targets: Vec<String>,
    },
    Throw(Box<Node>),
}

/// An analyzed node: operation, originating form (with category and
/// metadata), and the environment snapshot it was analyzed under.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub op: Op,
    pub form: Form,
    pub env: Env,
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Classifies a form into its initial AST shape: collections become `coll`
/// nodes with recursively converted children, atoms become `const` nodes.
/// The closed [`FormKind`] union guarantees every form classifies.
pub fn form_to_ast(form: &Form) -> Node {
    let op = match &form.kind {
        FormKind::List(items) | FormKind::Vector(items) | FormKind::Set(items) => {
            Op::Coll(items.iter().map(form_to_ast).collect())
        }
        FormKind::Map(pairs) => Op::Coll(
            pairs
                .iter()
                .flat_map(|(k, v)| [form_to_ast(k), form_to_ast(v)])
                .collect(),
        ),
        _ => Op::Const(form.category()),
    };
    Node {
        op,
        form: form.clone(),
        env: Env::top(),
    }
}

// ============================================================================
// ANALYZER
// ============================================================================

/// Analysis pass over classified nodes. Holds the namespace store it
/// resolves against; the store is read-only here, mutation belongs to the
/// driver.
pub struct Analyzer<'a> {
    pub namespaces: &'a NamespaceStore,
    pub strict_arity: bool,
}

impl<'a> Analyzer<'a> {
    pub fn new(namespaces: &'a NamespaceStore) -> Self {
        Analyzer {
            namespaces,
            strict_arity: false,
        }
    }

    pub fn with_strict_arity(mut self, strict: bool) -> Self {
        self.strict_arity = strict;
        self
    }

    /// Dispatches one node: list forms get list analysis, collections get
    /// per-child analysis under expression context, symbols resolve, and
    /// every other constant passes through with the environment attached.
    pub fn analyze(&self, env: &Env, node: &Node) -> Result<Node, YantraError> {
        match node.form.category() {
            Category::List => self.analyze_list(env, node),
            Category::Symbol => self.analyze_symbol(env, node),
            _ => match &node.op {
                Op::Coll(children) => {
                    let child_env = env.expr();
                    let analyzed = children
                        .iter()
                        .map(|child| self.analyze(&child_env, child))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Node {
                        op: Op::Coll(analyzed),
                        form: node.form.clone(),
                        env: env.clone(),
                    })
                }
                _ => Ok(Node {
                    op: node.op.clone(),
                    form: node.form.clone(),
                    env: env.clone(),
                }),
            },
        }
    }

    /// Classifies and analyzes a raw form in one step.
    pub fn analyze_form(&self, env: &Env, form: &Form) -> Result<Node, YantraError> {
        self.analyze(env, &form_to_ast(form))
    }

    /// List analysis: quoted or childless lists are generic collections, a
    /// recognized special-form head dispatches to its analyzer, anything
    /// else is an invocation.
    fn analyze_list(&self, env: &Env, node: &Node) -> Result<Node, YantraError> {
        let items = node.form.as_list().expect("list category implies a list");
        if env.quoted || items.is_empty() {
            return self.analyze_as_coll(env, node);
        }

        if let Some(head) = node.form.head_symbol() {
            if head.ns.is_none() {
                if let Some(analyzed) = special_forms::dispatch(self, env, node, &head.name)? {
                    return Ok(analyzed);
                }
            }
        }

        let arg_env = env.expr();
        let callee = self.analyze_form(&arg_env, &items[0])?;
        let args = items
            .iter()
            .skip(1)
            .map(|arg| self.analyze_form(&arg_env, arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node {
            op: Op::Invoke {
                callee: Box::new(callee),
                args,
            },
            form: node.form.clone(),
            env: env.clone(),
        })
    }

    fn analyze_as_coll(&self, env: &Env, node: &Node) -> Result<Node, YantraError> {
        let items = node.form.as_list().expect("list category implies a list");
        let child_env = env.expr();
        let children = items
            .iter()
            .map(|child| self.analyze_form(&child_env, child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node {
            op: Op::Coll(children),
            form: node.form.clone(),
            env: env.clone(),
        })
    }

    /// Block analysis: every expression but the last sits in statement
    /// position; the last takes return position unless the enclosing
    /// context is already a statement.
    pub fn analyze_block<'f>(
        &self,
        env: &Env,
        forms: impl ExactSizeIterator<Item = &'f Form>,
    ) -> Result<Vec<Node>, YantraError> {
        let count = forms.len();
        forms
            .enumerate()
            .map(|(index, form)| {
                let context = if index + 1 < count {
                    Context::Statement
                } else if env.context == Context::Statement {
                    Context::Statement
                } else {
                    Context::Return
                };
                self.analyze_form(&env.with_context(context), form)
            })
            .collect()
    }

    /// Symbol analysis: quoted symbols pass through, the literal
    /// true/false/nil names become fixed constants, locals stay bare, and
    /// everything else resolves to a fully qualified symbol.
    fn analyze_symbol(&self, env: &Env, node: &Node) -> Result<Node, YantraError> {
        let sym = node.form.as_symbol().expect("symbol category");

        if env.quoted {
            return Ok(Node {
                op: Op::Const(Category::Symbol),
                form: node.form.clone(),
                env: env.clone(),
            });
        }

        if sym.ns.is_none() {
            let constant = match sym.name.as_str() {
                "true" => Some((Form::boolean(true), Category::Bool)),
                "false" => Some((Form::boolean(false), Category::Bool)),
                "nil" => Some((Form::nil(), Category::Nil)),
                _ => None,
            };
            if let Some((replacement, category)) = constant {
                return Ok(Node {
                    op: Op::Const(category),
                    form: replacement.with_meta(node.form.meta),
                    env: env.clone(),
                });
            }
            if env.locals.contains(&sym.name) {
                return Ok(Node {
                    op: Op::Const(Category::Symbol),
                    form: node.form.clone(),
                    env: env.clone(),
                });
            }
        }

        let resolved = self.namespaces.resolve(sym);
        Ok(Node {
            op: Op::Const(Category::Symbol),
            form: Form::new(FormKind::Symbol(resolved)).with_meta(node.form.meta),
            env: env.clone(),
        })
    }
}

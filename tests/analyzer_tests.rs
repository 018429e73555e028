//! Analyzer contract tests: context threading, scoping, special-form
//! shapes, and symbol resolution.

use yantra::analysis::{form_to_ast, Analyzer, Context, Env, Op};
use yantra::ast::{Category, Form, FormKind, Symbol};
use yantra::namespaces::NamespaceStore;
use yantra::syntax::parse;

fn read_one(source: &str) -> Form {
    parse(source).unwrap().remove(0)
}

fn analyze_under(store: &NamespaceStore, env: &Env, source: &str) -> yantra::analysis::Node {
    let analyzer = Analyzer::new(store);
    analyzer.analyze(env, &form_to_ast(&read_one(source))).unwrap()
}

fn analyze_top(source: &str) -> yantra::analysis::Node {
    let store = NamespaceStore::new();
    analyze_under(&store, &Env::top(), source)
}

#[test]
fn if_branches_keep_the_enclosing_context() {
    let store = NamespaceStore::new();
    let env = Env::top().with_context(Context::Return);
    let node = analyze_under(&store, &env, "(if c 1 2)");
    let Op::If { test, then, els } = &node.op else {
        panic!("expected an if node");
    };
    assert_eq!(test.env.context, Context::Expr);
    assert_eq!(then.env.context, Context::Return);
    assert_eq!(els.env.context, Context::Return);
}

#[test]
fn block_analysis_marks_only_the_last_position_as_return() {
    let store = NamespaceStore::new();
    let env = Env::top().with_context(Context::Expr);
    let node = analyze_under(&store, &env, "(do 1 2 3)");
    let Op::Do { body } = &node.op else {
        panic!("expected a do node");
    };
    let contexts: Vec<Context> = body.iter().map(|n| n.env.context).collect();
    assert_eq!(
        contexts,
        vec![Context::Statement, Context::Statement, Context::Return]
    );
}

#[test]
fn statement_blocks_never_introduce_return_positions() {
    let node = analyze_top("(do 1 2)");
    let Op::Do { body } = &node.op else {
        panic!("expected a do node");
    };
    assert!(body.iter().all(|n| n.env.context == Context::Statement));
}

#[test]
fn let_bindings_are_visible_to_later_bindings_and_the_body() {
    let node = analyze_top("(let [a 1 b a] b)");
    let Op::Let { bindings, body } = &node.op else {
        panic!("expected a let node");
    };
    // `b`'s initializer sees `a` as a local: it stays unqualified.
    let init_form = &bindings[1].init.form;
    assert_eq!(init_form.as_symbol(), Some(&Symbol::simple("a")));
    assert_eq!(body[0].form.as_symbol(), Some(&Symbol::simple("b")));
}

#[test]
fn unbound_symbols_resolve_to_the_current_namespace() {
    let node = analyze_top("(let [a 1] other)");
    let Op::Let { body, .. } = &node.op else {
        panic!("expected a let node");
    };
    assert_eq!(
        body[0].form.as_symbol(),
        Some(&Symbol::qualified("user", "other"))
    );
}

#[test]
fn quoting_suppresses_resolution() {
    let node = analyze_top("'map");
    let Op::Quote(inner) = &node.op else {
        panic!("expected a quote node");
    };
    assert!(inner.env.quoted);
    // Unquoted, `map` would resolve to core/map; quoted it stays bare.
    assert_eq!(inner.form.as_symbol(), Some(&Symbol::simple("map")));
}

#[test]
fn literal_names_become_fixed_constants() {
    let node = analyze_top("[true false nil]");
    let Op::Coll(children) = &node.op else {
        panic!("expected a coll node");
    };
    assert_eq!(children[0].form.kind, FormKind::Bool(true));
    assert_eq!(children[1].form.kind, FormKind::Bool(false));
    assert_eq!(children[2].form.kind, FormKind::Nil);
}

#[test]
fn macro_generated_literal_symbols_become_constants() {
    // The reader produces real literals, but a macro may emit the bare
    // symbols; analysis folds them to the same constants.
    let store = NamespaceStore::new();
    let analyzer = Analyzer::new(&store);
    let node = analyzer
        .analyze(&Env::top(), &form_to_ast(&Form::symbol("nil")))
        .unwrap();
    assert_eq!(node.form.kind, FormKind::Nil);
    let node = analyzer
        .analyze(&Env::top(), &form_to_ast(&Form::symbol("true")))
        .unwrap();
    assert_eq!(node.form.kind, FormKind::Bool(true));
}

#[test]
fn collection_children_analyze_under_expression_context() {
    let node = analyze_top("[1 2]");
    let Op::Coll(children) = &node.op else {
        panic!("expected a coll node");
    };
    assert!(children.iter().all(|n| n.env.context == Context::Expr));
    assert!(matches!(node.op, Op::Coll(_)));
    assert_eq!(node.form.category(), Category::Vector);
}

#[test]
fn empty_and_quoted_lists_are_generic_collections() {
    assert!(matches!(analyze_top("()").op, Op::Coll(_)));
    let quoted = analyze_top("'(inc 1)");
    let Op::Quote(inner) = &quoted.op else {
        panic!("expected a quote node");
    };
    assert!(matches!(inner.op, Op::Coll(_)));
}

#[test]
fn invocations_analyze_callee_and_args_under_expr() {
    let node = analyze_top("(f 1 2)");
    let Op::Invoke { callee, args } = &node.op else {
        panic!("expected an invoke node");
    };
    assert_eq!(callee.env.context, Context::Expr);
    assert_eq!(args.len(), 2);
    assert_eq!(
        callee.form.as_symbol(),
        Some(&Symbol::qualified("user", "f"))
    );
}

#[test]
fn loop_establishes_a_recur_point_for_its_body() {
    let node = analyze_top("(loop [x 0 y 1] (recur 1 2))");
    let Op::Loop { body, .. } = &node.op else {
        panic!("expected a loop node");
    };
    let Op::Recur { targets, args } = &body[0].op else {
        panic!("expected a recur node");
    };
    assert_eq!(targets, &vec!["x".to_string(), "y".to_string()]);
    assert_eq!(args.len(), 2);
}

#[test]
fn fn_clauses_establish_recur_points_over_their_params() {
    let node = analyze_top("(fn [a b] (recur b a))");
    let Op::Fn { clauses } = &node.op else {
        panic!("expected a fn node");
    };
    let Op::Recur { targets, .. } = &clauses[0].body[0].op else {
        panic!("expected a recur node");
    };
    assert_eq!(targets, &vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn recur_arity_mismatch_truncates_silently_by_default() {
    let node = analyze_top("(loop [x 0] (recur 1 2 3))");
    let Op::Loop { body, .. } = &node.op else {
        panic!("expected a loop node");
    };
    let Op::Recur { targets, args } = &body[0].op else {
        panic!("expected a recur node");
    };
    // Positional matching truncates at emission; analysis records both.
    assert_eq!(targets.len(), 1);
    assert_eq!(args.len(), 3);
}

#[test]
fn strict_mode_rejects_recur_arity_mismatches() {
    let store = NamespaceStore::new();
    let analyzer = Analyzer::new(&store).with_strict_arity(true);
    let err = analyzer
        .analyze(&Env::top(), &form_to_ast(&read_one("(loop [x 0] (recur 1 2))")))
        .unwrap_err();
    assert_eq!(err.error_code(), "SYNTAX_ERROR");
}

#[test]
fn strict_mode_rejects_duplicate_clause_arities() {
    let store = NamespaceStore::new();
    let analyzer = Analyzer::new(&store).with_strict_arity(true);
    let err = analyzer
        .analyze(&Env::top(), &form_to_ast(&read_one("(fn ([x] x) ([y] y))")))
        .unwrap_err();
    assert_eq!(err.error_code(), "SYNTAX_ERROR");
}

#[test]
fn malformed_special_forms_are_fatal() {
    let store = NamespaceStore::new();
    let analyzer = Analyzer::new(&store);
    for source in [
        "(let [a] a)",
        "(loop 3 x)",
        "(fn)",
        "(fn 1)",
        "(quote)",
        "(throw)",
        "(new)",
        "(aget)",
        "(aset x)",
    ] {
        let err = analyzer
            .analyze(&Env::top(), &form_to_ast(&read_one(source)))
            .unwrap_err();
        assert_eq!(err.error_code(), "SYNTAX_ERROR", "for {}", source);
    }
}

#[test]
fn every_node_retains_its_originating_form() {
    let node = analyze_top("(if c 1 2)");
    assert!(node.form.is_call_to("if"));
    assert!(node.form.span().is_some());
}

//! Whole-pipeline tests: reader through emission, form ordering, and the
//! abort-on-first-error contract.

use std::sync::Arc;

use yantra::ast::Form;
use yantra::compiler::{CompileOptions, Compiler};
use yantra::macros::MacroRegistry;

#[test]
fn fragments_join_in_source_order() {
    let mut compiler = Compiler::new();
    let program = compiler
        .compile_source("test.clj", "(def a 1)\n(def b 2)")
        .unwrap();
    assert_eq!(program, "user.a = 1;\nuser.b = 2;");
}

#[test]
fn each_fragment_is_independently_valid() {
    let mut compiler = Compiler::new();
    let program = compiler
        .compile_source("test.clj", "(def a 1) (println a)")
        .unwrap();
    for fragment in program.lines() {
        assert!(fragment.ends_with(';'), "fragment {:?}", fragment);
    }
}

#[test]
fn later_forms_see_earlier_namespace_mutations() {
    let mut compiler = Compiler::new();
    let program = compiler
        .compile_source(
            "test.clj",
            "(def before 1)\n(ns app)\n(def after 2)",
        )
        .unwrap();
    assert_eq!(
        program,
        "user.before = 1;\nRT.ns(\"app\");\napp.after = 2;"
    );
}

#[test]
fn the_counted_loop_example_compiles_to_iterative_control_flow() {
    let mut compiler = Compiler::new();
    let program = compiler
        .compile_source(
            "test.clj",
            "(def result (loop [x 0] (if (< x 3) (recur (inc x)) x)))",
        )
        .unwrap();
    // Value-producing position wraps the loop in an IIFE whose terminating
    // branch returns the final binding.
    assert!(program.starts_with("user.result = (function () {"));
    assert!(program.contains("var x = 0;"));
    assert!(program.contains("while (true) {"));
    assert!(program.contains("x = core.inc(x);\ncontinue;"));
    assert!(program.contains("return x;"));
    assert!(program.contains("break;"));
    assert!(program.ends_with("})();"));
}

#[test]
fn supplied_macros_expand_before_analysis() {
    let mut registry = MacroRegistry::new();
    registry.register(
        "unless",
        Arc::new(|args: &[Form]| {
            Ok(Form::list([
                Form::symbol("if"),
                args[0].clone(),
                Form::nil(),
                args[1].clone(),
            ]))
        }),
    );
    let mut compiler = Compiler::new().with_macros(registry);
    let program = compiler
        .compile_source("test.clj", "(def x (unless c 1))")
        .unwrap();
    assert_eq!(program, "user.x = (user.c ? null : 1);");
}

#[test]
fn the_first_error_aborts_the_remaining_forms() {
    let mut compiler = Compiler::new();
    let err = compiler
        .compile_source("test.clj", "(def ok 1)\n(recur 1)\n(def never 2)")
        .unwrap_err();
    assert_eq!(err.error_code(), "SCOPE_ERROR");
}

#[test]
fn parse_errors_carry_the_named_source() {
    let mut compiler = Compiler::new();
    let err = compiler.compile_source("broken.clj", "(def x").unwrap_err();
    assert_eq!(err.error_code(), "PARSE_ERROR");
    let yantra::YantraError::Parse { ctx, .. } = &err else {
        panic!("expected a parse error");
    };
    assert!(ctx.source.is_some());
    assert!(ctx.span.is_some());
}

#[test]
fn independent_compilers_share_no_state() {
    let mut first = Compiler::new();
    first
        .compile_source("a.clj", "(ns app)\n(def x 1)")
        .unwrap();

    let mut second = Compiler::new();
    let program = second.compile_source("b.clj", "(def x 1)").unwrap();
    // The second run still sits in the default namespace.
    assert_eq!(program, "user.x = 1;");
}

#[test]
fn strict_arity_is_opt_in() {
    let source = "(loop [x 0] (recur 1 2))";

    let mut lenient = Compiler::new();
    assert!(lenient.compile_source("test.clj", source).is_ok());

    let mut strict = Compiler::with_options(CompileOptions {
        strict_arity: true,
        ..CompileOptions::default()
    });
    let err = strict.compile_source("test.clj", source).unwrap_err();
    assert_eq!(err.error_code(), "SYNTAX_ERROR");
}

#[test]
fn empty_source_compiles_to_an_empty_program() {
    let mut compiler = Compiler::new();
    assert_eq!(compiler.compile_source("test.clj", "  ; nothing\n").unwrap(), "");
}

//! Namespace resolver tests: seeding, resolution priority, declaration
//! processing, and the emitted registration call.

use yantra::ast::Symbol;
use yantra::compiler::Compiler;
use yantra::namespaces::{
    process_declaration, NamespaceStore, CORE_BINDINGS, CORE_NS, DEFAULT_NS,
};
use yantra::syntax::parse;

#[test]
fn created_namespaces_are_seeded_with_core_refers() {
    let mut store = NamespaceStore::new();
    store.create_namespace("app");
    let spec = store.spec("app").unwrap();
    assert_eq!(spec.refer.len(), CORE_BINDINGS.len());
    assert_eq!(spec.refer.get("concat").map(String::as_str), Some(CORE_NS));
}

#[test]
fn refer_substitutes_the_defining_namespace() {
    let store = NamespaceStore::new();
    assert_eq!(
        store.resolve(&Symbol::simple("map")),
        Symbol::qualified(CORE_NS, "map")
    );
}

#[test]
fn require_alias_substitutes_the_real_namespace() {
    let mut store = NamespaceStore::new();
    store.add_require(DEFAULT_NS, "s", "strlib");
    assert_eq!(
        store.resolve(&Symbol::qualified("s", "join")),
        Symbol::qualified("strlib", "join")
    );
}

#[test]
fn unqualified_unknown_names_default_to_the_current_namespace() {
    let store = NamespaceStore::new();
    assert_eq!(
        store.resolve(&Symbol::simple("foo")),
        Symbol::qualified(DEFAULT_NS, "foo")
    );
}

#[test]
fn a_declared_namespace_qualifier_is_kept_as_is() {
    let mut store = NamespaceStore::new();
    store.create_namespace("strlib");
    let sym = Symbol::qualified("strlib", "join");
    assert_eq!(store.resolve(&sym), sym);
}

#[test]
fn require_aliases_take_priority_over_declared_namespaces() {
    let mut store = NamespaceStore::new();
    store.create_namespace("s");
    store.add_require(DEFAULT_NS, "s", "strlib");
    assert_eq!(
        store.resolve(&Symbol::qualified("s", "join")),
        Symbol::qualified("strlib", "join")
    );
}

#[test]
fn local_refers_take_priority_over_the_current_namespace_default() {
    let mut store = NamespaceStore::new();
    store.add_refer(DEFAULT_NS, "join", "strlib");
    assert_eq!(
        store.resolve(&Symbol::simple("join")),
        Symbol::qualified("strlib", "join")
    );
}

#[test]
fn declaration_processing_registers_and_switches() {
    let mut store = NamespaceStore::new();
    let form = parse("(ns app (:require [strlib :as s] [seqs :refer [zip]] iolib))")
        .unwrap()
        .remove(0);
    let replacement = process_declaration(&mut store, &form).unwrap().unwrap();

    assert_eq!(store.current(), "app");
    let spec = store.spec("app").unwrap();
    assert_eq!(spec.require.get("s").map(String::as_str), Some("strlib"));
    assert_eq!(spec.require.get("strlib").map(String::as_str), Some("strlib"));
    assert_eq!(spec.require.get("iolib").map(String::as_str), Some("iolib"));
    assert_eq!(spec.refer.get("zip").map(String::as_str), Some("seqs"));

    assert_eq!(replacement.pretty(), "(js/RT.ns \"app\")");
}

#[test]
fn non_declarations_pass_through_untouched() {
    let mut store = NamespaceStore::new();
    let form = parse("(def x 1)").unwrap().remove(0);
    assert!(process_declaration(&mut store, &form).unwrap().is_none());
    assert_eq!(store.current(), DEFAULT_NS);
}

#[test]
fn malformed_declarations_are_fatal() {
    let mut store = NamespaceStore::new();
    for source in ["(ns)", "(ns \"app\")", "(ns app (:exports a))", "(ns app (:require 3))"] {
        let form = parse(source).unwrap().remove(0);
        let err = process_declaration(&mut store, &form).unwrap_err();
        assert_eq!(err.error_code(), "SYNTAX_ERROR", "for {}", source);
    }
}

#[test]
fn declarations_compile_to_the_runtime_registration_call() {
    let mut compiler = Compiler::new();
    let program = compiler
        .compile_source(
            "app.clj",
            "(ns app (:require [strlib :as s]))\n(def greeting (s/join \"a\" \"b\"))",
        )
        .unwrap();
    assert_eq!(
        program,
        "RT.ns(\"app\");\napp.greeting = strlib.join(\"a\", \"b\");"
    );
}

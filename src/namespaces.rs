//! Namespace registry and symbol resolution.
//!
//! A [`NamespaceStore`] is a plain value owned by the driver and threaded
//! through analysis — one store per compilation run, so isolated
//! compilations never share state. Each namespace holds a require table
//! (alias → namespace) and a refer table (bare name → defining namespace);
//! resolution always produces a fully qualified symbol.

use std::collections::HashMap;

use crate::ast::{Form, FormKind, Symbol};
use crate::diagnostics::{syntax_error, YantraError};

/// The namespace every fresh store starts in.
pub const DEFAULT_NS: &str = "user";

/// The namespace that defines the core bindings.
pub const CORE_NS: &str = "core";

/// Reserved pseudo-namespace for host-global access. Symbols qualified with
/// it resolve to bare JavaScript names.
pub const HOST_NS: &str = "js";

/// The fixed set of core binding names referred into every new namespace.
/// The syntax-quote helpers (`list`, `seq`, `concat`, `apply`, `hash-map`,
/// `hash-set`) must stay in this list.
pub const CORE_BINDINGS: &[&str] = &[
    "+", "-", "*", "/", "=", "<", ">", "<=", ">=",
    "apply", "assoc", "concat", "cons", "count", "dec", "filter", "first",
    "get", "hash-map", "hash-set", "inc", "keyword", "list", "map", "not",
    "nth", "println", "reduce", "rest", "seq", "str", "symbol", "vector",
];

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Resolution tables for one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceSpec {
    /// alias → namespace name.
    pub require: HashMap<String, String>,
    /// bare name → defining namespace name.
    pub refer: HashMap<String, String>,
}

impl NamespaceSpec {
    /// A spec seeded with the fixed core refer list.
    pub fn with_core_bindings() -> Self {
        let refer = CORE_BINDINGS
            .iter()
            .map(|name| (name.to_string(), CORE_NS.to_string()))
            .collect();
        NamespaceSpec {
            require: HashMap::new(),
            refer,
        }
    }
}

/// Registry of namespace specs plus the current-namespace pointer.
#[derive(Debug, Clone)]
pub struct NamespaceStore {
    specs: HashMap<String, NamespaceSpec>,
    current: String,
}

impl Default for NamespaceStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl NamespaceStore {
    /// A fresh store holding only the default namespace.
    pub fn new() -> Self {
        let mut specs = HashMap::new();
        specs.insert(DEFAULT_NS.to_string(), NamespaceSpec::with_core_bindings());
        NamespaceStore {
            specs,
            current: DEFAULT_NS.to_string(),
        }
    }

    /// Registers a namespace seeded with the core refer list. Re-declaring
    /// an existing namespace keeps its accumulated tables.
    pub fn create_namespace(&mut self, name: &str) {
        self.specs
            .entry(name.to_string())
            .or_insert_with(NamespaceSpec::with_core_bindings);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Moves the current-namespace pointer, registering the target first if
    /// needed.
    pub fn set_current(&mut self, name: &str) {
        self.create_namespace(name);
        self.current = name.to_string();
        log::debug!("current namespace is now {}", name);
    }

    pub fn spec(&self, name: &str) -> Option<&NamespaceSpec> {
        self.specs.get(name)
    }

    fn current_spec(&self) -> &NamespaceSpec {
        self.specs
            .get(&self.current)
            .expect("the current namespace is always registered")
    }

    /// Records `alias` → `target` in the named namespace's require table.
    pub fn add_require(&mut self, ns: &str, alias: &str, target: &str) {
        self.create_namespace(ns);
        if let Some(spec) = self.specs.get_mut(ns) {
            spec.require.insert(alias.to_string(), target.to_string());
        }
    }

    /// Records `name` as referred from `target` in the named namespace.
    pub fn add_refer(&mut self, ns: &str, name: &str, target: &str) {
        self.create_namespace(ns);
        if let Some(spec) = self.specs.get_mut(ns) {
            spec.refer.insert(name.to_string(), target.to_string());
        }
    }

    /// Resolves a symbol against the current namespace. The result is always
    /// fully qualified; resolution never yields an ambiguous or bare symbol.
    pub fn resolve(&self, sym: &Symbol) -> Symbol {
        self.resolve_in(self.current_spec(), sym)
    }

    /// Resolution against an explicit spec, in priority order:
    /// a require-table alias substitutes the real namespace; a declared
    /// namespace or the host pseudo-namespace is kept as-is; a referred bare
    /// name substitutes its defining namespace; anything else defaults to
    /// the current namespace.
    pub fn resolve_in(&self, spec: &NamespaceSpec, sym: &Symbol) -> Symbol {
        match &sym.ns {
            Some(alias) => {
                if let Some(real) = spec.require.get(alias) {
                    return Symbol::qualified(real.clone(), sym.name.clone());
                }
                // Declared namespaces and the host pseudo-namespace stay
                // as-is; so does an unrecognized qualifier, which is already
                // fully qualified.
                sym.clone()
            }
            None => {
                if let Some(defining) = spec.refer.get(&sym.name) {
                    return Symbol::qualified(defining.clone(), sym.name.clone());
                }
                Symbol::qualified(self.current.clone(), sym.name.clone())
            }
        }
    }
}

// ============================================================================
// NAMESPACE DECLARATION PROCESSING
// ============================================================================

/// Recognizes a top-level `(ns name clauses...)` declaration. When the form
/// is one, the store registers the namespace, accumulates its require/refer
/// clauses, and moves the current pointer; the returned replacement form
/// compiles into the runtime registration call. Other forms return `None`.
///
/// Supported clause shape:
/// `(:require [lib :as alias] [lib :refer [a b]] bare-lib)`.
pub fn process_declaration(
    store: &mut NamespaceStore,
    form: &Form,
) -> Result<Option<Form>, YantraError> {
    if !form.is_call_to("ns") {
        return Ok(None);
    }
    let items = form.as_list().expect("ns head implies a list");

    let name_form = items
        .get(1)
        .ok_or_else(|| syntax_error("ns declaration requires a name", Some(form)))?;
    let name = match name_form.as_symbol() {
        Some(sym) if sym.ns.is_none() => sym.name.clone(),
        _ => {
            return Err(syntax_error(
                "ns name must be a bare symbol",
                Some(name_form),
            ))
        }
    };

    store.set_current(&name);
    for clause in items.iter().skip(2) {
        process_clause(store, &name, clause)?;
    }

    Ok(Some(
        Form::list([
            Form::symbol(&format!("{}/RT.ns", HOST_NS)),
            Form::string(name),
        ])
        .with_meta(form.meta),
    ))
}

fn process_clause(
    store: &mut NamespaceStore,
    ns: &str,
    clause: &Form,
) -> Result<(), YantraError> {
    let items = clause
        .as_list()
        .ok_or_else(|| syntax_error("ns clause must be a list", Some(clause)))?;
    let head = match items.front().map(|f| &f.kind) {
        Some(FormKind::Keyword(kw)) if kw.ns.is_none() => kw.name.clone(),
        _ => {
            return Err(syntax_error(
                "ns clause must start with a keyword",
                Some(clause),
            ))
        }
    };
    if head != "require" {
        return Err(syntax_error(
            format!("Unsupported ns clause :{}", head),
            Some(clause),
        ));
    }

    for entry in items.iter().skip(1) {
        process_require_entry(store, ns, entry)?;
    }
    Ok(())
}

fn process_require_entry(
    store: &mut NamespaceStore,
    ns: &str,
    entry: &Form,
) -> Result<(), YantraError> {
    // A bare symbol requires the library under its own name.
    if let Some(sym) = entry.as_symbol() {
        store.add_require(ns, &sym.name, &sym.name);
        return Ok(());
    }

    let items = entry.as_vector().ok_or_else(|| {
        syntax_error("require entry must be a symbol or a vector", Some(entry))
    })?;
    let lib = items
        .front()
        .and_then(|f| f.as_symbol())
        .ok_or_else(|| syntax_error("require entry must name a library", Some(entry)))?
        .name
        .clone();
    store.add_require(ns, &lib, &lib);

    let mut rest = items.iter().skip(1);
    while let Some(option) = rest.next() {
        let option_name = match &option.kind {
            FormKind::Keyword(kw) if kw.ns.is_none() => kw.name.as_str(),
            _ => {
                return Err(syntax_error(
                    "require options must be keywords",
                    Some(option),
                ))
            }
        };
        let value = rest.next().ok_or_else(|| {
            syntax_error(format!(":{} expects a value", option_name), Some(entry))
        })?;
        match option_name {
            "as" => {
                let alias = value.as_symbol().ok_or_else(|| {
                    syntax_error(":as expects a symbol", Some(value))
                })?;
                store.add_require(ns, &alias.name, &lib);
            }
            "refer" => {
                let names = value.as_vector().ok_or_else(|| {
                    syntax_error(":refer expects a vector of symbols", Some(value))
                })?;
                for name in names {
                    let sym = name.as_symbol().ok_or_else(|| {
                        syntax_error(":refer expects a vector of symbols", Some(name))
                    })?;
                    store.add_refer(ns, &sym.name, &lib);
                }
            }
            other => {
                return Err(syntax_error(
                    format!("Unsupported require option :{}", other),
                    Some(option),
                ))
            }
        }
    }
    Ok(())
}

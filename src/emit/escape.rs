//! Identifier escaping.
//!
//! Source identifiers may contain characters JavaScript identifiers cannot.
//! Each character of the fixed set maps to a distinct textual token, so two
//! names differing anywhere in that set never collide after escaping.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::Symbol;
use crate::namespaces::HOST_NS;

static ESCAPES: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ('+', "_PLUS_"),
        ('-', "_DASH_"),
        ('*', "_STAR_"),
        ('/', "_SLASH_"),
        ('?', "_QMARK_"),
        ('!', "_BANG_"),
        ('<', "_LT_"),
        ('>', "_GT_"),
        ('=', "_EQ_"),
    ])
});

/// Transliterates one identifier. Characters outside the escape set pass
/// through untouched.
pub fn escape_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match ESCAPES.get(&c) {
            Some(token) => out.push_str(token),
            None => out.push(c),
        }
    }
    out
}

/// Renders a symbol as a member-access path: `<escaped-ns>.<escaped-name>`.
/// Symbols in the host pseudo-namespace render as the bare name, giving
/// direct access to host globals. Dots separate path segments and survive
/// escaping.
pub fn symbol_path(sym: &Symbol) -> String {
    match &sym.ns {
        Some(ns) if ns == HOST_NS => escape_identifier(&sym.name),
        Some(ns) => format!(
            "{}.{}",
            escape_identifier(ns),
            escape_identifier(&sym.name)
        ),
        None => escape_identifier(&sym.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_special_character_gets_a_distinct_token() {
        let specials = "+-*/?!<>=";
        let mut seen = std::collections::HashSet::new();
        for c in specials.chars() {
            let escaped = escape_identifier(&c.to_string());
            assert!(seen.insert(escaped), "token for {:?} collides", c);
        }
    }

    #[test]
    fn distinct_names_never_collide() {
        let names = ["a+b", "a-b", "a*b", "a/b", "a?b", "a!b", "a<b", "a>b", "a=b", "ab"];
        let escaped: std::collections::HashSet<String> =
            names.iter().map(|n| escape_identifier(n)).collect();
        assert_eq!(escaped.len(), names.len());
    }

    #[test]
    fn host_namespace_renders_bare() {
        let sym = Symbol::qualified("js", "console.log");
        assert_eq!(symbol_path(&sym), "console.log");
    }

    #[test]
    fn qualified_symbols_render_as_member_paths() {
        let sym = Symbol::qualified("my-app.core", "save!");
        assert_eq!(symbol_path(&sym), "my_DASH_app.core.save_BANG_");
    }
}

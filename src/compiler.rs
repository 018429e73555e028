//! The compilation driver.
//!
//! A [`Compiler`] owns the state a compilation run threads through the
//! pipeline: the namespace store, the externally supplied macro table, and
//! the options. Top-level forms compile strictly in order, because later
//! forms' resolution depends on namespace mutations performed by earlier
//! ones; the first error aborts everything remaining.

use crate::analysis::{form_to_ast, Analyzer, Env, Node};
use crate::ast::Form;
use crate::diagnostics::{to_error_source, YantraError};
use crate::emit::emit;
use crate::macros::{expand_all, MacroRegistry, DEFAULT_EXPANSION_BUDGET};
use crate::namespaces::{process_declaration, NamespaceStore};
use crate::syntax::parse;

/// Per-run compilation options.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Bound on the macro-expansion fixed-point loop.
    pub expansion_budget: usize,
    /// Opt-in strict mode: recur arity mismatches and duplicate fn clause
    /// arities become errors instead of silent truncation/overwrite.
    pub strict_arity: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            expansion_budget: DEFAULT_EXPANSION_BUDGET,
            strict_arity: false,
        }
    }
}

/// Sequentially composes expansion, analysis, and emission per top-level
/// form. One value per compilation run; independent runs share nothing.
#[derive(Debug, Default)]
pub struct Compiler {
    pub namespaces: NamespaceStore,
    pub macros: MacroRegistry,
    pub options: CompileOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Compiler {
            options,
            ..Self::default()
        }
    }

    pub fn with_macros(mut self, macros: MacroRegistry) -> Self {
        self.macros = macros;
        self
    }

    /// Expands one form to its macro-free fixed point without analyzing it.
    pub fn expand_form(&self, form: &Form) -> Result<Form, YantraError> {
        expand_all(form, &self.macros, self.options.expansion_budget)
    }

    /// Runs one top-level form through the full pipeline up to the analyzed
    /// AST. Namespace declarations mutate the store here, before analysis.
    pub fn lower_form(&mut self, form: &Form) -> Result<Node, YantraError> {
        let form = match process_declaration(&mut self.namespaces, form)? {
            Some(replacement) => replacement,
            None => form.clone(),
        };
        let expanded = expand_all(&form, &self.macros, self.options.expansion_budget)?;
        log::debug!("expanded: {}", expanded.pretty());

        let analyzer =
            Analyzer::new(&self.namespaces).with_strict_arity(self.options.strict_arity);
        analyzer.analyze(&Env::top(), &form_to_ast(&expanded))
    }

    /// Compiles one top-level form into an independently valid fragment.
    pub fn compile_form(&mut self, form: &Form) -> Result<String, YantraError> {
        Ok(emit(&self.lower_form(form)?))
    }

    /// Compiles an ordered sequence of forms; newline-joining the fragments
    /// in order yields the complete program.
    pub fn compile_forms(&mut self, forms: &[Form]) -> Result<String, YantraError> {
        let fragments = forms
            .iter()
            .map(|form| self.compile_form(form))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(fragments.join("\n"))
    }

    /// Reads source text and compiles every form in it, enriching errors
    /// with the named source.
    pub fn compile_source(&mut self, name: &str, text: &str) -> Result<String, YantraError> {
        let source = to_error_source(name, text);
        let forms = parse(text).map_err(|e| e.with_source(&source))?;
        log::debug!("compiling {} top-level forms from {}", forms.len(), name);
        self.compile_forms(&forms).map_err(|e| e.with_source(&source))
    }

    /// Like [`Compiler::compile_source`], but stops after analysis and
    /// returns the annotated nodes.
    pub fn analyze_source(&mut self, name: &str, text: &str) -> Result<Vec<Node>, YantraError> {
        let source = to_error_source(name, text);
        let forms = parse(text).map_err(|e| e.with_source(&source))?;
        forms
            .iter()
            .map(|form| self.lower_form(form).map_err(|e| e.with_source(&source)))
            .collect()
    }
}

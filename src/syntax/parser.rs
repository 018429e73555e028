//! Yantra reader.
//!
//! Converts source text into span-carrying [`Form`] trees. This parser is
//! purely syntactic: no resolution, no special-form recognition. Reader
//! macros (`'`, `` ` ``, `~`, `~@`) are rewritten into their list spellings
//! here so every later stage sees plain data.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::{Form, Span};
use crate::diagnostics::{parse_error, YantraError};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct YantraParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses source text into a sequence of top-level forms.
pub fn parse(source_text: &str) -> Result<Vec<Form>, YantraError> {
    if source_text.trim().is_empty() {
        return Ok(vec![]);
    }

    let pairs = YantraParser::parse(Rule::program, source_text)
        .map_err(convert_pest_error)?;

    let program = pairs.peek().expect("pest guarantees the program rule");
    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build_form)
        .collect()
}

// ============================================================================
// FORM BUILDERS
// ============================================================================

fn build_form(pair: Pair<Rule>) -> Result<Form, YantraError> {
    let span = span_of(&pair);

    match pair.as_rule() {
        Rule::quoted => build_reader_macro("quote", pair, span),
        Rule::syntax_quoted => build_reader_macro("syntax-quote", pair, span),
        Rule::unquoted => build_reader_macro("unquote", pair, span),
        Rule::unquote_splicing => build_reader_macro("unquote-splice", pair, span),

        Rule::list => Ok(Form::list(build_children(pair)?).with_span(span)),
        Rule::vector => Ok(Form::vector(build_children(pair)?).with_span(span)),
        Rule::set => Ok(Form::set(build_children(pair)?).with_span(span)),
        Rule::map => build_map(pair, span),

        Rule::string => build_string(pair, span),
        Rule::number => {
            let text = pair.as_str();
            let value = text.parse::<f64>().map_err(|_| {
                parse_error(format!("Invalid number literal: {}", text), Some(span))
            })?;
            Ok(Form::number(value).with_span(span))
        }
        Rule::boolean => Ok(Form::boolean(pair.as_str() == "true").with_span(span)),
        Rule::nil => Ok(Form::nil().with_span(span)),
        Rule::keyword => Ok(Form::keyword(&pair.as_str()[1..]).with_span(span)),
        Rule::symbol => Ok(Form::symbol(pair.as_str()).with_span(span)),

        rule => Err(parse_error(
            format!("Unexpected grammar rule: {:?}", rule),
            Some(span),
        )),
    }
}

/// Rewrites a reader-macro pair into its `(marker form)` list spelling.
fn build_reader_macro(marker: &str, pair: Pair<Rule>, span: Span) -> Result<Form, YantraError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| parse_error(format!("Dangling reader macro {}", marker), Some(span)))?;
    let form = build_form(inner)?;
    Ok(Form::list([Form::symbol(marker).with_span(span), form]).with_span(span))
}

fn build_children(pair: Pair<Rule>) -> Result<Vec<Form>, YantraError> {
    pair.into_inner().map(build_form).collect()
}

fn build_map(pair: Pair<Rule>, span: Span) -> Result<Form, YantraError> {
    let items = build_children(pair)?;
    if items.len() % 2 != 0 {
        return Err(parse_error(
            "Map literal requires an even number of forms",
            Some(span),
        ));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        pairs.push((k, v));
    }
    Ok(Form::map(pairs).with_span(span))
}

fn build_string(pair: Pair<Rule>, span: Span) -> Result<Form, YantraError> {
    let raw = pair.as_str();
    // Strip the surrounding quotes the grammar guarantees.
    let content = &raw[1..raw.len() - 1];
    Ok(Form::string(unescape(content)).with_span(span))
}

// ============================================================================
// UTILITIES
// ============================================================================

fn span_of(pair: &Pair<Rule>) -> Span {
    let s = pair.as_span();
    Span {
        start: s.start(),
        end: s.end(),
    }
}

fn unescape(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn convert_pest_error(err: pest::error::Error<Rule>) -> YantraError {
    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos,
            end: pos,
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };
    parse_error(err.variant.message().to_string(), Some(span))
}

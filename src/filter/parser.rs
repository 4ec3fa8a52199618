//! # Filter Parser
//!
//! Recursive descent over the token stream. A `(` opens a list whose
//! children are parsed until the matching `)`; any other token is an atom.
//!
//! Atom rules, in order:
//! 1. single-quoted → string (quotes stripped)
//! 2. `true` / `false` / `null` → literals
//! 3. `^\d+(\.\d+)?$` → number
//! 4. `^[^()',]+$` → symbol (field or operator name)
//! 5. anything else → syntax error

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Number;

use super::errors::{FilterError, FilterResult};
use super::tokenizer::{tokenize, Token};

/// A leaf of the raw filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// Quoted string, still URL-encoded
    String(String),
    Number(Number),
    Bool(bool),
    Null,
    /// Field or operator name
    Symbol(String),
}

/// Raw nested-list filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    List(Vec<Sexp>),
    Atom(Atom),
}

impl Sexp {
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Sexp::Atom(Atom::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Sexp::Atom(Atom::String(s)) => write!(f, "'{}'", s),
            Sexp::Atom(Atom::Number(n)) => write!(f, "{}", n),
            Sexp::Atom(Atom::Bool(b)) => write!(f, "{}", b),
            Sexp::Atom(Atom::Null) => write!(f, "null"),
            Sexp::Atom(Atom::Symbol(s)) => write!(f, "{}", s),
        }
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid number pattern"))
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^()',]+$").expect("valid symbol pattern"))
}

/// Parse a raw filter string into its top-level items
pub fn parse(input: &str) -> FilterResult<Vec<Sexp>> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let mut items = Vec::new();

    while pos < tokens.len() {
        items.push(parse_expr(&tokens, &mut pos)?);
    }
    Ok(items)
}

fn parse_expr(tokens: &[Token], pos: &mut usize) -> FilterResult<Sexp> {
    let token = tokens.get(*pos).ok_or(FilterError::UnbalancedParens)?;
    *pos += 1;

    match token {
        Token::Open => {
            let mut children = Vec::new();
            loop {
                match tokens.get(*pos) {
                    None => return Err(FilterError::UnbalancedParens),
                    Some(Token::Close) => {
                        *pos += 1;
                        return Ok(Sexp::List(children));
                    }
                    Some(_) => children.push(parse_expr(tokens, pos)?),
                }
            }
        }
        Token::Close => Err(FilterError::UnbalancedParens),
        Token::Text(text) => parse_atom(text).map(Sexp::Atom),
    }
}

/// Classify a single token
pub fn parse_atom(text: &str) -> FilterResult<Atom> {
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        return Ok(Atom::String(text[1..text.len() - 1].to_string()));
    }

    match text {
        "true" => return Ok(Atom::Bool(true)),
        "false" => return Ok(Atom::Bool(false)),
        "null" => return Ok(Atom::Null),
        _ => {}
    }

    if number_pattern().is_match(text) {
        return parse_number(text).map(Atom::Number);
    }

    if symbol_pattern().is_match(text) {
        return Ok(Atom::Symbol(text.to_string()));
    }

    Err(FilterError::InvalidAtom(text.to_string()))
}

fn parse_number(text: &str) -> FilterResult<Number> {
    if !text.contains('.') {
        if let Ok(n) = text.parse::<u64>() {
            return Ok(Number::from(n));
        }
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| FilterError::InvalidAtom(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Sexp {
        Sexp::Atom(Atom::Symbol(s.to_string()))
    }

    #[test]
    fn test_atoms() {
        assert_eq!(parse_atom("'bob'").unwrap(), Atom::String("bob".to_string()));
        assert_eq!(parse_atom("true").unwrap(), Atom::Bool(true));
        assert_eq!(parse_atom("null").unwrap(), Atom::Null);
        assert_eq!(parse_atom("21").unwrap(), Atom::Number(Number::from(21u64)));
        assert_eq!(
            parse_atom("2.5").unwrap(),
            Atom::Number(Number::from_f64(2.5).unwrap())
        );
        assert_eq!(parse_atom("age").unwrap(), Atom::Symbol("age".to_string()));
        assert_eq!(parse_atom("-3").unwrap(), Atom::Symbol("-3".to_string()));
    }

    #[test]
    fn test_non_ascii_digits_are_symbols() {
        assert_eq!(parse_atom("٣").unwrap(), Atom::Symbol("٣".to_string()));
        assert_eq!(parse_atom("１２").unwrap(), Atom::Symbol("１２".to_string()));
    }

    #[test]
    fn test_stray_quote_is_invalid() {
        assert_eq!(
            parse_atom("bo'b").unwrap_err(),
            FilterError::InvalidAtom("bo'b".to_string())
        );
    }

    #[test]
    fn test_nested_structure() {
        let parsed = parse("(and,((age,gt,21),(age,lt,65)))").unwrap();
        assert_eq!(parsed.len(), 1);

        let outer = parsed[0].as_list().unwrap();
        assert_eq!(outer[0], sym("and"));
        let operands = outer[1].as_list().unwrap();
        assert_eq!(operands.len(), 2);
        assert_eq!(operands[0].as_list().unwrap()[1], sym("gt"));
    }

    #[test]
    fn test_multiple_top_level_items() {
        let parsed = parse("(a,1)(b,2)").unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(parse("(a,1").unwrap_err(), FilterError::UnbalancedParens);
        assert_eq!(parse("a,1)").unwrap_err(), FilterError::UnbalancedParens);
    }

    #[test]
    fn test_display_round_trip() {
        let parsed = parse("(name,in,('a','b'))").unwrap();
        assert_eq!(parsed[0].to_string(), "(name,in,('a','b'))");
    }
}

//! # Filter Tokenizer
//!
//! `(` and `)` are tokens of their own, `,` only separates, and a
//! single-quoted span is one token (quotes included) even when it contains
//! delimiters. Everything else accumulates into the current token.

use super::errors::{FilterError, FilterResult};

/// A filter token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    Text(String),
}

/// Split a raw filter string into tokens
pub fn tokenize(input: &str) -> FilterResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.char_indices();

    fn flush(current: &mut String, tokens: &mut Vec<Token>) {
        if !current.is_empty() {
            tokens.push(Token::Text(std::mem::take(current)));
        }
    }

    while let Some((pos, c)) = chars.next() {
        match c {
            '(' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Open);
            }
            ')' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Close);
            }
            ',' => flush(&mut current, &mut tokens),
            '\'' => {
                flush(&mut current, &mut tokens);
                let mut quoted = String::from('\'');
                let mut closed = false;
                for (_, q) in chars.by_ref() {
                    quoted.push(q);
                    if q == '\'' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(FilterError::UnterminatedString(pos));
                }
                tokens.push(Token::Text(quoted));
            }
            other => current.push(other),
        }
    }
    flush(&mut current, &mut tokens);

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    #[test]
    fn test_simple_list() {
        assert_eq!(
            tokenize("(name,eq,'bob')").unwrap(),
            vec![Token::Open, text("name"), text("eq"), text("'bob'"), Token::Close]
        );
    }

    #[test]
    fn test_quoted_delimiters_kept() {
        assert_eq!(
            tokenize("(title,'a,(b)')").unwrap(),
            vec![Token::Open, text("title"), text("'a,(b)'"), Token::Close]
        );
    }

    #[test]
    fn test_nested_lists() {
        let tokens = tokenize("(and,((age,gt,21),(age,lt,65)))").unwrap();
        assert_eq!(tokens.iter().filter(|t| **t == Token::Open).count(), 4);
        assert_eq!(tokens.iter().filter(|t| **t == Token::Close).count(), 4);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            tokenize("(name,'bob").unwrap_err(),
            FilterError::UnterminatedString(6)
        );
    }
}

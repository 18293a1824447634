//! Tokenizer for matcher expressions and serialized value lists.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords (`and`, `or`, `not`, `in`) -- distinguished
    /// in the parser
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    Int(i64),
    /// Decimal literal -- kept as string to preserve exact representation
    Decimal(String),
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    // Comparison operators
    EqEq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    // Symbolic logical operators
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{}'", w),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::Int(n) => write!(f, "integer {}", n),
            Token::Decimal(d) => write!(f, "decimal {}", d),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::Comma => f.write_str("','"),
            Token::Dot => f.write_str("'.'"),
            Token::EqEq => f.write_str("'=='"),
            Token::Neq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Lte => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Gte => f.write_str("'>='"),
            Token::AndAnd => f.write_str("'&&'"),
            Token::OrOr => f.write_str("'||'"),
            Token::Bang => f.write_str("'!'"),
            Token::Eof => f.write_str("end of expression"),
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// A lexing or parsing problem at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        SyntaxError {
            offset,
            message: message.into(),
        }
    }
}

/// Tokenize `src`. Offsets are reported relative to `base`, so a fragment
/// of a larger text can be lexed in place.
pub fn lex(src: &str, base: usize) -> Result<Vec<Spanned>, SyntaxError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let offset_of = |i: usize| base + chars.get(i).map_or(src.len(), |&(o, _)| o);
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos].1;
        let start = offset_of(pos);

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // String literal
        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut s = String::new();
            loop {
                let Some(&(_, sc)) = chars.get(pos) else {
                    return Err(SyntaxError::new(start, "unterminated string literal"));
                };
                if sc == quote {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    let Some(&(_, esc)) = chars.get(pos) else {
                        return Err(SyntaxError::new(start, "unterminated escape in string"));
                    };
                    match esc {
                        '"' => s.push('"'),
                        '\'' => s.push('\''),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    pos += 1;
                    continue;
                }
                if sc == '\n' {
                    return Err(SyntaxError::new(start, "unterminated string literal"));
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                offset: start,
            });
            continue;
        }

        // Number
        let next_is_digit = chars.get(pos + 1).is_some_and(|&(_, n)| n.is_ascii_digit());
        if c.is_ascii_digit() || (c == '-' && next_is_digit) {
            let first = pos;
            pos += 1;
            while pos < chars.len() && chars[pos].1.is_ascii_digit() {
                pos += 1;
            }
            let is_decimal = chars.get(pos).is_some_and(|&(_, d)| d == '.')
                && chars.get(pos + 1).is_some_and(|&(_, d)| d.is_ascii_digit());
            if is_decimal {
                pos += 1; // consume '.'
                while pos < chars.len() && chars[pos].1.is_ascii_digit() {
                    pos += 1;
                }
            }
            let text: String = chars[first..pos].iter().map(|&(_, ch)| ch).collect();
            let token = if is_decimal {
                Token::Decimal(text)
            } else {
                let n: i64 = text.parse().map_err(|_| {
                    SyntaxError::new(start, format!("integer '{}' out of range", text))
                })?;
                Token::Int(n)
            };
            tokens.push(Spanned {
                token,
                offset: start,
            });
            continue;
        }

        // Identifier / keyword
        if c.is_ascii_alphabetic() || c == '_' {
            let first = pos;
            while pos < chars.len() && (chars[pos].1.is_ascii_alphanumeric() || chars[pos].1 == '_')
            {
                pos += 1;
            }
            let word: String = chars[first..pos].iter().map(|&(_, ch)| ch).collect();
            tokens.push(Spanned {
                token: Token::Word(word),
                offset: start,
            });
            continue;
        }

        // Operators and punctuation
        let next = chars.get(pos + 1).map(|&(_, n)| n);
        let (token, width) = match (c, next) {
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::Neq, 2),
            ('<', Some('=')) => (Token::Lte, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('=', _) => {
                return Err(SyntaxError::new(
                    start,
                    "unexpected '=', use '==' to compare",
                ))
            }
            _ => {
                return Err(SyntaxError::new(
                    start,
                    format!("unexpected character '{}'", c),
                ))
            }
        };
        tokens.push(Spanned {
            token,
            offset: start,
        });
        pos += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: base + src.len(),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src, 0).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn lexes_a_matcher() {
        assert_eq!(
            kinds("participants <= task_participant(task_id, _)"),
            vec![
                Token::Word("participants".into()),
                Token::Lte,
                Token::Word("task_participant".into()),
                Token::LParen,
                Token::Word("task_id".into()),
                Token::Comma,
                Token::Word("_".into()),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_literals() {
        assert_eq!(
            kinds(r#"'a\'b' "c" -12 3.50 {}"#),
            vec![
                Token::Str("a'b".into()),
                Token::Str("c".into()),
                Token::Int(-12),
                Token::Decimal("3.50".into()),
                Token::LBrace,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn offsets_are_relative_to_base() {
        let toks = lex("a == 'é' b", 10).unwrap();
        let offsets: Vec<usize> = toks.iter().map(|s| s.offset).collect();
        // 'é' is two bytes wide
        assert_eq!(offsets, vec![10, 12, 15, 20, 21]);
    }

    #[test]
    fn single_equals_is_rejected() {
        let err = lex("a = b", 0).unwrap_err();
        assert_eq!(err.offset, 2);
        assert!(err.message.contains("=="));
    }

    #[test]
    fn unterminated_string_points_at_quote() {
        let err = lex("x == 'abc", 4).unwrap_err();
        assert_eq!(err.offset, 9);
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn integer_overflow_is_an_error() {
        assert!(lex("99999999999999999999", 0).is_err());
    }
}

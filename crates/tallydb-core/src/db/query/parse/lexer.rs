use crate::db::query::parse::ParseError;
use std::fmt;

///
/// Token
///

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    Bang,
    Question,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl Token {
    /// True when this token is the given word, compared case-insensitively.
    pub(super) fn is_word(&self, word: &str) -> bool {
        matches!(self, Self::Ident(name) if name.eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Ident(name) => return write!(f, "'{name}'"),
            Self::Number(n) => return write!(f, "number {n}"),
            Self::Str(s) => return write!(f, "string \"{s}\""),
            Self::Assign => "=",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Question => "?",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
        };

        write!(f, "'{symbol}'")
    }
}

///
/// Spanned
///
/// One token with the byte offset it starts at.
///

#[derive(Clone, Debug, PartialEq)]
pub(super) struct Spanned {
    pub(super) token: Token,
    pub(super) offset: usize,
}

/// Split clause text into tokens.
pub(super) fn tokenize(text: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let offset = pos;
        let token = match c {
            b'0'..=b'9' => {
                let (number, end) = lex_number(text, pos)?;
                pos = end;
                number
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let end = scan_while(bytes, pos, |b| b.is_ascii_alphanumeric() || b == b'_');
                let word = text[pos..end].to_string();
                pos = end;
                Token::Ident(word)
            }
            b'"' | b'\'' => {
                let (literal, end) = lex_string(text, pos)?;
                pos = end;
                literal
            }
            _ => {
                let (token, width) = lex_symbol(bytes, pos)?;
                pos += width;
                token
            }
        };

        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

fn scan_while(bytes: &[u8], mut pos: usize, accept: impl Fn(u8) -> bool) -> usize {
    while pos < bytes.len() && accept(bytes[pos]) {
        pos += 1;
    }

    pos
}

fn lex_number(text: &str, start: usize) -> Result<(Token, usize), ParseError> {
    let bytes = text.as_bytes();
    let mut end = scan_while(bytes, start, |b| b.is_ascii_digit());

    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end = scan_while(bytes, end + 1, |b| b.is_ascii_digit());
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        let digits_end = scan_while(bytes, exp, |b| b.is_ascii_digit());
        if digits_end > exp {
            end = digits_end;
        }
    }

    let literal = &text[start..end];
    literal
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| (Token::Number(n), end))
        .ok_or_else(|| ParseError::InvalidToken {
            offset: start,
            detail: format!("invalid number literal '{literal}'"),
        })
}

fn lex_string(text: &str, start: usize) -> Result<(Token, usize), ParseError> {
    let mut chars = text[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ParseError::InvalidToken {
            offset: start,
            detail: "expected string literal".to_string(),
        });
    };

    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((Token::Str(out), start + i + c.len_utf8())),
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            c => out.push(c),
        }
    }

    Err(ParseError::InvalidToken {
        offset: start,
        detail: "unterminated string literal".to_string(),
    })
}

fn lex_symbol(bytes: &[u8], pos: usize) -> Result<(Token, usize), ParseError> {
    let next = bytes.get(pos + 1).copied();
    let pair = match (bytes[pos], next) {
        (b'=', Some(b'=')) => Some(Token::EqEq),
        (b'!', Some(b'=')) => Some(Token::NotEq),
        (b'<', Some(b'=')) => Some(Token::Le),
        (b'>', Some(b'=')) => Some(Token::Ge),
        (b'&', Some(b'&')) => Some(Token::AndAnd),
        (b'|', Some(b'|')) => Some(Token::OrOr),
        _ => None,
    };
    if let Some(token) = pair {
        return Ok((token, 2));
    }

    let token = match bytes[pos] {
        b'=' => Token::Assign,
        b'<' => Token::Lt,
        b'>' => Token::Gt,
        b'+' => Token::Plus,
        b'-' => Token::Minus,
        b'*' => Token::Star,
        b'/' => Token::Slash,
        b'%' => Token::Percent,
        b'!' => Token::Bang,
        b'?' => Token::Question,
        b':' => Token::Colon,
        b',' => Token::Comma,
        b'.' => Token::Dot,
        b'(' => Token::LParen,
        b')' => Token::RParen,
        b'[' => Token::LBracket,
        b']' => Token::RBracket,
        b'{' => Token::LBrace,
        b'}' => Token::RBrace,
        other => {
            return Err(ParseError::InvalidToken {
                offset: pos,
                detail: format!("unexpected character '{}'", char::from(other)),
            });
        }
    };

    Ok((token, 1))
}

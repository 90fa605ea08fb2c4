//! Query text parser
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! query      := SELECT '*' FROM alias [ WHERE comparison { AND comparison } ]
//! comparison := field op literal
//! field      := alias { '.' ident | '[' integer ']' | '[' string ']' }
//! op         := '=' | '!=' | '<>' | '<' | '<=' | '>' | '>='
//! literal    := string | number | true | false | null | '@' ident
//! ```
//!
//! Errors carry the byte offset of the offending token.

use docstore_core::{Error, FieldPath, Result};
use rustc_hash::FxHashMap;
use serde_json::{Number, Value};

use super::predicate::{CompareOp, Comparison, Predicate};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Star,
    Dot,
    LBracket,
    RBracket,
    Op(CompareOp),
    Str(String),
    Num(Number),
    Param(String),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("'{}'", s),
            Token::Star => "'*'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Op(op) => format!("'{}'", op),
            Token::Str(s) => format!("string {:?}", s),
            Token::Num(n) => format!("number {}", n),
            Token::Param(p) => format!("parameter @{}", p),
            Token::Eof => "end of query".to_string(),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'*' => {
                tokens.push((start, Token::Star));
                i += 1;
            }
            b'.' => {
                tokens.push((start, Token::Dot));
                i += 1;
            }
            b'[' => {
                tokens.push((start, Token::LBracket));
                i += 1;
            }
            b']' => {
                tokens.push((start, Token::RBracket));
                i += 1;
            }
            b'=' => {
                tokens.push((start, Token::Op(CompareOp::Eq)));
                i += 1;
            }
            b'!' => {
                if bytes.get(i + 1) != Some(&b'=') {
                    return Err(Error::invalid_query(start, "expected '!='"));
                }
                tokens.push((start, Token::Op(CompareOp::Ne)));
                i += 2;
            }
            b'<' => match bytes.get(i + 1) {
                Some(b'=') => {
                    tokens.push((start, Token::Op(CompareOp::Le)));
                    i += 2;
                }
                Some(b'>') => {
                    tokens.push((start, Token::Op(CompareOp::Ne)));
                    i += 2;
                }
                _ => {
                    tokens.push((start, Token::Op(CompareOp::Lt)));
                    i += 1;
                }
            },
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((start, Token::Op(CompareOp::Ge)));
                    i += 2;
                } else {
                    tokens.push((start, Token::Op(CompareOp::Gt)));
                    i += 1;
                }
            }
            b'\'' | b'"' => {
                let (s, end) = lex_string(text, start)?;
                tokens.push((start, Token::Str(s)));
                i = end;
            }
            b'@' => {
                i += 1;
                let name_start = i;
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                if i == name_start {
                    return Err(Error::invalid_query(start, "expected parameter name after '@'"));
                }
                tokens.push((start, Token::Param(text[name_start..i].to_string())));
            }
            b'-' | b'0'..=b'9' => {
                let (n, end) = lex_number(text, start)?;
                tokens.push((start, Token::Num(n)));
                i = end;
            }
            c if is_ident_start(c) => {
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                tokens.push((start, Token::Ident(text[start..i].to_string())));
            }
            _ => {
                let ch = text[start..].chars().next().unwrap_or('?');
                return Err(Error::invalid_query(
                    start,
                    format!("unexpected character '{}'", ch),
                ));
            }
        }
    }
    tokens.push((text.len(), Token::Eof));
    Ok(tokens)
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

/// Lex a quoted string starting at `start`; returns the value and the end offset
fn lex_string(text: &str, start: usize) -> Result<(String, usize)> {
    let mut chars = text[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(Error::invalid_query(start, "expected string")),
    };
    let mut out = String::new();
    while let Some((offset, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((out, start + offset + c.len_utf8())),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(Error::invalid_query(start, "unterminated string literal"))
}

/// Lex a JSON-style number starting at `start`
fn lex_number(text: &str, start: usize) -> Result<(Number, usize)> {
    let bytes = text.as_bytes();
    let mut i = start;
    if bytes[i] == b'-' {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return Err(Error::invalid_query(start, "expected digits"));
    }
    let mut is_float = false;
    if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).map_or(false, u8::is_ascii_digit) {
        is_float = true;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        is_float = true;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    let literal = &text[start..i];
    let number = if is_float {
        literal.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        literal.parse::<i64>().ok().map(Number::from)
    };
    number
        .map(|n| (n, i))
        .ok_or_else(|| Error::invalid_query(start, format!("invalid number '{}'", literal)))
}

struct Parser<'a> {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    parameters: &'a FxHashMap<&'a str, &'a Value>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].1
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].0
    }

    fn advance(&mut self) -> (usize, Token) {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::invalid_query(
            self.offset(),
            format!("expected {}, found {}", expected, self.peek().describe()),
        )
    }

    fn keyword(&mut self, keyword: &str) -> Result<()> {
        match self.peek() {
            Token::Ident(word) if word.eq_ignore_ascii_case(keyword) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected(keyword)),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }

    fn parse_query(&mut self) -> Result<Predicate> {
        self.keyword("SELECT")?;
        match self.peek() {
            Token::Star => {
                self.advance();
            }
            _ => return Err(self.unexpected("'*'")),
        }
        self.keyword("FROM")?;
        let alias = match self.advance() {
            (_, Token::Ident(alias)) if !is_reserved(&alias) => alias,
            (offset, token) => {
                return Err(Error::invalid_query(
                    offset,
                    format!("expected container alias, found {}", token.describe()),
                ))
            }
        };

        let mut predicate = Predicate::all();
        if self.at_keyword("WHERE") {
            self.advance();
            predicate.push(self.parse_comparison(&alias)?);
            while self.at_keyword("AND") {
                self.advance();
                predicate.push(self.parse_comparison(&alias)?);
            }
        }

        match self.peek() {
            Token::Eof => Ok(predicate),
            Token::Ident(word) if word.eq_ignore_ascii_case("OR") => Err(Error::invalid_query(
                self.offset(),
                "OR is not supported; only AND conjunctions",
            )),
            _ => Err(self.unexpected("AND or end of query")),
        }
    }

    fn parse_comparison(&mut self, alias: &str) -> Result<Comparison> {
        let path = self.parse_field(alias)?;
        let op = match self.advance() {
            (_, Token::Op(op)) => op,
            (offset, token) => {
                return Err(Error::invalid_query(
                    offset,
                    format!("expected comparison operator, found {}", token.describe()),
                ))
            }
        };
        let value = self.parse_literal()?;
        Ok(Comparison::new(path, op, value))
    }

    fn parse_field(&mut self, alias: &str) -> Result<FieldPath> {
        match self.advance() {
            (_, Token::Ident(name)) if name == alias => {}
            (offset, token) => {
                return Err(Error::invalid_query(
                    offset,
                    format!("expected field of '{}', found {}", alias, token.describe()),
                ))
            }
        }

        let mut path = FieldPath::root();
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    match self.advance() {
                        (_, Token::Ident(key)) => path = path.key(key),
                        (offset, token) => {
                            return Err(Error::invalid_query(
                                offset,
                                format!("expected field name, found {}", token.describe()),
                            ))
                        }
                    }
                }
                Token::LBracket => {
                    self.advance();
                    match self.advance() {
                        (_, Token::Str(key)) => path = path.key(key),
                        (offset, Token::Num(n)) => {
                            let index = n.as_u64().ok_or_else(|| {
                                Error::invalid_query(offset, format!("invalid array index {}", n))
                            })?;
                            path = path.index(index as usize);
                        }
                        (offset, token) => {
                            return Err(Error::invalid_query(
                                offset,
                                format!(
                                    "expected index or quoted name, found {}",
                                    token.describe()
                                ),
                            ))
                        }
                    }
                    match self.peek() {
                        Token::RBracket => {
                            self.advance();
                        }
                        _ => return Err(self.unexpected("']'")),
                    }
                }
                _ => break,
            }
        }

        if path.is_root() {
            return Err(Error::invalid_query(
                self.offset(),
                format!("comparison must name a field of '{}'", alias),
            ));
        }
        Ok(path)
    }

    fn parse_literal(&mut self) -> Result<Value> {
        match self.advance() {
            (_, Token::Str(s)) => Ok(Value::String(s)),
            (_, Token::Num(n)) => Ok(Value::Number(n)),
            (_, Token::Ident(word)) if word.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            (_, Token::Ident(word)) if word.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            (_, Token::Ident(word)) if word.eq_ignore_ascii_case("null") => Ok(Value::Null),
            (offset, Token::Param(name)) => self
                .parameters
                .get(name.as_str())
                .map(|v| (*v).clone())
                .ok_or_else(|| {
                    Error::invalid_query(offset, format!("parameter @{} is not bound", name))
                }),
            (offset, token) => Err(Error::invalid_query(
                offset,
                format!("expected literal, found {}", token.describe()),
            )),
        }
    }
}

fn is_reserved(word: &str) -> bool {
    ["SELECT", "FROM", "WHERE", "AND", "OR"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

/// Parse query text into a predicate, binding `@name` parameters
///
/// Parameter names are given without the leading `@`.
pub fn parse_query(text: &str, parameters: &[(String, Value)]) -> Result<Predicate> {
    let bound: FxHashMap<&str, &Value> = parameters
        .iter()
        .map(|(name, value)| (name.trim_start_matches('@'), value))
        .collect();
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        parameters: &bound,
    };
    parser.parse_query()
}

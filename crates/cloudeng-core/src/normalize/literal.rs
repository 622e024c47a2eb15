//! Parser for printed literal structures.
//!
//! Some agent runtimes hand back the debug print of a message object instead
//! of its text, e.g.:
//!
//! ```text
//! {'role': 'assistant', 'content': [{'text': 'Here are your buckets...'}]}
//! ```
//!
//! This module parses that literal syntax (mappings, sequences, quoted
//! strings, numbers, `True`/`False`/`None`) into a [`LiteralValue`] tree so the
//! payload can be pulled out without guessing at quote boundaries.

use std::fmt;

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<LiteralValue>),
    Tuple(Vec<LiteralValue>),
    Set(Vec<LiteralValue>),
    /// Key/value pairs in source order. Duplicate keys are kept; lookups
    /// resolve to the last occurrence.
    Dict(Vec<(LiteralValue, LiteralValue)>),
}

impl LiteralValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(LiteralValue, LiteralValue)]> {
        match self {
            LiteralValue::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Returns list or tuple items.
    pub fn as_sequence(&self) -> Option<&[LiteralValue]> {
        match self {
            LiteralValue::List(items) | LiteralValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a string key in a dict.
    pub fn get(&self, key: &str) -> Option<&LiteralValue> {
        self.as_dict()?
            .iter()
            .rev()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

/// Parse failure with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

impl LiteralError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for LiteralError {}

type ParseResult<T> = Result<T, LiteralError>;

/// Deepest container or unary-sign nesting accepted before giving up.
pub const MAX_DEPTH: usize = 256;

/// Parses a complete literal. Trailing non-whitespace input is an error.
///
/// # Errors
/// Returns a [`LiteralError`] on malformed input.
pub fn parse(input: &str) -> ParseResult<LiteralValue> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_value()?;
    parser.skip_trivia();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Decoded string literal body.
enum StrPiece {
    Text(String),
    Bytes(Vec<u8>),
}

struct StringPrefix {
    raw: bool,
    bytes: bool,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError::new(self.pos, message)
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}'")))
        }
    }

    /// Skips whitespace and `#` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn parse_value(&mut self) -> ParseResult<LiteralValue> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = self.parse_value_at_depth();
        self.depth -= 1;
        value
    }

    fn parse_value_at_depth(&mut self) -> ParseResult<LiteralValue> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('{') => self.parse_brace(),
            Some('[') => {
                self.bump();
                let (items, _) = self.parse_items(']')?;
                Ok(LiteralValue::List(items))
            }
            Some('(') => self.parse_paren(),
            Some('\'' | '"') => self.parse_strings(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some('+' | '-') => self.parse_signed(),
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_word(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    /// Parses comma-separated values up to `close`; returns items and whether
    /// the last item was followed by a comma.
    fn parse_items(&mut self, close: char) -> ParseResult<(Vec<LiteralValue>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok((items, trailing_comma));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            if self.eat(',') {
                trailing_comma = true;
            } else {
                self.skip_trivia();
                self.expect(close)?;
                return Ok((items, false));
            }
        }
    }

    fn parse_paren(&mut self) -> ParseResult<LiteralValue> {
        self.bump();
        let (mut items, trailing_comma) = self.parse_items(')')?;
        if items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(LiteralValue::Tuple(items))
    }

    /// Parses a dict or a set; `{}` is an empty dict.
    fn parse_brace(&mut self) -> ParseResult<LiteralValue> {
        self.bump();
        self.skip_trivia();
        if self.eat('}') {
            return Ok(LiteralValue::Dict(Vec::new()));
        }

        let first = self.parse_value()?;
        self.skip_trivia();
        if !self.eat(':') {
            let mut items = vec![first];
            self.skip_trivia();
            if self.eat(',') {
                let (rest, _) = self.parse_items('}')?;
                items.extend(rest);
            } else {
                self.expect('}')?;
            }
            return Ok(LiteralValue::Set(items));
        }

        let mut pairs = vec![(first, self.parse_value()?)];
        loop {
            self.skip_trivia();
            if self.eat('}') {
                return Ok(LiteralValue::Dict(pairs));
            }
            self.expect(',')?;
            self.skip_trivia();
            if self.eat('}') {
                return Ok(LiteralValue::Dict(pairs));
            }
            let key = self.parse_value()?;
            self.skip_trivia();
            self.expect(':')?;
            let value = self.parse_value()?;
            pairs.push((key, value));
        }
    }

    fn parse_signed(&mut self) -> ParseResult<LiteralValue> {
        let negative = self.bump() == Some('-');
        self.skip_trivia();
        match self.parse_value()? {
            LiteralValue::Int(n) if negative => n
                .checked_neg()
                .map(LiteralValue::Int)
                .ok_or_else(|| self.error("integer literal out of range")),
            LiteralValue::Float(f) if negative => Ok(LiteralValue::Float(-f)),
            value @ (LiteralValue::Int(_) | LiteralValue::Float(_)) => Ok(value),
            _ => Err(self.error("unary sign applied to a non-number")),
        }
    }

    fn parse_number(&mut self) -> ParseResult<LiteralValue> {
        let start = self.pos;
        let rest = self.rest();
        let radix = match rest.get(..2).map(str::to_ascii_lowercase).as_deref() {
            Some("0x") => Some(16),
            Some("0o") => Some(8),
            Some("0b") => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            while self
                .peek()
                .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
            {
                self.bump();
            }
            let digits: String = self.src[digits_start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            return i64::from_str_radix(&digits, radix)
                .map(LiteralValue::Int)
                .map_err(|e| LiteralError::new(start, format!("invalid integer literal: {e}")));
        }

        let mut is_float = false;
        self.consume_digits();
        if self.eat('.') {
            is_float = true;
            self.consume_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            self.consume_digits();
        }
        if matches!(self.peek(), Some('j' | 'J')) {
            return Err(self.error("complex literals are not supported"));
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            text.parse::<f64>()
                .map(LiteralValue::Float)
                .map_err(|e| LiteralError::new(start, format!("invalid float literal: {e}")))
        } else {
            text.parse::<i64>()
                .map(LiteralValue::Int)
                .map_err(|e| LiteralError::new(start, format!("invalid integer literal: {e}")))
        }
    }

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|c| c == '_' || c.is_ascii_digit()) {
            self.bump();
        }
    }

    /// Parses `True`/`False`/`None` or a prefixed string such as `r'...'`.
    fn parse_word(&mut self) -> ParseResult<LiteralValue> {
        let start = self.pos;
        let word_len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        let word = &self.src[start..start + word_len];
        let next = self.src[start + word_len..].chars().next();

        if matches!(next, Some('\'' | '"')) && string_prefix(word).is_some() {
            return self.parse_strings();
        }

        self.pos += word_len;
        match word {
            "True" => Ok(LiteralValue::Bool(true)),
            "False" => Ok(LiteralValue::Bool(false)),
            "None" => Ok(LiteralValue::None),
            other => Err(LiteralError::new(
                start,
                format!("unexpected identifier '{other}'"),
            )),
        }
    }

    /// Parses one string literal plus any adjacent ones (implicit
    /// concatenation).
    fn parse_strings(&mut self) -> ParseResult<LiteralValue> {
        let mut acc = self.parse_string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_trivia();
            if !self.at_string_start() {
                self.pos = checkpoint;
                break;
            }
            let offset = self.pos;
            match (&mut acc, self.parse_string()?) {
                (StrPiece::Text(a), StrPiece::Text(b)) => a.push_str(&b),
                (StrPiece::Bytes(a), StrPiece::Bytes(b)) => a.extend(b),
                _ => {
                    return Err(LiteralError::new(
                        offset,
                        "cannot mix bytes and text literals",
                    ));
                }
            }
        }
        Ok(match acc {
            StrPiece::Text(s) => LiteralValue::Str(s),
            StrPiece::Bytes(b) => LiteralValue::Bytes(b),
        })
    }

    fn at_string_start(&self) -> bool {
        let rest = self.rest();
        let prefix_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let after = rest[prefix_len..].chars().next();
        matches!(after, Some('\'' | '"'))
            && (prefix_len == 0 || string_prefix(&rest[..prefix_len]).is_some())
    }

    fn parse_string(&mut self) -> ParseResult<StrPiece> {
        let prefix_len = self
            .rest()
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(0);
        let prefix = string_prefix(&self.src[self.pos..self.pos + prefix_len])
            .ok_or_else(|| self.error("invalid string prefix"))?;
        self.pos += prefix_len;

        let quote = self
            .bump()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        let triple = self.rest().starts_with(&format!("{quote}{quote}"));
        if triple {
            self.pos += 2 * quote.len_utf8();
        }

        let mut out = StringBuilder::new(prefix.bytes);
        loop {
            let at = self.pos;
            let Some(c) = self.bump() else {
                return Err(LiteralError::new(at, "unterminated string literal"));
            };

            if c == quote {
                if !triple {
                    break;
                }
                let closing = format!("{quote}{quote}");
                if self.rest().starts_with(&closing) {
                    self.pos += closing.len();
                    break;
                }
                out.push_char(c, at)?;
                continue;
            }

            if c == '\n' && !triple {
                return Err(LiteralError::new(at, "unterminated string literal"));
            }

            if c != '\\' {
                out.push_char(c, at)?;
                continue;
            }

            if prefix.raw {
                // Raw strings keep the backslash; it still protects the quote.
                out.push_char('\\', at)?;
                if let Some(next) = self.bump() {
                    out.push_char(next, at)?;
                }
                continue;
            }

            self.read_escape(&mut out, at)?;
        }

        Ok(out.finish())
    }

    fn read_escape(&mut self, out: &mut StringBuilder, at: usize) -> ParseResult<()> {
        let Some(c) = self.bump() else {
            return Err(LiteralError::new(at, "unterminated string literal"));
        };
        match c {
            '\n' => {}
            '\r' => {
                self.eat('\n');
            }
            '\\' | '\'' | '"' => out.push_char(c, at)?,
            'n' => out.push_char('\n', at)?,
            't' => out.push_char('\t', at)?,
            'r' => out.push_char('\r', at)?,
            'a' => out.push_char('\x07', at)?,
            'b' => out.push_char('\x08', at)?,
            'f' => out.push_char('\x0c', at)?,
            'v' => out.push_char('\x0b', at)?,
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                out.push_code(value, at)?;
            }
            'x' => {
                let value = self.read_hex(2, at)?;
                out.push_code(value, at)?;
            }
            'u' | 'U' if !out.is_bytes() => {
                let width = if c == 'u' { 4 } else { 8 };
                let value = self.read_hex(width, at)?;
                let ch = char::from_u32(value)
                    .ok_or_else(|| LiteralError::new(at, "invalid unicode escape"))?;
                out.push_char(ch, at)?;
            }
            other => {
                out.push_char('\\', at)?;
                out.push_char(other, at)?;
            }
        }
        Ok(())
    }

    fn read_hex(&mut self, width: usize, at: usize) -> ParseResult<u32> {
        let digits = self
            .rest()
            .get(..width)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| LiteralError::new(at, "truncated hex escape"))?;
        let value = u32::from_str_radix(digits, 16)
            .map_err(|e| LiteralError::new(at, format!("invalid hex escape: {e}")))?;
        self.pos += width;
        Ok(value)
    }
}

/// Accumulates either text or bytes for one literal.
struct StringBuilder {
    text: String,
    bytes: Option<Vec<u8>>,
}

impl StringBuilder {
    fn new(bytes: bool) -> Self {
        Self {
            text: String::new(),
            bytes: bytes.then(Vec::new),
        }
    }

    fn is_bytes(&self) -> bool {
        self.bytes.is_some()
    }

    fn push_char(&mut self, c: char, at: usize) -> ParseResult<()> {
        match &mut self.bytes {
            Some(buf) => {
                let byte = u8::try_from(c)
                    .ok()
                    .filter(u8::is_ascii)
                    .ok_or_else(|| LiteralError::new(at, "non-ASCII character in bytes literal"))?;
                buf.push(byte);
            }
            None => self.text.push(c),
        }
        Ok(())
    }

    /// Pushes a numeric escape: a raw byte for bytes literals, a code point
    /// otherwise.
    fn push_code(&mut self, value: u32, at: usize) -> ParseResult<()> {
        match &mut self.bytes {
            Some(buf) => {
                let byte = u8::try_from(value)
                    .map_err(|_| LiteralError::new(at, "escape out of range for bytes"))?;
                buf.push(byte);
            }
            None => {
                let ch = char::from_u32(value)
                    .ok_or_else(|| LiteralError::new(at, "invalid escape value"))?;
                self.text.push(ch);
            }
        }
        Ok(())
    }

    fn finish(self) -> StrPiece {
        match self.bytes {
            Some(buf) => StrPiece::Bytes(buf),
            None => StrPiece::Text(self.text),
        }
    }
}

fn string_prefix(word: &str) -> Option<StringPrefix> {
    match word.to_ascii_lowercase().as_str() {
        "" | "u" => Some(StringPrefix {
            raw: false,
            bytes: false,
        }),
        "r" => Some(StringPrefix {
            raw: true,
            bytes: false,
        }),
        "b" => Some(StringPrefix {
            raw: false,
            bytes: true,
        }),
        "rb" | "br" => Some(StringPrefix {
            raw: true,
            bytes: true,
        }),
        _ => None,
    }
}

/// Quotes a string the way a literal printer does: single quotes unless the
/// text contains a single quote and no double quote.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = u32::from(c);
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else {
                    out.push_str(&format!("\\u{code:04x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

//! Reader for the protobuf text format used by METADATA files.
//!
//! Produces an untyped [`Message`] tree; schema mapping happens in
//! [`crate::metadata`]. The reader performs no I/O.

use crate::error::ParseError;

/// Deepest message nesting accepted before parsing fails.
pub const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Number(String),
    Ident(String),
    Message(Message),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Number(_) => "number",
            Value::Ident(_) => "identifier",
            Value::Message(_) => "message",
            Value::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get_all<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a Field> + 'b
    where
        'a: 'b,
    {
        self.fields.iter().filter(move |f| f.name == name)
    }
}

/// Parses a complete text-format message.
pub fn parse(input: &[u8]) -> Result<Message, ParseError> {
    let mut parser = Parser::new(input);
    parser.message(None, 0)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(Vec<u8>),
    Number(String),
    Punct(u8),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier {name:?}"),
            Token::Str(_) => "string".to_string(),
            Token::Number(n) => format!("number {n}"),
            Token::Punct(c) => format!("{:?}", *c as char),
            Token::Eof => "end of input".to_string(),
        }
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    peeked: Option<(Token, usize, usize)>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            peeked: None,
        }
    }

    fn message(&mut self, terminator: Option<u8>, depth: usize) -> Result<Message, ParseError> {
        let mut message = Message::default();
        loop {
            let (token, line, column) = self.next()?;
            let name = match token {
                Token::Eof => match terminator {
                    Some(close) => {
                        return Err(ParseError::new(
                            line,
                            column,
                            format!("unexpected end of input, expected {:?}", close as char),
                        ))
                    }
                    None => return Ok(message),
                },
                Token::Punct(c) if Some(c) == terminator => return Ok(message),
                Token::Ident(name) => name,
                Token::Punct(b'[') => self.extension_name()?,
                other => {
                    return Err(ParseError::new(
                        line,
                        column,
                        format!("unexpected {}, expected field name", other.describe()),
                    ))
                }
            };

            let has_colon = if self.peek()? == &Token::Punct(b':') {
                self.next()?;
                true
            } else {
                false
            };

            let value = match self.peek()?.clone() {
                Token::Punct(open @ (b'{' | b'<')) => {
                    self.next()?;
                    self.nested(open, depth)?
                }
                Token::Punct(b'[') if has_colon => {
                    self.next()?;
                    self.list(depth)?
                }
                _ if !has_colon => {
                    let (token, line, column) = self.next()?;
                    return Err(ParseError::new(
                        line,
                        column,
                        format!("unexpected {} after field {name:?}, expected ':'", token.describe()),
                    ));
                }
                _ => self.scalar()?,
            };

            message.fields.push(Field {
                name,
                value,
                line,
                column,
            });

            if matches!(self.peek()?, Token::Punct(b',' | b';')) {
                self.next()?;
            }
        }
    }

    fn extension_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::from("[");
        loop {
            let (token, line, column) = self.next()?;
            match token {
                Token::Ident(part) => name.push_str(&part),
                Token::Punct(c @ (b'.' | b'/')) => name.push(c as char),
                Token::Punct(b']') => {
                    name.push(']');
                    return Ok(name);
                }
                other => {
                    return Err(ParseError::new(
                        line,
                        column,
                        format!("unexpected {} in extension name", other.describe()),
                    ))
                }
            }
        }
    }

    /// Parses the body of a message whose opening bracket was just consumed.
    fn nested(&mut self, open: u8, depth: usize) -> Result<Value, ParseError> {
        if depth + 1 > MAX_DEPTH {
            return Err(ParseError::new(
                self.line,
                self.column,
                "message nesting too deep",
            ));
        }
        Ok(Value::Message(self.message(Some(closing(open)), depth + 1)?))
    }

    fn list(&mut self, depth: usize) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        if self.peek()? == &Token::Punct(b']') {
            self.next()?;
            return Ok(Value::List(items));
        }
        loop {
            let item = match self.peek()?.clone() {
                Token::Punct(open @ (b'{' | b'<')) => {
                    self.next()?;
                    self.nested(open, depth)?
                }
                _ => self.scalar()?,
            };
            items.push(item);

            let (token, line, column) = self.next()?;
            match token {
                Token::Punct(b',') => {}
                Token::Punct(b']') => return Ok(Value::List(items)),
                other => {
                    return Err(ParseError::new(
                        line,
                        column,
                        format!("unexpected {} in list, expected ',' or ']'", other.describe()),
                    ))
                }
            }
        }
    }

    fn scalar(&mut self) -> Result<Value, ParseError> {
        let (token, line, column) = self.next()?;
        match token {
            Token::Str(mut bytes) => {
                // Adjacent string literals concatenate.
                while matches!(self.peek()?, Token::Str(_)) {
                    if let (Token::Str(more), _, _) = self.next()? {
                        bytes.extend_from_slice(&more);
                    }
                }
                String::from_utf8(bytes)
                    .map(Value::Str)
                    .map_err(|_| ParseError::new(line, column, "invalid UTF-8 in string"))
            }
            Token::Number(n) => Ok(Value::Number(n)),
            Token::Ident(name) => Ok(Value::Ident(name)),
            other => Err(ParseError::new(
                line,
                column,
                format!("unexpected {}, expected value", other.describe()),
            )),
        }
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        if self.peeked.is_none() {
            let token = self.lex()?;
            self.peeked = Some(token);
        }
        match &self.peeked {
            Some((token, _, _)) => Ok(token),
            None => unreachable!("peeked token was just filled"),
        }
    }

    fn next(&mut self) -> Result<(Token, usize, usize), ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lex(),
        }
    }

    fn bump(&mut self) -> Option<u8> {
        let c = *self.input.get(self.pos)?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(c) = self.current() {
            if c == b'#' {
                while let Some(c) = self.bump() {
                    if c == b'\n' {
                        break;
                    }
                }
            } else if c.is_ascii_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex(&mut self) -> Result<(Token, usize, usize), ParseError> {
        self.skip_blank();
        let (line, column) = (self.line, self.column);
        let Some(c) = self.current() else {
            return Ok((Token::Eof, line, column));
        };

        let token = match c {
            b'"' | b'\'' => Token::Str(self.string(c, line, column)?),
            b'-' | b'+' | b'0'..=b'9' => Token::Number(self.number()),
            b'.' if self
                .input
                .get(self.pos + 1)
                .is_some_and(|n| n.is_ascii_digit()) =>
            {
                Token::Number(self.number())
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while self
                    .current()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
                {
                    self.bump();
                }
                Token::Ident(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
            }
            b':' | b'{' | b'}' | b'<' | b'>' | b'[' | b']' | b',' | b';' | b'.' | b'/' => {
                self.bump();
                Token::Punct(c)
            }
            other => {
                return Err(ParseError::new(
                    line,
                    column,
                    format!("invalid character {:?}", other as char),
                ))
            }
        };
        Ok((token, line, column))
    }

    fn number(&mut self) -> String {
        let start = self.pos;
        if matches!(self.current(), Some(b'-' | b'+')) {
            self.bump();
        }
        let mut prev = 0u8;
        while let Some(c) = self.current() {
            let exponent_sign = matches!(c, b'+' | b'-') && matches!(prev, b'e' | b'E');
            if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn string(&mut self, quote: u8, line: usize, column: usize) -> Result<Vec<u8>, ParseError> {
        self.bump();
        let mut out = Vec::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ParseError::new(line, column, "unterminated string"));
            };
            match c {
                b'\n' => return Err(ParseError::new(line, column, "unterminated string")),
                c if c == quote => return Ok(out),
                b'\\' => self.escape(&mut out, line, column)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut Vec<u8>, line: usize, column: usize) -> Result<(), ParseError> {
        let invalid = |what: &str| ParseError::new(line, column, format!("invalid escape {what}"));
        let Some(c) = self.bump() else {
            return Err(ParseError::new(line, column, "unterminated string"));
        };
        match c {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'\\' | b'\'' | b'"' | b'?' => out.push(c),
            b'0'..=b'7' => {
                let mut value = u32::from(c - b'0');
                for _ in 0..2 {
                    match self.current() {
                        Some(d @ b'0'..=b'7') => {
                            self.bump();
                            value = value * 8 + u32::from(d - b'0');
                        }
                        _ => break,
                    }
                }
                let byte = u8::try_from(value).map_err(|_| invalid("octal value out of range"))?;
                out.push(byte);
            }
            b'x' | b'X' => {
                let value = self.hex_digits(2);
                if value.1 == 0 {
                    return Err(invalid("\\x without hex digits"));
                }
                out.push(value.0 as u8);
            }
            b'u' | b'U' => {
                let width = if c == b'u' { 4 } else { 8 };
                let (value, read) = self.hex_digits(width);
                if read != width {
                    return Err(invalid("truncated unicode escape"));
                }
                let ch = char::from_u32(value).ok_or_else(|| invalid("invalid unicode code point"))?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            other => return Err(invalid(&format!("\\{}", other as char))),
        }
        Ok(())
    }

    fn hex_digits(&mut self, max: usize) -> (u32, usize) {
        let mut value = 0u32;
        let mut read = 0;
        while read < max {
            match self.current().and_then(|c| (c as char).to_digit(16)) {
                Some(d) => {
                    self.bump();
                    value = value * 16 + d;
                    read += 1;
                }
                None => break,
            }
        }
        (value, read)
    }
}

fn closing(open: u8) -> u8 {
    if open == b'<' {
        b'>'
    } else {
        b'}'
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn str_field<'a>(message: &'a Message, name: &str) -> Option<&'a str> {
        message.get_all(name).find_map(|f| match &f.value {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        })
    }

    #[test]
    fn parses_nested_messages_and_comments() {
        let input = br#"
# Format: google3/devtools/metadata/metadata.proto
name: "zlib"
description: 'General purpose ' "compression library"
third_party {
  url { type: HOMEPAGE value: "https://zlib.net" }
  version: "1.3.1";
  last_upgrade_date < year: 2024 month: 1 day: 22 >
  license_type: NOTICE,
}
"#;
        let message = parse(input).unwrap();

        assert_eq!(str_field(&message, "name"), Some("zlib"));
        assert_eq!(
            str_field(&message, "description"),
            Some("General purpose compression library")
        );

        let third_party = message.get_all("third_party").next().unwrap();
        let Value::Message(tp) = &third_party.value else {
            panic!("third_party should be a message");
        };
        assert_eq!(str_field(tp, "version"), Some("1.3.1"));
        assert_eq!(
            tp.get_all("license_type").next().unwrap().value,
            Value::Ident("NOTICE".to_string())
        );
        assert_eq!(third_party.line, 5);
    }

    #[test]
    fn parses_lists_and_extension_names() {
        let message = parse(b"tags: [\"a\", \"b\"] empty: [] [ext.pkg/type.Name]: 1e-3").unwrap();
        let names: Vec<&str> = message.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["tags", "empty", "[ext.pkg/type.Name]"]);
        assert_eq!(
            message.fields()[0].value,
            Value::List(vec![Value::Str("a".into()), Value::Str("b".into())])
        );
        assert_eq!(message.fields()[2].value, Value::Number("1e-3".into()));
    }

    #[test]
    fn decodes_escapes() {
        let message = parse(r#"s: "tab\there \x41\101 é \"q\"""#.as_bytes()).unwrap();
        assert_eq!(str_field(&message, "s"), Some("tab\there AA \u{e9} \"q\""));
    }

    #[test]
    fn reports_position_of_errors() {
        let err = parse(b"name: \"unterminated\nversion: 1").unwrap_err();
        assert_eq!((err.line, err.column), (1, 7));
        assert!(err.to_string().contains("unterminated string"));

        let err = parse(b"third_party {\n  version: \"1\"\n").unwrap_err();
        assert!(err.message.contains("expected '}'"), "{err}");

        let err = parse(b"name \"x\"").unwrap_err();
        assert!(err.message.contains("expected ':'"), "{err}");

        let err = parse(b"name: \"x\" }").unwrap_err();
        assert!(err.message.contains("expected field name"), "{err}");
    }

    #[test]
    fn limits_nesting_depth() {
        let at_limit = format!("{}{}", "a {".repeat(MAX_DEPTH), "}".repeat(MAX_DEPTH));
        assert!(parse(at_limit.as_bytes()).is_ok());

        let err = parse("a {".repeat(MAX_DEPTH + 1).as_bytes()).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("nesting too deep"), "{err}");

        let err = parse("a: [".repeat(50).as_bytes()).unwrap_err();
        assert!(!err.message.contains("nesting"), "{err}");

        let err = parse("a { b: [{".repeat(200_000).as_bytes()).unwrap_err();
        assert!(err.message.contains("nesting too deep"), "{err}");
    }
}

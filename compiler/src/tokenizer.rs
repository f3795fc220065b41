use std::fmt;

use crate::error::{CompileError, HeliumError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Import,
    Export,
    Message,
    Enum,
    Service,
    Client,
    Http,
    Ws,
    Tcp,
    Const,
    Extends,
    Interface,
    Type,
    From,
    OneOf,
    Throws,
    As,
}

impl Keyword {
    const ALL: [Keyword; 17] = [
        Keyword::Import, Keyword::Export, Keyword::Message, Keyword::Enum,
        Keyword::Service, Keyword::Client, Keyword::Http, Keyword::Ws,
        Keyword::Tcp, Keyword::Const, Keyword::Extends, Keyword::Interface,
        Keyword::Type, Keyword::From, Keyword::OneOf, Keyword::Throws,
        Keyword::As,
    ];

    pub fn from_word(word: &str) -> Option<Keyword> {
        Keyword::ALL.iter().copied().find(|keyword| keyword.as_str() == word)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Import    => "import",
            Keyword::Export    => "export",
            Keyword::Message   => "message",
            Keyword::Enum      => "enum",
            Keyword::Service   => "service",
            Keyword::Client    => "client",
            Keyword::Http      => "http",
            Keyword::Ws        => "ws",
            Keyword::Tcp       => "tcp",
            Keyword::Const     => "const",
            Keyword::Extends   => "extends",
            Keyword::Interface => "interface",
            Keyword::Type      => "type",
            Keyword::From      => "from",
            Keyword::OneOf     => "oneof",
            Keyword::Throws    => "throws",
            Keyword::As        => "as",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Byte,
    UShort,
    Short,
    UInt,
    Int,
    ULong,
    Long,
    Float,
    Double,
    String,
    Date,
    Map,
    Set,
    Void,
    Null,
    Boolean,
}

impl BuiltinType {
    const ALL: [BuiltinType; 16] = [
        BuiltinType::Byte, BuiltinType::UShort, BuiltinType::Short, BuiltinType::UInt,
        BuiltinType::Int, BuiltinType::ULong, BuiltinType::Long, BuiltinType::Float,
        BuiltinType::Double, BuiltinType::String, BuiltinType::Date, BuiltinType::Map,
        BuiltinType::Set, BuiltinType::Void, BuiltinType::Null, BuiltinType::Boolean,
    ];

    pub fn from_word(word: &str) -> Option<BuiltinType> {
        BuiltinType::ALL.iter().copied().find(|ty| ty.as_str() == word)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinType::Byte    => "byte",
            BuiltinType::UShort  => "ushort",
            BuiltinType::Short   => "short",
            BuiltinType::UInt    => "uint",
            BuiltinType::Int     => "int",
            BuiltinType::ULong   => "ulong",
            BuiltinType::Long    => "long",
            BuiltinType::Float   => "float",
            BuiltinType::Double  => "double",
            BuiltinType::String  => "string",
            BuiltinType::Date    => "date",
            BuiltinType::Map     => "map",
            BuiltinType::Set     => "set",
            BuiltinType::Void    => "void",
            BuiltinType::Null    => "null",
            BuiltinType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    Type(BuiltinType),
    Punctuation(char),
    Operator(String),
    Arrow,
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    String(String),
    Boolean(bool),
    Null,
    Eof,
}

impl TokenKind {
    /// The name of the token category, as used in parse errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            TokenKind::Keyword(_)     => "keyword",
            TokenKind::Identifier(_)  => "identifier",
            TokenKind::Type(_)        => "type",
            TokenKind::Punctuation(_) => "punctuation",
            TokenKind::Operator(_)    => "operator",
            TokenKind::Arrow          => "arrow",
            TokenKind::Int(_)         => "int",
            TokenKind::Long(_)        => "long",
            TokenKind::Float(_)       => "float",
            TokenKind::Double(_)      => "double",
            TokenKind::String(_)      => "string",
            TokenKind::Boolean(_)     => "boolean",
            TokenKind::Null           => "null",
            TokenKind::Eof            => "eof",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(keyword) => f.write_str(keyword.as_str()),
            TokenKind::Identifier(name) => f.write_str(name),
            TokenKind::Type(ty)         => f.write_str(ty.as_str()),
            TokenKind::Punctuation(c)   => write!(f, "{}", c),
            TokenKind::Operator(op)     => f.write_str(op),
            TokenKind::Arrow            => f.write_str("->"),
            TokenKind::Int(value)       => write!(f, "{}", value),
            TokenKind::Long(value)      => write!(f, "{}l", value),
            TokenKind::Float(value)     => write!(f, "{}f", value),
            TokenKind::Double(value)    => write!(f, "{}", value),
            TokenKind::String(value)    => write!(f, "{:?}", value),
            TokenKind::Boolean(value)   => write!(f, "{}", value),
            TokenKind::Null             => f.write_str("null"),
            TokenKind::Eof              => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub line:   usize,
    pub column: usize,
    pub start:  usize,
    pub end:    usize,
}

const PUNCTUATION: &str = ",;:(){}[]|@";
const OPERATOR_CHARS: &str = "+-*/%=&|<>!^~?";
const STRING_DELIMITERS: &str = "\"'`";
// No `<<` or `>>`, nested type arguments close one `>` at a time.
const MULTI_CHAR_OPERATORS: [&str; 7] = ["==", "!=", "<=", ">=", "&&", "**", "=>"];

/// Produces tokens on demand from a schema source text. Lines and columns
/// are 1-based.
pub struct Lexer<'a> {
    file:   String,
    source: &'a str,
    pos:    usize,
    line:   usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &str, source: &'a str) -> Lexer<'a> {
        Lexer {
            file: file.to_owned(),
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: String) -> HeliumError {
        HeliumError::Lex(CompileError::new(&self.file, line, column, message))
    }

    fn skip_trivia(&mut self) -> Result<(), HeliumError> {
        loop {
            match (self.peek_char(), self.peek_second()) {
                (Some(' ' | '\t' | '\r' | '\n'), _) => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek_char() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.error(line, column, "Unterminated comment".to_owned())),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Returns the next token. Once the end of the input is reached every
    /// further call yields `Eof`.
    pub fn next_token(&mut self) -> Result<Token, HeliumError> {
        self.skip_trivia()?;

        let (line, column, start) = (self.line, self.column, self.pos);
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token { kind: TokenKind::Eof, line, column, start, end: start }),
        };

        let kind = if STRING_DELIMITERS.contains(c) {
            self.read_string(c, line, column)?
        } else if c.is_ascii_digit() {
            self.read_number(line, column)?
        } else if c.is_ascii_alphabetic() || c == '_' {
            self.read_word()
        } else if c == '-' && self.peek_second() == Some('>') {
            self.bump();
            self.bump();
            TokenKind::Arrow
        } else if c == '|' && self.peek_second() == Some('|') {
            self.bump();
            self.bump();
            TokenKind::Operator("||".to_owned())
        } else if PUNCTUATION.contains(c) {
            self.bump();
            TokenKind::Punctuation(c)
        } else if OPERATOR_CHARS.contains(c) {
            self.read_operator()
        } else {
            return Err(self.error(line, column, format!("Unexpected character {}", c)));
        };

        Ok(Token { kind, line, column, start, end: self.pos })
    }

    fn read_string(&mut self, delimiter: char, line: usize, column: usize) -> Result<TokenKind, HeliumError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == delimiter => return Ok(TokenKind::String(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(escaped) => value.push(escaped),
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(self.error(line, column, "Unterminated string literal".to_owned()))
    }

    fn read_number(&mut self, line: usize, column: usize) -> Result<TokenKind, HeliumError> {
        let start = self.pos;

        if self.peek_char() == Some('0') && matches!(self.peek_second(), Some('x' | 'X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek_char().map_or(false, |c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.source[digits_start..self.pos];
            let value = i64::from_str_radix(digits, 16)
                .map_err(|_| self.error(line, column, format!("Invalid hex literal {}", &self.source[start..self.pos])))?;
            return Ok(TokenKind::Int(value));
        }

        let mut has_dot = false;
        loop {
            match self.peek_char() {
                Some(c) if c.is_ascii_digit() => {
                    self.bump();
                }
                Some('.') if !has_dot && self.peek_second().map_or(false, |c| c.is_ascii_digit()) => {
                    has_dot = true;
                    self.bump();
                }
                _ => break,
            }
        }
        let text = &self.source[start..self.pos];

        let is_float = self.peek_char() == Some('f');
        if is_float {
            self.bump();
        }
        let is_long = self.peek_char() == Some('l');
        if is_long {
            self.bump();
        }

        if is_long {
            if has_dot || is_float {
                return Err(self.error(line, column, format!("Long literal {} cannot have a fraction", text)));
            }
            let value = text
                .parse::<i64>()
                .map_err(|_| self.error(line, column, format!("Number {} does not fit in 64 bits", text)))?;
            return Ok(TokenKind::Long(value));
        }

        if has_dot || is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| self.error(line, column, format!("Invalid number {}", text)))?;
            return Ok(if is_float { TokenKind::Float(value) } else { TokenKind::Double(value) });
        }

        let value = text
            .parse::<i64>()
            .map_err(|_| self.error(line, column, format!("Number {} does not fit in 64 bits", text)))?;
        Ok(TokenKind::Int(value))
    }

    fn read_word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let word = &self.source[start..self.pos];
        match word {
            "true"  => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null"  => TokenKind::Null,
            _ => {
                if let Some(keyword) = Keyword::from_word(word) {
                    TokenKind::Keyword(keyword)
                } else if let Some(ty) = BuiltinType::from_word(word) {
                    TokenKind::Type(ty)
                } else {
                    TokenKind::Identifier(word.to_owned())
                }
            }
        }
    }

    fn read_operator(&mut self) -> TokenKind {
        let rest = &self.source[self.pos..];
        if let Some(op) = MULTI_CHAR_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            self.bump();
            self.bump();
            return TokenKind::Operator((*op).to_owned());
        }
        let c = self.bump().map(String::from).unwrap_or_default();
        TokenKind::Operator(c)
    }
}

/// A buffered view over a `Lexer` with a movable cursor. Tokens are lexed
/// lazily the first time the cursor reaches them and kept afterwards, so
/// `backtrack` never re-lexes.
pub struct TokenStream<'a> {
    lexer:  Lexer<'a>,
    tokens: Vec<Token>,
    cursor: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> TokenStream<'a> {
        TokenStream {
            lexer,
            tokens: Vec::new(),
            cursor: 0,
        }
    }

    pub fn file(&self) -> &str {
        self.lexer.file()
    }

    pub fn source(&self) -> &'a str {
        self.lexer.source
    }

    fn fill(&mut self) -> Result<(), HeliumError> {
        while self.cursor >= self.tokens.len() {
            if let Some(last) = self.tokens.last() {
                if last.kind == TokenKind::Eof {
                    self.cursor = self.tokens.len() - 1;
                    return Ok(());
                }
            }
            let token = self.lexer.next_token()?;
            self.tokens.push(token);
        }
        Ok(())
    }

    pub fn peek(&mut self) -> Result<&Token, HeliumError> {
        self.fill()?;
        Ok(&self.tokens[self.cursor])
    }

    pub fn next(&mut self) -> Result<Token, HeliumError> {
        self.fill()?;
        let token = self.tokens[self.cursor].clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        Ok(token)
    }

    /// Moves the cursor back by one token.
    pub fn backtrack(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    /// The byte offset just past the most recently consumed token.
    pub fn previous_end(&self) -> usize {
        match self.cursor.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.end,
            None => 0,
        }
    }
}

/// Lexes the whole of `source` eagerly. Mostly useful for tests and tooling,
/// the parser pulls tokens through a `TokenStream` instead.
pub fn tokenize(file: &str, source: &str) -> Result<Vec<Token>, HeliumError> {
    let mut lexer = Lexer::new(file, source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

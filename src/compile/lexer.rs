use super::CompileError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(u64),
    LongLiteral(u64),
    FloatLiteral(f32),
    DoubleLiteral(f64),
    StringLiteral(String),
    CharLiteral(u16),

    // Identifiers and keywords
    Ident(String),
    Return,
    Throw,
    New,
    Null,
    True,
    False,

    // Operators
    Plus,
    Minus,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,

    // End of input
    Eof,
}

#[derive(Clone, Debug)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            if self.pos >= self.chars.len() {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    line: self.line,
                    column: self.column,
                });
                break;
            }
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.advance();
            }
            if self.peek() == Some('/') && self.peek_ahead(1) == Some('/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }
            if self.peek() == Some('/') && self.peek_ahead(1) == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.peek() {
                        None => return Err(self.error("unterminated comment")),
                        Some('*') if self.peek_ahead(1) == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(_) => {
                            self.advance();
                        }
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::ParseError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, CompileError> {
        let line = self.line;
        let column = self.column;
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of input"));
        };

        let token = match c {
            '(' => { self.advance(); Token::LParen }
            ')' => { self.advance(); Token::RParen }
            '{' => { self.advance(); Token::LBrace }
            '}' => { self.advance(); Token::RBrace }
            ';' => { self.advance(); Token::Semicolon }
            ',' => { self.advance(); Token::Comma }
            '+' => { self.advance(); Token::Plus }
            '-' => { self.advance(); Token::Minus }
            '.' if !self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit()) => {
                self.advance();
                Token::Dot
            }
            '"' => self.read_string()?,
            '\'' => self.read_char()?,
            _ if c.is_ascii_digit() || c == '.' => self.read_number()?,
            _ if c.is_alphabetic() || c == '_' || c == '$' => self.read_ident_or_keyword(),
            _ => return Err(self.error(format!("unexpected character: '{}'", c))),
        };

        Ok(SpannedToken { token, line, column })
    }

    fn read_escape(&mut self) -> Result<u16, CompileError> {
        let Some(c) = self.advance() else {
            return Err(self.error("unterminated escape sequence"));
        };
        let unit = match c {
            'n' => '\n' as u16,
            't' => '\t' as u16,
            'r' => '\r' as u16,
            'b' => 0x08,
            'f' => 0x0c,
            's' => ' ' as u16,
            '\'' => '\'' as u16,
            '"' => '"' as u16,
            '\\' => '\\' as u16,
            'u' => {
                while self.peek() == Some('u') {
                    self.advance();
                }
                let mut value: u16 = 0;
                for _ in 0..4 {
                    let digit = self
                        .advance()
                        .and_then(|d| d.to_digit(16))
                        .ok_or_else(|| self.error("illegal unicode escape"))?;
                    value = value * 16 + digit as u16;
                }
                value
            }
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0) as u16;
                // Up to three octal digits, capped at \377.
                let max_digits = if c <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            self.advance();
                            value = value * 8 + d as u16;
                        }
                        None => break,
                    }
                }
                value
            }
            other => return Err(self.error(format!("illegal escape character: '\\{}'", other))),
        };
        Ok(unit)
    }

    fn read_string(&mut self) -> Result<Token, CompileError> {
        self.advance(); // consume opening "
        let mut units: Vec<u16> = Vec::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error("unterminated string literal")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    units.push(self.read_escape()?);
                }
                Some(c) => {
                    self.advance();
                    let mut buf = [0u16; 2];
                    units.extend_from_slice(c.encode_utf16(&mut buf));
                }
            }
        }
        Ok(Token::StringLiteral(String::from_utf16_lossy(&units)))
    }

    fn read_char(&mut self) -> Result<Token, CompileError> {
        self.advance(); // consume opening '
        let unit = match self.peek() {
            None | Some('\'') | Some('\n') => return Err(self.error("empty character literal")),
            Some('\\') => {
                self.advance();
                self.read_escape()?
            }
            Some(c) => {
                self.advance();
                let mut buf = [0u16; 2];
                let encoded = c.encode_utf16(&mut buf);
                if encoded.len() != 1 {
                    return Err(self.error("character literal does not fit in a char"));
                }
                encoded[0]
            }
        };
        if self.peek() != Some('\'') {
            return Err(self.error("unclosed character literal"));
        }
        self.advance();
        Ok(Token::CharLiteral(unit))
    }

    fn read_number(&mut self) -> Result<Token, CompileError> {
        if self.peek() == Some('0') && matches!(self.peek_ahead(1), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                } else if c != '_' {
                    break;
                }
                self.advance();
            }
            let value = u64::from_str_radix(&digits, 16)
                .map_err(|_| self.error("malformed hexadecimal literal"))?;
            return Ok(self.integer_suffix(value));
        }

        let mut text = String::new();
        let mut is_floating = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !is_floating {
                is_floating = true;
                text.push(c);
            } else if (c == 'e' || c == 'E')
                && (self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit())
                    || (matches!(self.peek_ahead(1), Some('+') | Some('-'))
                        && self.peek_ahead(2).is_some_and(|d| d.is_ascii_digit())))
            {
                is_floating = true;
                text.push(c);
                self.advance();
                if let Some(sign) = self.peek().filter(|s| *s == '+' || *s == '-') {
                    text.push(sign);
                    self.advance();
                }
                continue;
            } else if c != '_' {
                break;
            }
            self.advance();
        }

        match self.peek() {
            Some('f') | Some('F') => {
                self.advance();
                let value: f32 = text
                    .parse()
                    .map_err(|_| self.error("malformed floating-point literal"))?;
                Ok(Token::FloatLiteral(value))
            }
            Some('d') | Some('D') => {
                self.advance();
                let value: f64 = text
                    .parse()
                    .map_err(|_| self.error("malformed floating-point literal"))?;
                Ok(Token::DoubleLiteral(value))
            }
            _ if is_floating => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| self.error("malformed floating-point literal"))?;
                Ok(Token::DoubleLiteral(value))
            }
            _ => {
                let value: u64 = text
                    .parse()
                    .map_err(|_| self.error("integer number too large"))?;
                Ok(self.integer_suffix(value))
            }
        }
    }

    fn integer_suffix(&mut self, value: u64) -> Token {
        if matches!(self.peek(), Some('l') | Some('L')) {
            self.advance();
            Token::LongLiteral(value)
        } else {
            Token::IntLiteral(value)
        }
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match ident.as_str() {
            "return" => Token::Return,
            "throw" => Token::Throw,
            "new" => Token::New,
            "null" => Token::Null,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(ident),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn return_statement() {
        assert_eq!(
            tokens(r#"return "x";"#),
            vec![
                Token::Return,
                Token::StringLiteral("x".into()),
                Token::Semicolon,
                Token::Eof
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            tokens("1 2L 0x1F 1.5 2.5f 3d 1e3 1_000"),
            vec![
                Token::IntLiteral(1),
                Token::LongLiteral(2),
                Token::IntLiteral(31),
                Token::DoubleLiteral(1.5),
                Token::FloatLiteral(2.5),
                Token::DoubleLiteral(3.0),
                Token::DoubleLiteral(1000.0),
                Token::IntLiteral(1000),
                Token::Eof
            ]
        );
    }

    #[test]
    fn escapes() {
        assert_eq!(
            tokens(r#""a\n\"bA\101" '\t'"#),
            vec![
                Token::StringLiteral("a\n\"bAA".into()),
                Token::CharLiteral(9),
                Token::Eof
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            tokens("// line\n/* block */ return;"),
            vec![Token::Return, Token::Semicolon, Token::Eof]
        );
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = Lexer::new("return \"abc").tokenize().unwrap_err();
        match err {
            CompileError::ParseError { line, message, .. } => {
                assert_eq!(line, 1);
                assert!(message.contains("unterminated"));
            }
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_character() {
        assert!(Lexer::new("return #;").tokenize().is_err());
    }
}

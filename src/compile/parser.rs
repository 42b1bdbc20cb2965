use super::ast::*;
use super::lexer::{SpannedToken, Token};
use super::CompileError;

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: &Token) -> Result<(), CompileError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, got {:?}", expected, self.peek())))
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        let span = &self.tokens[self.pos];
        CompileError::ParseError {
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }

    fn expect_ident(&mut self) -> Result<String, CompileError> {
        if let Token::Ident(name) = self.peek().clone() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!("expected identifier, got {:?}", self.peek())))
        }
    }

    /// Parse a method body: either `{ statement* }` or bare statements up to
    /// the end of input. Nested blocks are flattened.
    pub fn parse_method_body(&mut self) -> Result<Vec<CStmt>, CompileError> {
        let mut stmts = Vec::new();
        while !self.at(&Token::Eof) {
            self.parse_statement_into(&mut stmts)?;
        }
        Ok(stmts)
    }

    fn parse_statement_into(&mut self, out: &mut Vec<CStmt>) -> Result<(), CompileError> {
        match self.peek() {
            Token::LBrace => {
                self.advance();
                while !self.at(&Token::RBrace) {
                    if self.at(&Token::Eof) {
                        return Err(self.error("reached end of input while parsing a block"));
                    }
                    self.parse_statement_into(out)?;
                }
                self.expect(&Token::RBrace)?;
            }
            Token::Semicolon => {
                self.advance();
            }
            Token::Return => {
                self.advance();
                let value = if self.at(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&Token::Semicolon)?;
                out.push(CStmt::Return(value));
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(&Token::Semicolon)?;
                out.push(CStmt::Throw(value));
            }
            other => {
                return Err(self.error(format!(
                    "unsupported statement starting with {:?}; only return and throw are allowed",
                    other
                )))
            }
        }
        Ok(())
    }

    /// expression := unary ('+' unary)*
    fn parse_expression(&mut self) -> Result<CExpr, CompileError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Token::Plus => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = CExpr::Add(Box::new(lhs), Box::new(rhs));
                }
                Token::Minus => return Err(self.error("binary '-' is not supported")),
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<CExpr, CompileError> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(CExpr::Neg(Box::new(self.parse_unary()?)))
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<CExpr, CompileError> {
        let expr = match self.peek().clone() {
            Token::StringLiteral(s) => CExpr::StringLit(s),
            Token::CharLiteral(c) => CExpr::CharLit(c),
            Token::IntLiteral(v) => CExpr::IntLit(v),
            Token::LongLiteral(v) => CExpr::LongLit(v),
            Token::FloatLiteral(v) => CExpr::FloatLit(v),
            Token::DoubleLiteral(v) => CExpr::DoubleLit(v),
            Token::True => CExpr::BoolLit(true),
            Token::False => CExpr::BoolLit(false),
            Token::Null => CExpr::Null,
            Token::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                return Ok(inner);
            }
            Token::New => {
                self.advance();
                return self.parse_new();
            }
            Token::Ident(name) => {
                return Err(self.error(format!(
                    "cannot resolve symbol '{}': only literals are allowed",
                    name
                )))
            }
            other => return Err(self.error(format!("expected expression, got {:?}", other))),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_new(&mut self) -> Result<CExpr, CompileError> {
        let mut class = self.expect_ident()?;
        while self.at(&Token::Dot) {
            self.advance();
            class.push('.');
            class.push_str(&self.expect_ident()?);
        }
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            args.push(self.parse_expression()?);
            while self.at(&Token::Comma) {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(CExpr::New { class, args })
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::Lexer;
    use super::*;

    fn parse(source: &str) -> Result<Vec<CStmt>, CompileError> {
        let tokens = Lexer::new(source).tokenize()?;
        Parser::new(tokens).parse_method_body()
    }

    #[test]
    fn braced_and_bare_bodies_agree() {
        let braced = parse(r#"{ return "stub"; }"#).unwrap();
        let bare = parse(r#"return "stub";"#).unwrap();
        assert_eq!(braced, bare);
        assert_eq!(braced, vec![CStmt::Return(Some(CExpr::StringLit("stub".into())))]);
    }

    #[test]
    fn concatenation_is_left_associative() {
        let stmts = parse(r#"return "a" + 1 + 2;"#).unwrap();
        assert_eq!(
            stmts,
            vec![CStmt::Return(Some(CExpr::Add(
                Box::new(CExpr::Add(
                    Box::new(CExpr::StringLit("a".into())),
                    Box::new(CExpr::IntLit(1))
                )),
                Box::new(CExpr::IntLit(2))
            )))]
        );
    }

    #[test]
    fn throw_new_with_qualified_name() {
        let stmts = parse(r#"throw new java.lang.IllegalStateException("disabled");"#).unwrap();
        assert_eq!(
            stmts,
            vec![CStmt::Throw(CExpr::New {
                class: "java.lang.IllegalStateException".into(),
                args: vec![CExpr::StringLit("disabled".into())],
            })]
        );
    }

    #[test]
    fn void_return() {
        assert_eq!(parse("{ return; }").unwrap(), vec![CStmt::Return(None)]);
    }

    #[test]
    fn identifiers_are_rejected() {
        let err = parse("return key;").unwrap_err();
        assert!(err.to_string().contains("cannot resolve symbol 'key'"));
    }

    #[test]
    fn missing_semicolon() {
        assert!(parse(r#"return "x""#).is_err());
    }

    #[test]
    fn unclosed_block() {
        let err = parse(r#"{ return "x";"#).unwrap_err();
        assert!(err.to_string().contains("end of input"));
    }

    #[test]
    fn other_statements_are_rejected() {
        assert!(parse("int x = 1;").is_err());
    }
}

//! # Statement Parser
//!
//! Recursive-descent parser over the lexer's token stream. The grammar:
//!
//! ```text
//! statement  := select | load | create_index
//! select     := SELECT projection FROM ident [WHERE condition (AND condition)*]
//! projection := KEY | VALUE | * | COUNT ( * )
//! condition  := KEY op integer | VALUE op string
//! op         := = | <> | != | < | <= | > | >=
//! load       := LOAD ident FROM string [WITH INDEX]
//! create     := CREATE INDEX ON ident
//! ```
//!
//! A trailing semicolon is accepted on every statement. Key comparisons
//! require integer literals and value comparisons require string
//! literals; mixing them is a parse error rather than a silent coercion.

use eyre::{bail, Result};

use super::ast::{CompareOp, LoadStatement, Predicate, Projection, SelectStatement, Statement};
use super::lexer::{Keyword, Lexer, Token};

pub fn parse(input: &str) -> Result<Statement<'_>> {
    let mut parser = Parser::new(input)?;
    let statement = parser.statement()?;
    parser.finish()?;
    Ok(statement)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<Token<'a>> {
        let token = self.current;
        self.current = self.lexer.next_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: Token<'a>) -> Result<()> {
        let token = self.advance()?;
        if token != expected {
            bail!("expected {:?}, found {:?}", expected, token);
        }
        Ok(())
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn ident(&mut self) -> Result<&'a str> {
        match self.advance()? {
            Token::Ident(name) => Ok(name),
            other => bail!("expected identifier, found {:?}", other),
        }
    }

    fn statement(&mut self) -> Result<Statement<'a>> {
        match self.current {
            Token::Keyword(Keyword::Select) => self.select(),
            Token::Keyword(Keyword::Load) => self.load(),
            Token::Keyword(Keyword::Create) => self.create_index(),
            other => bail!("expected SELECT, LOAD or CREATE, found {:?}", other),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.current == Token::Semicolon {
            self.advance()?;
        }
        if self.current != Token::Eof {
            bail!("unexpected trailing input: {:?}", self.current);
        }
        Ok(())
    }

    fn select(&mut self) -> Result<Statement<'a>> {
        self.expect_keyword(Keyword::Select)?;

        let projection = match self.advance()? {
            Token::Keyword(Keyword::Key) => Projection::Key,
            Token::Keyword(Keyword::Value) => Projection::Value,
            Token::Star => Projection::All,
            Token::Keyword(Keyword::Count) => {
                self.expect(Token::LParen)?;
                self.expect(Token::Star)?;
                self.expect(Token::RParen)?;
                Projection::Count
            }
            other => bail!("expected KEY, VALUE, * or COUNT(*), found {:?}", other),
        };

        self.expect_keyword(Keyword::From)?;
        let table = self.ident()?;

        let mut predicates = Vec::new();
        if self.current == Token::Keyword(Keyword::Where) {
            self.advance()?;
            loop {
                predicates.push(self.condition()?);
                if self.current == Token::Keyword(Keyword::And) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }

        Ok(Statement::Select(SelectStatement {
            projection,
            table,
            predicates,
        }))
    }

    fn condition(&mut self) -> Result<Predicate<'a>> {
        let attribute = self.advance()?;
        let op = self.compare_op()?;

        match attribute {
            Token::Keyword(Keyword::Key) => match self.advance()? {
                Token::Int(value) => Ok(Predicate::Key(op, value)),
                other => bail!("key comparisons take an integer literal, found {:?}", other),
            },
            Token::Keyword(Keyword::Value) => match self.advance()? {
                Token::Str(value) => Ok(Predicate::Value(op, value)),
                other => bail!("value comparisons take a string literal, found {:?}", other),
            },
            other => bail!("expected KEY or VALUE, found {:?}", other),
        }
    }

    fn compare_op(&mut self) -> Result<CompareOp> {
        match self.advance()? {
            Token::Eq => Ok(CompareOp::Eq),
            Token::Ne => Ok(CompareOp::Ne),
            Token::Lt => Ok(CompareOp::Lt),
            Token::Le => Ok(CompareOp::Le),
            Token::Gt => Ok(CompareOp::Gt),
            Token::Ge => Ok(CompareOp::Ge),
            other => bail!("expected a comparison operator, found {:?}", other),
        }
    }

    fn load(&mut self) -> Result<Statement<'a>> {
        self.expect_keyword(Keyword::Load)?;
        let table = self.ident()?;
        self.expect_keyword(Keyword::From)?;

        let file = match self.advance()? {
            Token::Str(path) => path,
            other => bail!("expected a quoted file path, found {:?}", other),
        };

        let with_index = if self.current == Token::Keyword(Keyword::With) {
            self.advance()?;
            self.expect_keyword(Keyword::Index)?;
            true
        } else {
            false
        };

        Ok(Statement::Load(LoadStatement {
            table,
            file,
            with_index,
        }))
    }

    fn create_index(&mut self) -> Result<Statement<'a>> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Index)?;
        self.expect_keyword(Keyword::On)?;
        let table = self.ident()?;

        Ok(Statement::CreateIndex { table })
    }
}

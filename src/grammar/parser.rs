//! The grammar parser.
//!
//! ```text
//! module      = "module" ident "{" definition* "}"
//! definition  = ident "=" constructor ("|" constructor)*
//! constructor = ident ("(" field ("," field)* ")")?
//! field       = ident ("?" | "*")? ident
//! ```

use std::iter::Peekable;

use compact_str::CompactString;
use text_size::{TextRange, TextSize};

use crate::tree::{Cardinality, FieldDecl};

use super::{
    lexer::{tokenize, Token, TokenKind},
    GrammarError,
};

/// A parsed grammar module, before type checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: CompactString,
    pub definitions: Vec<Definition>,
}

/// `type = Ctor(...) | Ctor(...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: CompactString,
    pub range: TextRange,
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub name: CompactString,
    pub range: TextRange,
    pub fields: Vec<FieldDecl>,
}

/// Parse the grammar text into a module.
pub fn parse(input: &str) -> Result<Module, GrammarError> {
    Parser::new(input).parse_module()
}

struct Parser<'input, I: Iterator<Item = Token>> {
    input: &'input str,
    token_iter: Peekable<I>,
    prev_token_end: TextSize,
    expected_kinds: Vec<TokenKind>,
}

impl<'input> Parser<'input, std::vec::IntoIter<Token>> {
    fn new(input: &'input str) -> Self {
        let tokens: Vec<Token> = tokenize(input)
            .filter(|token| !token.kind.is_trivia())
            .collect();
        Parser {
            input,
            token_iter: tokens.into_iter().peekable(),
            prev_token_end: TextSize::default(),
            expected_kinds: Vec::new(),
        }
    }
}

impl<I: Iterator<Item = Token>> Parser<'_, I> {
    fn current_token(&mut self) -> Option<Token> {
        self.token_iter.peek().copied()
    }

    fn current_kind(&mut self) -> TokenKind {
        self
            .current_token()
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        self.expected_kinds.clear();
        let token = self.token_iter.next()?;
        self.prev_token_end = token.range.end();
        Some(token)
    }

    /// Checks if the current token is `t`, recording it as expected otherwise.
    fn check(&mut self, t: TokenKind) -> bool {
        let is_present = self.current_kind() == t;
        if !is_present {
            self.expected_kinds.push(t);
        }
        is_present
    }

    fn eat(&mut self, t: TokenKind) -> bool {
        let is_present = self.check(t);
        if is_present {
            self.bump();
        }
        is_present
    }

    fn expect(&mut self, t: TokenKind) -> Result<TextRange, GrammarError> {
        if !self.check(t) {
            return Err(self.unexpected());
        }
        match self.bump() {
            Some(token) => Ok(token.range),
            None => Ok(TextRange::empty(self.prev_token_end)),
        }
    }

    fn expect_ident(&mut self) -> Result<(CompactString, TextRange), GrammarError> {
        let range = self.expect(TokenKind::Ident)?;
        Ok((CompactString::new(&self.input[range]), range))
    }

    fn unexpected(&mut self) -> GrammarError {
        let (found, range) = self
            .current_token()
            .map(|token| (token.kind, token.range))
            .unwrap_or((TokenKind::Eof, TextRange::empty(self.prev_token_end)));
        GrammarError::UnexpectedToken {
            expected: self.expected_kinds.clone(),
            found,
            range,
        }
    }

    fn parse_module(mut self) -> Result<Module, GrammarError> {
        let (keyword, range) = self.expect_ident()?;
        if keyword != "module" {
            return Err(GrammarError::UnexpectedToken {
                expected: vec![TokenKind::Ident],
                found: TokenKind::Ident,
                range,
            });
        }
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::OpenBrace)?;
        let mut definitions = Vec::new();
        while !self.eat(TokenKind::CloseBrace) {
            definitions.push(self.parse_definition()?);
        }
        if self.current_token().is_some() {
            self.expected_kinds.push(TokenKind::Eof);
            return Err(self.unexpected());
        }
        Ok(Module { name, definitions })
    }

    fn parse_definition(&mut self) -> Result<Definition, GrammarError> {
        let (name, start) = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let mut constructors = vec![self.parse_constructor()?];
        while self.eat(TokenKind::Pipe) {
            constructors.push(self.parse_constructor()?);
        }
        Ok(Definition {
            name,
            range: TextRange::new(start.start(), self.prev_token_end),
            constructors,
        })
    }

    fn parse_constructor(&mut self) -> Result<Constructor, GrammarError> {
        let (name, start) = self.expect_ident()?;
        let mut fields = Vec::new();
        if self.eat(TokenKind::OpenParen) {
            loop {
                fields.push(self.parse_field()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::CloseParen)?;
        }
        Ok(Constructor {
            name,
            range: TextRange::new(start.start(), self.prev_token_end),
            fields,
        })
    }

    fn parse_field(&mut self) -> Result<FieldDecl, GrammarError> {
        let (ty, _) = self.expect_ident()?;
        let cardinality = if self.eat(TokenKind::Question) {
            Cardinality::Optional
        } else if self.eat(TokenKind::Star) {
            Cardinality::Sequence
        } else {
            Cardinality::Single
        };
        let (name, _) = self.expect_ident()?;
        Ok(FieldDecl::new(String::from(name), String::from(ty), cardinality))
    }
}

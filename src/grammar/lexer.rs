//! The grammar lexer.

use std::{fmt, str::Chars};

use text_size::{TextRange, TextSize};

/// The kind of a grammar token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `-- comment` or `# comment`
    Comment,
    /// spaces, tabs and newlines
    Whitespace,
    /// `name`
    Ident,
    /// `=`
    Assign,
    /// `|`
    Pipe,
    /// `,`
    Comma,
    /// `?`
    Question,
    /// `*`
    Star,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// Any character the lexer does not know.
    Unknown,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Returns true if the token carries no meaning for the parser.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Whitespace)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenKind::Comment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Ident => "identifier",
            TokenKind::Assign => "`=`",
            TokenKind::Pipe => "`|`",
            TokenKind::Comma => "`,`",
            TokenKind::Question => "`?`",
            TokenKind::Star => "`*`",
            TokenKind::OpenParen => "`(`",
            TokenKind::CloseParen => "`)`",
            TokenKind::OpenBrace => "`{`",
            TokenKind::CloseBrace => "`}`",
            TokenKind::Unknown => "unknown token",
            TokenKind::Eof => "end of input",
        })
    }
}

/// A grammar token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
}

impl Token {
    pub const fn new(kind: TokenKind, range: TextRange) -> Self {
        Token { kind, range }
    }
}

/// Peekable iterator over a char sequence.
struct Cursor<'a> {
    input: &'a str,
    chars: Chars<'a>,
}

const EOF_CHAR: char = '\0';

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            input,
            chars: input.chars(),
        }
    }

    /// Peeks the next symbol without consuming it.
    fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    fn pos(&self) -> TextSize {
        // Grammar texts are far below 4 GiB.
        TextSize::new((self.input.len() - self.chars.as_str().len()) as u32)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.first() == c {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Eats symbols while predicate returns true or until the end of input is reached.
    fn eat_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    fn advance_token(&mut self) -> Token {
        let start = self.pos();
        let Some(first_char) = self.bump() else {
            return Token::new(TokenKind::Eof, TextRange::empty(start));
        };
        let kind = match first_char {
            '-' if self.eat('-') => self.line_comment(),
            '#' => self.line_comment(),
            c if c.is_whitespace() => {
                self.eat_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            c if is_id_start(c) => {
                self.eat_while(is_id_continue);
                TokenKind::Ident
            }
            '=' => TokenKind::Assign,
            '|' => TokenKind::Pipe,
            ',' => TokenKind::Comma,
            '?' => TokenKind::Question,
            '*' => TokenKind::Star,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            _ => TokenKind::Unknown,
        };
        Token::new(kind, TextRange::new(start, self.pos()))
    }

    fn line_comment(&mut self) -> TokenKind {
        self.eat_while(|c| c != '\n');
        TokenKind::Comment
    }
}

/// Creates an iterator that produces tokens from the grammar text.
pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);
    std::iter::from_fn(move || {
        let token = cursor.advance_token();
        (token.kind != TokenKind::Eof).then_some(token)
    })
}

/// True if `c` is valid as a first character of an identifier.
pub fn is_id_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// True if `c` is valid as a non-first character of an identifier.
pub fn is_id_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .map(|token| token.kind)
            .filter(|kind| !kind.is_trivia())
            .collect()
    }

    #[test]
    fn test_tokenize() {
        use TokenKind::*;

        assert_eq!(
            kinds("stmt = Return(expr? value) | Block(stmt* body) -- tail"),
            [
                Ident, Assign, Ident, OpenParen, Ident, Question, Ident, CloseParen, Pipe, Ident,
                OpenParen, Ident, Star, Ident, CloseParen,
            ]
        );
        assert_eq!(
            kinds("# comment\nmodule M {}"),
            [Ident, Ident, OpenBrace, CloseBrace]
        );
        assert_eq!(kinds("a - b"), [Ident, Unknown, Ident]);
    }

    #[test]
    fn test_ranges() {
        let tokens: Vec<_> = tokenize("ab = c").collect();
        assert_eq!(tokens[0].range, TextRange::new(0.into(), 2.into()));
        assert_eq!(tokens[2].range, TextRange::new(3.into(), 4.into()));
    }
}

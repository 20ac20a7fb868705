//! Tokens produced by the tokenizer.

/// Reserved words. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Else,
    False,
    If,
    Struct,
    Switch,
    Transform,
    True,
}

impl Keyword {
    pub fn from_ident(s: &str) -> Option<Self> {
        Some(match s {
            "else" => Keyword::Else,
            "false" => Keyword::False,
            "if" => Keyword::If,
            "struct" => Keyword::Struct,
            "switch" => Keyword::Switch,
            "transform" => Keyword::Transform,
            "true" => Keyword::True,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Else => "else",
            Keyword::False => "false",
            Keyword::If => "if",
            Keyword::Struct => "struct",
            Keyword::Switch => "switch",
            Keyword::Transform => "transform",
            Keyword::True => "true",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    Keyword(Keyword),
    /// Any other single character, represented by itself.
    Symbol(char),
    /// `<-`
    LeftArrow,
    Eof,
    /// No valid token (before the first read, or after an identifier was taken).
    Error,
}

/// A token with the position of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is_symbol(&self, c: char) -> bool {
        self.kind == TokenKind::Symbol(c)
    }

    pub fn is_keyword(&self, k: Keyword) -> bool {
        self.kind == TokenKind::Keyword(k)
    }
}

use std::fmt;

/// Every kind of token the lexer produces, plus the synthetic kinds the parser
/// uses to label interior nodes (`RELATION`, `ATTR`, `LIST`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Id,
    /// An identifier in relation position, naming a stored relation.
    Relation,
    Number,
    String,
    /// A qualified attribute, `qualifier.name`.
    Attr,
    /// A comma separated attribute list.
    List,
    LParen,
    RParen,
    LBrack,
    RBrack,
    Dot,
    Comma,
    NJoin,
    Select,
    Project,
    Rename,
    Union,
    ISect,
    Diff,
    CProd,
    And,
    Or,
    Not,
    Minus,
    Grtr,
    Geq,
    Eql,
    Neq,
    Less,
    Leq,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Eof => "EOF",
            TokenKind::Id => "ID",
            TokenKind::Relation => "RELATION",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Attr => "ATTR",
            TokenKind::List => "LIST",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrack => "[",
            TokenKind::RBrack => "]",
            TokenKind::Dot => "DOT",
            TokenKind::Comma => "COMMA",
            TokenKind::NJoin => "NJOIN",
            TokenKind::Select => "SELECT",
            TokenKind::Project => "PROJECT",
            TokenKind::Rename => "RENAME",
            TokenKind::Union => "UNION",
            TokenKind::ISect => "ISECT",
            TokenKind::Diff => "DIFF",
            TokenKind::CProd => "CPROD",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Minus => "MINUS",
            TokenKind::Grtr => "GRTR",
            TokenKind::Geq => "GEQ",
            TokenKind::Eql => "EQL",
            TokenKind::Neq => "NEQ",
            TokenKind::Less => "LESS",
            TokenKind::Leq => "LEQ",
        }
    }

    /// Comparison operators, the roots of leaf predicates.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Grtr
                | TokenKind::Geq
                | TokenKind::Eql
                | TokenKind::Neq
                | TokenKind::Less
                | TokenKind::Leq
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: Some(literal.into()),
        }
    }

    pub fn bare(kind: TokenKind) -> Self {
        Self {
            kind,
            literal: None,
        }
    }

    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }
}

impl From<TokenKind> for Token {
    fn from(kind: TokenKind) -> Self {
        Token::bare(kind)
    }
}

/// Renders as `<KIND, literal>`, with `null` standing in for a missing literal.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.kind, self.literal().unwrap_or("null"))
    }
}

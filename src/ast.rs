use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

/// A node of the expression tree. What a node means is decided entirely by
/// the kind of its token; leaves carry a literal, interior nodes carry
/// children in operand order.
///
/// A node without a token is a "null" node. The parser never produces one,
/// but it is handy as a detached root when building trees by hand.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ast {
    token: Option<Token>,
    children: Vec<Ast>,
}

impl Ast {
    pub fn new(token: Token) -> Self {
        Self {
            token: Some(token),
            children: Vec::new(),
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn leaf(kind: TokenKind, literal: impl Into<String>) -> Self {
        Self::new(Token::new(kind, literal))
    }

    pub fn with_children(kind: TokenKind, children: Vec<Ast>) -> Self {
        Self {
            token: Some(Token::bare(kind)),
            children,
        }
    }

    pub fn add_child(&mut self, child: Ast) {
        self.children.push(child);
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn kind(&self) -> Option<TokenKind> {
        self.token.as_ref().map(|token| token.kind)
    }

    pub fn literal(&self) -> Option<&str> {
        self.token.as_ref().and_then(Token::literal)
    }

    pub fn children(&self) -> &[Ast] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Result<&Ast> {
        self.children.get(index).ok_or_else(|| {
            Error::MalformedTree(format!(
                "{} is missing child {}",
                self.to_node_string(),
                index
            ))
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_null(&self) -> bool {
        self.token.is_none()
    }

    /// `<literal>` for leaves, `<KIND>` for interior nodes, `<null>` for null nodes.
    pub fn to_node_string(&self) -> String {
        match &self.token {
            None => "<null>".to_string(),
            Some(token) if self.is_leaf() => {
                format!("<{}>", token.literal().unwrap_or("null"))
            }
            Some(token) => format!("<{}>", token.kind),
        }
    }

    /// Parenthesized prefix form, e.g. `(<UNION> <r1> <r2>)`. A null root just
    /// lists its children.
    pub fn to_tree_string(&self) -> String {
        if self.is_leaf() {
            return self.to_node_string();
        }
        let children = self
            .children
            .iter()
            .map(Ast::to_tree_string)
            .collect::<Vec<_>>()
            .join(" ");
        if self.is_null() {
            children
        } else {
            format!("({} {})", self.to_node_string(), children)
        }
    }

    /// Dispatches to the handler of `visitor` for this node's kind.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<V::Output> {
        let kind = match self.kind() {
            Some(kind) => kind,
            None => return Err(Error::MalformedTree("cannot visit a null node".into())),
        };

        match kind {
            TokenKind::Relation => visitor.visit_relation(self),
            TokenKind::Number => visitor.visit_number(self),
            TokenKind::String => visitor.visit_string(self),
            TokenKind::Id => visitor.visit_id(self),
            TokenKind::Minus => visitor.visit_minus(self),
            TokenKind::Attr => visitor.visit_attr(self),
            TokenKind::List => visitor.visit_list(self),
            TokenKind::Grtr
            | TokenKind::Geq
            | TokenKind::Eql
            | TokenKind::Neq
            | TokenKind::Less
            | TokenKind::Leq => visitor.visit_comparison(self),
            TokenKind::And | TokenKind::Or => visitor.visit_logical(self),
            TokenKind::Not => visitor.visit_not(self),
            TokenKind::Project => visitor.visit_project(self),
            TokenKind::Select => visitor.visit_select(self),
            TokenKind::Rename => visitor.visit_rename(self),
            TokenKind::Union
            | TokenKind::ISect
            | TokenKind::Diff
            | TokenKind::CProd
            | TokenKind::NJoin => visitor.visit_set_operation(self),
            TokenKind::Eof
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBrack
            | TokenKind::RBrack
            | TokenKind::Dot
            | TokenKind::Comma => visitor.unhandled(self),
        }
    }
}

/// A handler table over node kinds. Every handler defaults to
/// [Visitor::unhandled], so a visitor only implements the kinds it cares
/// about and gets an error for the rest.
pub trait Visitor {
    type Output;

    fn unhandled(&mut self, node: &Ast) -> Result<Self::Output> {
        Err(Error::NoHandler {
            kind: node.kind().unwrap_or(TokenKind::Eof),
        })
    }

    fn visit_relation(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_number(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_string(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_id(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_minus(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_attr(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_list(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    /// `GRTR`, `GEQ`, `EQL`, `NEQ`, `LESS` and `LEQ`.
    fn visit_comparison(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    /// `AND` and `OR`.
    fn visit_logical(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_not(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_project(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_select(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    fn visit_rename(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }

    /// `UNION`, `ISECT`, `DIFF`, `CPROD` and `NJOIN`.
    fn visit_set_operation(&mut self, node: &Ast) -> Result<Self::Output> {
        self.unhandled(node)
    }
}

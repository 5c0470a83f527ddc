use crate::ast::Ast;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Recursive-descent parser over a [Lexer] with one token of lookahead.
///
/// Binding power, loosest first: union and intersection (same level),
/// difference, natural join, cartesian product, then the prefix operators
/// which take an explicit parenthesized operand. Every binary level is left
/// associative.
///
/// Each grammar production is a public method so it can be exercised on its
/// own. Any mismatch aborts the whole parse; there is no recovery.
pub struct Parser {
    lexer: Lexer,
    lookahead: Token,
}

impl Parser {
    /// Creates a parser with the lookahead primed to the first token.
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        let lookahead = lexer.next_token()?;
        Ok(Self { lexer, lookahead })
    }

    /// Parses a complete expression; trailing input is an error.
    pub fn parse(&mut self) -> Result<Ast> {
        let ast = self.union_intersection()?;
        self.match_token(TokenKind::Eof)?;
        Ok(ast)
    }

    pub fn lookahead(&self) -> &Token {
        &self.lookahead
    }

    //helpers
    fn peek(&self) -> TokenKind {
        self.lookahead.kind
    }

    /// Moves the lookahead to the next token.
    pub fn consume(&mut self) -> Result<()> {
        self.lookahead = self.lexer.next_token()?;
        Ok(())
    }

    /// Consumes the lookahead if it is of kind `kind`, returning it.
    pub fn match_token(&mut self, kind: TokenKind) -> Result<Token> {
        if self.peek() != kind {
            return Err(Error::type_mismatch(kind, self.peek()));
        }
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    /// Wraps `parse` in a `left OP right` loop for every operator in `ops`.
    fn left_assoc(
        &mut self,
        ops: &[TokenKind],
        mut operand: impl FnMut(&mut Self) -> Result<Ast>,
    ) -> Result<Ast> {
        let mut node = operand(self)?;
        while ops.contains(&self.peek()) {
            let op = self.match_token(self.peek())?;
            let rhs = operand(self)?;
            let mut parent = Ast::new(op);
            parent.add_child(node);
            parent.add_child(rhs);
            node = parent;
        }
        Ok(node)
    }

    /// `number := [MINUS] NUMBER`
    pub fn number(&mut self) -> Result<Ast> {
        if self.peek() == TokenKind::Minus {
            let minus = self.match_token(TokenKind::Minus)?;
            let number = self.match_token(TokenKind::Number)?;
            let mut node = Ast::new(minus);
            node.add_child(Ast::new(number));
            return Ok(node);
        }
        Ok(Ast::new(self.match_token(TokenKind::Number)?))
    }

    /// `string := STRING`
    pub fn string(&mut self) -> Result<Ast> {
        Ok(Ast::new(self.match_token(TokenKind::String)?))
    }

    /// `attribute := ID [ '.' ID ]`
    pub fn attribute(&mut self) -> Result<Ast> {
        let first = Ast::new(self.match_token(TokenKind::Id)?);
        if self.peek() != TokenKind::Dot {
            return Ok(first);
        }
        self.match_token(TokenKind::Dot)?;
        let second = Ast::new(self.match_token(TokenKind::Id)?);
        Ok(Ast::with_children(TokenKind::Attr, vec![first, second]))
    }

    /// `attributes := attribute ( ',' attribute )*`
    pub fn attributes(&mut self) -> Result<Ast> {
        let mut list = Ast::new(Token::bare(TokenKind::List));
        list.add_child(self.attribute()?);
        while self.peek() == TokenKind::Comma {
            self.match_token(TokenKind::Comma)?;
            list.add_child(self.attribute()?);
        }
        Ok(list)
    }

    /// `comparable := attribute | number | string`
    pub fn comparable(&mut self) -> Result<Ast> {
        match self.peek() {
            TokenKind::Id => self.attribute(),
            TokenKind::Number | TokenKind::Minus => self.number(),
            TokenKind::String => self.string(),
            _ => Err(Error::expected("comparable value", &self.lookahead)),
        }
    }

    /// One of `< <= > >= = !=` (or their glyphs).
    pub fn compare_op(&mut self) -> Result<Ast> {
        if !self.peek().is_comparison() {
            return Err(Error::expected("comparison operator", &self.lookahead));
        }
        Ok(Ast::new(self.match_token(self.peek())?))
    }

    /// `comparison := comparable compareOp comparable`
    pub fn comparison(&mut self) -> Result<Ast> {
        let lhs = self.comparable()?;
        let mut op = self.compare_op()?;
        let rhs = self.comparable()?;
        op.add_child(lhs);
        op.add_child(rhs);
        Ok(op)
    }

    /// `operand := NOT '(' disjunction ')' | '(' disjunction ')' | comparison`
    pub fn operand(&mut self) -> Result<Ast> {
        match self.peek() {
            TokenKind::Not => {
                let mut node = Ast::new(self.match_token(TokenKind::Not)?);
                self.match_token(TokenKind::LParen)?;
                node.add_child(self.disjunction()?);
                self.match_token(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::LParen => {
                self.match_token(TokenKind::LParen)?;
                let node = self.disjunction()?;
                self.match_token(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::Id | TokenKind::Number | TokenKind::Minus | TokenKind::String => {
                self.comparison()
            }
            _ => Err(Error::expected("start of operand", &self.lookahead)),
        }
    }

    /// `conjunction := operand ( AND operand )*`
    pub fn conjunction(&mut self) -> Result<Ast> {
        self.left_assoc(&[TokenKind::And], Self::operand)
    }

    /// `disjunction := conjunction ( OR conjunction )*`
    pub fn disjunction(&mut self) -> Result<Ast> {
        self.left_assoc(&[TokenKind::Or], Self::conjunction)
    }

    /// The prefix operators, a parenthesized expression, or a relation name.
    pub fn relation(&mut self) -> Result<Ast> {
        match self.peek() {
            TokenKind::Project => {
                self.match_token(TokenKind::Project)?;
                let attributes = self.attributes()?;
                let operand = self.parenthesized()?;
                Ok(Ast::with_children(
                    TokenKind::Project,
                    vec![attributes, operand],
                ))
            }
            TokenKind::Select => {
                self.match_token(TokenKind::Select)?;
                let predicate = self.disjunction()?;
                let operand = self.parenthesized()?;
                Ok(Ast::with_children(TokenKind::Select, vec![predicate, operand]))
            }
            TokenKind::Rename => {
                self.match_token(TokenKind::Rename)?;
                let mut node = Ast::new(Token::bare(TokenKind::Rename));
                node.add_child(self.attribute()?);
                if self.peek() == TokenKind::LBrack {
                    self.match_token(TokenKind::LBrack)?;
                    node.add_child(self.attributes()?);
                    self.match_token(TokenKind::RBrack)?;
                }
                node.add_child(self.parenthesized()?);
                Ok(node)
            }
            TokenKind::LParen => self.parenthesized(),
            TokenKind::Id => {
                let id = self.match_token(TokenKind::Id)?;
                let name = id.literal.unwrap_or_default();
                Ok(Ast::leaf(TokenKind::Relation, name))
            }
            _ => Err(Error::expected("start of relation", &self.lookahead)),
        }
    }

    /// `'(' unionIntersection ')'`
    fn parenthesized(&mut self) -> Result<Ast> {
        self.match_token(TokenKind::LParen)?;
        let node = self.union_intersection()?;
        self.match_token(TokenKind::RParen)?;
        Ok(node)
    }

    /// `cartesianProduct := relation ( CPROD relation )*`
    pub fn cartesian_product(&mut self) -> Result<Ast> {
        self.left_assoc(&[TokenKind::CProd], Self::relation)
    }

    /// `join := cartesianProduct ( NJOIN cartesianProduct )*`
    pub fn join(&mut self) -> Result<Ast> {
        self.left_assoc(&[TokenKind::NJoin], Self::cartesian_product)
    }

    /// `difference := join ( DIFF join )*`
    pub fn difference(&mut self) -> Result<Ast> {
        self.left_assoc(&[TokenKind::Diff], Self::join)
    }

    /// `unionIntersection := difference ( (UNION | ISECT) difference )*`
    pub fn union_intersection(&mut self) -> Result<Ast> {
        self.left_assoc(&[TokenKind::Union, TokenKind::ISect], Self::difference)
    }
}

/// Lexes and parses `input` as one complete expression.
pub fn parse(input: &str) -> Result<Ast> {
    Parser::new(Lexer::new(input))?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(input: &str) -> Parser {
        Parser::new(Lexer::new(input)).unwrap()
    }

    fn tree(ast: Result<Ast>) -> String {
        ast.unwrap().to_tree_string()
    }

    fn rel(name: &str) -> Ast {
        Ast::leaf(TokenKind::Relation, name)
    }

    fn id(name: &str) -> Ast {
        Ast::leaf(TokenKind::Id, name)
    }

    fn binary(kind: TokenKind, lhs: Ast, rhs: Ast) -> Ast {
        Ast::with_children(kind, vec![lhs, rhs])
    }

    #[test]
    fn test_consume_walks_the_tokens() {
        let mut p = parser("σt1.number = 13(t1)");
        assert_eq!(p.lookahead().to_string(), "<SELECT, null>");
        p.consume().unwrap();
        assert_eq!(p.lookahead().to_string(), "<ID, t1>");
        p.consume().unwrap();
        assert_eq!(p.lookahead().to_string(), "<DOT, null>");
    }

    #[test]
    fn test_match_mismatch_does_not_consume() {
        let mut p = parser("σt1.number = 13(t1)");
        let err = p.match_token(TokenKind::Project).unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch; Expecting PROJECT but found SELECT");
        assert_eq!(p.lookahead().kind, TokenKind::Select);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tree(parser("452").number()), "<452>");
        assert_eq!(tree(parser("-13").number()), "(<MINUS> <13>)");
    }

    #[test]
    fn test_attributes() {
        assert_eq!(tree(parser("table1").attribute()), "<table1>");
        assert_eq!(
            tree(parser("table1.attribute1").attribute()),
            "(<ATTR> <table1> <attribute1>)"
        );
        assert_eq!(
            tree(parser("a1, t1.a2, t3.a4").attributes()),
            "(<LIST> <a1> (<ATTR> <t1> <a2>) (<ATTR> <t3> <a4>))"
        );
    }

    #[test]
    fn test_comparables() {
        assert_eq!(tree(parser("foo1.bar2").comparable()), "(<ATTR> <foo1> <bar2>)");
        assert_eq!(tree(parser("24612").comparable()), "<24612>");
        assert_eq!(tree(parser(r##""#@!@str1ng_!#""##).comparable()), "<#@!@str1ng_!#>");

        let err = parser("(val)").comparable().unwrap_err();
        assert_eq!(err.to_string(), "Expected comparable value, but found <(, null>");
    }

    #[test]
    fn test_compare_ops() {
        let mut p = parser("<=≤ != ≠ >");
        for expected in ["LEQ", "LEQ", "NEQ", "NEQ", "GRTR"] {
            let node = p.compare_op().unwrap();
            assert_eq!(node.kind().unwrap().name(), expected);
        }
        let err = parser("∧").compare_op().unwrap_err();
        assert_eq!(err.to_string(), "Expected comparison operator, but found <AND, null>");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            tree(parser(r#"t1.attr1 = "foo bar baz""#).comparison()),
            "(<EQL> (<ATTR> <t1> <attr1>) <foo bar baz>)"
        );
        assert_eq!(tree(parser("foo != 223").comparison()), "(<NEQ> <foo> <223>)");
        assert_eq!(tree(parser("-5 < foo").comparison()), "(<LESS> (<MINUS> <5>) <foo>)");
    }

    #[test]
    fn test_operands() {
        assert_eq!(
            tree(parser("(t2.bar >= t3.baz)").operand()),
            "(<GEQ> (<ATTR> <t2> <bar>) (<ATTR> <t3> <baz>))"
        );
        assert_eq!(
            tree(parser("!(t2.bar >= t3.baz)").operand()),
            "(<NOT> (<GEQ> (<ATTR> <t2> <bar>) (<ATTR> <t3> <baz>)))"
        );
        let err = parser("∨").operand().unwrap_err();
        assert_eq!(err.to_string(), "Expected start of operand, but found <OR, null>");
    }

    #[test]
    fn test_conjunction_binds_tighter_than_disjunction() {
        assert_eq!(
            tree(parser("a = 1 ∧ b = 2 ∧ c = 3").disjunction()),
            "(<AND> (<AND> (<EQL> <a> <1>) (<EQL> <b> <2>)) (<EQL> <c> <3>))"
        );
        assert_eq!(
            tree(parser("a = 1 ∧ b = 2 ∨ c = 3 ∧ d = 4").disjunction()),
            "(<OR> (<AND> (<EQL> <a> <1>) (<EQL> <b> <2>)) (<AND> (<EQL> <c> <3>) (<EQL> <d> <4>)))"
        );
        assert_eq!(
            tree(parser("a = 1 ∧ (b = 2 ∨ c = 3)").disjunction()),
            "(<AND> (<EQL> <a> <1>) (<OR> (<EQL> <b> <2>) (<EQL> <c> <3>)))"
        );
    }

    #[test]
    fn test_relation_leaves_are_tagged() {
        let ast = parser("table1").relation().unwrap();
        assert_eq!(ast, rel("table1"));
        let ast = parser("(table2)").relation().unwrap();
        assert_eq!(ast, rel("table2"));
    }

    #[test]
    fn test_prefix_relations() {
        let ast = parser("Π a1, t1.a2, a3 (t1)").relation().unwrap();
        let list = Ast::with_children(
            TokenKind::List,
            vec![
                id("a1"),
                Ast::with_children(TokenKind::Attr, vec![id("t1"), id("a2")]),
                id("a3"),
            ],
        );
        assert_eq!(ast, Ast::with_children(TokenKind::Project, vec![list, rel("t1")]));

        assert_eq!(
            tree(parser("σ a > 24 (t1)").relation()),
            "(<SELECT> (<GRTR> <a> <24>) <t1>)"
        );
        assert_eq!(tree(parser("ρ foo (t1)").relation()), "(<RENAME> <foo> <t1>)");
        assert_eq!(
            tree(parser("ρ bar [b1, b2, b3] (t1)").relation()),
            "(<RENAME> <bar> (<LIST> <b1> <b2> <b3>) <t1>)"
        );
    }

    #[test]
    fn test_rename_with_empty_list_fails() {
        let err = parser("ρ bar [] (t1)").relation().unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch; Expecting ID but found ]");
    }

    #[test]
    fn test_invalid_relation_start() {
        let err = parser("∪").relation().unwrap_err();
        assert_eq!(err.to_string(), "Expected start of relation, but found <UNION, null>");
    }

    #[test]
    fn test_binary_operators_are_left_associative() {
        assert_eq!(
            tree(parser("r1 × r2 × r3").cartesian_product()),
            "(<CPROD> (<CPROD> <r1> <r2>) <r3>)"
        );
        assert_eq!(
            tree(parser("r1 × (r2 × r3)").cartesian_product()),
            "(<CPROD> <r1> (<CPROD> <r2> <r3>))"
        );
        assert_eq!(tree(parser("r1 ⨝ r2 ⨝ r3").join()), "(<NJOIN> (<NJOIN> <r1> <r2>) <r3>)");
        assert_eq!(tree(parser("r1 − r2 − r3").difference()), "(<DIFF> (<DIFF> <r1> <r2>) <r3>)");
        assert_eq!(
            tree(parser("r1 ∩ r2 ∩ r3").union_intersection()),
            "(<ISECT> (<ISECT> <r1> <r2>) <r3>)"
        );
    }

    #[test]
    fn test_union_and_intersection_share_precedence() {
        let ast = parser("r1 ∪ r2 ∩ r3").union_intersection().unwrap();
        let expected = binary(
            TokenKind::ISect,
            binary(TokenKind::Union, rel("r1"), rel("r2")),
            rel("r3"),
        );
        assert_eq!(ast, expected);

        assert_eq!(
            tree(parser("r1 ∩ r2 ∪ r3").union_intersection()),
            "(<UNION> (<ISECT> <r1> <r2>) <r3>)"
        );
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(
            tree(parser("r1 ∪ r2 ∩ r3 − r4 ⨝ r5 × r6").union_intersection()),
            "(<ISECT> (<UNION> <r1> <r2>) (<DIFF> <r3> (<NJOIN> <r4> (<CPROD> <r5> <r6>))))"
        );
        assert_eq!(
            tree(parser("r1 × r2 ⨝ r3 − r4 ∪ r5 ∩ r6").union_intersection()),
            "(<ISECT> (<UNION> (<DIFF> (<NJOIN> (<CPROD> <r1> <r2>) <r3>) <r4>) <r5>) <r6>)"
        );
        assert_eq!(
            tree(parser("(((((r1 ∪ r2) ∩ r3) − r4) ⨝ r5) × r6)").union_intersection()),
            "(<CPROD> (<NJOIN> (<DIFF> (<ISECT> (<UNION> <r1> <r2>) <r3>) <r4>) <r5>) <r6>)"
        );
    }

    #[test]
    fn test_parse_rejects_trailing_input() {
        let err = parse("r1 r2").unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch; Expecting EOF but found ID");
        let err = parse("(r1").unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch; Expecting ) but found EOF");
    }

    #[test]
    fn test_parse_surfaces_lex_errors() {
        let err = parse("r1 ∪ 0").unwrap_err();
        assert_eq!(err, Error::Lex("Invalid character: 0 at position 5".into()));
    }
}

//! The tree of intermediate relations behind an evaluated expression.

use std::fmt::Write;

use crate::ast::{Ast, Visitor};
use crate::error::{Error, Result};
use crate::eval::SideTable;
use crate::relation::Relation;
use crate::token::TokenKind;

/// One operator (or base relation) and the relation it produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationTree {
    pub name: String,
    pub relation: Relation,
    pub children: Vec<RelationTree>,
}

impl RelationTree {
    /// One `name [n tuples]` line per node, children indented under their parent.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let count = self.relation.len();
        let _ = writeln!(
            out,
            "{:indent$}{} [{} tuple{}]",
            "",
            self.name,
            count,
            if count == 1 { "" } else { "s" },
            indent = depth * 2
        );
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Rebuilds the operator tree of an already evaluated expression from the
/// relations recorded while evaluating it. Predicates, attribute lists and
/// rename targets are skipped.
pub struct RelationTreeVisitor<'t> {
    side_table: &'t SideTable,
}

impl<'t> RelationTreeVisitor<'t> {
    pub fn new(side_table: &'t SideTable) -> Self {
        Self { side_table }
    }

    pub fn build(&mut self, ast: &Ast) -> Result<RelationTree> {
        ast.visit(self)
    }

    fn node(&mut self, node: &Ast, name: &str, operands: &[&Ast]) -> Result<RelationTree> {
        let relation = self.side_table.get(node).cloned().ok_or_else(|| {
            Error::MalformedTree(format!("{} has not been evaluated", node.to_node_string()))
        })?;
        let children = operands
            .iter()
            .map(|child| child.visit(self))
            .collect::<Result<Vec<_>>>()?;
        Ok(RelationTree {
            name: name.to_owned(),
            relation,
            children,
        })
    }
}

impl Visitor for RelationTreeVisitor<'_> {
    type Output = RelationTree;

    fn visit_relation(&mut self, node: &Ast) -> Result<RelationTree> {
        let name = node.literal().unwrap_or_default().to_owned();
        self.node(node, &name, &[])
    }

    fn visit_project(&mut self, node: &Ast) -> Result<RelationTree> {
        self.node(node, "π", &[node.child(1)?])
    }

    fn visit_select(&mut self, node: &Ast) -> Result<RelationTree> {
        self.node(node, "σ", &[node.child(1)?])
    }

    fn visit_rename(&mut self, node: &Ast) -> Result<RelationTree> {
        let operand = match node.children().last() {
            Some(operand) if node.children().len() > 1 => operand,
            _ => return Err(Error::MalformedTree("rename without an operand".into())),
        };
        self.node(node, "ρ", &[operand])
    }

    fn visit_set_operation(&mut self, node: &Ast) -> Result<RelationTree> {
        let glyph = match node.kind() {
            Some(TokenKind::Union) => "∪",
            Some(TokenKind::ISect) => "∩",
            Some(TokenKind::Diff) => "−",
            Some(TokenKind::CProd) => "×",
            Some(TokenKind::NJoin) => "⨝",
            _ => return self.unhandled(node),
        };
        self.node(node, glyph, &[node.child(0)?, node.child(1)?])
    }
}

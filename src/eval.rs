//! Evaluation of an expression tree against a [DataSet].

use std::collections::HashMap;

use num_bigint::BigInt;

use crate::ast::{Ast, Visitor};
use crate::data_set::DataSet;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::parser::parse;
use crate::predicate::{CompareOp, Operand, Predicate, UnresolvedPredicate};
use crate::relation::{AttributeRef, Relation};
use crate::token::TokenKind;
use crate::tree::{RelationTree, RelationTreeVisitor};
use crate::value::Value;

/// What a node evaluates to. Only operator and relation nodes produce
/// relations; the rest are building blocks for their parents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evaluated {
    Relation(Relation),
    Value(Value),
    Name(String),
    Attribute(AttributeRef),
    Predicate(UnresolvedPredicate),
    List(Vec<AttributeRef>),
}

impl Evaluated {
    pub fn into_relation(self) -> Result<Relation> {
        match self {
            Evaluated::Relation(relation) => Ok(relation),
            other => Err(unexpected("a relation", &other)),
        }
    }

    fn into_predicate(self) -> Result<UnresolvedPredicate> {
        match self {
            Evaluated::Predicate(predicate) => Ok(predicate),
            _ => Err(Error::IllFormedPredicate),
        }
    }

    fn into_name(self) -> Result<String> {
        match self {
            Evaluated::Name(name) => Ok(name),
            other => Err(unexpected("an identifier", &other)),
        }
    }

    fn into_operand(self) -> Result<Operand<AttributeRef>> {
        match self {
            Evaluated::Attribute(attr) => Ok(Operand::Attribute(attr)),
            Evaluated::Value(value) => Ok(Operand::Literal(value)),
            _ => Err(Error::IllFormedPredicate),
        }
    }

    fn into_list(self) -> Result<Vec<AttributeRef>> {
        match self {
            Evaluated::List(list) => Ok(list),
            other => Err(unexpected("an attribute list", &other)),
        }
    }
}

fn unexpected(wanted: &str, found: &Evaluated) -> Error {
    let found = match found {
        Evaluated::Relation(_) => "a relation",
        Evaluated::Value(_) => "a value",
        Evaluated::Name(_) => "an identifier",
        Evaluated::Attribute(_) => "an attribute",
        Evaluated::Predicate(_) => "a predicate",
        Evaluated::List(_) => "an attribute list",
    };
    Error::MalformedTree(format!("expected {} but found {}", wanted, found))
}

/// Node identity within one tree: the node's address. Only meaningful while
/// that tree is alive and unmodified.
pub(crate) type NodeId = usize;

pub(crate) fn node_id(node: &Ast) -> NodeId {
    node as *const Ast as usize
}

/// Relations produced at each operator and relation node of a tree.
#[derive(Debug, Default)]
pub struct SideTable {
    relations: HashMap<NodeId, Relation>,
}

impl SideTable {
    pub fn get(&self, node: &Ast) -> Option<&Relation> {
        self.relations.get(&node_id(node))
    }

    fn insert(&mut self, node: &Ast, relation: Relation) {
        self.relations.insert(node_id(node), relation);
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

pub struct EvalVisitor<'a> {
    engine: Engine<'a>,
    side_table: SideTable,
}

impl<'a> EvalVisitor<'a> {
    pub fn new(data_set: &'a DataSet) -> Self {
        Self {
            engine: Engine::new(data_set),
            side_table: SideTable::default(),
        }
    }

    /// Evaluates a whole expression, which must produce a relation.
    pub fn evaluate(&mut self, ast: &Ast) -> Result<Relation> {
        ast.visit(self)?.into_relation()
    }

    pub fn side_table(&self) -> &SideTable {
        &self.side_table
    }

    pub fn into_side_table(self) -> SideTable {
        self.side_table
    }

    /// A bare identifier in attribute position is an unqualified attribute.
    fn primitive(&mut self, node: &Ast) -> Result<Evaluated> {
        if node.kind() == Some(TokenKind::Id) {
            let name = self.visit_id(node)?.into_name()?;
            return Ok(Evaluated::Attribute(AttributeRef::bare(&name)));
        }
        node.visit(self)
    }

    fn relation(&mut self, node: &Ast) -> Result<Relation> {
        node.visit(self)?.into_relation()
    }

    fn record(&mut self, node: &Ast, relation: Relation) -> Result<Evaluated> {
        self.side_table.insert(node, relation.clone());
        Ok(Evaluated::Relation(relation))
    }
}

fn literal(node: &Ast) -> Result<&str> {
    node.literal()
        .ok_or_else(|| Error::MalformedTree(format!("{} has no value", node.to_node_string())))
}

impl Visitor for EvalVisitor<'_> {
    type Output = Evaluated;

    fn visit_number(&mut self, node: &Ast) -> Result<Evaluated> {
        let digits = literal(node)?;
        let number: BigInt = digits
            .parse()
            .map_err(|_| Error::MalformedTree(format!("{} is not a number", digits)))?;
        Ok(Evaluated::Value(Value::Number(number)))
    }

    fn visit_string(&mut self, node: &Ast) -> Result<Evaluated> {
        Ok(Evaluated::Value(Value::from(literal(node)?)))
    }

    fn visit_id(&mut self, node: &Ast) -> Result<Evaluated> {
        Ok(Evaluated::Name(literal(node)?.to_owned()))
    }

    fn visit_minus(&mut self, node: &Ast) -> Result<Evaluated> {
        match node.child(0)?.visit(self)? {
            Evaluated::Value(Value::Number(n)) => Ok(Evaluated::Value(Value::Number(-n))),
            other => Err(unexpected("a number", &other)),
        }
    }

    fn visit_attr(&mut self, node: &Ast) -> Result<Evaluated> {
        let qualifier = node.child(0)?.visit(self)?.into_name()?;
        let attribute = node.child(1)?.visit(self)?.into_name()?;
        Ok(Evaluated::Attribute(AttributeRef::qualified(&qualifier, &attribute)))
    }

    fn visit_list(&mut self, node: &Ast) -> Result<Evaluated> {
        let mut list = Vec::with_capacity(node.children().len());
        for child in node.children() {
            match self.primitive(child)? {
                Evaluated::Attribute(attr) => list.push(attr),
                other => return Err(unexpected("an attribute", &other)),
            }
        }
        Ok(Evaluated::List(list))
    }

    fn visit_comparison(&mut self, node: &Ast) -> Result<Evaluated> {
        let op = CompareOp::from_kind(node.kind().unwrap_or(TokenKind::Eof))?;
        let lhs = self.primitive(node.child(0)?)?.into_operand()?;
        let rhs = self.primitive(node.child(1)?)?.into_operand()?;
        Ok(Evaluated::Predicate(Predicate::Compare { op, lhs, rhs }))
    }

    fn visit_logical(&mut self, node: &Ast) -> Result<Evaluated> {
        let lhs = Box::new(node.child(0)?.visit(self)?.into_predicate()?);
        let rhs = Box::new(node.child(1)?.visit(self)?.into_predicate()?);
        let predicate = match node.kind() {
            Some(TokenKind::And) => Predicate::And(lhs, rhs),
            Some(TokenKind::Or) => Predicate::Or(lhs, rhs),
            _ => return Err(Error::IllFormedPredicate),
        };
        Ok(Evaluated::Predicate(predicate))
    }

    fn visit_not(&mut self, node: &Ast) -> Result<Evaluated> {
        let operand = node.child(0)?.visit(self)?.into_predicate()?;
        Ok(Evaluated::Predicate(Predicate::Not(Box::new(operand))))
    }

    fn visit_relation(&mut self, node: &Ast) -> Result<Evaluated> {
        let relation = self.engine.lookup(literal(node)?)?;
        self.record(node, relation)
    }

    fn visit_project(&mut self, node: &Ast) -> Result<Evaluated> {
        let attributes = node.child(0)?.visit(self)?.into_list()?;
        let operand = self.relation(node.child(1)?)?;
        let relation = self.engine.project(&operand, &attributes)?;
        self.record(node, relation)
    }

    fn visit_select(&mut self, node: &Ast) -> Result<Evaluated> {
        let predicate = node.child(0)?.visit(self)?.into_predicate()?;
        let operand = self.relation(node.child(1)?)?;
        let relation = self.engine.select(&operand, &predicate)?;
        self.record(node, relation)
    }

    fn visit_rename(&mut self, node: &Ast) -> Result<Evaluated> {
        let target = node.child(0)?;
        if target.kind() != Some(TokenKind::Id) {
            return Err(Error::MalformedTree(
                "a rename target must be a plain name".into(),
            ));
        }
        let name = target.visit(self)?.into_name()?;

        let (attributes, operand) = match node.children() {
            [_, list, operand] if list.kind() == Some(TokenKind::List) => {
                (list.visit(self)?.into_list()?, operand)
            }
            [_, operand] => (Vec::new(), operand),
            _ => {
                return Err(Error::MalformedTree(format!(
                    "rename with {} children",
                    node.children().len()
                )))
            }
        };

        let operand = self.relation(operand)?;
        let relation = self.engine.rename(&operand, &name, &attributes)?;
        self.record(node, relation)
    }

    fn visit_set_operation(&mut self, node: &Ast) -> Result<Evaluated> {
        let x = self.relation(node.child(0)?)?;
        let y = self.relation(node.child(1)?)?;
        let relation = match node.kind() {
            Some(TokenKind::Union) => self.engine.union(&x, &y)?,
            Some(TokenKind::ISect) => self.engine.intersection(&x, &y)?,
            Some(TokenKind::Diff) => self.engine.difference(&x, &y)?,
            Some(TokenKind::CProd) => self.engine.cartesian_product(&x, &y)?,
            Some(TokenKind::NJoin) => self.engine.natural_join(&x, &y)?,
            _ => return self.unhandled(node),
        };
        self.record(node, relation)
    }
}

/// Parses and evaluates `text` against `data_set`.
pub fn evaluate(text: &str, data_set: &DataSet) -> Result<Relation> {
    let ast = parse(text)?;
    EvalVisitor::new(data_set).evaluate(&ast)
}

/// A parsed expression, ready to be run against any number of data sets.
#[derive(Clone, Debug)]
pub struct Query {
    text: String,
    ast: Ast,
}

impl Query {
    pub fn new(text: &str) -> Result<Self> {
        Ok(Self {
            text: text.to_owned(),
            ast: parse(text)?,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn run(&self, data_set: &DataSet) -> Result<Evaluation<'_>> {
        let mut visitor = EvalVisitor::new(data_set);
        let relation = visitor.evaluate(&self.ast)?;
        Ok(Evaluation {
            ast: &self.ast,
            relation,
            side_table: visitor.into_side_table(),
        })
    }
}

/// The result of running a [Query], along with the relation produced at
/// every intermediate step.
#[derive(Debug)]
pub struct Evaluation<'q> {
    ast: &'q Ast,
    relation: Relation,
    side_table: SideTable,
}

impl<'q> Evaluation<'q> {
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn into_relation(self) -> Relation {
        self.relation
    }

    pub fn side_table(&self) -> &SideTable {
        &self.side_table
    }

    pub fn tree(&self) -> Result<RelationTree> {
        RelationTreeVisitor::new(&self.side_table).build(self.ast)
    }
}

//! Named relations a query is evaluated against.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{types::ValueRef, Connection};
use tracing::debug;

use crate::error::{Error, Result};
use crate::relation::{Attribute, Relation, Tuple};
use crate::value::{DataType, Value};

/// Relation name to relation. Read-only while a query runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataSet {
    relations: BTreeMap<String, Relation>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, relation: Relation) {
        self.relations.insert(name.into(), relation);
    }

    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Relation names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.relations.iter().map(|(name, rel)| (name.as_str(), rel))
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Countries, lakes, population and area: a small world-facts data set to
    /// play with when no database is given.
    pub fn sample() -> Result<Self> {
        use DataType::{Number, String};

        let mut data_set = DataSet::new();
        data_set.insert(
            "countries",
            Relation::from_rows(
                "countries",
                &[("name", String), ("code", String), ("founded", Number)],
                vec![
                    row("United States", "US", 1776),
                    row("Argentina", "AR", 1816),
                    row("Yemen", "YE", 1990),
                    row("Ghana", "GH", 1957),
                    row("Mongolia", "MO", 1207),
                    row("New Zealand", "NZ", 1840),
                ],
            )?,
        );
        data_set.insert(
            "lakes",
            Relation::from_rows(
                "lakes",
                &[("name", String), ("country", String), ("surface_area", Number)],
                vec![
                    row("Taupo", "NZ", 616),
                    row("Khyargas", "MO", 1407),
                    row("Umiam", "IN", 220),
                    row("Volta", "GH", 8502),
                    row("Erie", "US", 9910),
                    row("Bosumtwi", "GH", 49),
                    row("Jordan", "US", 129),
                    row("Superior", "US", 31700),
                    row("Sangiin Dalai", "MO", 165),
                    row("Nahuel Huapi", "AR", 530),
                    row("Uvs", "MO", 3350),
                    row("Wanaka", "NZ", 192),
                ],
            )?,
        );
        data_set.insert(
            "population",
            Relation::from_rows(
                "population",
                &[("country", String), ("number", Number)],
                vec![
                    pair("IN", 1252000000),
                    pair("NZ", 4471000),
                    pair("AR", 40412000),
                    pair("MO", 2839000),
                    pair("YE", 24410000),
                    pair("US", 318900000),
                    pair("GH", 25900000),
                    pair("IE", 4595000),
                ],
            )?,
        );
        data_set.insert(
            "area",
            Relation::from_rows(
                "area",
                &[("country", String), ("number", Number)],
                vec![
                    pair("NZ", 103483),
                    pair("GH", 92099),
                    pair("US", 3806000),
                    pair("MO", 604600),
                    pair("IN", 1269000),
                    pair("YE", 203891),
                    pair("ES", 194845),
                    pair("AR", 1074000),
                    pair("ZW", 150872),
                ],
            )?,
        );
        Ok(data_set)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_sqlite(&conn)
    }

    /// Loads every user table as a relation qualified by the table name.
    pub fn from_sqlite(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut data_set = DataSet::new();
        for table in tables {
            let relation = load_table(conn, &table)?;
            debug!(table = %table, tuples = relation.len(), "loaded relation");
            data_set.insert(table, relation);
        }
        Ok(data_set)
    }
}

fn row(name: &str, code: &str, number: i64) -> Vec<Value> {
    vec![name.into(), code.into(), number.into()]
}

fn pair(country: &str, number: i64) -> Vec<Value> {
    vec![country.into(), number.into()]
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn load_table(conn: &Connection, table: &str) -> Result<Relation> {
    // (name, declared type) per column
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_identifier(table)))?;
    let mut rows = stmt.query([])?;
    let mut values: Vec<Vec<Value>> = Vec::new();
    while let Some(row) = rows.next()? {
        let mut converted = Vec::with_capacity(columns.len());
        for (i, (column, _)) in columns.iter().enumerate() {
            let value = match row.get_ref(i)? {
                ValueRef::Integer(n) => Value::from(n),
                ValueRef::Text(s) => Value::from(
                    std::str::from_utf8(s)
                        .map_err(|e| Error::DataSet(format!("{}.{}: {}", table, column, e)))?,
                ),
                other => {
                    return Err(Error::DataSet(format!(
                        "{}.{} holds an unsupported {:?} value",
                        table,
                        column,
                        other.data_type()
                    )))
                }
            };
            converted.push(value);
        }
        values.push(converted);
    }

    let attributes: Vec<Attribute> = columns
        .iter()
        .enumerate()
        .map(|(i, (column, declared))| {
            let data_type = match values.first() {
                Some(first) => first[i].data_type(),
                None if declared.to_ascii_uppercase().starts_with("INT") => DataType::Number,
                None => DataType::String,
            };
            Attribute::new(table, column, data_type)
        })
        .collect();

    let tuples = values
        .into_iter()
        .map(|row| {
            attributes
                .iter()
                .map(Attribute::qualified_name)
                .zip(row)
                .collect::<Tuple>()
        })
        .collect();

    Relation::new(attributes, tuples)
}

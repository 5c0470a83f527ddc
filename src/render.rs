//! Text rendering of relations for the shell.

use comfy_table::{Cell, ContentArrangement, Table};

use crate::relation::Relation;

/// Formats `relation` as a table headed by its qualified attribute names,
/// one row per tuple.
pub fn table(relation: &Relation) -> String {
    let mut table = Table::new();

    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    table.set_header(relation.qualified_attributes().into_iter().map(Cell::new));

    for row in relation.rows() {
        table.add_row(row.into_iter().map(|value| Cell::new(value.to_string())));
    }

    table.to_string()
}

/// `(n row)` / `(n rows)`.
pub fn row_count(relation: &Relation) -> String {
    match relation.len() {
        1 => "(1 row)".to_string(),
        n => format!("({} rows)", n),
    }
}

/// `name(attribute: type, ...)`
pub fn schema(name: &str, relation: &Relation) -> String {
    let attributes = relation
        .attributes()
        .iter()
        .map(|attr| format!("{}: {}", attr.attribute, attr.data_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({})", name, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::tests::{favorites, movies};

    #[test]
    fn test_table_has_header_and_rows() {
        let rendered = table(&movies());
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[1].contains("movies.id"));
        assert!(lines[1].contains("movies.title"));
        assert!(lines[1].contains("movies.year"));
        assert!(rendered.contains("Ratatoullie"));
        assert!(rendered.contains("1998"));
        assert!(lines[0].starts_with('╭'));
    }

    #[test]
    fn test_row_count() {
        assert_eq!(row_count(&movies()), "(5 rows)");
        let drive = movies().intersection(
            &crate::relation::Relation::from_rows(
                "drive",
                &[
                    ("id", crate::value::DataType::Number),
                    ("title", crate::value::DataType::String),
                    ("year", crate::value::DataType::Number),
                ],
                vec![vec![1.into(), "Drive".into(), 2007.into()]],
            )
            .unwrap(),
        );
        assert_eq!(row_count(&drive), "(1 row)");
        let empty = favorites().difference(&favorites());
        assert_eq!(row_count(&empty), "(0 rows)");
    }

    #[test]
    fn test_schema() {
        assert_eq!(
            schema("movies", &movies()),
            "movies(id: number, title: string, year: number)"
        );
    }
}

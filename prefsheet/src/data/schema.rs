//! Validated, indexed schema for one nesting level.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    data::{group::PropertyGroup, row::PropertyRow},
    error::SchemaError,
};

/// Location of a row: group index, then row index within the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RowPosition {
    /// Index into the schema's groups.
    pub group: usize,
    /// Index into that group's rows.
    pub row: usize,
}

impl RowPosition {
    pub fn new(group: usize, row: usize) -> Self {
        Self { group, row }
    }

    fn path(self) -> String {
        format!("groups[{}].rows[{}]", self.group, self.row)
    }
}

#[derive(Debug, Clone, Default)]
struct Index {
    /// Rows holding a value; identifiers are unique.
    values: HashMap<String, RowPosition>,
    /// Action and nesting rows; first declaration wins.
    structural: HashMap<String, RowPosition>,
}

impl Index {
    fn insert(
        &mut self,
        level: usize,
        pos: RowPosition,
        row: &PropertyRow,
    ) -> Result<(), SchemaError> {
        if row.identifier.is_empty() {
            return Ok(());
        }
        if !row.is_persisted() {
            self.structural.entry(row.identifier.clone()).or_insert(pos);
            return Ok(());
        }
        if let Some(first) = self.values.get(&row.identifier) {
            return Err(SchemaError::DuplicateIdentifier {
                identifier: row.identifier.clone(),
                level,
                first: first.path(),
                second: pos.path(),
            });
        }
        self.values.insert(row.identifier.clone(), pos);
        Ok(())
    }

    fn index_group(
        &mut self,
        level: usize,
        group_index: usize,
        group: &PropertyGroup,
    ) -> Result<(), SchemaError> {
        for (r, row) in group.rows.iter().enumerate() {
            let pos = RowPosition::new(group_index, r);
            if row.row_type().has_choices() && row.kind.choices().is_empty() {
                return Err(SchemaError::EmptyChoiceSet { path: pos.path() });
            }
            validate_children(row, level)?;
            self.insert(level, pos, row)?;
        }
        Ok(())
    }

    fn without_group(&self, group_index: usize) -> Self {
        let keep = |map: &HashMap<String, RowPosition>| {
            map.iter()
                .filter(|(_, pos)| pos.group != group_index)
                .map(|(k, pos)| (k.clone(), *pos))
                .collect()
        };
        Self {
            values: keep(&self.values),
            structural: keep(&self.structural),
        }
    }
}

/// Eagerly declared child schemas are validated in their own namespace.
fn validate_children(row: &PropertyRow, level: usize) -> Result<(), SchemaError> {
    if let Some(groups) = row.kind.child_groups() {
        Schema::build(groups, level + 1)?;
    }
    Ok(())
}

fn index_group_keys(groups: &[PropertyGroup]) -> Result<HashMap<String, usize>, SchemaError> {
    let mut keys = HashMap::new();
    for (i, group) in groups.iter().enumerate() {
        let Some(key) = &group.key else { continue };
        if keys.insert(key.clone(), i).is_some() {
            return Err(SchemaError::InvalidField {
                path: format!("groups[{i}]"),
                field: "key",
                reason: format!("duplicate group key `{key}`"),
            });
        }
    }
    Ok(keys)
}

/// A property tree that passed validation, with lookup indices.
///
/// Identifiers are scoped to this level: rows inside a nesting row's child
/// schema live in that child's own namespace.
#[derive(Debug, Clone)]
pub struct Schema {
    level: usize,
    groups: Vec<PropertyGroup>,
    index: Index,
    group_keys: HashMap<String, usize>,
}

impl Schema {
    /// Validate and index `groups` at nesting `level`.
    pub fn build(groups: Vec<PropertyGroup>, level: usize) -> Result<Self, SchemaError> {
        let group_keys = index_group_keys(&groups)?;
        let mut index = Index::default();
        for (g, group) in groups.iter().enumerate() {
            index.index_group(level, g, group)?;
        }
        Ok(Self {
            level,
            groups,
            index,
            group_keys,
        })
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn groups(&self) -> &[PropertyGroup] {
        &self.groups
    }

    pub fn row_at(&self, group: usize, row: usize) -> Option<&PropertyRow> {
        self.groups.get(group)?.rows.get(row)
    }

    pub fn row_at_position(&self, pos: RowPosition) -> Option<&PropertyRow> {
        self.row_at(pos.group, pos.row)
    }

    /// Value rows are found first, then action and nesting rows.
    pub fn position_of(&self, identifier: &str) -> Option<RowPosition> {
        self.index
            .values
            .get(identifier)
            .or_else(|| self.index.structural.get(identifier))
            .copied()
    }

    pub fn row_for(&self, identifier: &str) -> Option<&PropertyRow> {
        self.position_of(identifier)
            .and_then(|pos| self.row_at_position(pos))
    }

    pub fn group_index(&self, key: &str) -> Option<usize> {
        self.group_keys.get(key).copied()
    }

    /// All rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = (RowPosition, &PropertyRow)> {
        self.groups.iter().enumerate().flat_map(|(g, group)| {
            group
                .rows
                .iter()
                .enumerate()
                .map(move |(r, row)| (RowPosition::new(g, r), row))
        })
    }

    /// Swap the rows of the group keyed `group_key`.
    ///
    /// Only the new rows are validated and indexed. On error the schema is
    /// left untouched.
    pub fn replace_rows(
        &mut self,
        group_key: &str,
        rows: Vec<PropertyRow>,
    ) -> Result<(), SchemaError> {
        let g = self
            .group_index(group_key)
            .ok_or_else(|| SchemaError::UnknownGroup {
                key: group_key.to_string(),
            })?;

        let mut index = self.index.without_group(g);
        let mut group = PropertyGroup {
            rows,
            ..self.groups[g].clone()
        };
        index.index_group(self.level, g, &group)?;

        std::mem::swap(&mut self.groups[g].rows, &mut group.rows);
        self.index = index;
        debug!(
            "level {}: replaced rows of group `{group_key}` ({} rows)",
            self.level,
            self.groups[g].rows.len()
        );
        Ok(())
    }

    /// Swap the whole group list. On error the schema is left untouched.
    pub fn replace_groups(&mut self, groups: Vec<PropertyGroup>) -> Result<(), SchemaError> {
        *self = Self::build(groups, self.level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::row::{PropertyRow, RowKind};

    fn sample() -> Schema {
        Schema::build(
            vec![
                PropertyGroup::new(
                    "Account",
                    vec![
                        PropertyRow::string("User", "user", "guest"),
                        PropertyRow::integer("Age", "age", 0),
                    ],
                )
                .with_key("account"),
                PropertyGroup::new(
                    "Other",
                    vec![
                        PropertyRow::action("Reset", "reset"),
                        PropertyRow::boolean("Sound", "sound", true),
                    ],
                ),
            ],
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let schema = sample();
        assert_eq!(schema.row_at(1, 1).unwrap().identifier, "sound");
        assert_eq!(schema.position_of("age"), Some(RowPosition::new(0, 1)));
        assert_eq!(schema.row_for("reset").unwrap().name, "Reset");
        assert!(schema.row_for("missing").is_none());
        assert!(schema.row_at(5, 0).is_none());
        assert_eq!(schema.rows().count(), 4);
    }

    #[test]
    fn test_duplicate_identifier_same_level() {
        let err = Schema::build(
            vec![
                PropertyGroup::new("A", vec![PropertyRow::string("X", "x", "")]),
                PropertyGroup::new("B", vec![PropertyRow::integer("Also X", "x", 1)]),
            ],
            0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateIdentifier {
                identifier: "x".into(),
                level: 0,
                first: "groups[0].rows[0]".into(),
                second: "groups[1].rows[0]".into(),
            }
        );
    }

    #[test]
    fn test_same_identifier_across_levels() {
        let child = vec![PropertyGroup::new("Inner", vec![PropertyRow::string("X", "x", "")])];
        let schema = Schema::build(
            vec![PropertyGroup::new(
                "Outer",
                vec![
                    PropertyRow::string("X", "x", ""),
                    PropertyRow::multi_level("More", "more", Some(child)),
                ],
            )],
            0,
        );
        assert!(schema.is_ok());
    }

    #[test]
    fn test_nested_duplicates_are_rejected_upfront() {
        let child = vec![PropertyGroup::new(
            "Inner",
            vec![
                PropertyRow::string("Y", "y", ""),
                PropertyRow::string("Y again", "y", ""),
            ],
        )];
        let err = Schema::build(
            vec![PropertyGroup::new(
                "Outer",
                vec![PropertyRow::multi_level("More", "more", Some(child))],
            )],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateIdentifier { level: 1, .. }));
    }

    #[test]
    fn test_structural_rows_may_share_identifiers() {
        let schema = Schema::build(
            vec![PropertyGroup::new(
                "A",
                vec![
                    PropertyRow::action("Go", "go"),
                    PropertyRow::action("Go too", "go"),
                    PropertyRow::new("Label", "", RowKind::Default { value: "hi".into() }),
                    PropertyRow::new("Label", "", RowKind::Default { value: "ho".into() }),
                ],
            )],
            0,
        )
        .unwrap();
        assert_eq!(schema.position_of("go"), Some(RowPosition::new(0, 0)));
    }

    #[test]
    fn test_replace_rows() {
        let mut schema = sample();
        schema
            .replace_rows(
                "account",
                vec![
                    PropertyRow::string("User", "user", ""),
                    PropertyRow::string("Email", "email", ""),
                ],
            )
            .unwrap();
        assert!(schema.row_for("age").is_none());
        assert_eq!(schema.position_of("email"), Some(RowPosition::new(0, 1)));
        assert_eq!(schema.position_of("sound"), Some(RowPosition::new(1, 1)));
    }

    #[test]
    fn test_replace_rows_rejects_collision() {
        let mut schema = sample();
        let err = schema
            .replace_rows("account", vec![PropertyRow::boolean("Sound", "sound", false)])
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateIdentifier { .. }));
        // unchanged
        assert_eq!(schema.position_of("age"), Some(RowPosition::new(0, 1)));

        assert_eq!(
            schema.replace_rows("nope", vec![]).unwrap_err(),
            SchemaError::UnknownGroup { key: "nope".into() }
        );
    }

    #[test]
    fn test_empty_choice_set() {
        let err = Schema::build(
            vec![PropertyGroup::new(
                "A",
                vec![
                    PropertyRow::string("X", "x", ""),
                    PropertyRow::multi_value("Color", "color", vec![]),
                ],
            )],
            0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::EmptyChoiceSet {
                path: "groups[0].rows[1]".into()
            }
        );

        let err = Schema::build(
            vec![PropertyGroup::new(
                "A",
                vec![PropertyRow::new("Pick", "pick", RowKind::PickerView { choices: vec![] })],
            )],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::EmptyChoiceSet { .. }));
    }

    #[test]
    fn test_replace_rows_rejects_empty_choices() {
        let mut schema = sample();
        let err = schema
            .replace_rows(
                "account",
                vec![
                    PropertyRow::string("User", "user", ""),
                    PropertyRow::new("Tone", "tone", RowKind::PickerList { choices: vec![] }),
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::EmptyChoiceSet {
                path: "groups[0].rows[1]".into()
            }
        );
        assert!(schema.row_for("tone").is_none());
        assert_eq!(schema.position_of("age"), Some(RowPosition::new(0, 1)));
    }

    #[test]
    fn test_duplicate_group_keys() {
        let err = Schema::build(
            vec![
                PropertyGroup::new("A", vec![]).with_key("k"),
                PropertyGroup::new("B", vec![]).with_key("k"),
            ],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "key", .. }));
    }
}

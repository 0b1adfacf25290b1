//! Autodetector for generating migrations from schema changes.
//!
//! This module compares an entity's desired definition with the live
//! state of its table and produces the operations needed to bring the
//! table in line. Columns and constraints are matched strictly by
//! name, so a rename shows up as a drop plus an add.

use tracing::debug;

use crate::introspect::TableState;
use crate::operations::{
    AddReference, AlterColumn, AlterColumnOp, AlterTableOp, MigrationOperation, UniqueColumn,
};
use crate::schema::{
    ColumnReference, ColumnSchema, EntityDefinition, PrimaryKey, SchemaDefinition, SqlType,
    UniqueConstraint,
};

/// Detects schema changes and generates migration operations.
///
/// Holds the full schema definition so foreign keys can target the
/// primary key of the referenced entity.
#[derive(Debug, Clone, Copy)]
pub struct Autodetector<'a> {
    schema: &'a SchemaDefinition,
}

impl<'a> Autodetector<'a> {
    /// Creates an autodetector over a schema definition.
    #[must_use]
    pub const fn new(schema: &'a SchemaDefinition) -> Self {
        Self { schema }
    }

    /// Returns the operations that turn `live` into `entity`.
    ///
    /// A table that does not exist (`None`) is created from scratch.
    #[must_use]
    pub fn diff(&self, entity: &EntityDefinition, live: Option<&TableState>) -> Vec<MigrationOperation> {
        let Some(live) = live else {
            return self.create_table(entity);
        };

        let (column_ops, table_ops) = self.diff_table(entity, live);
        debug!(
            table = %entity.name,
            columns = column_ops.len(),
            constraints = table_ops.len(),
            "Diffed table"
        );

        column_ops
            .into_iter()
            .map(|alteration| MigrationOperation::alter_column(&entity.name, alteration))
            .chain(
                table_ops
                    .into_iter()
                    .map(|op| MigrationOperation::alter_table(&entity.name, op)),
            )
            .collect()
    }

    /// Returns the operations that build `entity`'s table from nothing:
    /// one `CreateTable`, then its unique constraints, then its
    /// foreign keys.
    #[must_use]
    pub fn create_table(&self, entity: &EntityDefinition) -> Vec<MigrationOperation> {
        let table = entity.name.as_str();
        let columns: Vec<ColumnSchema> = entity.compared_columns().cloned().collect();

        let mut operations = vec![MigrationOperation::CreateTable {
            name: table.to_string(),
            columns,
            primary_key: entity.primary_key.clone(),
        }];

        for constraint in &entity.unique_constraints {
            operations.push(MigrationOperation::alter_table(
                table,
                add_unique(entity, constraint),
            ));
        }

        for column in &entity.columns {
            if let Some(reference) = &column.reference {
                operations.push(MigrationOperation::alter_column(
                    table,
                    self.set_foreign_key(&column.name, reference),
                ));
            }
        }

        for fk in &entity.foreign_keys {
            operations.push(MigrationOperation::alter_column(
                table,
                AlterColumn::new(
                    &fk.references_table,
                    AlterColumnOp::SetForeignKey(AddReference {
                        references_table: fk.references_table.clone(),
                        constraint_name: fk.name.clone(),
                        columns: fk.columns.clone(),
                        references_columns: fk.references_columns.clone(),
                    }),
                ),
            ));
        }

        operations
    }

    /// Compares an existing table with its definition.
    ///
    /// Returns column alterations, in declaration order followed by
    /// drops of leftover live columns, and unique constraint changes.
    #[must_use]
    pub fn diff_table(
        &self,
        entity: &EntityDefinition,
        live: &TableState,
    ) -> (Vec<AlterColumn>, Vec<AlterTableOp>) {
        let mut column_ops = Vec::new();
        let mut remaining: Vec<&ColumnSchema> = live.columns.iter().collect();

        for desired in entity.compared_columns() {
            match remaining.iter().position(|c| c.name == desired.name) {
                Some(index) => {
                    let current = remaining.remove(index);
                    self.diff_column(desired, current, &mut column_ops);
                }
                None => {
                    column_ops.push(AlterColumn::new(
                        &desired.name,
                        AlterColumnOp::Add(desired.clone()),
                    ));
                    if let Some(reference) = &desired.reference {
                        column_ops.push(self.set_foreign_key(&desired.name, reference));
                    }
                }
            }
        }

        for leftover in remaining {
            if let Some(reference) = &leftover.reference {
                column_ops.push(AlterColumn::new(
                    &reference.table,
                    AlterColumnOp::DropForeignKey(reference.constraint_name.clone()),
                ));
            }
            column_ops.push(AlterColumn::new(&leftover.name, AlterColumnOp::Drop));
        }

        let table_ops = diff_unique_constraints(entity, &live.unique_constraints);
        (column_ops, table_ops)
    }

    /// Compares a column present on both sides.
    fn diff_column(&self, desired: &ColumnSchema, live: &ColumnSchema, out: &mut Vec<AlterColumn>) {
        let name = desired.name.as_str();
        let reference_changed = desired.reference != live.reference;

        if reference_changed {
            if let Some(old) = &live.reference {
                out.push(AlterColumn::new(
                    &old.table,
                    AlterColumnOp::DropForeignKey(old.constraint_name.clone()),
                ));
            }
        }

        if live.nullable && !desired.nullable {
            if let Some(default) = &desired.default {
                out.push(AlterColumn::new(name, AlterColumnOp::DataFix(default.clone())));
            }
        }

        let desired_type = desired.sql_type.render(desired.max_len, false);
        let live_type = live.sql_type.render(live.max_len, false);
        if !desired_type.eq_ignore_ascii_case(&live_type) || desired.nullable != live.nullable {
            out.push(AlterColumn::new(name, AlterColumnOp::Change(desired.clone())));
        }

        match (&desired.default, &live.default) {
            (None, Some(_)) => out.push(AlterColumn::new(name, AlterColumnOp::ClearDefault)),
            (Some(wanted), current) if current.as_ref() != Some(wanted) => {
                out.push(AlterColumn::new(name, AlterColumnOp::SetDefault(wanted.clone())));
            }
            _ => {}
        }

        if reference_changed {
            if let Some(new) = &desired.reference {
                out.push(self.set_foreign_key(name, new));
            }
        }
    }

    fn set_foreign_key(&self, column: &str, reference: &ColumnReference) -> AlterColumn {
        AlterColumn::new(
            &reference.table,
            AlterColumnOp::SetForeignKey(AddReference {
                references_table: reference.table.clone(),
                constraint_name: reference.constraint_name.clone(),
                columns: vec![column.to_string()],
                references_columns: self.schema.primary_key_columns(&reference.table),
            }),
        )
    }
}

/// Compares unique constraints by name.
///
/// The desired member list is sorted before it is compared with the
/// live list, which the catalog returns ordered by column name.
fn diff_unique_constraints(entity: &EntityDefinition, live: &[UniqueConstraint]) -> Vec<AlterTableOp> {
    let mut operations = Vec::new();

    for desired in &entity.unique_constraints {
        match live.iter().find(|c| c.name == desired.name) {
            None => operations.push(add_unique(entity, desired)),
            Some(current) => {
                let mut wanted = desired.columns.clone();
                wanted.sort();
                if wanted != current.columns {
                    operations.push(AlterTableOp::DropUniqueConstraint(desired.name.clone()));
                    operations.push(add_unique(entity, desired));
                }
            }
        }
    }

    for current in live {
        if !entity.unique_constraints.iter().any(|c| c.name == current.name) {
            operations.push(AlterTableOp::DropUniqueConstraint(current.name.clone()));
        }
    }

    operations
}

fn add_unique(entity: &EntityDefinition, constraint: &UniqueConstraint) -> AlterTableOp {
    AlterTableOp::AddUniqueConstraint {
        name: constraint.name.clone(),
        columns: constraint
            .columns
            .iter()
            .map(|name| unique_column(entity, name))
            .collect(),
    }
}

fn unique_column(entity: &EntityDefinition, name: &str) -> UniqueColumn {
    let (sql_type, max_len) = match (entity.column_named(name), &entity.primary_key) {
        (Some(column), _) => (column.sql_type.clone(), column.max_len),
        (None, PrimaryKey::AutoIncrement { column, sql_type }) if column == name => {
            (sql_type.clone(), None)
        }
        (None, _) => (SqlType::Other(String::new()), None),
    };
    UniqueColumn {
        name: name.to_string(),
        sql_type,
        max_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ForeignKeySchema;

    fn users() -> EntityDefinition {
        EntityDefinition::new("users")
            .column(ColumnSchema::new("name", SqlType::String).max_len(50))
            .column(ColumnSchema::new("age", SqlType::Int32).nullable())
    }

    fn live(columns: Vec<ColumnSchema>) -> TableState {
        TableState {
            columns,
            unique_constraints: Vec::new(),
        }
    }

    fn ops(entity: &EntityDefinition, state: &TableState) -> Vec<AlterColumnOp> {
        let schema = SchemaDefinition::new(vec![entity.clone()]);
        Autodetector::new(&schema)
            .diff_table(entity, state)
            .0
            .into_iter()
            .map(|a| a.op)
            .collect()
    }

    #[test]
    fn detect_new_table() {
        let entity = users();
        let schema = SchemaDefinition::new(vec![entity.clone()]);
        let operations = Autodetector::new(&schema).diff(&entity, None);
        assert_eq!(operations.len(), 1);
        assert!(matches!(operations[0], MigrationOperation::CreateTable { .. }));
    }

    #[test]
    fn create_path_adds_constraints_and_references() {
        let entity = EntityDefinition::new("posts")
            .column(ColumnSchema::new("id", SqlType::Int64))
            .column(ColumnSchema::new("author_id", SqlType::Int64).references("users", "fk_author"))
            .column(ColumnSchema::new("slug", SqlType::String).max_len(80))
            .unique(UniqueConstraint::new("uq_slug", &["slug"]))
            .foreign_key(ForeignKeySchema {
                name: "fk_pair".into(),
                references_table: "pairs".into(),
                columns: vec!["author_id".into(), "slug".into()],
                references_columns: vec!["a".into(), "b".into()],
            });
        let schema = SchemaDefinition::new(vec![entity.clone()]);
        let operations = Autodetector::new(&schema).create_table(&entity);

        assert_eq!(operations.len(), 4);
        match &operations[0] {
            MigrationOperation::CreateTable { columns, .. } => {
                let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["author_id", "slug"]);
            }
            other => panic!("Expected CreateTable, got {other:?}"),
        }
        assert!(matches!(
            &operations[1],
            MigrationOperation::AlterTable { op: AlterTableOp::AddUniqueConstraint { name, columns }, .. }
                if name == "uq_slug" && columns[0].max_len == Some(80)
        ));
        match &operations[2] {
            MigrationOperation::AlterColumn { alteration, .. } => {
                assert_eq!(alteration.subject, "users");
                assert_eq!(
                    alteration.op,
                    AlterColumnOp::SetForeignKey(AddReference {
                        references_table: "users".into(),
                        constraint_name: "fk_author".into(),
                        columns: vec!["author_id".into()],
                        references_columns: vec!["id".into()],
                    })
                );
            }
            other => panic!("Expected AlterColumn, got {other:?}"),
        }
        assert!(matches!(
            &operations[3],
            MigrationOperation::AlterColumn { alteration, .. } if alteration.subject == "pairs"
        ));
    }

    #[test]
    fn no_changes() {
        let entity = users();
        let state = live(entity.columns.clone());
        assert!(ops(&entity, &state).is_empty());
    }

    #[test]
    fn type_comparison_ignores_case() {
        let entity = EntityDefinition::new("t")
            .column(ColumnSchema::new("n", SqlType::Other("INT(10) UNSIGNED".into())));
        let state = live(vec![ColumnSchema::new(
            "n",
            SqlType::Other("int(10) unsigned".into()),
        )]);
        assert!(ops(&entity, &state).is_empty());
    }

    #[test]
    fn detect_new_and_dropped_columns() {
        let entity = users();
        let state = live(vec![
            ColumnSchema::new("name", SqlType::String).max_len(50),
            ColumnSchema::new("legacy", SqlType::Blob).references("blobs", "fk_legacy"),
        ]);
        let changes = ops(&entity, &state);
        assert_eq!(
            changes,
            vec![
                AlterColumnOp::Add(ColumnSchema::new("age", SqlType::Int32).nullable()),
                AlterColumnOp::DropForeignKey("fk_legacy".into()),
                AlterColumnOp::Drop,
            ]
        );
    }

    #[test]
    fn detect_type_and_nullability_change() {
        let entity = users();
        let state = live(vec![
            ColumnSchema::new("name", SqlType::String).max_len(30),
            ColumnSchema::new("age", SqlType::Int32),
        ]);
        let changes = ops(&entity, &state);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|op| matches!(op, AlterColumnOp::Change(_))));
    }

    #[test]
    fn tightening_nullability_fixes_data_first() {
        let entity = EntityDefinition::new("t").column(ColumnSchema::new("n", SqlType::Int32).default("0"));
        let state = live(vec![ColumnSchema::new("n", SqlType::Int32).nullable()]);
        assert_eq!(
            ops(&entity, &state),
            vec![
                AlterColumnOp::DataFix("0".into()),
                AlterColumnOp::Change(ColumnSchema::new("n", SqlType::Int32).default("0")),
                AlterColumnOp::SetDefault("0".into()),
            ]
        );
    }

    #[test]
    fn default_changes() {
        let entity = EntityDefinition::new("t")
            .column(ColumnSchema::new("a", SqlType::Int32))
            .column(ColumnSchema::new("b", SqlType::Int32).default("2"));
        let state = live(vec![
            ColumnSchema::new("a", SqlType::Int32).default("1"),
            ColumnSchema::new("b", SqlType::Int32).default("1"),
        ]);
        assert_eq!(
            ops(&entity, &state),
            vec![
                AlterColumnOp::ClearDefault,
                AlterColumnOp::SetDefault("2".into()),
            ]
        );
    }

    #[test]
    fn foreign_key_retarget() {
        let entity = EntityDefinition::new("posts")
            .column(ColumnSchema::new("owner_id", SqlType::Int64).references("teams", "fk_owner"));
        let state = live(vec![
            ColumnSchema::new("owner_id", SqlType::Int64).references("users", "fk_owner"),
        ]);
        let schema = SchemaDefinition::new(vec![entity.clone()]);
        let (changes, _) = Autodetector::new(&schema).diff_table(&entity, &state);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].subject, "users");
        assert_eq!(changes[0].op, AlterColumnOp::DropForeignKey("fk_owner".into()));
        assert_eq!(changes[1].subject, "teams");
        assert!(matches!(changes[1].op, AlterColumnOp::SetForeignKey(_)));
    }

    #[test]
    fn unique_constraint_changes() {
        let entity = EntityDefinition::new("t")
            .column(ColumnSchema::new("a", SqlType::Int32))
            .column(ColumnSchema::new("b", SqlType::Int32))
            .unique(UniqueConstraint::new("uq_ab", &["b", "a"]))
            .unique(UniqueConstraint::new("uq_new", &["a"]));
        let current = vec![
            UniqueConstraint::new("uq_ab", &["a", "b"]),
            UniqueConstraint::new("uq_old", &["b"]),
        ];
        let table_ops = diff_unique_constraints(&entity, &current);

        assert_eq!(table_ops.len(), 2);
        assert!(matches!(
            &table_ops[0],
            AlterTableOp::AddUniqueConstraint { name, .. } if name == "uq_new"
        ));
        assert_eq!(table_ops[1], AlterTableOp::DropUniqueConstraint("uq_old".into()));
    }

    #[test]
    fn composite_key_columns_are_compared() {
        let entity = EntityDefinition::new("memberships")
            .column(ColumnSchema::new("user_id", SqlType::Int64).references("users", "fk_user"))
            .column(ColumnSchema::new("group_id", SqlType::Int64))
            .composite_key(&["user_id", "group_id"]);
        let state = live(vec![
            ColumnSchema::new("user_id", SqlType::Int64).references("users", "fk_user"),
            ColumnSchema::new("group_id", SqlType::Int64),
        ]);
        assert!(ops(&entity, &state).is_empty());

        let state = live(vec![
            ColumnSchema::new("user_id", SqlType::Int64),
            ColumnSchema::new("group_id", SqlType::Int64),
        ]);
        let operations = ops(&entity, &state);
        assert_eq!(operations.len(), 1);
        assert!(matches!(
            &operations[0],
            AlterColumnOp::SetForeignKey(reference) if reference.columns == vec!["user_id".to_string()]
        ));

        let schema = SchemaDefinition::new(vec![entity.clone()]);
        match &Autodetector::new(&schema).create_table(&entity)[0] {
            MigrationOperation::CreateTable { columns, .. } => assert_eq!(columns.len(), 2),
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }
}

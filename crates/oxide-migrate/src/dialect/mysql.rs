//! MySQL dialect for migrations.
//!
//! Type changes are always rendered as a full `MODIFY COLUMN`
//! rewrite. Unique constraints over string or blob columns carry a
//! key prefix length, since MySQL cannot index unbounded columns.

use crate::operations::{AddReference, AlterColumn, AlterColumnOp, AlterTableOp, UniqueColumn};
use crate::schema::SqlType;

use super::MigrationDialect;

/// Key prefix length used for unbounded string and blob columns in
/// unique constraints.
pub const DEFAULT_KEY_PREFIX: u32 = 200;

/// MySQL migration dialect.
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn add_reference_sql(&self, table: &str, reference: &AddReference) -> String {
        let columns: Vec<String> = reference
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        let targets: Vec<String> = reference
            .references_columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(table),
            self.quote_identifier(&reference.constraint_name),
            columns.join(", "),
            self.quote_identifier(&reference.references_table),
            targets.join(", ")
        )
    }

    fn unique_member(&self, column: &UniqueColumn) -> String {
        let name = self.quote_identifier(&column.name);
        if column.sql_type.needs_key_prefix() {
            format!("{name}({})", column.max_len.unwrap_or(DEFAULT_KEY_PREFIX))
        } else {
            name
        }
    }
}

impl MigrationDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn alter_column(&self, table: &str, alteration: &AlterColumn) -> String {
        let quoted_table = self.quote_identifier(table);
        let column = self.quote_identifier(&alteration.subject);

        match &alteration.op {
            AlterColumnOp::Add(col) => {
                format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quoted_table,
                    self.column_definition(col)
                )
            }
            AlterColumnOp::Change(col) => {
                format!(
                    "ALTER TABLE {} MODIFY COLUMN {}",
                    quoted_table,
                    self.column_definition(col)
                )
            }
            AlterColumnOp::Drop => {
                format!("ALTER TABLE {quoted_table} DROP COLUMN {column}")
            }
            AlterColumnOp::SetDefault(default) => {
                format!("ALTER TABLE {quoted_table} ALTER COLUMN {column} SET DEFAULT {default}")
            }
            AlterColumnOp::ClearDefault => {
                format!("ALTER TABLE {quoted_table} ALTER COLUMN {column} DROP DEFAULT")
            }
            AlterColumnOp::SetForeignKey(reference) => self.add_reference_sql(table, reference),
            AlterColumnOp::DropForeignKey(name) => {
                format!(
                    "ALTER TABLE {} DROP FOREIGN KEY {}",
                    quoted_table,
                    self.quote_identifier(name)
                )
            }
            AlterColumnOp::DataFix(value) => {
                format!("UPDATE {quoted_table} SET {column} = {value} WHERE {column} IS NULL")
            }
        }
    }

    fn alter_table(&self, table: &str, op: &AlterTableOp) -> String {
        let quoted_table = self.quote_identifier(table);
        match op {
            AlterTableOp::AddUniqueConstraint { name, columns } => {
                let members: Vec<String> = columns.iter().map(|c| self.unique_member(c)).collect();
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                    quoted_table,
                    self.quote_identifier(name),
                    members.join(", ")
                )
            }
            AlterTableOp::DropUniqueConstraint(name) => {
                format!(
                    "ALTER TABLE {} DROP INDEX {}",
                    quoted_table,
                    self.quote_identifier(name)
                )
            }
        }
    }

    fn type_name(&self, sql_type: &SqlType, max_len: Option<u32>) -> String {
        sql_type.render(max_len, true)
    }

    fn auto_increment_keyword(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn quote_char(&self) -> char {
        '`'
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::MigrationOperation;
    use crate::schema::{ColumnSchema, PrimaryKey};

    fn alter(subject: &str, op: AlterColumnOp) -> String {
        MySqlDialect::new().alter_column("users", &AlterColumn::new(subject, op))
    }

    #[test]
    fn mysql_type_names() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.type_name(&SqlType::Bool, None), "TINYINT(1)");
        assert_eq!(dialect.type_name(&SqlType::Int64, None), "BIGINT");
        assert_eq!(
            dialect.type_name(&SqlType::String, Some(64)),
            "VARCHAR(64) CHARACTER SET utf8mb4"
        );
        assert_eq!(
            dialect.type_name(&SqlType::String, None),
            "TEXT CHARACTER SET utf8mb4"
        );
    }

    #[test]
    fn create_table_with_auto_increment_id() {
        let dialect = MySqlDialect::new();
        let sql = dialect.generate_sql(&MigrationOperation::CreateTable {
            name: "users".into(),
            columns: vec![
                ColumnSchema::new("username", SqlType::String).max_len(40),
                ColumnSchema::new("bio", SqlType::String).nullable(),
            ],
            primary_key: PrimaryKey::default(),
        });
        assert_eq!(
            sql,
            "CREATE TABLE `users` (\n  \
             `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,\n  \
             `username` VARCHAR(40) CHARACTER SET utf8mb4 NOT NULL,\n  \
             `bio` TEXT CHARACTER SET utf8mb4 NULL\n)"
        );
    }

    #[test]
    fn create_table_with_composite_key() {
        let dialect = MySqlDialect::new();
        let sql = dialect.generate_sql(&MigrationOperation::CreateTable {
            name: "memberships".into(),
            columns: vec![
                ColumnSchema::new("user_id", SqlType::Int64),
                ColumnSchema::new("group_id", SqlType::Int64),
                ColumnSchema::new("admin", SqlType::Bool).default("0"),
            ],
            primary_key: PrimaryKey::Composite(vec!["user_id".into(), "group_id".into()]),
        });
        assert_eq!(
            sql,
            "CREATE TABLE `memberships` (\n  \
             `user_id` BIGINT NOT NULL,\n  \
             `group_id` BIGINT NOT NULL,\n  \
             `admin` TINYINT(1) NOT NULL DEFAULT 0,\n  \
             PRIMARY KEY (`user_id`, `group_id`)\n)"
        );
    }

    #[test]
    fn column_alterations() {
        let email = ColumnSchema::new("email", SqlType::String).max_len(100);
        assert_eq!(
            alter("email", AlterColumnOp::Add(email.clone())),
            "ALTER TABLE `users` ADD COLUMN `email` VARCHAR(100) CHARACTER SET utf8mb4 NOT NULL"
        );
        assert_eq!(
            alter("email", AlterColumnOp::Change(email.nullable())),
            "ALTER TABLE `users` MODIFY COLUMN `email` VARCHAR(100) CHARACTER SET utf8mb4 NULL"
        );
        assert_eq!(
            alter("email", AlterColumnOp::Drop),
            "ALTER TABLE `users` DROP COLUMN `email`"
        );
        assert_eq!(
            alter("email", AlterColumnOp::SetDefault("'none'".into())),
            "ALTER TABLE `users` ALTER COLUMN `email` SET DEFAULT 'none'"
        );
        assert_eq!(
            alter("email", AlterColumnOp::ClearDefault),
            "ALTER TABLE `users` ALTER COLUMN `email` DROP DEFAULT"
        );
        assert_eq!(
            alter("email", AlterColumnOp::DataFix("'none'".into())),
            "UPDATE `users` SET `email` = 'none' WHERE `email` IS NULL"
        );
    }

    #[test]
    fn foreign_key_alterations() {
        let reference = AddReference {
            references_table: "orgs".into(),
            constraint_name: "fk_users_org".into(),
            columns: vec!["org_id".into()],
            references_columns: vec!["id".into()],
        };
        assert_eq!(
            alter("orgs", AlterColumnOp::SetForeignKey(reference)),
            "ALTER TABLE `users` ADD CONSTRAINT `fk_users_org` FOREIGN KEY (`org_id`) REFERENCES `orgs` (`id`)"
        );
        assert_eq!(
            alter("orgs", AlterColumnOp::DropForeignKey("fk_users_org".into())),
            "ALTER TABLE `users` DROP FOREIGN KEY `fk_users_org`"
        );
    }

    #[test]
    fn unique_constraints_use_key_prefixes() {
        let dialect = MySqlDialect::new();
        let add = AlterTableOp::AddUniqueConstraint {
            name: "uq_users_handle".into(),
            columns: vec![
                UniqueColumn {
                    name: "org_id".into(),
                    sql_type: SqlType::Int64,
                    max_len: None,
                },
                UniqueColumn {
                    name: "handle".into(),
                    sql_type: SqlType::String,
                    max_len: Some(30),
                },
                UniqueColumn {
                    name: "bio".into(),
                    sql_type: SqlType::String,
                    max_len: None,
                },
            ],
        };
        assert_eq!(
            dialect.alter_table("users", &add),
            "ALTER TABLE `users` ADD CONSTRAINT `uq_users_handle` UNIQUE (`org_id`, `handle`(30), `bio`(200))"
        );
        assert_eq!(
            dialect.alter_table("users", &AlterTableOp::DropUniqueConstraint("uq_users_handle".into())),
            "ALTER TABLE `users` DROP INDEX `uq_users_handle`"
        );
    }

    #[test]
    fn identifiers_escape_backticks() {
        assert_eq!(MySqlDialect::new().quote_identifier("we`ird"), "`we``ird`");
    }
}

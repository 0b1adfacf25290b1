//! Schema migration planning for MySQL.
//!
//! `oxide-migrate` compares the tables an application declares with
//! what the database catalog reports, and renders the statements that
//! reconcile the two. It never executes them:
//! - Columns and constraints are matched by name; renames show up as a
//!   drop plus an add
//! - Every statement is tagged safe or unsafe, and only column drops
//!   are unsafe
//! - Catalog rows that cannot be read are reported instead of planned
//!   around
//!
//! # Architecture
//!
//! - **Connection** - Query-execution capability the planner is handed
//! - **Introspect** - Reads live columns, unique constraints and foreign
//!   keys from `INFORMATION_SCHEMA`
//! - **Autodetector** - Diffs an entity against its live table
//! - **Dialect** - Renders operations as MySQL statements
//! - **Migrator** - Ties the above together into plans and previews
//!
//! # Example
//!
//! ```rust,no_run
//! use oxide_migrate::prelude::*;
//!
//! # async fn run() -> oxide_migrate::error::Result<()> {
//! let schema = SchemaDefinition::new(vec![
//!     EntityDefinition::new("users")
//!         .column(ColumnSchema::new("username", SqlType::String).max_len(40))
//!         .unique(UniqueConstraint::new("uq_username", &["username"])),
//! ]);
//!
//! let migrator = Migrator::new(MySqlDialect::new(), "app");
//! let mut conn = SqlxConnection::connect("mysql://root@localhost/app").await?;
//! if let Ok(plan) = migrator.plan(&mut conn, &schema, "users").await? {
//!     for step in plan.safe_steps() {
//!         println!("{};", step.sql);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show every statement, marking unsafe ones
//! oxide-migrate --entities entities.json plan
//!
//! # Statements a fresh database would run, no connection needed
//! oxide-migrate --entities entities.json preview
//!
//! # Only the statements that need no confirmation
//! oxide-migrate --entities entities.json safe-sql
//! ```

pub mod autodetector;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod migrator;
pub mod mysql;
pub mod operations;
pub mod schema;

pub use error::{MigrateError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::autodetector::Autodetector;
    pub use crate::connection::{
        execute, fetch_rows, query_values, Connection, EmptyCatalog, Execution, MemoryResultSet,
        ResultSet, Statement,
    };
    pub use crate::dialect::{MigrationDialect, MySqlDialect};
    pub use crate::error::{MigrateError, Result};
    pub use crate::introspect::{introspect, LiveItem, LiveSchema, TableState};
    pub use crate::migrator::{MigrationPlan, Migrator, PlanOutcome, RenderedStep};
    pub use crate::mysql::SqlxConnection;
    pub use crate::operations::{
        AddReference, AlterColumn, AlterColumnOp, AlterTableOp, MigrationOperation, UniqueColumn,
    };
    pub use crate::schema::{
        ColumnReference, ColumnSchema, EntityDefinition, ForeignKeySchema, PrimaryKey,
        SchemaDefinition, SqlType, UniqueConstraint,
    };
}

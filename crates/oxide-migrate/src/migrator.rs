//! Migration planning.
//!
//! The migrator reads a table's live schema, diffs it against the
//! entity definition and renders the result. It never executes the
//! statements it produces.

use tracing::{debug, info, warn};

use crate::autodetector::Autodetector;
use crate::connection::{Connection, EmptyCatalog};
use crate::dialect::MigrationDialect;
use crate::error::{MigrateError, Result};
use crate::introspect::introspect;
use crate::operations::MigrationOperation;
use crate::schema::SchemaDefinition;

/// One rendered statement of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStep {
    /// Whether the statement drops a column.
    pub is_unsafe: bool,
    /// Statement text, without a terminator.
    pub sql: String,
}

/// The ordered statements that bring one table up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Table name.
    pub table: String,
    /// Steps in execution order.
    pub steps: Vec<RenderedStep>,
}

impl MigrationPlan {
    /// Returns whether the table is already up to date.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns whether any step is unsafe.
    #[must_use]
    pub fn has_unsafe(&self) -> bool {
        self.steps.iter().any(|s| s.is_unsafe)
    }

    /// Iterates over the steps that can be applied without
    /// confirmation.
    pub fn safe_steps(&self) -> impl Iterator<Item = &RenderedStep> {
        self.steps.iter().filter(|s| !s.is_unsafe)
    }

    /// Iterates over the steps that need confirmation.
    pub fn unsafe_steps(&self) -> impl Iterator<Item = &RenderedStep> {
        self.steps.iter().filter(|s| s.is_unsafe)
    }
}

/// A plan, or the catalog rows that kept it from being computed.
pub type PlanOutcome = std::result::Result<MigrationPlan, Vec<String>>;

/// Plans migrations for one database.
#[derive(Debug, Clone)]
pub struct Migrator<D: MigrationDialect> {
    dialect: D,
    database: String,
}

impl<D: MigrationDialect> Migrator<D> {
    /// Creates a migrator for the tables of `database`.
    pub fn new(dialect: D, database: impl Into<String>) -> Self {
        Self {
            dialect,
            database: database.into(),
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub const fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Returns the database whose catalog is read.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Renders operations in order.
    #[must_use]
    pub fn render(&self, table: &str, operations: &[MigrationOperation]) -> MigrationPlan {
        let steps = operations
            .iter()
            .map(|op| {
                let step = RenderedStep {
                    is_unsafe: op.is_unsafe(),
                    sql: self.dialect.generate_sql(op),
                };
                debug!(table = %table, is_unsafe = step.is_unsafe, sql = %step.sql, "Planned step");
                if step.is_unsafe {
                    warn!(table = %table, sql = %step.sql, "Unsafe step planned");
                }
                step
            })
            .collect();
        MigrationPlan {
            table: table.to_string(),
            steps,
        }
    }

    /// Plans the migration of the table behind `entity`.
    ///
    /// # Errors
    ///
    /// Fails if the entity is not defined, on connection errors and on
    /// ambiguous foreign keys. Catalog rows that do not parse are
    /// returned as `Ok(Err(messages))`.
    pub async fn plan<C>(&self, conn: &mut C, schema: &SchemaDefinition, entity: &str) -> Result<PlanOutcome>
    where
        C: Connection + ?Sized,
    {
        let entity = schema.entity(entity)?;
        let live = introspect(conn, &self.database, entity).await?;

        let state = match live.into_table_state() {
            Ok(state) => state,
            Err(errors) => {
                warn!(table = %entity.name, errors = errors.len(), "Not planning table");
                return Ok(Err(errors));
            }
        };
        if state.is_none() {
            debug!(table = %entity.name, "Table does not exist yet");
        }

        let operations = Autodetector::new(schema).diff(entity, state.as_ref());
        let plan = self.render(&entity.name, &operations);
        info!(
            table = %plan.table,
            steps = plan.steps.len(),
            unsafe_steps = plan.unsafe_steps().count(),
            "Planned migration"
        );
        Ok(Ok(plan))
    }

    /// Plans every entity in declaration order.
    ///
    /// # Errors
    ///
    /// Stops at the first connection error or ambiguous foreign key.
    pub async fn plan_all<C>(
        &self,
        conn: &mut C,
        schema: &SchemaDefinition,
    ) -> Result<Vec<(String, PlanOutcome)>>
    where
        C: Connection + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(schema.entities.len());
        for entity in &schema.entities {
            let outcome = self.plan(conn, schema, &entity.name).await?;
            outcomes.push((entity.name.clone(), outcome));
        }
        Ok(outcomes)
    }

    /// Renders the statements a fresh deployment would run for
    /// `entity`, without a database.
    ///
    /// # Errors
    ///
    /// Fails if the entity is not defined.
    pub async fn preview(&self, schema: &SchemaDefinition, entity: &str) -> Result<MigrationPlan> {
        self.plan(&mut EmptyCatalog, schema, entity)
            .await?
            .map_err(MigrateError::Introspection)
    }

    /// Previews every entity in declaration order.
    ///
    /// # Errors
    ///
    /// See [`Migrator::preview`].
    pub async fn preview_all(&self, schema: &SchemaDefinition) -> Result<Vec<MigrationPlan>> {
        let mut plans = Vec::with_capacity(schema.entities.len());
        for entity in &schema.entities {
            plans.push(self.preview(schema, &entity.name).await?);
        }
        Ok(plans)
    }
}

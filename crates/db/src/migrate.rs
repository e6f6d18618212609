//! Applies module migrations exactly once, in the order the registry hands
//! them over.

use rusqlite::{params, Connection, OptionalExtension};
use shelf_kernel::Migration;

use crate::{Database, DbError};

const LEDGER_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        PRIMARY KEY (module, id)
    );
";

/// A row of the migration ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub module: String,
    pub id: String,
    pub applied_at: String,
}

impl Database {
    /// Apply every migration not yet recorded in the ledger.
    ///
    /// Each migration runs in its own transaction together with its ledger
    /// row. Returns the number of migrations applied by this call.
    pub async fn migrate(&self, migrations: Vec<(String, Migration)>) -> Result<usize, DbError> {
        let applied = self
            .call("migrate", move |conn| apply_pending(conn, &migrations))
            .await?;

        tracing::info!(target: "shelf-db", applied, "migrations complete");
        Ok(applied)
    }

    /// Ledger contents, oldest first.
    pub async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>, DbError> {
        self.call("applied_migrations", |conn| {
            conn.execute_batch(LEDGER_DDL)?;
            let mut stmt = conn.prepare(
                "SELECT module, id, applied_at FROM schema_migrations ORDER BY rowid ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AppliedMigration {
                        module: row.get(0)?,
                        id: row.get(1)?,
                        applied_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }
}

fn apply_pending(conn: &mut Connection, migrations: &[(String, Migration)]) -> Result<usize, DbError> {
    conn.execute_batch(LEDGER_DDL)?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let seen = conn
            .query_row(
                "SELECT 1 FROM schema_migrations WHERE module = ?1 AND id = ?2",
                params![module, migration.id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if seen {
            continue;
        }

        let wrap = |source| DbError::Migration {
            module: module.clone(),
            id: migration.id,
            source,
        };

        let tx = conn.transaction()?;
        tx.execute_batch(migration.up).map_err(wrap)?;
        tx.execute(
            "INSERT INTO schema_migrations (module, id) VALUES (?1, ?2)",
            params![module, migration.id],
        )
        .map_err(wrap)?;
        tx.commit()?;

        tracing::info!(target: "shelf-db", module = %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books_migrations() -> Vec<(String, Migration)> {
        vec![
            (
                "books".to_string(),
                Migration {
                    id: "001_create",
                    up: "CREATE TABLE books (id TEXT PRIMARY KEY);",
                },
            ),
            (
                "books".to_string(),
                Migration {
                    id: "002_index",
                    up: "CREATE INDEX books_id_idx ON books (id);",
                },
            ),
        ]
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let db = Database::in_memory().await.unwrap();

        assert_eq!(db.migrate(books_migrations()).await.unwrap(), 2);
        assert_eq!(db.migrate(books_migrations()).await.unwrap(), 0);

        let ledger = db.applied_migrations().await.unwrap();
        let ids: Vec<_> = ledger.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["001_create", "002_index"]);
        assert!(ledger.iter().all(|m| m.module == "books"));
    }

    #[tokio::test]
    async fn failing_migration_is_not_recorded() {
        let db = Database::in_memory().await.unwrap();
        let broken = vec![(
            "books".to_string(),
            Migration {
                id: "001_broken",
                up: "CREATE TABLE books (id TEXT PRIMARY KEY); NOT SQL AT ALL;",
            },
        )];

        let err = db.migrate(broken).await.unwrap_err();
        assert!(matches!(err, DbError::Migration { id: "001_broken", .. }));

        // The transaction rolled back, including the table it created.
        assert_eq!(db.migrate(books_migrations()).await.unwrap(), 2);
        assert!(db.applied_migrations().await.unwrap().len() == 2);
    }
}

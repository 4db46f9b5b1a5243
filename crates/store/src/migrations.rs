use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Row;

    use super::run_pending;
    use crate::migrations::MIGRATOR;
    use crate::DbPool;

    /// A bare, un-migrated pool; these tests drive the migrator themselves.
    async fn blank_pool() -> DbPool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("connect")
    }

    #[tokio::test]
    async fn migrations_create_the_documents_table() {
        let pool = blank_pool().await;
        run_pending(&pool).await.expect("run migrations");

        let table_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
        )
        .fetch_one(&pool)
        .await
        .expect("check documents table")
        .get::<i64, _>("count");

        let index_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'index' AND name = 'idx_documents_collection'",
        )
        .fetch_one(&pool)
        .await
        .expect("check collection index")
        .get::<i64, _>("count");

        assert_eq!(table_count, 1);
        assert_eq!(index_count, 1);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = blank_pool().await;
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let table_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
        )
        .fetch_one(&pool)
        .await
        .expect("check documents table removed")
        .get::<i64, _>("count");

        assert_eq!(table_count, 0);
    }
}

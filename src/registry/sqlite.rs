use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tokio::sync::Mutex;

use super::{GradientRole, MAX_ROLES_PER_SERVER, RoleRegistry, ServerRegistry};
use crate::error::RegistryError;

/// SQLite-backed registry using an sqlx async pool.
pub struct SqliteRoleRegistry {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteRoleRegistry {
    /// Create a registry on an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self, RegistryError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS servers (
                 server_id  TEXT PRIMARY KEY,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS gradient_roles (
                 id              INTEGER PRIMARY KEY AUTOINCREMENT,
                 server_id       TEXT NOT NULL REFERENCES servers(server_id),
                 role_id         TEXT NOT NULL,
                 primary_color   INTEGER NOT NULL,
                 secondary_color INTEGER NOT NULL,
                 created_at      TEXT NOT NULL,
                 UNIQUE(server_id, role_id)
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_gradient_roles_server
                 ON gradient_roles(server_id, id)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS orphan_roles (
                 id          INTEGER PRIMARY KEY AUTOINCREMENT,
                 server_id   TEXT NOT NULL REFERENCES servers(server_id),
                 role_id     TEXT NOT NULL,
                 recorded_at TEXT NOT NULL,
                 UNIQUE(server_id, role_id)
             )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    /// Open (or create) a database file.
    pub async fn open(path: &Path) -> Result<Self, RegistryError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::new(pool).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_server(&self, server_id: &str) -> Result<(), RegistryError> {
        sqlx::query("INSERT OR IGNORE INTO servers (server_id, created_at) VALUES ($1, $2)")
            .bind(server_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn color_from_column(row: &SqliteRow, column: &str) -> Result<u32, RegistryError> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw)
        .ok()
        .filter(|color| *color <= super::MAX_COLOR)
        .ok_or_else(|| RegistryError::Corrupt(format!("{column} out of range: {raw}")))
}

fn map_role_row(row: &SqliteRow) -> Result<GradientRole, RegistryError> {
    Ok(GradientRole {
        role_id: row.try_get("role_id")?,
        server_id: row.try_get("server_id")?,
        primary_color: color_from_column(row, "primary_color")?,
        secondary_color: color_from_column(row, "secondary_color")?,
    })
}

impl RoleRegistry for SqliteRoleRegistry {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get_server<'a>(
        &'a self,
        server_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ServerRegistry, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            {
                let _guard = self.write_lock.lock().await;
                self.ensure_server(server_id).await?;
            }

            let rows = sqlx::query(
                "SELECT server_id, role_id, primary_color, secondary_color
                 FROM gradient_roles
                 WHERE server_id = $1
                 ORDER BY id ASC",
            )
            .bind(server_id)
            .fetch_all(&self.pool)
            .await?;

            let roles = rows
                .iter()
                .map(map_role_row)
                .collect::<Result<Vec<_>, _>>()?;

            let orphans: Vec<(String,)> = sqlx::query_as(
                "SELECT role_id FROM orphan_roles WHERE server_id = $1 ORDER BY id ASC",
            )
            .bind(server_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(ServerRegistry {
                server_id: server_id.to_string(),
                roles,
                orphans: orphans.into_iter().map(|(role_id,)| role_id).collect(),
            })
        })
    }

    fn add_role<'a>(
        &'a self,
        role: &'a GradientRole,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            self.ensure_server(&role.server_id).await?;

            let mut tx = self.pool.begin().await?;

            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM gradient_roles WHERE server_id = $1")
                    .bind(&role.server_id)
                    .fetch_one(&mut *tx)
                    .await?;

            if usize::try_from(count).unwrap_or(usize::MAX) >= MAX_ROLES_PER_SERVER {
                tx.rollback().await?;
                return Ok(false);
            }

            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO gradient_roles
                     (server_id, role_id, primary_color, secondary_color, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&role.server_id)
            .bind(&role.role_id)
            .bind(i64::from(role.primary_color))
            .bind(i64::from(role.secondary_color))
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            tx.commit().await?;
            Ok(inserted == 1)
        })
    }

    fn remove_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let removed =
                sqlx::query("DELETE FROM gradient_roles WHERE server_id = $1 AND role_id = $2")
                    .bind(server_id)
                    .bind(role_id)
                    .execute(&self.pool)
                    .await?
                    .rows_affected();
            Ok(removed > 0)
        })
    }

    fn add_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            self.ensure_server(server_id).await?;
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO orphan_roles (server_id, role_id, recorded_at)
                 VALUES ($1, $2, $3)",
            )
            .bind(server_id)
            .bind(role_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?
            .rows_affected();
            Ok(inserted == 1)
        })
    }

    fn remove_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let removed =
                sqlx::query("DELETE FROM orphan_roles WHERE server_id = $1 AND role_id = $2")
                    .bind(server_id)
                    .bind(role_id)
                    .execute(&self.pool)
                    .await?
                    .rows_affected();
            Ok(removed > 0)
        })
    }

    fn health_check<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let (_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM servers")
                .fetch_one(&self.pool)
                .await?;
            Ok(())
        })
    }
}

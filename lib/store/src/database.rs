//! MySQL-backed store.

use crate::config::{DatabaseConfig, StoreOptions, TableNames};
use crate::error::StoreError;
use crate::record::{LaravelUser, SessionRecord};
use crate::store::SessionStore;
use async_trait::async_trait;
use rootcause::prelude::Report;
use sessionbridge_core::UserId;
use sessionbridge_session::{Permissions, ResolvedPermissions, SessionDecoder};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, FromRow, Row};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: Option<u64>,
    payload: String,
    last_activity: i64,
}

impl SessionRow {
    fn into_record(self) -> SessionRecord {
        SessionRecord {
            id: self.id,
            user_id: self.user_id.filter(|id| *id > 0).map(UserId::new),
            payload: self.payload,
            last_activity: self.last_activity,
        }
    }
}

/// SQL text for every query, built once from validated table names.
#[derive(Debug, Clone)]
struct Queries {
    session_by_id: String,
    latest_session_for_user: String,
    user_by_id: String,
    roles: String,
    modules: String,
    links: String,
}

impl Queries {
    fn new(tables: &TableNames) -> Self {
        // Casts pin the column types so lenient schemas decode the same way.
        let session_columns = "id, CAST(user_id AS UNSIGNED) AS user_id, payload, \
                               CAST(last_activity AS SIGNED) AS last_activity";
        Self {
            session_by_id: format!(
                "SELECT {session_columns} FROM {} WHERE id = ? LIMIT 1",
                tables.sessions
            ),
            latest_session_for_user: format!(
                "SELECT {session_columns} FROM {} WHERE user_id = ? \
                 ORDER BY last_activity DESC LIMIT 1",
                tables.sessions
            ),
            user_by_id: format!(
                "SELECT * FROM {} WHERE id = ? AND deleted_at IS NULL LIMIT 1",
                tables.users
            ),
            roles: format!(
                "SELECT r.name FROM {user_roles} ur \
                 INNER JOIN {roles} r ON r.id = ur.role_id \
                 WHERE ur.user_id = ? AND ur.deleted_at IS NULL AND r.deleted_at IS NULL \
                 ORDER BY r.id",
                user_roles = tables.user_roles,
                roles = tables.roles,
            ),
            modules: grant_query(tables, &tables.role_modules, &tables.modules, "module_id"),
            links: grant_query(tables, &tables.role_links, &tables.links, "link_id"),
        }
    }
}

/// Names granted to any of the user's roles through `grants`.
fn grant_query(tables: &TableNames, grants: &str, targets: &str, target_column: &str) -> String {
    format!(
        "SELECT DISTINCT t.name FROM {user_roles} ur \
         INNER JOIN {grants} g ON g.role_id = ur.role_id \
         INNER JOIN {targets} t ON t.id = g.{target_column} \
         WHERE ur.user_id = ? AND ur.deleted_at IS NULL \
         AND g.deleted_at IS NULL AND t.deleted_at IS NULL \
         ORDER BY t.name",
        user_roles = tables.user_roles,
    )
}

/// Store reading the framework's MySQL tables.
#[derive(Clone)]
pub struct DatabaseStore {
    pool: MySqlPool,
    queries: Queries,
    decoder: SessionDecoder,
    permission_paths: Vec<String>,
}

impl DatabaseStore {
    /// Connects a new pool and creates the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the table names are invalid or the database cannot
    /// be reached.
    pub async fn connect(
        config: &DatabaseConfig,
        options: StoreOptions,
    ) -> Result<Self, Report<StoreError>> {
        options.tables.validate()?;
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connection {
                details: e.to_string(),
            })?;
        debug!(max_connections = config.max_connections, "database pool connected");
        Self::new(pool, options)
    }

    /// Creates a store over an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if a table name is not a plain
    /// identifier.
    pub fn new(pool: MySqlPool, options: StoreOptions) -> Result<Self, Report<StoreError>> {
        options.tables.validate()?;
        Ok(Self {
            pool,
            queries: Queries::new(&options.tables),
            decoder: options.decoder,
            permission_paths: options.permission_paths,
        })
    }

    async fn latest_session_for_user(
        &self,
        id: UserId,
    ) -> Result<Option<SessionRecord>, Report<StoreError>> {
        let row: Option<SessionRow> = sqlx::query_as(&self.queries.latest_session_for_user)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query)?;
        Ok(row.map(SessionRow::into_record))
    }

    async fn fallback_permissions(
        &self,
        id: UserId,
    ) -> Result<ResolvedPermissions, Report<StoreError>> {
        let roles = self.names(&self.queries.roles, id).await?;
        let modules = self.names(&self.queries.modules, id).await?;
        let links = self.names(&self.queries.links, id).await?;
        debug!(
            roles = roles.len(),
            modules = modules.len(),
            links = links.len(),
            "permissions resolved from join tables"
        );
        Ok(ResolvedPermissions::from_rows(roles, modules, links))
    }

    async fn names(&self, sql: &str, id: UserId) -> Result<Vec<String>, Report<StoreError>> {
        let names: Vec<Option<String>> = sqlx::query_scalar(sql)
            .bind(id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::query)?;
        Ok(names.into_iter().flatten().collect())
    }
}

#[async_trait]
impl SessionStore for DatabaseStore {
    #[instrument(skip(self, id))]
    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, Report<StoreError>> {
        let row: Option<SessionRow> = sqlx::query_as(&self.queries.session_by_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query)?;
        Ok(row.map(SessionRow::into_record))
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: UserId) -> Result<Option<LaravelUser>, Report<StoreError>> {
        let row: Option<MySqlRow> = sqlx::query(&self.queries.user_by_id)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query)?;

        match row {
            Some(row) => {
                let user = LaravelUser::from_columns(row_to_map(&row)).ok_or_else(|| {
                    StoreError::Decode {
                        details: format!("user row {id} has no usable id column"),
                    }
                })?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_user_permissions(
        &self,
        id: UserId,
    ) -> Result<Option<Permissions>, Report<StoreError>> {
        if let Some(record) = self.latest_session_for_user(id).await? {
            if let Some(permissions) =
                permissions_from_payload(&self.decoder, &self.permission_paths, &record)
            {
                debug!("permissions found in latest session payload");
                return Ok(Some(permissions));
            }
        }
        let resolved = self.fallback_permissions(id).await?;
        Ok(Some(Permissions::Resolved(resolved)))
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("database pool closed");
    }
}

/// Extracts permissions from a stored session payload.
///
/// `None` sends the caller to the join-table fallback; that includes payloads
/// that no longer decode.
fn permissions_from_payload(
    decoder: &SessionDecoder,
    paths: &[String],
    record: &SessionRecord,
) -> Option<Permissions> {
    match decoder.decode(&record.payload) {
        Ok(session) => session.permissions(paths),
        Err(report) => {
            warn!(session_id = %record.id, error = %report, "could not decode latest session");
            None
        }
    }
}

/// Converts every column of a row into JSON, best effort.
///
/// Integer, float, text, and date/time columns are supported; anything else
/// (decimals, blobs) becomes `null`.
fn row_to_map(row: &MySqlRow) -> serde_json::Map<String, serde_json::Value> {
    row.columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            (column.name().to_string(), column_value(row, index))
        })
        .collect()
}

fn column_value(row: &MySqlRow, index: usize) -> serde_json::Value {
    use serde_json::Value;

    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return v.map_or(Value::Null, |dt| Value::from(dt.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return v.map_or(Value::Null, |d| Value::from(d.format("%Y-%m-%d").to_string()));
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_use_configured_tables() {
        let tables = TableNames {
            sessions: "app_sessions".to_string(),
            user_roles: "role_user".to_string(),
            ..TableNames::default()
        };
        let queries = Queries::new(&tables);
        assert!(queries.session_by_id.contains("FROM app_sessions WHERE id = ?"));
        assert!(queries.latest_session_for_user.contains("ORDER BY last_activity DESC LIMIT 1"));
        assert!(queries.roles.contains("FROM role_user ur"));
        assert!(queries.modules.contains("FROM role_user ur"));
        assert!(queries.links.contains("INNER JOIN role_links g"));
    }

    #[test]
    fn fallback_queries_filter_deleted_rows() {
        let queries = Queries::new(&TableNames::default());
        for sql in [&queries.roles, &queries.modules, &queries.links] {
            assert!(sql.contains("ur.deleted_at IS NULL"), "{sql}");
        }
        assert!(queries.modules.contains("g.deleted_at IS NULL AND t.deleted_at IS NULL"));
        assert!(queries.modules.contains("t.id = g.module_id"));
        assert!(queries.links.contains("t.id = g.link_id"));
        assert!(queries.user_by_id.contains("deleted_at IS NULL"));
    }

    fn stored(serialized: &str) -> SessionRecord {
        use base64::Engine;
        SessionRecord {
            id: "latest".to_string(),
            user_id: Some(UserId::new(42)),
            payload: base64::engine::general_purpose::STANDARD.encode(serialized),
            last_activity: 1_700_000_000,
        }
    }

    #[test]
    fn payload_permissions_skip_the_join_tables() {
        let record = stored(
            r#"a:2:{s:14:"login_web_59ba";i:42;s:11:"permissions";a:4:{s:4:"role";s:6:"editor";s:8:"role_arr";a:1:{i:0;s:6:"editor";}s:7:"modules";a:1:{i:0;s:5:"posts";}s:5:"links";a:0:{}}}"#,
        );
        let permissions = permissions_from_payload(&SessionDecoder::default(), &[], &record);
        let expected = ResolvedPermissions {
            role: Some("editor".to_string()),
            role_arr: vec!["editor".to_string()],
            modules: vec!["posts".to_string()],
            links: vec![],
        };
        assert_eq!(permissions, Some(Permissions::Resolved(expected)));
    }

    #[test]
    fn configured_path_is_read_from_payload() {
        let record = stored(r#"a:1:{s:4:"auth";a:1:{s:9:"abilities";a:1:{i:0;s:4:"read";}}}"#);
        let paths = vec!["auth.abilities".to_string()];
        let permissions = permissions_from_payload(&SessionDecoder::default(), &paths, &record);
        assert_eq!(
            permissions,
            Some(Permissions::Value(serde_json::json!(["read"])))
        );
    }

    #[test]
    fn payload_without_permissions_falls_back() {
        let record = stored(r#"a:2:{s:14:"login_web_59ba";i:42;s:6:"_token";s:3:"tok";}"#);
        assert_eq!(
            permissions_from_payload(&SessionDecoder::default(), &[], &record),
            None
        );
    }

    #[test]
    fn undecodable_payload_falls_back() {
        let record = SessionRecord {
            payload: "not base64 !!".to_string(),
            ..stored("a:0:{}")
        };
        assert_eq!(
            permissions_from_payload(&SessionDecoder::default(), &[], &record),
            None
        );
    }

    #[test]
    fn session_row_ignores_zero_user_id() {
        let record = SessionRow {
            id: "abc".to_string(),
            user_id: Some(0),
            payload: String::new(),
            last_activity: 10,
        }
        .into_record();
        assert_eq!(record.user_id, None);
        assert_eq!(record.last_activity, 10);
    }
}

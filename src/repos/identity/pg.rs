/*
 * Responsibility
 * - users テーブル向け SQLx 操作 (認証に必要な読み取りのみ)
 * - パスワード照合は DB 側 (pgcrypto の crypt()) に委譲する
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoError;
use crate::repos::identity::store::{Identity, IdentityStore};

// Any well-formed bcrypt hash. Unknown usernames are checked against it so that
// crypt() runs once per login attempt either way.
const DUMMY_HASH: &str = "$2a$10$7EqJtq98hPqEX7fNZaFWoOhi5BWX4Z3ZJ0sZ4QJp9YlZ3QxwM3f7e";

#[derive(Debug, FromRow)]
struct IdentityRow {
    id: String,
    user_name: String,
    roles: Vec<String>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: row.id,
            username: row.user_name,
            roles: row.roles.into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, RepoError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT u."userId"::text AS id, u."userName" AS user_name, u.roles
            FROM (SELECT 1) AS probe
            LEFT JOIN users u ON u."userName" = $1
            WHERE crypt($2, COALESCE(u."passwordHash", $3)) = u."passwordHash"
            "#,
        )
        .bind(username)
        .bind(password)
        .bind(DUMMY_HASH)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Identity::from))
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Option<Identity>, RepoError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT "userId"::text AS id, "userName" AS user_name, roles
            FROM users
            WHERE "userId"::text = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Identity::from))
    }
}

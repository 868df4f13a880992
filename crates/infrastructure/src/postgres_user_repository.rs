use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use gymgate_application::UserRepository;
use gymgate_core::{AppError, AppResult, UserId};
use gymgate_domain::{EmailAddress, User};

/// PostgreSQL-backed account store.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a user repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    photo_path: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::from_uuid(row.id),
            email: EmailAddress::new(row.email)?,
            display_name: row.display_name,
            password_hash: row.password_hash,
            photo_path: row.photo_path,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, display_name, password_hash, photo_path
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        row.map(User::try_from).transpose()
    }

    async fn search_users(&self, query: &str) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, display_name, password_hash, photo_path
            FROM users
            WHERE display_name ILIKE '%' || $1 || '%'
               OR email ILIKE '%' || $1 || '%'
            ORDER BY display_name
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to search users: {error}")))?;

        rows.into_iter().map(User::try_from).collect()
    }
}

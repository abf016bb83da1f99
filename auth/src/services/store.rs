use authbridge_models::{
    AuthMethod, Login, OAuth2Provider, Oauth2Token, PasswordCredential, User, UserStatus,
};
use chrono::{NaiveDate, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::error::{unique_violation_to_conflict, AuthError};

/// Identity fields for a user row about to be created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub verification_code: String,
}

/// Credential material to attach to a new login.
#[derive(Debug, Clone)]
pub enum NewCredential {
    Password { hash: String },
    Oauth2 {
        provider: OAuth2Provider,
        provider_user_id: String,
    },
}

impl NewCredential {
    pub fn method(&self) -> AuthMethod {
        match self {
            NewCredential::Password { .. } => AuthMethod::Password,
            NewCredential::Oauth2 { .. } => AuthMethod::Oauth2,
        }
    }
}

/// All persistence for users, logins and their credentials. Every read
/// filters soft-deleted rows; uniqueness of live emails and live provider
/// subjects is enforced by partial indexes, not application checks alone.
#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        UserStore { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, birth_date, status,
                   verification_code, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_user(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, birth_date, status,
                   verification_code, created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_user(row).await?)),
            None => Ok(None),
        }
    }

    /// Creates a user together with its first login and credential in one
    /// transaction. A live-email collision maps to a conflict so that two
    /// racing registrations cannot both land.
    pub async fn create_user_with_login(
        &self,
        new_user: NewUser,
        credential: NewCredential,
    ) -> Result<User, AuthError> {
        let mut tx = self.pool.begin().await?;
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, birth_date, status,
                verification_code, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user_id)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(new_user.birth_date)
        .bind(UserStatus::PendingVerification.as_str())
        .bind(&new_user.verification_code)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|error| unique_violation_to_conflict(error, "Email already exists"))?;

        Self::insert_login(&mut tx, user_id, credential).await?;
        tx.commit().await?;

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::internal("created user row is missing"))
    }

    /// Attaches an additional login to an existing user.
    pub async fn create_login_for_user(
        &self,
        user_id: Uuid,
        credential: NewCredential,
    ) -> Result<Login, AuthError> {
        let mut tx = self.pool.begin().await?;
        let login = Self::insert_login(&mut tx, user_id, credential).await?;
        tx.commit().await?;
        Ok(login)
    }

    async fn insert_login(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        credential: NewCredential,
    ) -> Result<Login, AuthError> {
        let login_id = Uuid::new_v4();
        let now = Utc::now();
        let method = credential.method();

        sqlx::query(
            r#"
            INSERT INTO logins (id, method, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(login_id)
        .bind(method.as_str())
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        match credential {
            NewCredential::Password { hash } => {
                sqlx::query(
                    r#"
                    INSERT INTO passwords (id, hash, is_active, login_id, created_at, updated_at)
                    VALUES ($1, $2, TRUE, $3, $4, $5)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&hash)
                .bind(login_id)
                .bind(now)
                .bind(now)
                .execute(&mut **tx)
                .await?;
            }
            NewCredential::Oauth2 {
                provider,
                provider_user_id,
            } => {
                sqlx::query(
                    r#"
                    INSERT INTO oauth2_tokens (
                        id, provider_user_id, provider, login_id, created_at, updated_at
                    ) VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&provider_user_id)
                .bind(provider.as_str())
                .bind(login_id)
                .bind(now)
                .bind(now)
                .execute(&mut **tx)
                .await
                .map_err(|error| {
                    unique_violation_to_conflict(
                        error,
                        "provider user id not matched with saved provider user id",
                    )
                })?;
            }
        }

        Ok(Login {
            id: login_id,
            method,
            user_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub async fn set_status(&self, user_id: Uuid, status: UserStatus) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE users SET status = $1, updated_at = $2
            WHERE id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The currently valid password hash for a login, if it has one.
    pub async fn find_active_password(
        &self,
        login_id: Uuid,
    ) -> Result<Option<PasswordCredential>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, hash, is_active, login_id, created_at, updated_at, deleted_at
            FROM passwords
            WHERE login_id = $1 AND is_active = TRUE AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PasswordCredential {
            id: row.get("id"),
            hash: row.get("hash"),
            is_active: row.get("is_active"),
            login_id: row.get("login_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            deleted_at: row.get("deleted_at"),
        }))
    }

    /// Provider bindings among the given logins, for link decisions.
    pub async fn find_oauth2_tokens(
        &self,
        login_ids: &[Uuid],
        provider: OAuth2Provider,
    ) -> Result<Vec<Oauth2Token>, AuthError> {
        let rows = sqlx::query(
            r#"
            SELECT id, provider_user_id, provider, user_agent, ip_address,
                   login_id, created_at, updated_at, deleted_at
            FROM oauth2_tokens
            WHERE login_id = ANY($1) AND provider = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(login_ids)
        .bind(provider.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::map_oauth2_token).collect()
    }

    async fn hydrate_user(&self, row: PgRow) -> Result<User, AuthError> {
        let user_id: Uuid = row.get("id");
        let logins = self.find_logins(user_id).await?;
        let status_str: String = row.get("status");
        let status = UserStatus::parse(&status_str)
            .ok_or_else(|| AuthError::internal(format!("unknown user status {status_str}")))?;

        Ok(User {
            id: user_id,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            birth_date: row.get("birth_date"),
            status,
            verification_code: row.get("verification_code"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            deleted_at: row.get("deleted_at"),
            logins,
        })
    }

    async fn find_logins(&self, user_id: Uuid) -> Result<Vec<Login>, AuthError> {
        let rows = sqlx::query(
            r#"
            SELECT id, method, user_id, created_at, updated_at, deleted_at
            FROM logins
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let method_str: String = row.get("method");
                let method = AuthMethod::parse(&method_str).ok_or_else(|| {
                    AuthError::internal(format!("unknown login method {method_str}"))
                })?;
                Ok(Login {
                    id: row.get("id"),
                    method,
                    user_id: row.get("user_id"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                    deleted_at: row.get("deleted_at"),
                })
            })
            .collect()
    }

    fn map_oauth2_token(row: PgRow) -> Result<Oauth2Token, AuthError> {
        let provider_str: String = row.get("provider");
        let provider = OAuth2Provider::parse(&provider_str)
            .ok_or_else(|| AuthError::internal(format!("unknown provider {provider_str}")))?;
        Ok(Oauth2Token {
            id: row.get("id"),
            provider_user_id: row.get("provider_user_id"),
            provider,
            user_agent: row.get("user_agent"),
            ip_address: row.get("ip_address"),
            login_id: row.get("login_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            deleted_at: row.get("deleted_at"),
        })
    }
}

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;

use super::{into_result, present, FieldErrors, Validate};
use crate::database::bind::bind_fragment_as;
use crate::database::manager::DatabaseError;
use crate::sql::{build_set_fragment, ColumnMap, UpdateRequest};

static UPDATE_COLUMNS: Lazy<ColumnMap> = Lazy::new(|| {
    ColumnMap::from_pairs([("firstName", "first_name"), ("lastName", "last_name")])
});

const USER_COLUMNS: &str = "username, first_name, last_name, email, is_admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

/// Profile fields a user may change. Admin status is not editable here, and
/// none of these columns are nullable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<String>,
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, value) in [("firstName", &self.first_name), ("lastName", &self.last_name)] {
            if matches!(value.as_deref(), Some(v) if v.is_empty() || v.chars().count() > 30) {
                errors.insert(field.into(), "must be 1 to 30 characters".into());
            }
        }
        if let Some(email) = self.email.as_deref() {
            let looks_valid = matches!(
                email.split_once('@'),
                Some((user, host)) if !user.is_empty() && host.contains('.')
            );
            if !looks_valid {
                errors.insert("email".into(), "must be an email address".into());
            }
        }
        into_result(errors)
    }
}

impl From<UserUpdate> for UpdateRequest {
    fn from(update: UserUpdate) -> Self {
        let mut request = UpdateRequest::new();
        if let Some(first_name) = update.first_name {
            request.push("firstName", first_name);
        }
        if let Some(last_name) = update.last_name {
            request.push("lastName", last_name);
        }
        if let Some(email) = update.email {
            request.push("email", email);
        }
        request
    }
}

impl User {
    pub async fn find_all(pool: &PgPool) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?;
        Ok(users)
    }

    pub async fn get(pool: &PgPool, username: &str) -> Result<User, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No user: {}", username)))
    }

    pub async fn update(
        pool: &PgPool,
        username: &str,
        data: &UpdateRequest,
    ) -> Result<User, DatabaseError> {
        let set = build_set_fragment(data, &UPDATE_COLUMNS)?;
        let sql = format!(
            "UPDATE users SET {} WHERE username = {} RETURNING {}",
            set.sql,
            set.next_placeholder(),
            USER_COLUMNS
        );

        let user = bind_fragment_as(sqlx::query_as::<_, User>(&sql), &set)
            .bind(username)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No user: {}", username)))?;

        info!("Updated user {}", username);
        Ok(user)
    }

    pub async fn remove(pool: &PgPool, username: &str) -> Result<(), DatabaseError> {
        let deleted = sqlx::query_scalar::<_, String>(
            "DELETE FROM users WHERE username = $1 RETURNING username",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;
        if deleted.is_none() {
            return Err(DatabaseError::NotFound(format!("No user: {}", username)));
        }

        info!("Removed user {}", username);
        Ok(())
    }
}

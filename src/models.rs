use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// User projection returned to clients; never carries the password hash.
#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct PublicUser {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[schema(example = false)]
    pub is_admin: bool,
    #[schema(example = "2024-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

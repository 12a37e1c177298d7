//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Regular,
    Author,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Regular => "regular",
            Role::Author => "author",
        }
    }

    /// Roles an administrator may hand out through role assignment
    pub fn is_assignable(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff | Role::Regular)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "regular" => Ok(Role::Regular),
            "author" => Ok(Role::Author),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Regular
    }
}

// SQLx conversion for Role (stored as text)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub role: Role,
    pub company_department_id: Option<i32>,
    pub company_id: Option<i32>,
    pub manager_id: Option<i32>,
    pub avatar_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserOut {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub role: Role,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        UserOut {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            role: user.role,
        }
    }
}

/// Signup request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Tokens issued on login or refresh
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserOut,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Refresh request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Assign role request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRole {
    pub user_id: i32,
    pub role: Role,
}

/// Kind of JWT issued by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub token_use: TokenUse,
    pub jti: uuid::Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require staff or admin privileges
    pub fn require_staff(&self) -> Result<(), AppError> {
        if matches!(self.role, Role::Admin | Role::Staff) {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff access required".to_string()))
        }
    }

    /// Only regular users borrow and return books
    pub fn require_regular(&self) -> Result<(), AppError> {
        if self.role == Role::Regular {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Only regular users can borrow or return books".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> UserClaims {
        let now = chrono::Utc::now().timestamp();
        UserClaims {
            sub: "reader@example.org".to_string(),
            user_id: 7,
            role,
            token_use: TokenUse::Access,
            jti: uuid::Uuid::new_v4(),
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = claims(Role::Regular).create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.role, Role::Regular);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_role_guards() {
        assert!(claims(Role::Admin).require_admin().is_ok());
        assert!(claims(Role::Staff).require_admin().is_err());
        assert!(claims(Role::Staff).require_staff().is_ok());
        assert!(claims(Role::Regular).require_regular().is_ok());
        assert!(claims(Role::Admin).require_regular().is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("librarian".parse::<Role>().is_err());
        assert!(!Role::Author.is_assignable());
    }
}

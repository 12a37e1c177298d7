//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{AssignRole, CreateUser, LoginResponse, Role, TokenUse, User, UserClaims, UserOut},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account. Self-registration may only ask for the
    /// regular or author role.
    pub async fn signup(&self, data: CreateUser) -> AppResult<UserOut> {
        data.validate()?;

        let role = data.role.unwrap_or_default();
        if !matches!(role, Role::Regular | Role::Author) {
            return Err(AppError::Authorization(format!(
                "Role '{}' can only be granted by an administrator",
                role
            )));
        }

        if self
            .repository
            .users
            .identity_exists(&data.username, &data.email)
            .await?
        {
            return Err(AppError::Conflict("Username or email already registered".to_string()));
        }

        let hashed = hash_password(&data.password)?;
        let user = self
            .repository
            .users
            .create(&data.username, &data.email, &hashed, data.full_name.as_deref(), role)
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user.into())
    }

    /// Authenticate by username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginResponse> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user.hashed_password, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }
        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        self.issue_tokens(user)
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<LoginResponse> {
        let claims = UserClaims::from_token(refresh_token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        if claims.token_use != TokenUse::Refresh {
            return Err(AppError::Authentication("Not a refresh token".to_string()));
        }

        let user = self.repository.users.get_by_id(claims.user_id).await?;
        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        self.issue_tokens(user)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<UserOut> {
        Ok(self.repository.users.get_by_id(id).await?.into())
    }

    /// Grant a role to another user
    pub async fn assign_role(&self, request: AssignRole) -> AppResult<UserOut> {
        if !request.role.is_assignable() {
            return Err(AppError::Validation(format!("Invalid role: {}", request.role)));
        }

        let user = self.repository.users.set_role(request.user_id, request.role).await?;
        tracing::info!(user_id = user.id, role = %user.role, "Role assigned");
        Ok(user.into())
    }

    fn issue_tokens(&self, user: User) -> AppResult<LoginResponse> {
        let access_token = create_token(&user, TokenUse::Access, &self.config)?;
        let refresh_token = create_token(&user, TokenUse::Refresh, &self.config)?;

        Ok(LoginResponse {
            user: user.into(),
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Sign an access or refresh token for a user
pub fn create_token(user: &User, token_use: TokenUse, config: &AuthConfig) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let lifetime = match token_use {
        TokenUse::Access => config.jwt_expiration_hours as i64 * 3600,
        TokenUse::Refresh => config.refresh_expiration_days as i64 * 24 * 3600,
    };

    let claims = UserClaims {
        sub: user.username.clone(),
        user_id: user.id,
        role: user.role,
        token_use,
        jti: uuid::Uuid::new_v4(),
        exp: now + lifetime,
        iat: now,
    };

    claims
        .create_token(&config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: 3,
            username: "reader".to_string(),
            email: "reader@example.org".to_string(),
            hashed_password: String::new(),
            full_name: None,
            is_active: true,
            role,
            company_department_id: None,
            company_id: None,
            manager_id: None,
            avatar_url: None,
            created_at: None,
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password(&hash, "s3cret").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn test_refresh_token_outlives_access_token() {
        let config = AuthConfig::default();
        let access = create_token(&user(Role::Regular), TokenUse::Access, &config).unwrap();
        let refresh = create_token(&user(Role::Regular), TokenUse::Refresh, &config).unwrap();

        let access = UserClaims::from_token(&access, &config.jwt_secret).unwrap();
        let refresh = UserClaims::from_token(&refresh, &config.jwt_secret).unwrap();

        assert_eq!(access.token_use, TokenUse::Access);
        assert_eq!(refresh.token_use, TokenUse::Refresh);
        assert!(refresh.exp > access.exp);
        assert_ne!(access.jti, refresh.jti);
    }
}

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use rishta_db::Database;
use rishta_db::models::NewUser;
use rishta_types::api::{
    AdminAuthResponse, AdminClaims, AdminProfile, AuthResponse, LoginRequest, Profile,
    RegisterRequest, UserClaims,
};
use rishta_types::policy;

use crate::error::{ApiError, ApiResult};
use crate::extract::AppJson;
use crate::response::{created, ok};
use crate::state::AppState;

pub const ADMIN_ROLE: &str = "admin";

const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(req: &RegisterRequest) -> ApiResult<()> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(ApiError::validation("Name must be between 1 and 100 characters"));
    }
    let email = normalize_email(&req.email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(ApiError::validation("A valid email address is required")),
    }
    let digits = req.phone.chars().filter(char::is_ascii_digit).count();
    if !(7..=15).contains(&digits) {
        return Err(ApiError::validation("A valid phone number is required"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn email_taken() -> ApiError {
    ApiError::Conflict("An account with this email already exists".into())
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_registration(&req)?;

    let email = normalize_email(&req.email);
    let lookup = email.clone();
    if state.run(move |db| db.email_exists(&lookup)).await? {
        return Err(email_taken());
    }

    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();
    let user = state
        .run(move |db| {
            db.create_user(
                &NewUser {
                    name: req.name.trim(),
                    email: &email,
                    phone: req.phone.trim(),
                    password_hash: &password_hash,
                    role: req.role,
                },
                now,
            )
        })
        .await?
        // A concurrent registration can take the email after the check above.
        .ok_or_else(email_taken)?;

    let token = create_user_token(&state.user_jwt_secret, user.id, &user.email, state.token_ttl_days)?;
    info!("Member {} registered as {}", user.id, user.role);

    Ok(created(
        "Registration successful",
        AuthResponse {
            token,
            user: Profile::from_user(user, now),
        },
    ))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email);
    let creds = state
        .run(move |db| db.get_credentials_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&req.password, &creds.password_hash) {
        return Err(ApiError::Unauthorized);
    }
    policy::ensure_not_blocked(&creds.user)?;

    let user = creds.user;
    let token = create_user_token(&state.user_jwt_secret, user.id, &user.email, state.token_ttl_days)?;

    Ok(ok(AuthResponse {
        token,
        user: Profile::from_user(user, Utc::now()),
    }))
}

pub async fn admin_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email);
    let creds = state
        .run(move |db| db.get_admin_credentials(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&req.password, &creds.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let admin = creds.admin;
    let token = create_admin_token(&state.admin_jwt_secret, admin.id, &admin.email, state.token_ttl_days)?;
    info!("Admin {} logged in", admin.email);

    Ok(ok(AdminAuthResponse {
        token,
        admin: AdminProfile {
            id: admin.id,
            email: admin.email,
            name: admin.name,
        },
    }))
}

/// Creates the first admin account when none exists. Returns whether one
/// was created.
pub fn seed_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<bool> {
    if db.count_admins()? > 0 {
        return Ok(false);
    }
    let hash = hash_password(password)?;
    db.create_admin(&normalize_email(email), "Administrator", &hash, Utc::now())?;
    Ok(true)
}

fn expiry(ttl_days: i64) -> usize {
    (Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize
}

pub fn create_user_token(secret: &str, user_id: Uuid, email: &str, ttl_days: i64) -> anyhow::Result<String> {
    let claims = UserClaims {
        sub: user_id,
        email: email.to_string(),
        exp: expiry(ttl_days),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn create_admin_token(secret: &str, admin_id: Uuid, email: &str, ttl_days: i64) -> anyhow::Result<String> {
    let claims = AdminClaims {
        sub: admin_id,
        email: email.to_string(),
        role: ADMIN_ROLE.to_string(),
        exp: expiry(ttl_days),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rishta_types::models::Role;

    fn registration(email: &str, phone: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Priya".into(),
            email: email.into(),
            phone: phone.into(),
            password: password.into(),
            role: Role::Bride,
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn registration_validation() {
        assert!(validate_registration(&registration("p@example.com", "+91 98765 43210", "longenough")).is_ok());
        assert!(validate_registration(&registration("no-at-sign", "9876543210", "longenough")).is_err());
        assert!(validate_registration(&registration("p@example.com", "12", "longenough")).is_err());
        assert!(validate_registration(&registration("p@example.com", "9876543210", "short")).is_err());
    }

    #[test]
    fn seed_admin_only_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(seed_admin(&db, "Admin@Rishta.app", "supersecret").unwrap());
        assert!(!seed_admin(&db, "other@rishta.app", "supersecret").unwrap());
        assert!(db.get_admin_credentials("admin@rishta.app").unwrap().is_some());
    }
}

use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

const MIN_SECRET_LEN: usize = 16;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub user_jwt_secret: String,
    pub admin_jwt_secret: String,
    pub token_ttl_days: i64,
    /// First admin account, created only while the admins table is empty.
    pub admin_seed: Option<(String, String)>,
    pub push: Option<PushConfig>,
}

pub struct PushConfig {
    pub url: String,
    pub key: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let user_jwt_secret = secret(var("RISHTA_USER_JWT_SECRET"), "RISHTA_USER_JWT_SECRET")?;
        let admin_jwt_secret = secret(var("RISHTA_ADMIN_JWT_SECRET"), "RISHTA_ADMIN_JWT_SECRET")?;
        if user_jwt_secret == admin_jwt_secret {
            bail!("RISHTA_USER_JWT_SECRET and RISHTA_ADMIN_JWT_SECRET must differ");
        }

        let port = match var("RISHTA_PORT") {
            Some(p) => p.parse::<u16>().with_context(|| format!("invalid RISHTA_PORT {:?}", p))?,
            None => 5000,
        };
        let token_ttl_days = match var("RISHTA_TOKEN_TTL_DAYS") {
            Some(d) => d
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .with_context(|| format!("invalid RISHTA_TOKEN_TTL_DAYS {:?}", d))?,
            None => 30,
        };

        let admin_seed = match (var("RISHTA_ADMIN_EMAIL"), var("RISHTA_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => {
                if password.len() < 8 {
                    bail!("RISHTA_ADMIN_PASSWORD must be at least 8 characters");
                }
                Some((email, password))
            }
            (None, None) => None,
            _ => bail!("RISHTA_ADMIN_EMAIL and RISHTA_ADMIN_PASSWORD must be set together"),
        };

        let push = match (var("RISHTA_PUSH_URL"), var("RISHTA_PUSH_KEY")) {
            (Some(url), Some(key)) => Some(PushConfig { url, key }),
            (None, _) => None,
            (Some(_), None) => bail!("RISHTA_PUSH_URL is set but RISHTA_PUSH_KEY is not"),
        };

        Ok(Self {
            host: var("RISHTA_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("RISHTA_DB_PATH").unwrap_or_else(|| "rishta.db".into()).into(),
            user_jwt_secret,
            admin_jwt_secret,
            token_ttl_days,
            admin_seed,
            push,
        })
    }
}

fn secret(value: Option<String>, name: &str) -> anyhow::Result<String> {
    match value {
        Some(s) if !PLACEHOLDER_SECRETS.contains(&s.as_str()) && s.len() >= MIN_SECRET_LEN => Ok(s),
        Some(_) => bail!("{} is a placeholder or shorter than {} characters", name, MIN_SECRET_LEN),
        None => bail!("{} is unset", name),
    }
}

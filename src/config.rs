use std::{path::PathBuf, str::FromStr};

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::wallet::services::{MAX_MONEY, MONEY_SCALE};

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    /// Token records older than this are purged on logout.
    pub retention_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub initial_balance: Decimal,
    pub purchase_max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    Local {
        root: PathBuf,
    },
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub ledger: LedgerConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never touch process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            access_secret: required("JWT_ACCESS_SECRET")?,
            refresh_secret: required("JWT_REFRESH_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "gallery".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "gallery-users".into()),
            access_ttl_minutes: positive(&lookup, "JWT_ACCESS_TTL_MINUTES", 30)?,
            refresh_ttl_minutes: positive(&lookup, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7)?,
            retention_hours: positive(&lookup, "TOKEN_RETENTION_HOURS", 24)?,
        };
        if jwt.access_secret.is_empty() || jwt.refresh_secret.is_empty() {
            anyhow::bail!("JWT secrets must not be empty");
        }
        if jwt.access_secret == jwt.refresh_secret {
            tracing::warn!("access and refresh tokens share one signing secret");
        }

        let initial_balance = parsed(&lookup, "WALLET_INITIAL_BALANCE", Decimal::new(3000, 2))?;
        if initial_balance.is_sign_negative() && !initial_balance.is_zero() {
            anyhow::bail!("WALLET_INITIAL_BALANCE must not be negative");
        }
        if initial_balance.normalize().scale() > MONEY_SCALE || initial_balance > MAX_MONEY {
            anyhow::bail!("WALLET_INITIAL_BALANCE must be at most 99999999.99 with 2 decimal places");
        }
        let ledger = LedgerConfig {
            initial_balance,
            purchase_max_attempts: parsed(&lookup, "PURCHASE_MAX_ATTEMPTS", 3u32)?.max(1),
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                root: lookup("STORAGE_LOCAL_ROOT")
                    .unwrap_or_else(|| "./data_file".into())
                    .into(),
            },
            "s3" => StorageConfig::S3 {
                endpoint: required("S3_ENDPOINT")?,
                bucket: required("S3_BUCKET")?,
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
                region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
            },
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}"),
        };

        Ok(Self {
            database_url,
            db_max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 10u32)?.max(1),
            jwt,
            ledger,
            storage,
        })
    }
}

/// Default when unset; a value that is set but does not parse is an error.
fn parsed<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
    }
}

fn positive<F>(lookup: &F, key: &str, default: i64) -> anyhow::Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parsed(lookup, key, default)?;
    if value <= 0 {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/gallery"),
        ("JWT_ACCESS_SECRET", "access"),
        ("JWT_REFRESH_SECRET", "refresh"),
    ];

    #[test]
    fn defaults_are_applied() {
        let cfg = AppConfig::from_lookup(lookup_from(BASE)).expect("config");
        assert_eq!(cfg.jwt.access_ttl_minutes, 30);
        assert_eq!(cfg.jwt.refresh_ttl_minutes, 7 * 24 * 60);
        assert_eq!(cfg.jwt.retention_hours, 24);
        assert_eq!(cfg.ledger.initial_balance.to_string(), "30.00");
        assert_eq!(cfg.ledger.purchase_max_attempts, 3);
        assert!(matches!(cfg.storage, StorageConfig::Local { .. }));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_ACCESS_SECRET"));
    }

    #[test]
    fn overrides_and_s3_backend() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("JWT_ACCESS_TTL_MINUTES", "5"),
            ("WALLET_INITIAL_BALANCE", "12.50"),
            ("PURCHASE_MAX_ATTEMPTS", "0"),
            ("STORAGE_BACKEND", "s3"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("S3_BUCKET", "photos"),
            ("S3_ACCESS_KEY", "k"),
            ("S3_SECRET_KEY", "s"),
        ]);
        let cfg = AppConfig::from_lookup(lookup_from(&pairs)).expect("config");
        assert_eq!(cfg.jwt.access_ttl_minutes, 5);
        assert_eq!(cfg.ledger.initial_balance.to_string(), "12.50");
        assert_eq!(cfg.ledger.purchase_max_attempts, 1);
        match cfg.storage {
            StorageConfig::S3 { bucket, region, .. } => {
                assert_eq!(bucket, "photos");
                assert_eq!(region, "us-east-1");
            }
            other => panic!("unexpected storage config {other:?}"),
        }
    }

    fn with(extra: &[(&'static str, &'static str)]) -> anyhow::Result<AppConfig> {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(extra);
        AppConfig::from_lookup(lookup_from(&pairs))
    }

    #[test]
    fn unparseable_values_are_errors_not_defaults() {
        let err = with(&[("WALLET_INITIAL_BALANCE", "30,00")]).unwrap_err();
        assert!(err.to_string().contains("WALLET_INITIAL_BALANCE"));
        let err = with(&[("JWT_ACCESS_TTL_MINUTES", "thirty")]).unwrap_err();
        assert!(err.to_string().contains("JWT_ACCESS_TTL_MINUTES"));
        assert!(with(&[("PURCHASE_MAX_ATTEMPTS", "-1")]).is_err());
    }

    #[test]
    fn initial_balance_must_fit_a_wallet() {
        assert!(with(&[("WALLET_INITIAL_BALANCE", "-5")]).is_err());
        assert!(with(&[("WALLET_INITIAL_BALANCE", "1.005")]).is_err());
        assert!(with(&[("WALLET_INITIAL_BALANCE", "100000000")]).is_err());
        let cfg = with(&[("WALLET_INITIAL_BALANCE", "0")]).expect("zero balance");
        assert!(cfg.ledger.initial_balance.is_zero());
        let cfg = with(&[("WALLET_INITIAL_BALANCE", "1.50")]).expect("cents");
        assert_eq!(cfg.ledger.initial_balance.to_string(), "1.50");
    }

    #[test]
    fn lifetimes_must_be_positive() {
        for key in ["JWT_ACCESS_TTL_MINUTES", "JWT_REFRESH_TTL_MINUTES", "TOKEN_RETENTION_HOURS"] {
            let err = with(&[(key, "0")]).unwrap_err();
            assert!(err.to_string().contains(key), "{key}");
            assert!(with(&[(key, "-30")]).is_err(), "{key}");
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("STORAGE_BACKEND", "ftp"));
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
    }
}

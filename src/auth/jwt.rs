use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, DecodingKey, EncodingKey, Header,
    Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::config::JwtConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("bad token signature")]
    BadSignature,
    #[error("expected {0:?} token")]
    WrongKind(TokenKind),
    #[error("token signing failed")]
    Signing,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::ExpiredSignature => Self::Expired,
            JwtErrorKind::InvalidSignature => Self::BadSignature,
            _ => Self::Malformed,
        }
    }
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies access/refresh JWTs. Stateless: revocation lives in the token table.
#[derive(Clone)]
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            access: KeyPair::from_secret(&cfg.access_secret),
            refresh: KeyPair::from_secret(&cfg.refresh_secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::minutes(cfg.access_ttl_minutes),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(|_| TokenError::Signing)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id)?,
            refresh_token: self.issue_refresh(user_id)?,
        })
    }

    /// Verifies signature, expiry, issuer and audience against the secret for `kind`.
    pub fn decode(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation)?;
        if data.claims.kind != kind {
            return Err(TokenError::WrongKind(kind));
        }
        debug!(user_id = %data.claims.sub, kind = ?kind, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config(access: &str, refresh: &str) -> JwtConfig {
        JwtConfig {
            access_secret: access.into(),
            refresh_secret: refresh.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            access_ttl_minutes: 30,
            refresh_ttl_minutes: 60 * 24 * 7,
            retention_hours: 24,
        }
    }

    fn make_service() -> TokenService {
        TokenService::new(&jwt_config("access-secret", "refresh-secret"))
    }

    #[test]
    fn sign_and_decode_access_token() {
        let tokens = make_service();
        let user_id = Uuid::new_v4();
        let token = tokens.issue_access(user_id).expect("sign access");
        let claims = tokens.decode(&token, TokenKind::Access).expect("decode");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn refresh_token_lives_seven_days() {
        let tokens = make_service();
        let token = tokens.issue_refresh(Uuid::new_v4()).expect("sign refresh");
        let claims = tokens.decode(&token, TokenKind::Refresh).expect("decode");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn tokens_issued_together_are_distinct() {
        let tokens = make_service();
        let user_id = Uuid::new_v4();
        let a = tokens.issue_access(user_id).unwrap();
        let b = tokens.issue_access(user_id).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn access_token_is_not_accepted_as_refresh() {
        let tokens = make_service();
        let pair = tokens.issue_pair(Uuid::new_v4()).unwrap();
        // different secrets per kind, so the signature check fails first
        assert_eq!(
            tokens.decode(&pair.access_token, TokenKind::Refresh).unwrap_err(),
            TokenError::BadSignature
        );
        assert_eq!(
            tokens.decode(&pair.refresh_token, TokenKind::Access).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn shared_secret_still_checks_kind() {
        let tokens = TokenService::new(&jwt_config("same", "same"));
        let refresh = tokens.issue_refresh(Uuid::new_v4()).unwrap();
        assert_eq!(
            tokens.decode(&refresh, TokenKind::Access).unwrap_err(),
            TokenError::WrongKind(TokenKind::Access)
        );
    }

    #[test]
    fn foreign_secret_is_bad_signature() {
        let ours = make_service();
        let theirs = TokenService::new(&jwt_config("other", "other-refresh"));
        let token = theirs.issue_access(Uuid::new_v4()).unwrap();
        assert_eq!(
            ours.decode(&token, TokenKind::Access).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = make_service();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            iat: now - 7200,
            exp: now - 3600,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
            kind: TokenKind::Access,
        };
        let token = encode(&Header::default(), &claims, &tokens.access.encoding).unwrap();
        assert_eq!(
            tokens.decode(&token, TokenKind::Access).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let tokens = make_service();
        assert_eq!(
            tokens.decode("not-a-jwt", TokenKind::Access).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let ours = make_service();
        let mut cfg = jwt_config("access-secret", "refresh-secret");
        cfg.audience = "someone-else".into();
        let theirs = TokenService::new(&cfg);
        let token = theirs.issue_access(Uuid::new_v4()).unwrap();
        assert!(ours.decode(&token, TokenKind::Access).is_err());
    }
}

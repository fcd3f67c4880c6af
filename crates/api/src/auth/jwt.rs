//! HS256 session tokens.
//!
//! Tokens carry `{user_id, username, exp}`. Tokens minted by other clients of
//! the same secret sometimes encode `user_id` as a float or a string, so the
//! decoder accepts any of those as long as the value is a whole,
//! non-negative number.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use npuwatch_core::types::DbId;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(deserialize_with = "deserialize_user_id")]
    pub user_id: DbId,
    pub username: String,
    /// Expiration (UTC Unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime in hours (default: 24).
    pub expire_hours: i64,
}

pub const DEFAULT_EXPIRE_HOURS: i64 = 24;

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expire_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expire_hours: if expire_hours > 0 {
                expire_hours
            } else {
                DEFAULT_EXPIRE_HOURS
            },
        }
    }
}

pub fn generate_token(
    user_id: DbId,
    username: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = chrono::Utc::now().timestamp() + config.expire_hours * 3600;
    let claims = Claims {
        user_id,
        username: username.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify signature and expiry, and require a non-empty username.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    if data.claims.username.is_empty() {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(data.claims)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Int(u64),
    Float(f64),
    Text(String),
}

fn deserialize_user_id<'de, D>(deserializer: D) -> Result<DbId, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let whole = |value: f64| -> Option<DbId> {
        (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= DbId::MAX as f64)
            .then_some(value as DbId)
    };

    let id = match RawUserId::deserialize(deserializer)? {
        RawUserId::Int(value) => DbId::try_from(value).ok(),
        RawUserId::Float(value) => whole(value),
        RawUserId::Text(text) => {
            let text = text.trim();
            text.parse::<DbId>()
                .ok()
                .filter(|id| *id >= 0)
                .or_else(|| text.parse::<f64>().ok().and_then(whole))
        }
    };
    id.ok_or_else(|| D::Error::custom("user_id is not a non-negative integer"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig::new("test-secret-that-is-long-enough-for-hmac", 24)
    }

    fn sign(claims: serde_json::Value, config: &JwtConfig) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("encoding should succeed")
    }

    fn future_exp() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn generated_token_validates() {
        let config = test_config();
        let token = generate_token(42, "admin", &config).expect("token generation should succeed");
        let claims = validate_token(&token, &config).expect("token validation should succeed");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "admin");
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn expired_token_fails() {
        let config = test_config();
        // Well past the default 60 s leeway.
        let exp = chrono::Utc::now().timestamp() - 300;
        let token = sign(json!({"user_id": 1, "username": "a", "exp": exp}), &config);
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn different_secret_fails() {
        let token = generate_token(1, "a", &JwtConfig::new("secret-alpha", 24)).unwrap();
        assert!(validate_token(&token, &JwtConfig::new("secret-bravo", 24)).is_err());
    }

    #[test]
    fn user_id_is_decoded_tolerantly() {
        let config = test_config();
        for raw in [json!(7), json!(7.0), json!("7"), json!("7.0")] {
            let token = sign(
                json!({"user_id": raw, "username": "ops", "exp": future_exp()}),
                &config,
            );
            let claims = validate_token(&token, &config).expect("tolerant user_id");
            assert_eq!(claims.user_id, 7, "raw value {raw}");
        }
    }

    #[test]
    fn fractional_or_negative_user_id_is_rejected() {
        let config = test_config();
        for raw in [json!(7.5), json!(-1), json!("abc"), json!(null)] {
            let token = sign(
                json!({"user_id": raw, "username": "ops", "exp": future_exp()}),
                &config,
            );
            assert!(validate_token(&token, &config).is_err(), "raw value {raw}");
        }
    }

    #[test]
    fn empty_username_is_rejected() {
        let config = test_config();
        let token = sign(
            json!({"user_id": 1, "username": "", "exp": future_exp()}),
            &config,
        );
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn non_positive_lifetime_falls_back_to_default() {
        assert_eq!(JwtConfig::new("s", 0).expire_hours, DEFAULT_EXPIRE_HOURS);
    }
}

use super::model::Claims;
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::time::Duration;

/// Verifies HS256 access tokens issued by the external identity service.
pub struct JwtValidator {
    decoding_key: DecodingKey,
    issuer: Option<String>,
    leeway: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, issuer: Option<String>, leeway: Duration) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            leeway: leeway.as_secs(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        // Validate algorithm from header
        if header.alg != Algorithm::HS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only HS256 is allowed",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(AppError::Auth("Token subject is empty".to_string()));
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token_for(sub: &str, exp_offset: i64, iss: Option<&str>, alg: Algorithm) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset) as u64;
        let claims = Claims {
            sub: sub.to_string(),
            exp,
            iat: None,
            iss: iss.map(str::to_string),
        };
        encode(
            &Header::new(alg),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_returns_subject() {
        let validator = JwtValidator::new(SECRET, None, Duration::from_secs(0));
        let token = token_for("alice@example.com", 600, None, Algorithm::HS256);
        let claims = validator.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
    }

    #[test]
    fn test_expired_token_rejected() {
        let validator = JwtValidator::new(SECRET, None, Duration::from_secs(0));
        let token = token_for("alice@example.com", -600, None, Algorithm::HS256);
        assert!(matches!(
            validator.validate_token(&token),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let validator = JwtValidator::new("other-secret", None, Duration::from_secs(0));
        let token = token_for("alice@example.com", 600, None, Algorithm::HS256);
        assert!(validator.validate_token(&token).is_err());
    }

    #[test]
    fn test_non_hs256_algorithm_rejected() {
        let validator = JwtValidator::new(SECRET, None, Duration::from_secs(0));
        let token = token_for("alice@example.com", 600, None, Algorithm::HS512);
        assert!(validator.validate_token(&token).is_err());
    }

    #[test]
    fn test_issuer_enforced_when_configured() {
        let validator = JwtValidator::new(
            SECRET,
            Some("filevault-idp".to_string()),
            Duration::from_secs(0),
        );
        let good = token_for("bob@example.com", 600, Some("filevault-idp"), Algorithm::HS256);
        let bad = token_for("bob@example.com", 600, Some("someone-else"), Algorithm::HS256);
        assert!(validator.validate_token(&good).is_ok());
        assert!(validator.validate_token(&bad).is_err());
    }
}

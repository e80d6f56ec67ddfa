use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use zeroize::Zeroizing;

use crate::{entities::token::Claims, errors::AuthError, settings::AuthSettings};

const JWT_ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        let secret = Zeroizing::new(secret.as_bytes().to_vec());
        SigningKeys {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
        }
    }
}

/// Verifies the bearer tokens admin clients attach to mutating requests.
/// Issuance lives with the auth collaborator; `create_jwt` exists for tooling and tests.
#[derive(Clone)]
pub struct JwtService {
    keys: SigningKeys,
    lifetime: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("keys", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl JwtService {
    pub fn new(settings: &AuthSettings) -> Self {
        JwtService {
            keys: SigningKeys::from_secret(&settings.jwt_secret),
            lifetime: Duration::minutes(settings.jwt_expiration_minutes),
        }
    }

    pub fn create_jwt(&self, subject: &str, admin: bool) -> Result<String, AuthError> {
        let issued = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            admin,
            exp: (issued + self.lifetime).timestamp() as usize,
            iat: issued.timestamp() as usize,
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.keys.encoding).map_err(|e| {
            tracing::error!("Failed to sign token for {}: {}", subject, e);
            AuthError::TokenCreation
        })
    }

    /// Checks signature and expiry.
    pub fn decode_jwt(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.keys.decoding, &validation).map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, minutes: i64) -> JwtService {
        JwtService::new(&AuthSettings { jwt_secret: secret.into(), jwt_expiration_minutes: minutes })
    }

    #[test]
    fn round_trips_admin_claims() {
        let service = service(&"s".repeat(48), 5);

        let token = service.create_jwt("admin-1", true).unwrap();
        let claims = service.decode_jwt(&token).unwrap().claims;

        assert_eq!(claims.sub, "admin-1");
        assert!(claims.admin);
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let issuer = service(&"a".repeat(48), 5);
        let verifier = service(&"b".repeat(48), 5);

        let token = issuer.create_jwt("admin-1", true).unwrap();

        assert!(matches!(verifier.decode_jwt(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_tokens_are_reported_as_such() {
        let service = service(&"s".repeat(48), -5);

        let token = service.create_jwt("admin-1", true).unwrap();

        assert!(matches!(service.decode_jwt(&token), Err(AuthError::TokenExpired)));
    }
}

use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ROLE_PARTICIPANT: &str = "participant";
pub const ROLE_ORGANIZER: &str = "organizer";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id from the identity provider
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    pub fn generate_access_token(&self, user_id: &str, role: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: "access".to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims() {
        let svc = JwtService::new("test-secret", 3600);
        let token = svc.generate_access_token("user-1", ROLE_ORGANIZER).unwrap();

        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, ROLE_ORGANIZER);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let signer = JwtService::new("secret-a", 3600);
        let verifier = JwtService::new("secret-b", 3600);

        let token = signer
            .generate_access_token("user-1", ROLE_PARTICIPANT)
            .unwrap();
        assert!(verifier.verify_access_token(&token).is_err());
    }
}

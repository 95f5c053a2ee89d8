//! JWT issuance and verification

use crate::config::AuthConfig;
use crate::utils::error::{Result, ServiceError};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

const ISSUER: &str = "cursorconnect";

/// JWT handler for token operations
#[derive(Clone)]
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    expiration: u64,
}

impl std::fmt::Debug for JwtHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtHandler")
            .field("algorithm", &self.algorithm)
            .field("expiration", &self.expiration)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Issued at timestamp
    pub iat: u64,
    /// Expiration timestamp
    pub exp: u64,
    /// Issuer
    pub iss: String,
    /// JWT ID
    pub jti: String,
    /// Token type
    pub token_type: TokenType,
}

/// Token type enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Access token for API access
    Access,
    /// Refresh token for obtaining new access tokens
    Refresh,
}

/// Token pair (access + refresh)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Expires in seconds
    pub expires_in: u64,
}

impl JwtHandler {
    /// Create a new JWT handler
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            expiration: config.jwt_expiration,
        }
    }

    /// Create an access token for a user
    pub fn create_access_token(&self, user_id: Uuid) -> Result<String> {
        self.create_token(user_id, self.expiration, TokenType::Access)
    }

    /// Create a refresh token for a user
    pub fn create_refresh_token(&self, user_id: Uuid) -> Result<String> {
        // Refresh tokens last 24x longer
        self.create_token(user_id, self.expiration * 24, TokenType::Refresh)
    }

    /// Create a token pair (access + refresh)
    pub fn create_token_pair(&self, user_id: Uuid) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.create_access_token(user_id)?,
            refresh_token: self.create_refresh_token(user_id)?,
            token_type: "Bearer".to_string(),
            expires_in: self.expiration,
        })
    }

    fn create_token(&self, user_id: Uuid, lifetime: u64, token_type: TokenType) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ServiceError::internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + lifetime,
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        let header = Header::new(self.algorithm);
        let token = encode(&header, &claims, &self.encoding_key).map_err(ServiceError::Jwt)?;

        debug!("Created {:?} token for user: {}", claims.token_type, user_id);
        Ok(token)
    }

    /// Verify and decode a token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[ISSUER]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            warn!("JWT verification failed: {}", e);
            ServiceError::Jwt(e)
        })?;

        debug!("Token verified for user: {}", token_data.claims.sub);
        Ok(token_data.claims)
    }

    /// Verify an access token and return its claims
    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != TokenType::Access {
            return Err(ServiceError::unauthorized("Invalid token type"));
        }

        Ok(claims)
    }

    /// Verify a refresh token and return the user ID
    pub fn verify_refresh_token(&self, token: &str) -> Result<Uuid> {
        let claims = self.verify_token(token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(ServiceError::unauthorized("Invalid token type for refresh"));
        }

        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> JwtHandler {
        JwtHandler::new(&AuthConfig {
            jwt_secret: "A-test-secret-that-is-long-enough-for-hs256!".to_string(),
            jwt_expiration: 3600,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let handler = handler();
        let user_id = Uuid::new_v4();

        let token = handler.create_access_token(user_id).unwrap();
        let claims = handler.verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let handler = handler();
        let token = handler.create_access_token(Uuid::new_v4()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('a') { 'b' } else { 'a' });

        assert!(handler.verify_token(&tampered).is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let handler = handler();
        let other = JwtHandler::new(&AuthConfig {
            jwt_secret: "A-different-secret-that-is-also-long-enough!".to_string(),
            jwt_expiration: 3600,
        });

        let token = other.create_access_token(Uuid::new_v4()).unwrap();
        assert!(handler.verify_token(&token).is_err());
    }

    #[test]
    fn test_refresh_token_cannot_be_used_as_access_token() {
        let handler = handler();
        let user_id = Uuid::new_v4();

        let refresh = handler.create_refresh_token(user_id).unwrap();
        assert!(handler.verify_access_token(&refresh).is_err());
        assert_eq!(handler.verify_refresh_token(&refresh).unwrap(), user_id);
    }

    #[test]
    fn test_access_token_cannot_be_used_as_refresh_token() {
        let handler = handler();
        let access = handler.create_access_token(Uuid::new_v4()).unwrap();
        assert!(handler.verify_refresh_token(&access).is_err());
    }

    #[test]
    fn test_token_pair() {
        let handler = handler();
        let pair = handler.create_token_pair(Uuid::new_v4()).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);
        assert!(handler.verify_access_token(&pair.access_token).is_ok());
        assert!(handler.verify_refresh_token(&pair.refresh_token).is_ok());
    }
}

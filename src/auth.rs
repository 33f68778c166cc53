//! The auth gate (§4.7, supplemented): JWT verification for the WebSocket
//! upgrade, modeled on how the original deployment's front door issued
//! bearer tokens that `websocket_manager.py` never itself validated. We add
//! the validation step here since a production rewrite can't skip it.

use crate::error::ServerError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthGate {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthGate {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a bearer token, returning the authenticated
    /// username. Expired, malformed, or wrong-signature tokens are all
    /// reported as the same `Authentication` kind; the distinction isn't
    /// actionable to the client.
    pub fn authenticate(&self, token: &str) -> Result<String, ServerError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| ServerError::Authentication(e.to_string()))?;
        Ok(data.claims.sub)
    }

    /// Membership check used once a socket already belongs to an authenticated
    /// user: does this user have standing in the targeted room?
    pub fn authorize_room_membership(&self, is_member: bool) -> Result<(), ServerError> {
        if is_member {
            Ok(())
        } else {
            Err(ServerError::Authorization(
                "user is not a member of this room".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(username: &str, secret: &str, exp: usize) -> String {
        let claims = Claims {
            sub: username.to_string(),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_resolves_username() {
        let gate = AuthGate::new("secret");
        let future_exp = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600) as usize;
        let token = token_for("alice", "secret", future_exp);
        assert_eq!(gate.authenticate(&token).unwrap(), "alice");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let gate = AuthGate::new("secret");
        let future_exp = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600) as usize;
        let token = token_for("alice", "wrong-secret", future_exp);
        assert!(gate.authenticate(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let gate = AuthGate::new("secret");
        let token = token_for("alice", "secret", 1);
        assert!(gate.authenticate(&token).is_err());
    }
}

// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{common::error::AppError, models::auth::Claims};

// Os tokens são emitidos pelo portal administrativo; aqui só validamos.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(token_data.claims)
    }

    #[cfg(test)]
    pub fn create_token(&self, permissions: &[&str]) -> Result<String, AppError> {
        use chrono::Utc;
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(1);

        let claims = Claims {
            sub: uuid::Uuid::new_v4(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            name: Some("Test Officer".into()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_permissions_through_the_token() {
        let service = AuthService::new("test-secret".into());
        let token = service.create_token(&["stores:write"]).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert!(claims.has_permission("stores:write"));
        assert!(!claims.has_permission("stores:approve"));
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let issuer = AuthService::new("other-secret".into());
        let token = issuer.create_token(&["*"]).unwrap();

        let service = AuthService::new("test-secret".into());
        assert!(matches!(service.validate_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(service.validate_token("not-a-jwt"), Err(AppError::InvalidToken)));
    }
}

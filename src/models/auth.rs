// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Estrutura de dados ("claims") dentro do JWT emitido pelo portal administrativo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do operador)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
    #[serde(default)]
    pub name: Option<String>,
    // Slugs das permissões, ex: "stores:approve"
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Claims {
    pub fn has_permission(&self, slug: &str) -> bool {
        self.permissions.iter().any(|p| p == slug || p == "*")
    }
}

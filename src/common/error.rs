use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Erros da aplicação, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid approval status '{0}'")]
    InvalidStatus(String),

    // Documento em estado terminal (aprovado / emitido): não pode ser alterado
    #[error("{0}")]
    Conflict(String),

    #[error("Cannot move document from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Item code '{0}' already exists")]
    DuplicateCode(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::InvalidStatus(_)
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } | AppError::DuplicateCode(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidToken | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_message = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(m) => m.to_string(),
                            None => e.code.to_string(),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                // `summary` também cobre os erros aninhados (items[0].quantity_issued, ...)
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                    "summary": errors.to_string(),
                }));
                return (status, body).into_response();
            }
            AppError::InvalidToken | AppError::JwtError(_) => {
                "Authentication token is invalid or missing.".to_string()
            }

            // 500: loga o detalhe e devolve uma mensagem genérica
            ref e @ (AppError::DatabaseError(_) | AppError::InternalServerError(_)) => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                "An unexpected error occurred.".to_string()
            }

            other => other.to_string(),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

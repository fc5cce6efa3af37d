// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{common::error::AppError, models::auth::Claims};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

/// Checagem avulsa, para handlers cuja permissão depende do corpo (ex: PATCH com status).
pub fn ensure_permission(claims: &Claims, slug: &str) -> Result<(), AppError> {
    if claims.has_permission(slug) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Permission '{}' is required for this action",
        slug
    )))
}

// 3. Implementação do FromRequestParts
// As permissões vêm nas claims do token; o `auth_guard` já as colocou nos extensions.
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Claims>().ok_or(AppError::InvalidToken)?;

        ensure_permission(claims, T::slug())?;

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermStoresWrite;
impl PermissionDef for PermStoresWrite {
    fn slug() -> &'static str { "stores:write" }
}

pub struct PermStoresApprove;
impl PermissionDef for PermStoresApprove {
    fn slug() -> &'static str { "stores:approve" }
}

pub struct PermLedgerRebuild;
impl PermissionDef for PermLedgerRebuild {
    fn slug() -> &'static str { "ledger:rebuild" }
}

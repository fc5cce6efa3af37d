// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::common;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- ITEMS ---
        handlers::items::create_item,
        handlers::items::list_items,
        handlers::items::get_item,

        // --- GRN ---
        handlers::grn::create_grn,
        handlers::grn::list_grns,
        handlers::grn::get_grn,
        handlers::grn::update_grn,
        handlers::grn::delete_grn,

        // --- ISSUANCE ---
        handlers::issuance::create_issuance,
        handlers::issuance::list_issuances,
        handlers::issuance::get_issuance,
        handlers::issuance::update_issuance,
        handlers::issuance::delete_issuance,

        // --- LEDGER ---
        handlers::ledger::get_ledger_summary,
        handlers::ledger::get_item_ledger,
        handlers::ledger::recalculate_item,
        handlers::ledger::recalculate_all,
    ),
    components(
        schemas(
            common::pagination::Pagination,

            // --- Items ---
            models::item::Item,
            models::item::StockStatus,

            // --- GRN ---
            models::grn::GrnStatus,
            models::grn::Grn,
            models::grn::GrnLineDetail,
            models::grn::GrnDetail,
            models::grn::GrnSummary,
            models::grn::CreatedGrn,

            // --- Issuance ---
            models::issuance::IssuanceStatus,
            models::issuance::Issuance,
            models::issuance::IssuanceLineDetail,
            models::issuance::IssuanceDetail,
            models::issuance::IssuanceSummary,
            models::issuance::CreatedIssuance,

            // --- Ledger ---
            models::ledger::TransactionType,
            models::ledger::LedgerEntry,
            models::ledger::LedgerReport,
            models::ledger::LedgerSummaryRow,
            models::ledger::LedgerStatistics,
            models::ledger::LedgerSummary,
            models::ledger::RecomputeOutcome,
            models::ledger::RebuildReport,

            // --- Payloads ---
            handlers::items::CreateItemPayload,
            handlers::grn::GrnLinePayload,
            handlers::grn::CreateGrnPayload,
            handlers::grn::UpdateGrnPayload,
            handlers::issuance::IssuanceLinePayload,
            handlers::issuance::CreateIssuancePayload,
            handlers::issuance::UpdateIssuancePayload,
        )
    ),
    tags(
        (name = "Items", description = "Catálogo de itens do almoxarifado"),
        (name = "GRN", description = "Notas de recebimento (entradas)"),
        (name = "Issuance", description = "Guias de saída / requisições"),
        (name = "Ledger", description = "Razão de estoque por item")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

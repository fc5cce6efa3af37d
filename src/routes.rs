// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    let item_routes = Router::new()
        .route("/", post(handlers::items::create_item).get(handlers::items::list_items))
        .route("/{id}", get(handlers::items::get_item));

    let grn_routes = Router::new()
        .route("/", post(handlers::grn::create_grn).get(handlers::grn::list_grns))
        .route(
            "/{id}",
            get(handlers::grn::get_grn)
                .patch(handlers::grn::update_grn)
                .delete(handlers::grn::delete_grn),
        );

    let issuance_routes = Router::new()
        .route(
            "/",
            post(handlers::issuance::create_issuance).get(handlers::issuance::list_issuances),
        )
        .route(
            "/{id}",
            get(handlers::issuance::get_issuance)
                .patch(handlers::issuance::update_issuance)
                .delete(handlers::issuance::delete_issuance),
        );

    let ledger_routes = Router::new()
        .route("/", get(handlers::ledger::get_ledger_summary))
        .route("/recalculate", post(handlers::ledger::recalculate_all))
        .route("/{item_id}", get(handlers::ledger::get_item_ledger))
        .route("/{item_id}/recalculate", post(handlers::ledger::recalculate_item));

    // Tudo do almoxarifado exige token
    let stores_routes = Router::new()
        .nest("/items", item_routes)
        .nest("/grn", grn_routes)
        .nest("/issuance", issuance_routes)
        .nest("/ledger", ledger_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/stores", stores_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

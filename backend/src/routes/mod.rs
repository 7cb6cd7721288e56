//! Route definitions for the Pharmacy Stock Management Backend
//!
//! Every operational route is nested under a branch segment, so one
//! deployment serves both store instances: `/api/v1/:branch/...` with
//! branch `indoor` or `pharmacy`.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/:branch/medicines", medicine_routes())
        .nest("/:branch/stock-lots", stock_lot_routes())
        .nest("/:branch/purchases", purchase_routes())
        .nest("/:branch/inventory", inventory_routes())
        .nest("/:branch/suppliers", supplier_routes())
        .nest("/:branch/sales", sale_routes())
        .nest("/:branch/returns", return_routes())
        .nest("/:branch/audit", audit_routes())
}

fn medicine_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_medicines).post(handlers::create_medicine))
        .route("/:id", get(handlers::get_medicine))
}

fn stock_lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::create_lot))
        .route(
            "/:id",
            get(handlers::get_lot)
                .put(handlers::update_lot)
                .delete(handlers::delete_lot),
        )
        .route("/:id/approve", post(handlers::approve_lot))
        .route("/:id/reject", post(handlers::reject_lot))
        .route("/:id/adjust-units", post(handlers::adjust_units))
        .route("/:id/adjust-packs", post(handlers::adjust_packs))
        .route("/:id/loose-units", post(handlers::add_loose_units))
}

fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases))
        .route("/lot/:id", get(handlers::get_purchase_for_lot))
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inventory))
        .route("/:medicine", get(handlers::get_inventory_item))
        .route("/:medicine/recompute", post(handlers::recompute_inventory))
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
        .route("/:id/recalculate", post(handlers::recalculate_supplier))
        .route(
            "/:id/payments",
            get(handlers::list_supplier_payments).post(handlers::add_supplier_payment),
        )
        .route("/:id/returns", get(handlers::list_supplier_returns))
}

fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::record_sale))
        .route("/summary", get(handlers::sales_summaries))
        .route("/:id", get(handlers::get_sale))
}

fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/customer", post(handlers::customer_return))
        .route("/supplier", post(handlers::supplier_return))
}

fn audit_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::recent_audit))
}

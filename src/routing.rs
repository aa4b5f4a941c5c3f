//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::{
    AppState, Error,
    auth::{auth_guard, post_log_in, post_log_out, register_user},
    endpoints,
    stats::{get_monthly_summary_endpoint, get_stats_endpoint},
    target::{
        create_target_endpoint, delete_target_endpoint, get_target_endpoint, list_targets_endpoint,
        update_target_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, list_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
        .route(
            endpoints::TARGETS,
            get(list_targets_endpoint).post(create_target_endpoint),
        )
        .route(
            endpoints::TARGET,
            get(get_target_endpoint)
                .patch(update_target_endpoint)
                .delete(delete_target_endpoint),
        )
        .route(endpoints::STATS, get(get_stats_endpoint))
        .route(endpoints::MONTHLY_STATS, get(get_monthly_summary_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Respond to requests for routes that do not exist.
async fn get_404_not_found() -> Error {
    Error::NotFound
}

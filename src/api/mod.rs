/// API routes and handlers
pub mod audio;
pub mod focus;
pub mod health;
pub mod mirror;
pub mod notifications;

use crate::{
    context::AppContext,
    error::{OxbowError, OxbowResult},
    rate_limit::rate_limit_middleware,
};
use axum::{
    extract::rejection::JsonRejection, middleware, routing::get, Json, Router,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Build API routes
///
/// Every route that spends provider tokens draws on the generation quota.
/// The always-200 endpoints check it in their handlers instead of the layer.
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    let generation = Router::new()
        .merge(mirror::routes())
        .merge(audio::routes())
        .layer(middleware::from_fn_with_state(ctx, rate_limit_middleware));

    Router::new()
        .merge(generation)
        .merge(mirror::preview_routes())
        .merge(focus::routes())
        .merge(notifications::routes())
        .merge(health::routes())
        .route("/metrics", get(metrics_handler))
}

async fn metrics_handler() -> String {
    crate::metrics::render_metrics()
}

/// Unwrap a JSON body and run its field validation
pub(crate) fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> OxbowResult<T>
where
    T: DeserializeOwned + Validate,
{
    let Json(request) =
        body.map_err(|rejection| OxbowError::Validation(rejection.body_text()))?;
    request
        .validate()
        .map_err(|e| OxbowError::Validation(e.to_string()))?;
    Ok(request)
}

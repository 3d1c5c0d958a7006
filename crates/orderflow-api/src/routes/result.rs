//! Form-based lookup kept for the original browser front end.
//!
//! Always answers 200: either `{"result": <order>}` or
//! `{"error": "Not found this order_uid"}`.

use axum::extract::State;
use axum::{Form, Json, Router, routing::post};
use orderflow_cache::query::lookup_order;
use orderflow_core::document::OrderDocument;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::state::AppState;

const NOT_FOUND_MESSAGE: &str = "Not found this order_uid";

/// Form body for POST /result.
#[derive(Debug, Deserialize)]
pub struct ResultForm {
    /// The order to look up.
    #[serde(default)]
    pub order_uid: String,
}

/// Response body for POST /result.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResultResponse {
    /// The order was found.
    Found {
        /// The cached order document.
        result: OrderDocument,
    },
    /// No such order.
    Missing {
        /// Fixed not-found message.
        error: &'static str,
    },
}

/// POST /result
#[instrument(skip(state, form), fields(order_uid = %form.order_uid))]
async fn post_result(
    State(state): State<AppState>,
    Form(form): Form<ResultForm>,
) -> Json<ResultResponse> {
    Json(match lookup_order(&state.cache, &form.order_uid) {
        Some(result) => ResultResponse::Found { result },
        None => ResultResponse::Missing {
            error: NOT_FOUND_MESSAGE,
        },
    })
}

/// Returns the router for the form lookup.
pub fn router() -> Router<AppState> {
    Router::new().route("/result", post(post_result))
}

use crate::error::HandlerError;
use crate::greeting;
use crate::server::router::AppState;
use axum::{Json, Router, extract::State, routing::any};
use greeting_schema::Message;

pub const GREETING_PATH: &str = "/api/greeting";

pub fn router() -> Router<AppState> {
    Router::new().route(GREETING_PATH, any(greeting_handler))
}

/// Takes no parameters or body; any method is accepted.
async fn greeting_handler(State(state): State<AppState>) -> Result<Json<Message>, HandlerError> {
    greeting::handle(state.store.as_ref(), &state.greeting)
        .await
        .map(Json)
}

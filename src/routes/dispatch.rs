use axum::extract::State;
use axum::Json;

use crate::dispatcher::{self, CycleStats};
use crate::error::AppError;
use crate::state::SharedState;

/// Run one dispatch cycle on demand. Same code path as the schedule; a
/// cycle already in flight makes this a no-op.
pub async fn run(State(state): State<SharedState>) -> Result<Json<CycleStats>, AppError> {
    let stats = dispatcher::run_cycle(&state).await?;
    Ok(Json(stats))
}

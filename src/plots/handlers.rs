use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::extractors::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::plots::dto::CreatePlotRequest;
use crate::plots::repo::{NewPlot, Plot};
use crate::state::AppState;

pub fn plot_routes() -> Router<AppState> {
    Router::new().route("/plots", get(list_plots).post(create_plot))
}

#[instrument(skip_all)]
pub async fn create_plot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreatePlotRequest>,
) -> ApiResult<(StatusCode, Json<Plot>)> {
    let plot_name = match payload.plot_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            return Err(ApiError::Validation(
                "missing required field: plot_name".into(),
            ))
        }
    };
    let points = payload
        .points
        .ok_or_else(|| ApiError::Validation("missing required field: points".into()))?;
    if points.len() < 3 {
        warn!(count = points.len(), "too few boundary points");
        return Err(ApiError::Validation(
            "points must contain at least 3 coordinate pairs".into(),
        ));
    }

    let plot = Plot::create(
        &state.store,
        &user,
        NewPlot {
            plot_name,
            points,
            area_acres: payload.area_acres,
        },
    )
    .await?;

    info!(plot_id = %plot.id, user_id = %user.id, "plot registered");
    Ok((StatusCode::CREATED, Json(plot)))
}

#[instrument(skip_all)]
pub async fn list_plots(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Plot>>> {
    let plots = Plot::list_by_owner(&state.store, &user.id).await?;
    Ok(Json(plots))
}

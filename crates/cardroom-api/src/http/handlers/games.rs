//! Game lobby handlers for the REST API.
//!
//! Every mutation here goes through `GameService`, so connected websocket
//! clients see its effect through the relay without these handlers touching
//! the registry.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use cardroom_types::chat::{ChatMessage, MessageGroup, PostMessageRequest};
use cardroom_types::game::{
    CreateGameRequest, Game, GameId, GameStatus, GameSummary, JoinGameRequest,
    RenameGameRequest, SetStatusRequest,
};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

fn game_links(resp: ApiResponse<Game>) -> ApiResponse<Game> {
    let base = resp
        .data
        .as_ref()
        .map(|g| format!("/api/v1/games/{}", g.id))
        .unwrap_or_default();
    resp.with_link("self", &base)
        .with_link("messages", &format!("{base}/messages"))
}

/// GET /api/v1/games - Abridged games, most recently updated first.
pub async fn list_games(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<GameSummary>>>, AppError> {
    let timer = RequestTimer::start();
    let games = state.game_service.list_games().await?;
    Ok(Json(timer.finish(games).with_link("self", "/api/v1/games")))
}

/// POST /api/v1/games - Open a new table.
pub async fn create_game(
    State(state): State<AppState>,
    Json(body): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Game>>), AppError> {
    let timer = RequestTimer::start();
    let game = state.game_service.create_game(body).await?;
    Ok((StatusCode::CREATED, Json(game_links(timer.finish(game)))))
}

/// GET /api/v1/games/{id}
pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Game>>, AppError> {
    let timer = RequestTimer::start();
    let game = state.game_service.get_game(&GameId::from(id)).await?;
    Ok(Json(game_links(timer.finish(game))))
}

/// PUT /api/v1/games/{id} - Rename a table.
pub async fn rename_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RenameGameRequest>,
) -> Result<Json<ApiResponse<Game>>, AppError> {
    let timer = RequestTimer::start();
    let game = state
        .game_service
        .rename_game(&GameId::from(id), &body.name)
        .await?;
    Ok(Json(game_links(timer.finish(game))))
}

/// DELETE /api/v1/games/{id}
pub async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    state.game_service.delete_game(&GameId::from(id.as_str())).await?;
    Ok(Json(timer.finish(serde_json::json!({ "deleted": id }))))
}

/// PUT /api/v1/games/{id}/status
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<ApiResponse<Game>>, AppError> {
    let timer = RequestTimer::start();
    let status = body
        .status
        .parse::<GameStatus>()
        .map_err(AppError::Validation)?;
    let game = state
        .game_service
        .set_status(&GameId::from(id), status)
        .await?;
    Ok(Json(game_links(timer.finish(game))))
}

/// POST /api/v1/games/{id}/users - Take a seat.
pub async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JoinGameRequest>,
) -> Result<Json<ApiResponse<Game>>, AppError> {
    let timer = RequestTimer::start();
    let game = state
        .game_service
        .join_game(&GameId::from(id), &body.user_id, &body.name)
        .await?;
    Ok(Json(game_links(timer.finish(game))))
}

/// DELETE /api/v1/games/{id}/users/{user_id} - Leave the table.
pub async fn leave_game(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Game>>, AppError> {
    let timer = RequestTimer::start();
    let game = state
        .game_service
        .leave_game(&GameId::from(id), &user_id)
        .await?;
    Ok(Json(game_links(timer.finish(game))))
}

/// GET /api/v1/games/{id}/messages - Chat log grouped by sender.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MessageGroup>>>, AppError> {
    let timer = RequestTimer::start();
    let groups = state
        .game_service
        .message_groups(&GameId::from(id))
        .await?;
    Ok(Json(timer.finish(groups)))
}

/// POST /api/v1/games/{id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatMessage>>), AppError> {
    let timer = RequestTimer::start();
    let message = state
        .game_service
        .post_message(&GameId::from(id), &body.user_id, &body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(timer.finish(message))))
}

//! Axum router configuration with middleware.
//!
//! REST routes live under `/api/v1/`, the lobby websocket at `/ws/games`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/games",
            get(handlers::games::list_games).post(handlers::games::create_game),
        )
        .route(
            "/games/{id}",
            get(handlers::games::get_game)
                .put(handlers::games::rename_game)
                .delete(handlers::games::delete_game),
        )
        .route(
            "/games/{id}/status",
            put(handlers::games::set_status),
        )
        .route(
            "/games/{id}/users",
            post(handlers::games::join_game),
        )
        .route(
            "/games/{id}/users/{user_id}",
            delete(handlers::games::leave_game),
        )
        .route(
            "/games/{id}/messages",
            get(handlers::games::list_messages).post(handlers::games::post_message),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws/games", get(handlers::ws::ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use cardroom_core::feed::GameListener;
    use cardroom_types::game::GameId;
    use tower::ServiceExt;

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let router = build_router(AppState::in_memory_for_tests());
        let (status, json) = call(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn game_lifecycle_over_rest() {
        let router = build_router(AppState::in_memory_for_tests());

        let (status, json) = call(
            &router,
            Method::POST,
            "/api/v1/games",
            Some(serde_json::json!({"name": "Friday", "small_blind": 5, "big_blind": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["max_players"], 6);
        let id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/v1/games/{id}/users"),
            Some(serde_json::json!({"user_id": "ada", "name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/v1/games/{id}/messages"),
            Some(serde_json::json!({"user_id": "ada", "message": "gl"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, json) = call(&router, Method::GET, &format!("/api/v1/games/{id}/messages"), None).await;
        assert_eq!(json["data"][0]["name"], "Ada");

        let (_, json) = call(&router, Method::GET, "/api/v1/games", None).await;
        assert_eq!(json["data"][0]["players"], 1);

        let (status, _) = call(&router, Method::DELETE, &format!("/api/v1/games/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call(&router, Method::GET, &format!("/api/v1/games/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["errors"][0]["code"], "GAME_NOT_FOUND");
    }

    #[tokio::test]
    async fn bad_status_is_validation_error() {
        let state = AppState::in_memory_for_tests();
        let router = build_router(state.clone());
        let game = state
            .game_service
            .create_game(cardroom_types::game::CreateGameRequest {
                name: "T".into(),
                max_players: 4,
                small_blind: 1,
                big_blind: 2,
            })
            .await
            .unwrap();

        let (status, json) = call(
            &router,
            Method::PUT,
            &format!("/api/v1/games/{}/status", game.id),
            Some(serde_json::json!({"status": "exploded"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["code"], "VALIDATION_ERROR");

        let (status, json) = call(
            &router,
            Method::PUT,
            &format!("/api/v1/games/{}/status", game.id),
            Some(serde_json::json!({"status": "playing"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "playing");
    }

    #[tokio::test]
    async fn rest_mutation_reaches_websocket_clients_through_relay() {
        let state = AppState::in_memory_for_tests();
        let router = build_router(state.clone());
        let mut conn = state.relay.on_connect();
        let mut changes = state.store.subscribe();

        let (_, json) = call(
            &router,
            Method::POST,
            "/api/v1/games",
            Some(serde_json::json!({"name": "Live", "small_blind": 1, "big_blind": 2})),
        )
        .await;
        let id = GameId::from(json["data"]["id"].as_str().unwrap());

        let changed = changes.next().await.unwrap();
        assert_eq!(changed, id);
        state.relay.on_change(&changed).await.unwrap();

        match conn.events.recv().await.unwrap() {
            cardroom_types::event::ServerEvent::GameItemUpdate(summary) => {
                assert_eq!(summary.id, id);
                assert_eq!(summary.name, "Live");
            }
            other => panic!("expected item update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sqlite_backed_lobby_survives_reopen() {
        use cardroom_core::repository::GameRepository;
        use cardroom_infra::store::LobbyStore;
        use cardroom_types::config::ServerConfig;

        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig::default();
        let store = LobbyStore::open(tmp.path(), config.change_feed_capacity)
            .await
            .unwrap();
        let router = build_router(AppState::from_parts(store, config, tmp.path().to_path_buf()));

        let (_, json) = call(
            &router,
            Method::POST,
            "/api/v1/games",
            Some(serde_json::json!({"name": "Disk", "small_blind": 1, "big_blind": 2})),
        )
        .await;
        let id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/v1/games/{id}/users"),
            Some(serde_json::json!({"user_id": "ada", "name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call(
            &router,
            Method::POST,
            &format!("/api/v1/games/{id}/messages"),
            Some(serde_json::json!({"user_id": "ada", "message": "x".repeat(501)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["code"], "VALIDATION_ERROR");
        drop(router);

        let reopened = LobbyStore::open(tmp.path(), 16).await.unwrap();
        let games = reopened.list().await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].id, GameId::from(id.as_str()));
        assert_eq!(games[0].players, 1);
        let game = reopened.get(&games[0].id).await.unwrap().unwrap();
        assert!(game.messages.is_empty());
    }
}

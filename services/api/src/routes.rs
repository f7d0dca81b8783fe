//! API service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{get, post},
};
use corkboard::models::{
    Board, Card, List, LoginCredentials, NewBoard, NewCard, NewList, NewUser, UpdateBoard,
    UpdateCard, UpdateList,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extract::{SessionToken, expired_session_cookie, session_cookie},
    state::AppState,
    validation::{
        check, validate_description, validate_email, validate_full_name, validate_name,
        validate_password,
    },
};

/// A board together with its lists and cards
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/me", get(me))
        .route("/boards", get(list_boards).post(create_board))
        .route(
            "/boards/:board",
            get(get_board).patch(update_board).delete(delete_board),
        )
        .route("/boards/:board/lists", post(create_list))
        .route(
            "/lists/:list",
            get(get_list).patch(update_list).delete(delete_list),
        )
        .route("/lists/:list/cards", get(list_cards).post(create_card))
        .route(
            "/cards/:card",
            get(get_card).patch(update_card).delete(delete_card),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .nest("/v1", v1)
        .with_state(state)
}

/// Trim an optional name and validate it when present
fn optional_name(name: Option<String>) -> ApiResult<Option<String>> {
    let name = name.map(|name| name.trim().to_string());
    if let Some(name) = &name {
        check("name", validate_name(name))?;
    }
    Ok(name)
}

/// Trim a required name and validate it
fn required_name(name: &str) -> ApiResult<String> {
    let name = name.trim().to_string();
    check("name", validate_name(&name))?;
    Ok(name)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "corkboard-api"
    }))
}

/// Register a user and log them in
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let new_user = NewUser {
        full_name: payload.full_name.trim().to_string(),
        email: payload.email.trim().to_string(),
        password: payload.password,
    };
    check("fullName", validate_full_name(&new_user.full_name))?;
    check("email", validate_email(&new_user.email))?;
    check("password", validate_password(&new_user.password))?;

    let session = state.client.connect(None);
    let user = match session.users().register(new_user).await {
        Ok(user) => user,
        Err(corkboard::Error::EmailConflict) => {
            return Err(ApiError::Validation {
                field: "email",
                message: "Email address is already registered".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let login = session.user_sessions().create(user.id).await?;

    info!("Registered user {}", user.login);
    let cookie = session_cookie(&login.id, state.cookie_max_age, state.secure_cookies);
    Ok((StatusCode::CREATED, [(SET_COOKIE, cookie)], Json(user)))
}

/// Log in with a login or email address
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> ApiResult<impl IntoResponse> {
    let login_or_email = payload.login_or_email.trim();
    if login_or_email.is_empty() {
        return Err(ApiError::Validation {
            field: "loginOrEmail",
            message: "Login or email is required".to_string(),
        });
    }

    info!("Login attempt for user: {}", login_or_email);

    let session = state.client.connect(None);
    let login = session.login(login_or_email, &payload.password).await?;
    let user = session.users().get(login.user_id).await?;

    let cookie = session_cookie(&login.id, state.cookie_max_age, state.secure_cookies);
    Ok(([(SET_COOKIE, cookie)], Json(user)))
}

/// End the current login session
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> ApiResult<impl IntoResponse> {
    state.client.connect(token).logout().await?;

    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, expired_session_cookie())]))
}

/// The authenticated user
pub async fn me(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> ApiResult<impl IntoResponse> {
    let session = state.client.connect(token);
    let user = session.authenticate().await?.clone();

    Ok(Json(user))
}

/// Boards of the authenticated user
pub async fn list_boards(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> ApiResult<impl IntoResponse> {
    let boards = state.client.connect(token).boards().list().await?;

    Ok(Json(boards))
}

/// Create a board
pub async fn create_board(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Json(payload): Json<NewBoard>,
) -> ApiResult<impl IntoResponse> {
    let new_board = NewBoard {
        name: required_name(&payload.name)?,
        settings: payload.settings,
    };

    let board = state.client.connect(token).boards().create(new_board).await?;

    Ok((StatusCode::CREATED, Json(board)))
}

/// A board, by id or slug, with its lists and cards
pub async fn get_board(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(selector): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let session = state.client.connect(token);
    let board = session.boards().get_by_selector(&selector).await?;

    let board_id = board.id.to_string();
    let lists = session.lists().list_by_board(&board_id).await?;
    let cards = session.cards().list_by_board(&board_id).await?;

    Ok(Json(BoardDetail {
        board,
        lists,
        cards,
    }))
}

/// Update a board
pub async fn update_board(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBoard>,
) -> ApiResult<impl IntoResponse> {
    let update = UpdateBoard {
        name: optional_name(payload.name)?,
        settings: payload.settings,
    };

    let board = state.client.connect(token).boards().update(&id, update).await?;

    Ok(Json(board))
}

/// Delete a board with its lists and cards
pub async fn delete_board(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.client.connect(token).boards().delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Add a list to a board given by id or slug
pub async fn create_list(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(selector): Path<String>,
    Json(payload): Json<NewList>,
) -> ApiResult<impl IntoResponse> {
    let new_list = NewList {
        name: required_name(&payload.name)?,
        position: payload.position,
    };

    let session = state.client.connect(token);
    let board = session.boards().get_by_selector(&selector).await?;
    let list = session
        .lists()
        .create(&board.id.to_string(), new_list)
        .await?;

    Ok((StatusCode::CREATED, Json(list)))
}

/// A list
pub async fn get_list(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let list = state.client.connect(token).lists().get(&id).await?;

    Ok(Json(list))
}

/// Update a list
pub async fn update_list(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
    Json(payload): Json<UpdateList>,
) -> ApiResult<impl IntoResponse> {
    let update = UpdateList {
        name: optional_name(payload.name)?,
        position: payload.position,
    };

    let list = state.client.connect(token).lists().update(&id, update).await?;

    Ok(Json(list))
}

/// Delete a list with its cards
pub async fn delete_list(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.client.connect(token).lists().delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Cards of a list
pub async fn list_cards(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(list_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let session = state.client.connect(token);
    let list = session.lists().get(&list_id).await?;
    let cards = session.cards().list_by_list(&list.id.to_string()).await?;

    Ok(Json(cards))
}

/// Add a card to a list
pub async fn create_card(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(list_id): Path<String>,
    Json(payload): Json<NewCard>,
) -> ApiResult<impl IntoResponse> {
    let new_card = NewCard {
        name: required_name(&payload.name)?,
        description: payload.description.trim().to_string(),
        position: payload.position,
    };
    check("description", validate_description(&new_card.description))?;

    let card = state
        .client
        .connect(token)
        .cards()
        .create(&list_id, new_card)
        .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

/// A card
pub async fn get_card(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let card = state.client.connect(token).cards().get(&id).await?;

    Ok(Json(card))
}

/// Update a card
pub async fn update_card(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCard>,
) -> ApiResult<impl IntoResponse> {
    let description = payload
        .description
        .map(|description| description.trim().to_string());
    if let Some(description) = &description {
        check("description", validate_description(description))?;
    }

    let update = UpdateCard {
        name: optional_name(payload.name)?,
        description,
        position: payload.position,
    };

    let card = state.client.connect(token).cards().update(&id, update).await?;

    Ok(Json(card))
}

/// Delete a card
pub async fn delete_card(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.client.connect(token).cards().delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

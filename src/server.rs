//! HTTP surface over a [`LocalNetwork`].
//!
//! Every route is scoped to the party acting through it:
//!
//! - `GET  /parties`
//! - `GET  /parties/{party}/me`
//! - `GET  /parties/{party}/peers`
//! - `GET  /parties/{party}/games?complete=`
//! - `POST /parties/{party}/games` with `{"opponent": ..}`
//! - `GET  /parties/{party}/games/{id}`
//! - `GET  /parties/{party}/games/{id}/history`
//! - `POST /parties/{party}/games/{id}/moves` with `{"row": .., "column": ..}`

use crate::games::tictactoe::{GameId, GameState, GameStatus, PartyId, Position};
use crate::network::{LocalNetwork, Node};
use crate::protocol::{AttemptState, CommitReceipt, ProtocolError, StateStore, StoreError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Builds the router for `network`.
pub fn router(network: Arc<LocalNetwork>) -> Router {
    Router::new()
        .route("/parties", get(list_parties))
        .route("/parties/{party}/me", get(me))
        .route("/parties/{party}/peers", get(peers))
        .route("/parties/{party}/games", get(list_games).post(create_game))
        .route("/parties/{party}/games/{id}", get(get_game))
        .route("/parties/{party}/games/{id}/history", get(game_history))
        .route("/parties/{party}/games/{id}/moves", post(play_move))
        .with_state(network)
}

/// JSON projection of one game version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    /// Game identifier.
    pub id: GameId,
    /// Party holding seat A.
    pub player_a: PartyId,
    /// Party holding seat B.
    pub player_b: PartyId,
    /// Party to move next.
    pub active_player: PartyId,
    /// Board as `-1` (empty), `0` (seat A), `1` (seat B).
    pub board: [[i8; 3]; 3],
    /// Whether the game is over.
    pub complete: bool,
    /// Winner, if any.
    pub winner: Option<PartyId>,
    /// Committed version number.
    pub version: u64,
    /// Summary of the outcome.
    pub status: GameStatus,
}

impl From<&GameState> for GameView {
    fn from(state: &GameState) -> Self {
        Self {
            id: state.id().clone(),
            player_a: state.player_a().clone(),
            player_b: state.player_b().clone(),
            active_player: state.active_player().clone(),
            board: state.board().to_codes(),
            complete: *state.complete(),
            winner: state.winner().clone(),
            version: *state.version(),
            status: state.status(),
        }
    }
}

/// Result of a committed create or move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitView {
    /// Newly committed version.
    pub game: GameView,
    /// States the attempt passed through.
    pub trail: Vec<String>,
    /// Digest the three signatures cover.
    pub transition: String,
    /// Whether the opponent acknowledged the commit.
    pub delivered: bool,
}

/// Body of `POST /parties/{party}/games`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameRequest {
    /// Party to play against.
    pub opponent: String,
}

/// Body of `POST /parties/{party}/games/{id}/moves`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayMoveRequest {
    /// Row, 0 to 2.
    pub row: usize,
    /// Column, 0 to 2.
    pub column: usize,
}

/// Query of `GET /parties/{party}/games`.
#[derive(Debug, Clone, Deserialize)]
pub struct GamesFilter {
    /// Keep only complete (`true`) or unfinished (`false`) games.
    pub complete: Option<bool>,
}

/// Error returned by a handler, rendered as `{"error": ..}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unknown_party(party: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Unknown party {}", party))
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        let status = match &err {
            ProtocolError::InvalidMove(_) => StatusCode::BAD_REQUEST,
            ProtocolError::NotFound(_) => StatusCode::NOT_FOUND,
            ProtocolError::ArbitrationConflict { .. } => StatusCode::CONFLICT,
            ProtocolError::CounterpartyRejection { .. } | ProtocolError::ArbitrationRefused(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ProtocolError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProtocolError::Signature(_) | ProtocolError::Transport(_) | ProtocolError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ProtocolError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "Request failed");
        } else {
            debug!(status = %self.status, error = %self.message, "Request rejected");
        }
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

fn node_for(network: &LocalNetwork, party: &str) -> Result<Arc<Node>, ApiError> {
    network
        .node(&PartyId::from(party))
        .cloned()
        .ok_or_else(|| ApiError::unknown_party(party))
}

fn commit_view(receipt: &CommitReceipt) -> CommitView {
    CommitView {
        game: GameView::from(receipt.state()),
        trail: receipt.trail().iter().map(AttemptState::to_string).collect(),
        transition: receipt.committed().digest().to_string(),
        delivered: *receipt.delivered(),
    }
}

#[instrument(skip(network))]
async fn list_parties(State(network): State<Arc<LocalNetwork>>) -> Json<Vec<PartyId>> {
    Json(network.parties())
}

#[instrument(skip(network))]
async fn me(
    State(network): State<Arc<LocalNetwork>>,
    Path(party): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let node = node_for(&network, &party)?;
    Ok(Json(serde_json::json!({
        "me": node.party(),
        "auto_play": node.auto_play(),
    })))
}

#[instrument(skip(network))]
async fn peers(
    State(network): State<Arc<LocalNetwork>>,
    Path(party): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let node = node_for(&network, &party)?;
    let peers: Vec<PartyId> = network
        .parties()
        .into_iter()
        .filter(|peer| peer != node.party())
        .collect();
    Ok(Json(serde_json::json!({ "peers": peers })))
}

#[instrument(skip(network))]
async fn list_games(
    State(network): State<Arc<LocalNetwork>>,
    Path(party): Path<String>,
    Query(filter): Query<GamesFilter>,
) -> Result<Json<Vec<GameView>>, ApiError> {
    let node = node_for(&network, &party)?;
    let games = match filter.complete {
        Some(complete) => node.vault().games_by_completion(complete).await,
        None => node.vault().list_games().await,
    };
    Ok(Json(games.iter().map(GameView::from).collect()))
}

#[instrument(skip(network))]
async fn get_game(
    State(network): State<Arc<LocalNetwork>>,
    Path((party, id)): Path<(String, String)>,
) -> Result<Json<GameView>, ApiError> {
    let node = node_for(&network, &party)?;
    let game = node.vault().fetch_current(&GameId::from_string(id)).await?;
    Ok(Json(GameView::from(&game)))
}

#[instrument(skip(network))]
async fn game_history(
    State(network): State<Arc<LocalNetwork>>,
    Path((party, id)): Path<(String, String)>,
) -> Result<Json<Vec<GameView>>, ApiError> {
    let node = node_for(&network, &party)?;
    let history = node.vault().history(&GameId::from_string(id)).await?;
    Ok(Json(history.iter().map(GameView::from).collect()))
}

#[instrument(skip(network))]
async fn create_game(
    State(network): State<Arc<LocalNetwork>>,
    Path(party): Path<String>,
    Json(request): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<CommitView>), ApiError> {
    let node = node_for(&network, &party)?;
    let opponent = PartyId::from(request.opponent);
    if network.node(&opponent).is_none() {
        return Err(ApiError::unknown_party(opponent.as_str()));
    }
    let receipt = node.coordinator().create_game(&opponent).await?;
    info!(game_id = %receipt.state().id(), "Game created over HTTP");
    Ok((StatusCode::CREATED, Json(commit_view(&receipt))))
}

#[instrument(skip(network))]
async fn play_move(
    State(network): State<Arc<LocalNetwork>>,
    Path((party, id)): Path<(String, String)>,
    Json(request): Json<PlayMoveRequest>,
) -> Result<Json<CommitView>, ApiError> {
    let node = node_for(&network, &party)?;
    let position = Position::from_coordinates(request.row, request.column)
        .map_err(ProtocolError::from)?;
    let receipt = node
        .coordinator()
        .play_move(&GameId::from_string(id), position)
        .await?;
    Ok(Json(commit_view(&receipt)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::MoveError;
    use crate::protocol::{ArbiterError, Stage};
    use std::time::Duration;

    fn status_of(err: ProtocolError) -> StatusCode {
        ApiError::from(err).status
    }

    #[test]
    fn test_refusals_on_the_merits_are_unprocessable() {
        let refused = ProtocolError::ArbitrationRefused(ArbiterError::Malformed(
            "transition must be signed by both players".to_string(),
        ));
        let rejected = ProtocolError::CounterpartyRejection {
            counterparty: PartyId::from("PartyB"),
            reason: "Cell TopLeft is already occupied".to_string(),
        };
        assert_eq!(status_of(refused), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(rejected), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_client_and_timeout_statuses() {
        assert_eq!(
            status_of(MoveError::NotGenesis.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::NotFound(GameId::from_string("g1".to_string())).into()),
            StatusCode::NOT_FOUND
        );
        let timeout = ProtocolError::Timeout {
            stage: Stage::Arbitration,
            after: Duration::from_millis(5),
        };
        assert_eq!(status_of(timeout), StatusCode::GATEWAY_TIMEOUT);
    }
}

mod error;

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{broadcast, Mutex},
    time::MissedTickBehavior,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

pub use error::ApiError;

use crate::{
    accounts::{AccountService, Session},
    actors::{ActorId, GroupId, UnitId, UnitKind},
    commands::OrderRequest,
    config::GameConfig,
    engine::{Engine, EngineBuilder, EngineSettings},
    map::TileCoord,
    persistence::{Autosave, PersistenceGateway, StoreBackend},
    world::{GameView, World},
};

/// The one game the server is running, and who it belongs to. A `None` user
/// plays as a guest whose progress is never saved.
struct GameSession {
    user: Option<String>,
    world: World,
    engine: Engine,
    autosave: Autosave,
}

impl GameSession {
    fn start(&mut self, session: Session) {
        self.autosave = Autosave::new(
            self.engine.config().autosave_interval_ticks,
            session.world.tick(),
        );
        self.user = Some(session.user);
        self.world = session.world;
    }
}

struct AppState {
    session: Mutex<GameSession>,
    accounts: AccountService<StoreBackend>,
    broadcaster: broadcast::Sender<String>,
}

impl AppState {
    fn new(engine: Engine, accounts: AccountService<StoreBackend>, resumed: Option<Session>) -> Self {
        let (user, world) = match resumed {
            Some(Session { user, world }) => (Some(user), world),
            None => (None, engine.new_world()),
        };
        let autosave = Autosave::new(engine.config().autosave_interval_ticks, world.tick());
        let (broadcaster, _) = broadcast::channel::<String>(256);
        Self {
            session: Mutex::new(GameSession {
                user,
                world,
                engine,
                autosave,
            }),
            accounts,
            broadcaster,
        }
    }

    fn publish(&self, world: &World) -> GameView {
        let view = world.view();
        if let Ok(payload) = serde_json::to_string(&view) {
            let _ = self.broadcaster.send(payload);
        }
        view
    }
}

#[derive(Serialize)]
struct SessionResponse {
    user: Option<String>,
    view: GameView,
}

#[derive(Deserialize)]
struct SpawnUnitRequest {
    kind: UnitKind,
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    members: Vec<UnitId>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct AssignTileRequest {
    x: i32,
    y: i32,
    group: GroupId,
}

#[derive(Deserialize)]
struct ReleaseTileRequest {
    x: i32,
    y: i32,
}

#[derive(Deserialize)]
struct Credentials {
    user: String,
    password: String,
}

pub async fn run(config: GameConfig, store: StoreBackend) -> Result<()> {
    let tick_period = Duration::try_from_secs_f64(config.tick_seconds)
        .context("tick_seconds must be a positive, finite number of seconds")?;
    anyhow::ensure!(!tick_period.is_zero(), "tick_seconds must be positive");
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let engine = EngineBuilder::standard(EngineSettings::new(config)).build();
    let accounts = AccountService::new(PersistenceGateway::new(store));

    let resumed = accounts
        .resume_session(&engine)
        .await
        .context("failed to resume the last session")?;
    let state = Arc::new(AppState::new(engine, accounts, resumed));

    let ticker = tokio::spawn(tick_loop(state.clone(), tick_period));

    let router = Router::new()
        .route("/api/state", get(current_state))
        .route("/api/events", get(stream_events))
        .route("/api/units", post(spawn_unit))
        .route("/api/groups", post(create_group))
        .route("/api/units/:id/order", post(order_unit))
        .route("/api/groups/:id/order", post(order_group))
        .route("/api/tiles/assign", post(assign_tile))
        .route("/api/tiles/release", post(release_tile))
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .with_state(state.clone());

    info!(%addr, "Game server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.abort();
    save_on_exit(&state).await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down game server");
}

async fn save_on_exit(state: &AppState) {
    let session = state.session.lock().await;
    if let Some(user) = &session.user {
        if let Err(err) = state
            .accounts
            .gateway()
            .save_snapshot(user, &session.world)
            .await
        {
            warn!(user = %user, %err, "Final save failed");
        }
    }
}

async fn tick_loop(state: Arc<AppState>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of an interval fires immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        if let Err(err) = advance(&state).await {
            warn!(error = %err, "Tick failed");
        }
    }
}

async fn advance(state: &AppState) -> Result<()> {
    let due = {
        let mut guard = state.session.lock().await;
        let session = &mut *guard;
        session.engine.tick(&mut session.world)?;
        state.publish(&session.world);
        let tick = session.world.tick();
        match &session.user {
            Some(user) if session.autosave.should_save(tick) => {
                session.autosave.mark_saved(tick);
                Some((user.clone(), session.world.clone()))
            }
            _ => None,
        }
    };
    if let Some((user, world)) = due {
        if let Err(err) = state.accounts.gateway().save_snapshot(&user, &world).await {
            warn!(user = %user, %err, "Autosave failed");
        }
    }
    Ok(())
}

async fn current_state(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let session = state.session.lock().await;
    Json(SessionResponse {
        user: session.user.clone(),
        view: session.world.view(),
    })
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

async fn spawn_unit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpawnUnitRequest>,
) -> Result<Json<GameView>, ApiError> {
    let mut session = state.session.lock().await;
    session.world.spawn_unit(request.kind)?;
    Ok(Json(state.publish(&session.world)))
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<Json<GameView>, ApiError> {
    let mut session = state.session.lock().await;
    session.world.create_group(&request.members, request.name)?;
    Ok(Json(state.publish(&session.world)))
}

async fn order_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<GameView>, ApiError> {
    issue_order(&state, ActorId::Unit(UnitId(id)), request).await
}

async fn order_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<GameView>, ApiError> {
    issue_order(&state, ActorId::Group(GroupId(id)), request).await
}

async fn issue_order(
    state: &AppState,
    actor: ActorId,
    request: OrderRequest,
) -> Result<Json<GameView>, ApiError> {
    let mut guard = state.session.lock().await;
    let session = &mut *guard;
    session
        .world
        .issue_order(session.engine.config(), actor, request)?;
    Ok(Json(state.publish(&session.world)))
}

async fn assign_tile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignTileRequest>,
) -> Result<Json<GameView>, ApiError> {
    let mut session = state.session.lock().await;
    session
        .world
        .assign_tile(TileCoord::new(request.x, request.y), request.group)?;
    Ok(Json(state.publish(&session.world)))
}

async fn release_tile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReleaseTileRequest>,
) -> Result<Json<GameView>, ApiError> {
    let mut session = state.session.lock().await;
    session
        .world
        .release_tile(TileCoord::new(request.x, request.y))?;
    Ok(Json(state.publish(&session.world)))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut session = state.session.lock().await;
    state
        .accounts
        .check_available(&credentials.user, &credentials.password)
        .await?;
    if let Some(previous) = session.user.clone() {
        state.accounts.logout(&previous, &session.world).await?;
    }
    let started = state
        .accounts
        .signup(&session.engine, &credentials.user, &credentials.password)
        .await?;
    session.start(started);
    Ok(Json(SessionResponse {
        user: session.user.clone(),
        view: state.publish(&session.world),
    }))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut session = state.session.lock().await;
    state
        .accounts
        .verify(&credentials.user, &credentials.password)
        .await?;
    if let Some(previous) = session.user.clone() {
        state.accounts.logout(&previous, &session.world).await?;
    }
    let started = state
        .accounts
        .login(&session.engine, &credentials.user, &credentials.password)
        .await?;
    session.start(started);
    Ok(Json(SessionResponse {
        user: session.user.clone(),
        view: state.publish(&session.world),
    }))
}

async fn logout(State(state): State<Arc<AppState>>) -> Result<Json<SessionResponse>, ApiError> {
    let mut guard = state.session.lock().await;
    let session = &mut *guard;
    let user = session.user.take().ok_or(ApiError::NotLoggedIn)?;
    if let Err(err) = state.accounts.logout(&user, &session.world).await {
        session.user = Some(user);
        return Err(err.into());
    }
    session.world = session.engine.new_world();
    session.autosave = Autosave::new(session.engine.config().autosave_interval_ticks, 0);
    Ok(Json(SessionResponse {
        user: None,
        view: state.publish(&session.world),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{accounts::AccountError, persistence::LocalStore};

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        let engine = EngineBuilder::standard(EngineSettings::new(GameConfig::default())).build();
        let store = StoreBackend::Local(LocalStore::new(dir));
        let accounts = AccountService::new(PersistenceGateway::new(store));
        Arc::new(AppState::new(engine, accounts, None))
    }

    fn credentials(user: &str, password: &str) -> Json<Credentials> {
        Json(Credentials {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    #[test]
    fn account_handlers_can_run_on_any_worker() {
        fn assert_send<F: Send>(_: &F) {}
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let signing_up = signup(State(state.clone()), credentials("ada", "pw"));
        assert_send(&signing_up);
        let logging_in = login(State(state), credentials("ada", "pw"));
        assert_send(&logging_in);
    }

    #[tokio::test]
    async fn rejected_credentials_keep_the_current_player() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        assert!(signup(State(state.clone()), credentials("ada", "pw"))
            .await
            .is_ok());

        let wrong_password = login(State(state.clone()), credentials("ada", "nope")).await;
        assert!(matches!(
            wrong_password,
            Err(ApiError::Account(AccountError::WrongPassword))
        ));
        let taken = signup(State(state.clone()), credentials("ada", "again")).await;
        assert!(matches!(
            taken,
            Err(ApiError::Account(AccountError::UserExists(_)))
        ));
        assert_eq!(state.accounts.resume().await.unwrap().as_deref(), Some("ada"));
        assert_eq!(state.session.lock().await.user.as_deref(), Some("ada"));

        assert!(signup(State(state.clone()), credentials("grace", "pw2"))
            .await
            .is_ok());
        assert_eq!(
            state.accounts.resume().await.unwrap().as_deref(),
            Some("grace")
        );
        assert_eq!(state.session.lock().await.user.as_deref(), Some("grace"));
        assert!(state
            .accounts
            .gateway()
            .load_snapshot("ada")
            .await
            .unwrap()
            .is_some());
    }
}

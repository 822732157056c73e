use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast::error::RecvError};
use tokio_graceful_shutdown::SubsystemHandle;

use skpilot_core::{AutopilotEvent, DodgeCommand, TackGybeDirection};

use crate::{AutopilotProvider, SharedPilots, PROVIDER_ID};

// Signal K Autopilot API v2 paths
const AUTOPILOTS_URI: &str = "/signalk/v2/api/vehicles/self/autopilots";
const AUTOPILOT_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}";
const STATE_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/state";
const MODE_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/mode";
const TARGET_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/target";
const TARGET_ADJUST_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/target/adjust";
const ENGAGE_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/engage";
const DISENGAGE_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/disengage";
const TACK_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/tack/{direction}";
const GYBE_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/gybe/{direction}";
const DODGE_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/dodge";
const STREAM_URI: &str = "/signalk/v2/api/vehicles/self/autopilots/{id}/stream";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
}

#[derive(Clone)]
pub struct Web {
    pilots: SharedPilots,
    port: u16,
}

impl Web {
    pub fn new(pilots: SharedPilots, port: u16) -> Self {
        Web { pilots, port }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let listener = TcpListener::bind(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            self.port,
        ))
        .await?;

        log::info!("Starting HTTP web server on port {}", self.port);

        axum::serve(listener, router(self.pilots))
            .with_graceful_shutdown(async move {
                subsys.on_shutdown_requested().await;
            })
            .await?;
        Ok(())
    }
}

/// Build the API router for `pilots`
pub fn router(pilots: SharedPilots) -> Router {
    Router::new()
        .route(AUTOPILOTS_URI, get(get_autopilots))
        .route(AUTOPILOT_URI, get(get_data))
        .route(STATE_URI, get(get_state).put(set_state))
        .route(MODE_URI, get(get_mode).put(set_mode))
        .route(TARGET_URI, get(get_target).put(set_target))
        .route(TARGET_ADJUST_URI, put(adjust_target))
        .route(ENGAGE_URI, post(engage))
        .route(DISENGAGE_URI, post(disengage))
        .route(TACK_URI, post(tack))
        .route(GYBE_URI, post(gybe))
        .route(DODGE_URI, post(enter_dodge).put(enter_dodge).delete(exit_dodge))
        .route(STREAM_URI, get(stream_handler))
        .layer(middleware::from_fn(no_cache_middleware))
        .with_state(pilots)
}

/// Middleware to add no-cache headers to API responses
async fn no_cache_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutopilotInfo {
    provider: String,
    is_default: bool,
}

/// Request body of all value-setting commands: `{"value": ...}`
#[derive(Deserialize)]
struct ValueRequest<T> {
    value: T,
}

/// Reply of a state change
#[derive(Serialize)]
struct EngagedReply {
    engaged: bool,
}

fn parse_direction(direction: &str) -> Result<TackGybeDirection, Response> {
    direction.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid direction: {}", direction),
        )
            .into_response()
    })
}

// Signal K response format:
//    {"mockPilotSK":{"provider":"mock-autopilot-provider","isDefault":true}}
//
#[debug_handler]
async fn get_autopilots(State(pilots): State<SharedPilots>) -> Response {
    let default_id = pilots.default_id();
    let list: BTreeMap<String, AutopilotInfo> = pilots
        .ids()
        .map(|id| {
            (
                id.to_string(),
                AutopilotInfo {
                    provider: PROVIDER_ID.to_string(),
                    is_default: Some(id) == default_id,
                },
            )
        })
        .collect();
    Json(list).into_response()
}

#[debug_handler]
async fn get_data(State(pilots): State<SharedPilots>, Path(id): Path<String>) -> Response {
    match pilots.get_data(&id).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn get_state(State(pilots): State<SharedPilots>, Path(id): Path<String>) -> Response {
    match pilots.get_state(&id).await {
        Ok(state) => Json(state).into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn set_state(
    State(pilots): State<SharedPilots>,
    Path(id): Path<String>,
    Json(request): Json<ValueRequest<String>>,
) -> Response {
    debug!("PUT state {} for autopilot {}", request.value, id);
    match pilots.set_state(&id, &request.value).await {
        Ok(engaged) => Json(EngagedReply { engaged }).into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn get_mode(State(pilots): State<SharedPilots>, Path(id): Path<String>) -> Response {
    match pilots.get_mode(&id).await {
        Ok(mode) => Json(mode).into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn set_mode(
    State(pilots): State<SharedPilots>,
    Path(id): Path<String>,
    Json(request): Json<ValueRequest<String>>,
) -> Response {
    debug!("PUT mode {} for autopilot {}", request.value, id);
    match pilots.set_mode(&id, &request.value).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn get_target(State(pilots): State<SharedPilots>, Path(id): Path<String>) -> Response {
    match pilots.get_target(&id).await {
        Ok(target) => Json(target).into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn set_target(
    State(pilots): State<SharedPilots>,
    Path(id): Path<String>,
    Json(request): Json<ValueRequest<f64>>,
) -> Response {
    debug!("PUT target {} for autopilot {}", request.value, id);
    match pilots.set_target(&id, request.value).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn adjust_target(
    State(pilots): State<SharedPilots>,
    Path(id): Path<String>,
    Json(request): Json<ValueRequest<f64>>,
) -> Response {
    debug!("PUT target adjust {} for autopilot {}", request.value, id);
    match pilots.adjust_target(&id, request.value).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn engage(State(pilots): State<SharedPilots>, Path(id): Path<String>) -> Response {
    match pilots.engage(&id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn disengage(State(pilots): State<SharedPilots>, Path(id): Path<String>) -> Response {
    match pilots.disengage(&id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn tack(
    State(pilots): State<SharedPilots>,
    Path((id, direction)): Path<(String, String)>,
) -> Response {
    let direction = match parse_direction(&direction) {
        Ok(d) => d,
        Err(response) => return response,
    };
    match pilots.tack(&id, direction).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn gybe(
    State(pilots): State<SharedPilots>,
    Path((id, direction)): Path<(String, String)>,
) -> Response {
    let direction = match parse_direction(&direction) {
        Ok(d) => d,
        Err(response) => return response,
    };
    match pilots.gybe(&id, direction).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn enter_dodge(
    State(pilots): State<SharedPilots>,
    Path(id): Path<String>,
    Json(request): Json<ValueRequest<f64>>,
) -> Response {
    debug!("Dodge {} for autopilot {}", request.value, id);
    match pilots.dodge(&id, DodgeCommand::Enter(request.value)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn exit_dodge(State(pilots): State<SharedPilots>, Path(id): Path<String>) -> Response {
    debug!("Exit dodge for autopilot {}", id);
    match pilots.dodge(&id, DodgeCommand::Exit).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[debug_handler]
async fn stream_handler(
    State(pilots): State<SharedPilots>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) = pilots.get(&id) {
        return e.into_response();
    }
    ws.on_upgrade(move |socket| event_stream(socket, pilots, id))
}

/// Forward the events of one device to a websocket client.
///
/// The first message is the current status, so a client does not have to
/// wait for the next change.
async fn event_stream(mut socket: WebSocket, pilots: SharedPilots, id: String) {
    let mut events = pilots.subscribe();

    let initial = match pilots.get(&id) {
        Ok(device) => AutopilotEvent::Update {
            device_type: id.clone(),
            status: device.status().device,
        },
        Err(_) => return,
    };
    if send_event(&mut socket, &initial).await.is_err() {
        return;
    }
    debug!("Started /stream websocket for autopilot {}", id);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if event.device_type() != id {
                        continue;
                    }
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Websocket for autopilot {} missed {} events", id, n);
                }
                Err(RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(m)) => trace!("Ignoring websocket message {:?}", m),
            },
        }
    }
    debug!("Websocket for autopilot {} closed", id);
}

async fn send_event(socket: &mut WebSocket, event: &AutopilotEvent) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}

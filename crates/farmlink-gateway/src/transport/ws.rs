//! WebSocket handler.
//!
//! Responsibilities:
//! - Authenticate the device (`uuid` + `token` query) before upgrading
//! - Register the session in the hub so replies can reach it
//! - Decode text frames into envelopes and queue them for the dispatcher
//! - Lifecycle: ping/pong + idle timeout

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use farmlink_core::coerce::epoch_float;
use farmlink_core::error::{ClientCode, FarmlinkError, Result};

use crate::app_state::AppState;
use crate::transport::codec::decode_envelope;
use crate::transport::hub::Connection;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub uuid: String,
    pub token: String,
}

/// Transport-level error frame. `confirm_id` is null: the frame answers the
/// raw message, not a dispatched one.
fn transport_error_json(code: ClientCode, msg: &str) -> String {
    json!({
        "message_type": "error",
        "time_stamp": epoch_float(Utc::now()),
        "confirm_id": null,
        "code": code.as_str(),
        "error": msg
    })
    .to_string()
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    if app.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    if !app.cfg().authenticate(&q.uuid, &q.token) {
        app.metrics().auth_failures.inc(&[]);
        tracing::warn!(uuid = %q.uuid, "device auth failed");
        let code = FarmlinkError::AuthFailed.client_code();
        return (StatusCode::UNAUTHORIZED, code.as_str()).into_response();
    }

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_session(app, q.uuid, socket).await {
            tracing::debug!(error = %e, "session ended with error");
        }
    })
}

async fn run_session(app: AppState, uuid: String, socket: WebSocket) -> Result<()> {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(app.cfg().gateway.outbound_queue);
    let session_id = app.hub().register(&uuid, Connection { tx: out_tx.clone() });
    app.metrics().ws_sessions.inc(&[]);

    let span = tracing::info_span!("ws_session", %uuid, session_id);
    let result = session_loop(&app, &uuid, socket, &out_tx, &mut out_rx)
        .instrument(span)
        .await;

    app.hub().remove(session_id);
    app.metrics().ws_sessions.dec(&[]);
    result
}

async fn session_loop(
    app: &AppState,
    uuid: &str,
    socket: WebSocket,
    out_tx: &mpsc::Sender<Message>,
    out_rx: &mut mpsc::Receiver<Message>,
) -> Result<()> {
    tracing::info!("device connected");
    let (mut ws_tx, mut ws_rx) = socket.split();

    let gw = &app.cfg().gateway;
    let ping_every = Duration::from_millis(gw.ping_interval_ms);
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                if ws_tx.send(m).await.is_err() {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match msg {
                    Message::Text(s) => {
                        let queued = decode_envelope(&s, uuid).and_then(|env| {
                            app.submit(env)
                        });
                        if let Err(e) = queued {
                            if matches!(e, FarmlinkError::BadRequest(_)) {
                                app.metrics().decode_errors.inc(&[]);
                            }
                            tracing::debug!(error = %e, "inbound frame rejected");
                            let frame = transport_error_json(e.client_code(), &e.to_string());
                            let _ = out_tx.try_send(Message::Text(frame));
                        }
                    }
                    Message::Binary(_) => {
                        app.metrics().decode_errors.inc(&[]);
                        let frame = transport_error_json(ClientCode::BadRequest, "binary frames not supported");
                        let _ = out_tx.try_send(Message::Text(frame));
                    }
                    Message::Ping(payload) => {
                        let _ = out_tx.try_send(Message::Pong(payload));
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }

            _ = ping_tick.tick() => {
                let _ = out_tx.try_send(Message::Ping(Vec::new()));
            }

            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    let frame = transport_error_json(ClientCode::BadRequest, "idle timeout");
                    let _ = ws_tx.send(Message::Text(frame)).await;
                    break;
                }
            }
        }
    }

    tracing::info!("device disconnected");
    Ok(())
}

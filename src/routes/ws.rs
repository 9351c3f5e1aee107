//! WebSocket upgrade + message loop. Each connection owns a `Session`; every client
//! message drives one state transition and gets exactly one JSON reply.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::domain::{ImagePayload, Mode};
use crate::error::ValidationError;
use crate::logic::analyze_envelope;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::Session;
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "study_partner", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "study_partner", "WebSocket connected");
  let mut session = Session::new();
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => handle_client_ws(incoming, &state, &mut session).await,
          Err(e) => ServerWsMessage::Error { message: format!("Invalid message: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "study_partner", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => {
        if let Err(e) = socket.send(Message::Pong(payload)).await {
          error!(target: "study_partner", error = %e, "WS pong send error");
          break;
        }
      }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "study_partner", "WebSocket disconnected");
}

fn state_msg(session: &Session) -> ServerWsMessage {
  ServerWsMessage::State { state: session.state().name(), mode: session.mode() }
}

#[instrument(level = "info", skip(state, session, msg))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session: &mut Session) -> ServerWsMessage {
  let transition = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,

    ClientWsMessage::SelectMode { mode } => match mode.parse::<Mode>() {
      Ok(m) => session.select_mode(m),
      Err(_) => return ServerWsMessage::Error { message: ValidationError::InvalidMode.to_string() },
    },

    ClientWsMessage::SetCredential { credential } => {
      session.set_credential(&credential);
      Ok(())
    }

    ClientWsMessage::ClearCredential => {
      session.clear_credential();
      Ok(())
    }

    ClientWsMessage::StartCapture => session.start_capture(),
    ClientWsMessage::CancelCapture => session.cancel_capture(),
    ClientWsMessage::Dismiss => session.dismiss(),

    ClientWsMessage::Submit { image, context } => {
      if image.is_empty() {
        return ServerWsMessage::Error { message: ValidationError::MissingImage.to_string() };
      }
      let req = match session.begin_processing(ImagePayload::from_wire(&image), context) {
        Ok(r) => r,
        Err(e) => return ServerWsMessage::Error { message: e.to_string() },
      };
      let result = analyze_envelope(state, &req).await;
      debug!(target: "study_partner", mode = %req.mode, success = result.success, "WS analysis finished");
      return match session.complete(result.clone()) {
        Ok(()) => ServerWsMessage::Result { result },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      };
    }
  };

  match transition {
    Ok(()) => state_msg(session),
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::{Message, ProtocolError};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::jwt::TokenVerifier;
use crate::notify::hub::NotificationHub;
use crate::notify::protocol::{ClientMessage, ServerEvent};

/// Query params for the WebSocket handshake endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// GET /api/notifications/ws?token=<jwt>
///
/// Browsers cannot set an Authorization header on the handshake, so the
/// token travels in the query string.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    verifier: web::Data<TokenVerifier>,
    hub: web::Data<Arc<NotificationHub>>,
) -> Result<HttpResponse, actix_web::Error> {
    let claims = verifier
        .verify(&query.token)
        .await
        .map_err(|e| actix_web::error::ErrorUnauthorized(format!("Invalid token: {e}")))?;

    let user_id = claims
        .user_id()
        .map_err(actix_web::error::ErrorUnauthorized)?;

    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    let (connection_id, rx) = hub.register(user_id).await;
    info!(%user_id, connection_id, "notification session opened");

    actix_web::rt::spawn(run_session(
        session,
        msg_stream,
        rx,
        user_id,
        connection_id,
        hub.get_ref().clone(),
    ));

    Ok(response)
}

/// What the session does with one item from the client stream.
#[derive(Debug, PartialEq)]
enum Step {
    Reply(ServerEvent),
    Pong(web::Bytes),
    Close,
    Ignore,
}

/// `None` means the client went away without a Close frame; that ends the
/// session just like a Close does.
fn next_step(msg: Option<Result<Message, ProtocolError>>) -> Step {
    match msg {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => Step::Reply(ServerEvent::Pong),
            Err(e) => Step::Reply(ServerEvent::Error {
                message: format!("Invalid message format: {e}"),
            }),
        },
        Some(Ok(Message::Ping(bytes))) => Step::Pong(bytes),
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => Step::Close,
        Some(Ok(_)) => Step::Ignore,
    }
}

async fn run_session(
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    user_id: Uuid,
    connection_id: u64,
    hub: Arc<NotificationHub>,
) {
    loop {
        tokio::select! {
            msg = msg_stream.next() => {
                match next_step(msg) {
                    Step::Reply(reply) => {
                        if send_event(&mut session, &reply).await.is_err() {
                            break;
                        }
                    }
                    Step::Pong(bytes) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Step::Close => break,
                    Step::Ignore => {}
                }
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut session, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.unregister(user_id, connection_id).await;
    debug!(%user_id, connection_id, "notification session closed");
    let _ = session.close(None).await;
}

async fn send_event(
    session: &mut actix_ws::Session,
    event: &ServerEvent,
) -> Result<(), actix_ws::Closed> {
    match serde_json::to_string(event) {
        Ok(json) => session.text(json).await,
        Err(e) => {
            debug!(error = %e, "could not serialize notification");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_client_stream_ends_the_session() {
        assert_eq!(next_step(None), Step::Close);
        assert_eq!(next_step(Some(Ok(Message::Close(None)))), Step::Close);
    }

    #[test]
    fn ping_text_gets_a_pong_and_garbage_gets_an_error() {
        assert_eq!(
            next_step(Some(Ok(Message::Text(r#"{"type":"ping"}"#.into())))),
            Step::Reply(ServerEvent::Pong)
        );
        assert!(matches!(
            next_step(Some(Ok(Message::Text("not json".into())))),
            Step::Reply(ServerEvent::Error { .. })
        ));
    }

    #[test]
    fn protocol_pings_are_echoed() {
        let payload = web::Bytes::from_static(b"hb");
        assert_eq!(
            next_step(Some(Ok(Message::Ping(payload.clone())))),
            Step::Pong(payload)
        );
        assert_eq!(next_step(Some(Ok(Message::Nop))), Step::Ignore);
    }
}

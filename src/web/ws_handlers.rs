// src/web/ws_handlers.rs
use crate::{
    models::{
        notification::{Room, SocketAction, SocketEvent},
        user::{CurrentUser, ROLE_HELPDESK_ADMIN},
    },
    state::{AppState, WsTx},
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Quem pode seguir cada sala.
pub fn can_join(user: &CurrentUser, room: &Room) -> bool {
    match room {
        Room::Day(_) => true,
        Room::Coordinator(id) | Room::Requester(id) => *id == user.id || user.is_admin(),
        Room::Tech(id) => *id == user.id || user.has_any_role(&[ROLE_HELPDESK_ADMIN]),
    }
}

/// Handler para o upgrade da conexão HTTP para WebSocket (GET /ws).
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    tracing::info!("Tentativa de upgrade WebSocket por {}", user.username);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Resposta só para esta conexão (confirmação ou erro).
async fn reply(tx: &WsTx, event: &str, room: &str, data: serde_json::Value) {
    let frame = SocketEvent {
        event: event.to_string(),
        room: room.to_string(),
        data,
    };
    match serde_json::to_string(&frame) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text.into())).await;
        }
        Err(e) => tracing::error!("Erro ao serializar resposta WS: {:?}", e),
    }
}

async fn process_action(state: &AppState, user: &CurrentUser, conn_id: Uuid, tx: &WsTx, text: &str) {
    let action = match serde_json::from_str::<SocketAction>(text) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!("Mensagem WS inválida de {}: {}", conn_id, e);
            reply(tx, "error", "", json!({ "message": "Mensagem inválida." })).await;
            return;
        }
    };

    let Some(room) = Room::parse(&action.room) else {
        reply(tx, "error", &action.room, json!({ "message": "Sala desconhecida." })).await;
        return;
    };

    match action.action.as_str() {
        "join" if can_join(user, &room) => {
            state.hub.join(conn_id, &room).await;
            tracing::debug!("WS {} ({}) entrou em {}", conn_id, user.username, action.room);
            reply(tx, "joined", &room.name(), json!({})).await;
        }
        "join" => {
            tracing::warn!("WS: {} sem acesso à sala {}", user.username, action.room);
            reply(tx, "error", &action.room, json!({ "message": "Sem permissão para esta sala." })).await;
        }
        "leave" => {
            state.hub.leave(conn_id, &room).await;
            reply(tx, "left", &room.name(), json!({})).await;
        }
        other => {
            reply(tx, "error", &action.room, json!({ "message": format!("Ação desconhecida '{}'.", other) })).await;
        }
    }
}

/// Gere uma conexão WebSocket individual.
async fn handle_socket(socket: WebSocket, state: AppState, user: CurrentUser) {
    let conn_id = Uuid::new_v4();
    tracing::info!("🔌 Nova conexão WS: {} (utilizador {})", conn_id, user.username);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Todas as mensagens para este cliente passam por este canal
    let (tx, mut rx) = mpsc::channel::<Message>(32);
    state.hub.register(conn_id, tx.clone()).await;

    // --- Task 1: canal MPSC -> cliente ---
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!("Falha ao enviar msg WS para {}, terminando send_task.", conn_id);
                break;
            }
        }
    });

    // --- Task 2: cliente -> ações join/leave ---
    let state_recv = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => process_action(&state_recv, &user, conn_id, &tx, text.as_str()).await,
                Message::Close(_) => {
                    tracing::info!("Cliente {} enviou Close frame.", conn_id);
                    break;
                }
                _ => tracing::trace!("Ignorando msg WS não-texto de {}", conn_id),
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.hub.unregister(conn_id).await;
    tracing::info!("🔌 Conexão WS {} fechada.", conn_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user(id: i64, roles: &[&str]) -> CurrentUser {
        CurrentUser {
            id,
            username: format!("u{}", id),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn room_access_rules() {
        let day = Room::Day(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        let student = user(5, &["student"]);
        assert!(can_join(&student, &day));
        assert!(can_join(&student, &Room::Requester(5)));
        assert!(!can_join(&student, &Room::Requester(6)));
        assert!(!can_join(&student, &Room::Coordinator(6)));

        let boss = user(9, &["helpdesk_admin"]);
        assert!(can_join(&boss, &Room::Tech(3)));
        assert!(!can_join(&boss, &Room::Coordinator(3)));

        let admin = user(1, &["admin"]);
        assert!(can_join(&admin, &Room::Coordinator(3)));
    }

    #[tokio::test]
    async fn join_is_acknowledged_and_foreign_room_refused() {
        let state = AppState {
            db_pool: crate::db::test_pool().await,
            hub: Default::default(),
            default_slot_minutes: 10,
        };
        let (tx, mut rx) = mpsc::channel(8);
        let conn = Uuid::new_v4();
        state.hub.register(conn, tx.clone()).await;
        let me = user(4, &["coordinator"]);

        process_action(&state, &me, conn, &tx, r#"{"action":"join","room":"coord:4"}"#).await;
        process_action(&state, &me, conn, &tx, r#"{"action":"join","room":"coord:5"}"#).await;

        let frames: Vec<serde_json::Value> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| match m {
                Message::Text(t) => serde_json::from_str(t.as_str()).unwrap(),
                other => panic!("frame inesperado: {:?}", other),
            })
            .collect();
        assert_eq!(frames[0]["event"], "joined");
        assert_eq!(frames[1]["event"], "error");

        // só a sala autorizada recebe eventos
        state.hub.emit(&Room::Coordinator(4), "windows_changed", json!({})).await;
        state.hub.emit(&Room::Coordinator(5), "windows_changed", json!({})).await;
        assert!(matches!(rx.try_recv(), Ok(Message::Text(_))));
        assert!(rx.try_recv().is_err());
    }
}

// src/state.rs
use crate::models::notification::{Room, SocketEvent};
use axum::extract::ws::Message;
use sqlx::SqlitePool;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

// Tipo para o 'sender' de uma conexão WebSocket individual
pub type WsTx = mpsc::Sender<Message>;

#[derive(Debug, Default)]
struct HubInner {
    connections: HashMap<Uuid, WsTx>,
    // nome da sala -> conexões que a seguem
    rooms: HashMap<String, HashSet<Uuid>>,
}

/// Distribuição de eventos por salas (dia, coordenador, requerente, técnico).
#[derive(Debug, Clone, Default)]
pub struct NotificationHub {
    inner: Arc<Mutex<HubInner>>,
}

impl NotificationHub {
    pub async fn register(&self, conn_id: Uuid, tx: WsTx) {
        self.inner.lock().await.connections.insert(conn_id, tx);
    }

    /// Remove a conexão e tira-a de todas as salas.
    pub async fn unregister(&self, conn_id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner.connections.remove(&conn_id);
        inner.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    pub async fn join(&self, conn_id: Uuid, room: &Room) {
        let mut inner = self.inner.lock().await;
        if inner.connections.contains_key(&conn_id) {
            inner.rooms.entry(room.name()).or_default().insert(conn_id);
        }
    }

    pub async fn leave(&self, conn_id: Uuid, room: &Room) {
        let mut inner = self.inner.lock().await;
        let name = room.name();
        if let Some(members) = inner.rooms.get_mut(&name) {
            members.remove(&conn_id);
            if members.is_empty() {
                inner.rooms.remove(&name);
            }
        }
    }

    /// Envia um evento para todos os membros da sala. Canal cheio: a mensagem perde-se.
    /// Canal fechado: a conexão é removida do hub.
    pub async fn emit(&self, room: &Room, event: &str, data: serde_json::Value) {
        let payload = SocketEvent {
            event: event.to_string(),
            room: room.name(),
            data,
        };
        let text = match serde_json::to_string(&payload) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("Erro ao serializar evento WS '{}': {:?}", event, e);
                return;
            }
        };

        // Copia os senders para não segurar o lock durante os envios
        let targets: Vec<(Uuid, WsTx)> = {
            let inner = self.inner.lock().await;
            inner
                .rooms
                .get(&payload.room)
                .map(|members| {
                    members
                        .iter()
                        .filter_map(|id| inner.connections.get(id).map(|tx| (*id, tx.clone())))
                        .collect()
                })
                .unwrap_or_default()
        };

        tracing::debug!("-> WS evento '{}' para {} ({} conexões)", event, payload.room, targets.len());
        let mut closed = Vec::new();
        for (conn_id, tx) in targets {
            match tx.try_send(Message::Text(text.clone().into())) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("Canal WS de {} cheio, evento '{}' descartado.", conn_id, event);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(conn_id),
            }
        }
        for conn_id in closed {
            tracing::debug!("Removendo conexão WS fechada {}", conn_id);
            self.unregister(conn_id).await;
        }
    }

    pub async fn emit_many(&self, rooms: &[Room], event: &str, data: serde_json::Value) {
        for room in rooms {
            self.emit(room, event, data.clone()).await;
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub hub: NotificationHub,
    pub default_slot_minutes: i64,
}

// Permite extrair o pool da DB diretamente
impl axum::extract::FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> SqlitePool {
        state.db_pool.clone()
    }
}

impl axum::extract::FromRef<AppState> for NotificationHub {
    fn from_ref(state: &AppState) -> NotificationHub {
        state.hub.clone()
    }
}

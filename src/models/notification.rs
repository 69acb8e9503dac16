// src/models/notification.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ação enviada pelo cliente via WebSocket.
#[derive(Debug, Deserialize)]
pub struct SocketAction {
    pub action: String, // "join" ou "leave"
    pub room: String,
}

/// Evento enviado pelo servidor a todos os membros de uma sala.
#[derive(Debug, Clone, Serialize)]
pub struct SocketEvent {
    pub event: String,
    pub room: String,
    pub data: serde_json::Value,
}

/// Salas conhecidas. O nome em texto é o que o cliente envia em `join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Room {
    Day(NaiveDate),
    Coordinator(i64),
    Requester(i64),
    Tech(i64),
}

impl Room {
    pub fn parse(name: &str) -> Option<Room> {
        let (kind, value) = name.split_once(':')?;
        match kind {
            "day" => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().map(Room::Day),
            "coord" => value.parse().ok().map(Room::Coordinator),
            "ticket" => value.parse().ok().map(Room::Requester),
            "tech" => value.parse().ok().map(Room::Tech),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Room::Day(day) => format!("day:{}", day.format("%Y-%m-%d")),
            Room::Coordinator(id) => format!("coord:{}", id),
            Room::Requester(id) => format!("ticket:{}", id),
            Room::Tech(id) => format!("tech:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_names_round_trip_through_parse() {
        let day = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        assert_eq!(Room::parse("day:2025-09-03"), Some(Room::Day(day)));
        assert_eq!(Room::parse("coord:7").map(|r| r.name()), Some("coord:7".to_string()));
        assert_eq!(Room::parse("coord:sete"), None);
        assert_eq!(Room::parse("lobby"), None);
    }
}

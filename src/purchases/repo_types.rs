use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::{dates::iso_date, db};

/// Seat identifier as sent by the client: a label like `"A1"` or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seat {
    Label(String),
    Number(serde_json::Number),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseStatus {
    #[serde(rename = "ativo")]
    Active,
    #[serde(rename = "usado")]
    Used,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Active => "ativo",
            PurchaseStatus::Used => "usado",
            PurchaseStatus::Cancelled => "cancelado",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ativo" => Ok(PurchaseStatus::Active),
            "usado" => Ok(PurchaseStatus::Used),
            "cancelado" => Ok(PurchaseStatus::Cancelled),
            other => anyhow::bail!("unknown purchase status {other:?}"),
        }
    }
}

/// `purchases` row as stored; seats are JSON text.
#[derive(Debug, FromRow)]
pub struct PurchaseRow {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub movie_name: String,
    pub room_id: i64,
    pub room_name: String,
    pub showtime: String,
    pub session_date: Date,
    pub seats: String,
    pub ticket_count: i64,
    pub total_price: f64,
    pub status: String,
    pub created_at: OffsetDateTime,
}

/// Purchase record. Serializes to its public representation, which leaves
/// out the owner and the external ids.
#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub movie_id: i64,
    #[serde(rename = "filme_nome")]
    pub movie_name: String,
    #[serde(skip_serializing)]
    pub room_id: i64,
    #[serde(rename = "sala_nome")]
    pub room_name: String,
    #[serde(rename = "horario")]
    pub showtime: String,
    #[serde(rename = "data_sessao", with = "iso_date")]
    pub session_date: Date,
    #[serde(rename = "poltronas")]
    pub seats: Vec<Seat>,
    #[serde(rename = "quantidade_ingressos")]
    pub ticket_count: i64,
    #[serde(rename = "valor_total")]
    pub total_price: f64,
    pub status: PurchaseStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = anyhow::Error;

    fn try_from(r: PurchaseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            seats: db::from_json_text(Some(&r.seats))?,
            status: r.status.parse()?,
            id: r.id,
            user_id: r.user_id,
            movie_id: r.movie_id,
            movie_name: r.movie_name,
            room_id: r.room_id,
            room_name: r.room_name,
            showtime: r.showtime,
            session_date: r.session_date,
            ticket_count: r.ticket_count,
            total_price: r.total_price,
            created_at: r.created_at,
        })
    }
}

/// Validated purchase ready to insert.
#[derive(Debug)]
pub struct NewPurchase {
    pub movie_id: i64,
    pub movie_name: String,
    pub room_id: i64,
    pub room_name: String,
    pub showtime: String,
    pub session_date: Date,
    pub seats: Vec<Seat>,
    pub total_price: f64,
}

impl NewPurchase {
    pub fn ticket_count(&self) -> i64 {
        self.seats.len() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{date, datetime};

    #[test]
    fn seats_accept_labels_and_numbers() {
        let seats: Vec<Seat> = serde_json::from_value(json!(["A1", 12, "B7"])).unwrap();
        assert_eq!(
            seats,
            vec![
                Seat::Label("A1".into()),
                Seat::Number(12i64.into()),
                Seat::Label("B7".into())
            ]
        );
        assert_eq!(serde_json::to_value(&seats).unwrap(), json!(["A1", 12, "B7"]));
    }

    #[test]
    fn status_wire_names() {
        for status in [
            PurchaseStatus::Active,
            PurchaseStatus::Used,
            PurchaseStatus::Cancelled,
        ] {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, json!(status.as_str()));
            assert_eq!(status.as_str().parse::<PurchaseStatus>().unwrap(), status);
        }
        assert!("active".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn public_representation_hides_owner_and_ids() {
        let purchase = Purchase::try_from(PurchaseRow {
            id: 3,
            user_id: 1,
            movie_id: 10,
            movie_name: "Duna".into(),
            room_id: 2,
            room_name: "Sala 2".into(),
            showtime: "19:30".into(),
            session_date: date!(2024 - 07 - 01),
            seats: r#"["A1","A2"]"#.into(),
            ticket_count: 2,
            total_price: 50.0,
            status: "ativo".into(),
            created_at: datetime!(2024-06-01 12:00 UTC),
        })
        .unwrap();
        let json = serde_json::to_value(&purchase).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json.get("movie_id").is_none());
        assert!(json.get("room_id").is_none());
        assert_eq!(json["data_sessao"], "2024-07-01");
        assert_eq!(json["poltronas"], json!(["A1", "A2"]));
        assert_eq!(json["quantidade_ingressos"], 2);
        assert_eq!(json["valor_total"], 50.0);
        assert_eq!(json["status"], "ativo");
    }

    #[test]
    fn unknown_stored_status_is_an_error() {
        let row = PurchaseRow {
            id: 1,
            user_id: 1,
            movie_id: 1,
            movie_name: "x".into(),
            room_id: 1,
            room_name: "x".into(),
            showtime: "x".into(),
            session_date: date!(2024 - 07 - 01),
            seats: "[]".into(),
            ticket_count: 0,
            total_price: 0.0,
            status: "refunded".into(),
            created_at: datetime!(2024-06-01 12:00 UTC),
        };
        assert!(Purchase::try_from(row).is_err());
    }
}

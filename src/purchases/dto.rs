use serde::{Deserialize, Serialize};

use crate::purchases::repo_types::{Purchase, Seat};

/// Request body for a new purchase. Every field is required; they are kept
/// optional here so the missing one can be named in the error.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePurchaseRequest {
    pub filme_id: Option<i64>,
    pub filme_nome: Option<String>,
    pub sala_id: Option<i64>,
    pub sala_nome: Option<String>,
    pub horario: Option<String>,
    pub data_sessao: Option<String>,
    pub poltronas: Option<Vec<Seat>>,
    pub valor_total: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub message: &'static str,
    pub compra: Purchase,
}

use crate::dates::parse_iso_date;
use crate::error::{AppError, AppResult};
use crate::purchases::dto::CreatePurchaseRequest;
use crate::purchases::repo_types::NewPurchase;

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(format!("Campo {field} é obrigatório")))
}

/// Checks the fields in wire order; the first missing one is reported.
pub fn validate_purchase(req: CreatePurchaseRequest) -> AppResult<NewPurchase> {
    let movie_id = required(req.filme_id, "filme_id")?;
    let movie_name = required(req.filme_nome, "filme_nome")?;
    let room_id = required(req.sala_id, "sala_id")?;
    let room_name = required(req.sala_nome, "sala_nome")?;
    let showtime = required(req.horario, "horario")?;
    let raw_date = required(req.data_sessao, "data_sessao")?;
    let seats = required(req.poltronas, "poltronas")?;
    let total_price = required(req.valor_total, "valor_total")?;

    let session_date = parse_iso_date(&raw_date)
        .ok_or_else(|| AppError::validation("Data da sessão inválida (use YYYY-MM-DD)"))?;

    Ok(NewPurchase {
        movie_id,
        movie_name,
        room_id,
        room_name,
        showtime,
        session_date,
        seats,
        total_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchases::repo_types::Seat;
    use time::macros::date;

    fn full_request() -> CreatePurchaseRequest {
        CreatePurchaseRequest {
            filme_id: Some(1),
            filme_nome: Some("Duna".into()),
            sala_id: Some(2),
            sala_nome: Some("Sala 2".into()),
            horario: Some("19:30".into()),
            data_sessao: Some("2024-07-01".into()),
            poltronas: Some(vec![Seat::Label("A1".into()), Seat::Label("A2".into())]),
            valor_total: Some(50.0),
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn builds_new_purchase() {
        let new = validate_purchase(full_request()).unwrap();
        assert_eq!(new.session_date, date!(2024 - 07 - 01));
        assert_eq!(new.ticket_count(), 2);
    }

    #[test]
    fn first_missing_field_is_reported() {
        let mut req = full_request();
        req.sala_id = None;
        req.valor_total = None;
        assert_eq!(
            message(validate_purchase(req).unwrap_err()),
            "Campo sala_id é obrigatório"
        );

        let req = CreatePurchaseRequest::default();
        assert_eq!(
            message(validate_purchase(req).unwrap_err()),
            "Campo filme_id é obrigatório"
        );
    }

    #[test]
    fn empty_seat_list_is_allowed() {
        let mut req = full_request();
        req.poltronas = Some(vec![]);
        assert_eq!(validate_purchase(req).unwrap().ticket_count(), 0);
    }

    #[test]
    fn rejects_malformed_session_date() {
        let mut req = full_request();
        req.data_sessao = Some("01/07/2024".into());
        assert_eq!(
            message(validate_purchase(req).unwrap_err()),
            "Data da sessão inválida (use YYYY-MM-DD)"
        );
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UpdatePhotoRequest {
    pub title: String,
    /// Left unchanged when omitted.
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPhotoResponse {
    pub id: Uuid,
    pub title: String,
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_stay_unset() {
        let req: UpdatePhotoRequest = serde_json::from_str(r#"{"title":"Dunes"}"#).unwrap();
        assert_eq!(req.title, "Dunes");
        assert!(req.description.is_none());
        assert!(req.price.is_none());

        let req: UpdatePhotoRequest =
            serde_json::from_str(r#"{"title":"Dunes","description":"","price":"4.50"}"#).unwrap();
        assert_eq!(req.description.as_deref(), Some(""));
        assert_eq!(req.price, Some(Decimal::new(450, 2)));
    }
}

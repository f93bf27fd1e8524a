use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub photo_id: Uuid,
}

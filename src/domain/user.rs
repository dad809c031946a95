use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// IANA zone name. Falls back to the system default when unset.
    pub timezone: Option<String>,
}

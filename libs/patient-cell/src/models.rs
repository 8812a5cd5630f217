use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An existing patient identity. The booking engine only reads these; it
/// never creates or edits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Preferred notification recipient: email first, then phone.
    pub fn contact(&self) -> Option<(&'static str, &str)> {
        if let Some(email) = self.email.as_deref() {
            return Some(("email", email));
        }
        self.phone_number.as_deref().map(|phone| ("sms", phone))
    }
}

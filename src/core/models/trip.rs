use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Traveler,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TripMember {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub joined_at: DateTime<Utc>,
}

impl TripMember {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub destination: Option<String>,
    pub members: Vec<TripMember>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id && m.is_owner())
    }

    /// Member ids in join order.
    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }
}

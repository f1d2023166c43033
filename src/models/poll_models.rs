use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: String,
    pub code: String,
    pub name: String,
    pub question: String,
    pub answers: Vec<String>,
    pub multiple_choices: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub valid_till: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

impl Poll {
    /// Votes are accepted strictly before `valid_till`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_till
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: String,

    pub poll_id: String,

    pub device_id: String,

    /// Answer indices, unique and in range for the referenced poll.
    pub selected: Vec<u32>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

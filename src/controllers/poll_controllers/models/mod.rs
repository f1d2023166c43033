use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{poll_models::Poll, vote_record_models::Vote};
use crate::polls::{tally::Tally, validation::PollDraft};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePollRequest {
    pub name: String,
    pub question: String,
    pub answers: Vec<String>,
    pub multiple_choices: Option<bool>,
    /// Voting window in whole hours.
    pub duration: Option<i64>,
}

impl From<CreatePollRequest> for PollDraft {
    fn from(req: CreatePollRequest) -> Self {
        PollDraft {
            name: req.name,
            question: req.question,
            answers: req.answers,
            multiple_choices: req.multiple_choices.unwrap_or(false),
            duration_hours: req.duration,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct CastVoteRequest {
    #[serde(default)]
    pub selected: Option<Vec<i64>>,
}

#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Public view of a poll; internal bookkeeping such as `created_at` stays out.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub code: String,
    pub name: String,
    pub question: String,
    pub answers: Vec<String>,
    pub multiple_choices: bool,
    pub valid_till: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl PollResponse {
    pub fn from_poll(poll: Poll, now: DateTime<Utc>) -> Self {
        let is_active = poll.is_active(now);
        Self {
            id: poll.id,
            code: poll.code,
            name: poll.name,
            question: poll.question,
            answers: poll.answers,
            multiple_choices: poll.multiple_choices,
            valid_till: poll.valid_till,
            expires_at: poll.expires_at,
            is_active,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PollResultsResponse {
    #[serde(flatten)]
    pub poll: PollResponse,
    pub vote_counts: Vec<u64>,
    pub total_votes: u64,
}

impl PollResultsResponse {
    pub fn new(poll: PollResponse, tally: Tally) -> Self {
        Self {
            poll,
            vote_counts: tally.counts,
            total_votes: tally.total,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PollDetailsResponse {
    #[serde(flatten)]
    pub results: PollResultsResponse,
    /// The requesting device's selection, `null` if it has not voted.
    pub user_vote: Option<Vec<u32>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    pub poll_id: String,
    pub device_id: String,
    pub selected: Vec<u32>,
    pub voted_at: DateTime<Utc>,
}

impl From<Vote> for VoteView {
    fn from(vote: Vote) -> Self {
        Self {
            poll_id: vote.poll_id,
            device_id: vote.device_id,
            selected: vote.selected,
            voted_at: vote.voted_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub vote: VoteView,
    pub vote_counts: Vec<u64>,
    pub total_votes: u64,
}

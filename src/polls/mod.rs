//! Poll integrity and live tally engine.
//!
//! Creation asks [`CodeGenerator`] for a free code and persists through
//! [`PollStore`]. A vote goes through [`VoteLedger`] for admission, then
//! [`TallyEngine`] recomputes counts and [`Broadcaster`] pushes them to the
//! poll's channel.

pub mod broadcaster;
pub mod code_generator;
pub mod poll_store;
pub mod sweeper;
pub mod tally;
pub mod validation;
pub mod vote_ledger;

pub use broadcaster::{channel_key, Broadcaster, ChannelEvent, Subscriber, VoteUpdate};
pub use code_generator::CodeGenerator;
pub use poll_store::PollStore;
pub use tally::{Tally, TallyEngine};
pub use vote_ledger::{Admission, VoteLedger};

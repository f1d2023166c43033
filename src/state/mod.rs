use std::sync::Arc;

use crate::config::Config;
use crate::db::Storage;
use crate::polls::{Broadcaster, PollStore, TallyEngine, VoteLedger};
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub polls: PollStore,
    pub ledger: VoteLedger,
    pub tally: TallyEngine,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        let polls = PollStore::new(
            storage.clone(),
            clock.clone(),
            config.default_poll_duration_hours,
        );
        let ledger = VoteLedger::new(polls.clone(), storage.clone(), clock.clone());
        Self {
            config: Arc::new(config),
            clock,
            polls,
            ledger,
            tally: TallyEngine::new(storage),
            broadcaster: Arc::new(Broadcaster::new()),
        }
    }
}

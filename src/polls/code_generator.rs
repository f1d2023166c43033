use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::warn;

use crate::db::Storage;
use crate::utils::error::{AppError, AppResult};

pub const CODE_LENGTH: usize = 8;
pub const MAX_CODE_ATTEMPTS: u32 = 10;

/// `^[A-Za-z0-9]{8}$`
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Draws public poll codes from the OS random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(CODE_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Starts a bounded reservation against `storage`.
    pub fn reservation<'a>(&self, storage: &'a dyn Storage) -> Reservation<'a> {
        Reservation {
            generator: *self,
            storage,
            attempts: 0,
        }
    }

    /// Returns a code not currently used by any stored poll.
    pub async fn reserve(&self, storage: &dyn Storage) -> AppResult<String> {
        self.reservation(storage).next_code().await
    }
}

/// Attempt budget shared by every draw made for one poll creation. Each
/// candidate costs one attempt, whether it is refused by the existence check
/// here or later by the storage unique index.
pub struct Reservation<'a> {
    generator: CodeGenerator,
    storage: &'a dyn Storage,
    attempts: u32,
}

impl Reservation<'_> {
    pub async fn next_code(&mut self) -> AppResult<String> {
        while self.attempts < MAX_CODE_ATTEMPTS {
            self.attempts += 1;
            let candidate = self.generator.generate();
            if !self.storage.code_exists(&candidate).await? {
                return Ok(candidate);
            }
            warn!(attempt = self.attempts, "poll code collision, redrawing");
        }
        Err(AppError::CodeSpaceExhausted)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

use log::{info, warn};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::Config;
use crate::error::PollError;
use crate::voting::VotingService;
use crate::voting::results::PollResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Reset,
    Rejected,
}

// Privileged credential checks plus the reveal and reset operations.
pub struct AdminGate {
    config: Arc<Config>,
}

impl AdminGate {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    // On success the caller sets the admin flag on the session.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), PollError> {
        let user_ok = secrets_match(username, &self.config.admin_username);
        let pass_ok = secrets_match(password, &self.config.admin_password);

        if user_ok & pass_ok {
            info!("Admin logged in");
            Ok(())
        } else {
            warn!("Rejected admin login attempt");
            Err(PollError::Auth)
        }
    }

    // Full voter listing including raw addresses. Requires the admin flag.
    pub async fn reveal(&self, voting: &VotingService, is_admin: bool) -> Result<PollResults, PollError> {
        if !is_admin {
            return Err(PollError::Auth);
        }
        voting.results(true).await
    }

    // Zeroes the tally and empties the voter map when `token` matches.
    pub async fn reset(
        &self,
        voting: &VotingService,
        token: &str,
        is_admin: bool,
    ) -> Result<ResetOutcome, PollError> {
        let token_ok = secrets_match(token, &self.config.reset_token);
        let session_ok = is_admin || !self.config.reset_requires_admin;

        if !(token_ok && session_ok) {
            warn!("Rejected reset attempt");
            return Ok(ResetOutcome::Rejected);
        }

        voting.clear().await?;
        info!("Poll reset");
        Ok(ResetOutcome::Reset)
    }
}

// Compares digests so timing does not follow the shared prefix of the raw values.
fn secrets_match(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}

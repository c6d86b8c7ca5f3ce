pub mod results;

use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::Records;
use crate::error::PollError;
use crate::identity::Client;
use crate::models::{PendingVoter, VoterRecord};
use results::{PollResults, calculate_results};

// What happened to a vote submission. The caller picks the navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    AlreadyVoted,
    InvalidChoice,
    NotAuthenticated,
}

pub struct VotingService {
    config: Arc<Config>,
    records: Records,
    // Serialises load-mutate-save cycles within this process.
    write_lock: Mutex<()>,
}

impl VotingService {
    pub fn new(config: Arc<Config>, records: Records) -> Self {
        Self {
            config,
            records,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn initialize(&self) -> Result<(), PollError> {
        self.records.initialize(&self.config.options).await?;
        Ok(())
    }

    // Checks the display name and that this client has not voted yet.
    pub async fn login(&self, name: &str, client: &Client) -> Result<PendingVoter, PollError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PollError::Validation("Please enter your name.".to_string()));
        }

        let voters = self.records.load_voters().await?;
        if let Some(existing) = voters.get(&client.identifier) {
            info!(
                "Login refused for {}: already voted as '{}'",
                client.identifier, existing.name
            );
            return Err(PollError::DuplicateVote {
                existing_name: existing.name.clone(),
            });
        }

        info!("'{}' logged in from {}", name, client.identifier);
        Ok(PendingVoter {
            name: name.to_string(),
            identifier: client.identifier.clone(),
        })
    }

    // Records a vote. The identifier is taken from the live request, not the
    // session, so a stale or forged session cannot vote twice.
    pub async fn commit(
        &self,
        pending: Option<&PendingVoter>,
        client: &Client,
        choice: Option<&str>,
    ) -> Result<CommitOutcome, PollError> {
        let Some(pending) = pending else {
            return Ok(CommitOutcome::NotAuthenticated);
        };

        let _guard = self.write_lock.lock().await;

        let mut voters = self.records.load_voters().await?;
        if voters.contains(&client.identifier) {
            info!("Ignoring repeated vote from {}", client.identifier);
            return Ok(CommitOutcome::AlreadyVoted);
        }

        let choice = match choice {
            Some(choice) if self.config.is_option(choice) => choice,
            other => {
                warn!("Invalid choice {:?} from {}", other, client.identifier);
                return Ok(CommitOutcome::InvalidChoice);
            }
        };

        let mut tally = self.records.load_tally(&self.config.options).await?;
        tally.increment(choice);

        voters.insert_new(
            client.identifier.clone(),
            VoterRecord {
                name: pending.name.clone(),
                choice: choice.to_string(),
                address: self
                    .config
                    .store_raw_address
                    .then(|| client.address.clone()),
                voted_at: Utc::now(),
            },
        );

        // Two separate writes: a failure in between leaves the records out of step.
        self.records.save_tally(&tally).await?;
        self.records.save_voters(&voters).await?;

        info!("'{}' ({}) voted for '{}'", pending.name, client.identifier, choice);
        Ok(CommitOutcome::Committed)
    }

    pub async fn results(&self, privileged: bool) -> Result<PollResults, PollError> {
        let tally = self.records.load_tally(&self.config.options).await?;
        let voters = self.records.load_voters().await?;
        Ok(calculate_results(
            &self.config.question,
            &self.config.options,
            &tally,
            &voters,
            privileged,
        ))
    }

    pub(crate) async fn clear(&self) -> Result<(), PollError> {
        let _guard = self.write_lock.lock().await;
        self.records.reset(&self.config.options).await?;
        Ok(())
    }
}

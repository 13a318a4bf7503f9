//! Leader rotation - draws a group each round and triggers a block

use crate::group::ConsensusGroup;
use enclave_ledger::{LeaderToken, TriggerSender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for a leader rotation
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Candidate node identifiers
    pub node_ids: Vec<String>,
    /// Members drawn per round
    pub group_size: usize,
    /// Upper bound on transactions per block
    pub max_transactions: u64,
    /// Per-round random reduction is drawn from `0..rand_factor`
    pub rand_factor: u64,
    /// Pause between drawing a group and triggering its block
    pub round_delay: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            node_ids: default_node_ids(),
            group_size: 15,
            max_transactions: 5000,
            rand_factor: 1000,
            round_delay: Duration::from_secs(3),
        }
    }
}

/// Placeholder node identities
pub fn default_node_ids() -> Vec<String> {
    (1..=32).map(|i| format!("IG-NODE-{i:04}")).collect()
}

/// Periodically names a leader and sends its token to the block producer
pub struct LeaderRotation {
    config: RotationConfig,
    trigger: TriggerSender,
}

impl LeaderRotation {
    pub fn new(config: RotationConfig, trigger: TriggerSender) -> Self {
        Self { config, trigger }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Draw the next group and the token its leader would send
    pub fn next_round<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(ConsensusGroup, LeaderToken)> {
        let group = ConsensusGroup::random(&self.config.node_ids, self.config.group_size, rng)?;
        let token = LeaderToken::new(group.leader(), self.transaction_count(rng));
        Some((group, token))
    }

    /// `max_transactions` reduced by a random amount below `rand_factor`
    pub fn transaction_count<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let adjust = if self.config.rand_factor == 0 {
            0
        } else {
            rng.gen_range(0..self.config.rand_factor)
        };
        self.config.max_transactions.saturating_sub(adjust)
    }

    /// Run rounds until cancelled or the block producer goes away
    pub async fn run(self, shutdown: CancellationToken) {
        let mut rng = StdRng::from_entropy();
        let mut round: u64 = 0;

        tracing::info!(
            "Leader rotation started: {} nodes, group size {}, {}ms rounds",
            self.config.node_ids.len(),
            self.config.group_size,
            self.config.round_delay.as_millis()
        );

        loop {
            round += 1;
            let Some((group, token)) = self.next_round(&mut rng) else {
                tracing::warn!("No node ids configured, leader rotation stopped");
                return;
            };

            tracing::debug!(
                "Consensus group waiting for block {}: {} members, leader {}",
                round,
                group.len(),
                group.leader()
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.round_delay) => {}
            }

            tracing::debug!(
                "Verifying block {} transactions: {}",
                round,
                token.transaction_count
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                sent = self.trigger.send(token) => {
                    if sent.is_err() {
                        tracing::debug!("Block producer gone, leader rotation stopped");
                        break;
                    }
                }
            }
        }

        tracing::info!("Leader rotation stopped after {} rounds", round);
    }
}

/// Builder for LeaderRotation
pub struct LeaderRotationBuilder {
    config: RotationConfig,
}

impl LeaderRotationBuilder {
    pub fn new() -> Self {
        Self {
            config: RotationConfig::default(),
        }
    }

    pub fn node_ids(mut self, ids: Vec<String>) -> Self {
        self.config.node_ids = ids;
        self
    }

    pub fn group_size(mut self, size: usize) -> Self {
        self.config.group_size = size;
        self
    }

    pub fn max_transactions(mut self, max: u64) -> Self {
        self.config.max_transactions = max;
        self
    }

    pub fn rand_factor(mut self, factor: u64) -> Self {
        self.config.rand_factor = factor;
        self
    }

    pub fn round_delay(mut self, delay: Duration) -> Self {
        self.config.round_delay = delay;
        self
    }

    pub fn build(self, trigger: TriggerSender) -> LeaderRotation {
        LeaderRotation::new(self.config, trigger)
    }
}

impl Default for LeaderRotationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

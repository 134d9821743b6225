use std::collections::HashMap;
use std::time::Instant;

use llmgw_core::VendorId;
use parking_lot::Mutex;

use crate::concurrency::{ConcurrencyGate, ConcurrencySlot};
use crate::config::GovernorConfig;
use crate::error::GovernorError;
use crate::launch_slot::LaunchSlot;
use crate::token_budget::TokenBudget;

struct VendorGates {
    budget: TokenBudget,
    launch_slot: LaunchSlot,
    concurrency: ConcurrencyGate,
}

/// Composes the three admission gates (§4.5) per vendor behind a single
/// `admit` call.
pub struct Governor {
    gates: Mutex<HashMap<VendorId, std::sync::Arc<VendorGates>>>,
    default_config: GovernorConfig,
}

impl Governor {
    #[must_use]
    pub fn new(default_config: GovernorConfig) -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
            default_config,
        }
    }

    fn gates_for(&self, vendor: &VendorId) -> std::sync::Arc<VendorGates> {
        let mut gates = self.gates.lock();
        gates
            .entry(vendor.clone())
            .or_insert_with(|| {
                std::sync::Arc::new(VendorGates {
                    budget: TokenBudget::new(self.default_config.clone()),
                    launch_slot: LaunchSlot::new(self.default_config.stagger_seconds),
                    concurrency: ConcurrencyGate::new(self.default_config.max_concurrency),
                })
            })
            .clone()
    }

    /// Run a request through all three gates in order: token budget, launch
    /// slot, concurrency. Returns a [`GovernorPermit`] whose `Drop` releases
    /// the token reservation unless [`GovernorPermit::commit`] is called.
    pub async fn admit(
        &self,
        vendor: &VendorId,
        estimated_tokens: u32,
        grounded: bool,
        deadline: Instant,
    ) -> Result<GovernorPermit, GovernorError> {
        let gates = self.gates_for(vendor);

        let reserved = gates.budget.reserve(estimated_tokens, grounded, deadline).await?;
        gates.launch_slot.wait_for_slot(deadline).await;
        let slot = gates.concurrency.acquire_with_timeout(deadline).await;

        Ok(GovernorPermit {
            gates,
            reserved,
            estimated_tokens,
            slot: Some(slot),
            committed: false,
        })
    }
}

/// RAII admission permit. Dropping without calling [`commit`](Self::commit)
/// returns the token reservation to the window, as if the request never
/// happened (§4.5 "releases its reservation/permit on cancellation").
pub struct GovernorPermit {
    gates: std::sync::Arc<VendorGates>,
    reserved: i64,
    estimated_tokens: u32,
    slot: Option<ConcurrencySlot>,
    committed: bool,
}

impl GovernorPermit {
    #[must_use]
    pub fn concurrency_bypassed(&self) -> bool {
        self.slot.as_ref().is_some_and(ConcurrencySlot::bypassed)
    }

    /// Record the request's actual token usage, folding it into the
    /// vendor's `grounded_multiplier` reconciliation and marking the
    /// reservation as consumed rather than returned on drop.
    pub fn commit(mut self, actual_tokens: u32) {
        self.gates.budget.reconcile(self.reserved, actual_tokens, self.estimated_tokens);
        self.committed = true;
    }
}

impl Drop for GovernorPermit {
    fn drop(&mut self) {
        if !self.committed {
            self.gates.budget.release(self.reserved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> GovernorConfig {
        GovernorConfig {
            tpm_limit: 10_000,
            headroom_fraction: 0.0,
            stagger_seconds: 0.0,
            max_concurrency: 4,
            multiplier_sample_window: 20,
        }
    }

    #[tokio::test]
    async fn admit_grants_a_permit_within_budget() {
        let governor = Governor::new(config());
        let vendor = VendorId::new("openai");
        let deadline = Instant::now() + Duration::from_secs(1);
        let permit = governor.admit(&vendor, 100, false, deadline).await.unwrap();
        assert!(!permit.concurrency_bypassed());
    }

    #[tokio::test]
    async fn dropping_without_commit_releases_reservation() {
        let governor = Governor::new(config());
        let vendor = VendorId::new("openai");
        let deadline = Instant::now() + Duration::from_secs(1);
        {
            let _permit = governor.admit(&vendor, 5000, false, deadline).await.unwrap();
        }
        let permit = governor.admit(&vendor, 5000, false, deadline).await.unwrap();
        permit.commit(5000);
    }

    #[tokio::test]
    async fn commit_reconciles_grounded_multiplier() {
        let governor = Governor::new(config());
        let vendor = VendorId::new("openai");
        let deadline = Instant::now() + Duration::from_secs(1);
        let permit = governor.admit(&vendor, 100, true, deadline).await.unwrap();
        permit.commit(150);
        let gates = governor.gates_for(&vendor);
        assert!((gates.budget.grounded_multiplier() - 1.5).abs() < 1e-9);
    }
}

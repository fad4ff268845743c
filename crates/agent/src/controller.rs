//! Shield state controller.
//!
//! Ties the pure [`ShieldPolicy`] decision to its side effects: reads the
//! marker, issues at most one remote toggle, then writes or clears the
//! marker. Every failure is logged and folded into an [`Outcome`]; nothing
//! is propagated past [`ShieldController::evaluate`].

use chrono::NaiveDateTime;

use loadshield_core::decision::{NoOpReason, ShieldPolicy, ToggleDecision};
use loadshield_core::marker::{MarkerState, ShieldMarker};
use loadshield_core::outcome::Outcome;
use loadshield_core::sample::LoadSample;

use crate::cloudflare::RuleToggle;
use crate::marker_store::MarkerStore;
use crate::sampler::{LoadSampler, SampleError};

pub struct ShieldController<S, R> {
    store: S,
    remote: R,
    policy: ShieldPolicy,
}

impl<S, R> ShieldController<S, R>
where
    S: MarkerStore,
    R: RuleToggle,
{
    pub fn new(store: S, remote: R, policy: ShieldPolicy) -> Self {
        Self {
            store,
            remote,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn policy(&self) -> &ShieldPolicy {
        &self.policy
    }

    /// Sample the host and evaluate once.
    ///
    /// Sampling errors are returned as-is: an unsupported platform is not
    /// something the controller can act on.
    pub async fn run<L>(&self, sampler: &L, now: NaiveDateTime) -> Result<Outcome, SampleError>
    where
        L: LoadSampler + ?Sized,
    {
        let sample = sampler.sample()?;
        Ok(self.evaluate(sample, now).await)
    }

    /// Apply the hysteresis rules to one sample.
    pub async fn evaluate(&self, sample: LoadSample, now: NaiveDateTime) -> Outcome {
        let marker = match self.store.load() {
            Ok(marker) => marker,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read shield marker");
                return Outcome::MarkerIoFailed;
            }
        };

        let threshold = self.policy.threshold();
        let marker_age_mins = marker
            .marker()
            .map(|m| m.age(now).num_seconds() as f64 / 60.0);

        match self.policy.decide(sample.load1, &marker, now) {
            ToggleDecision::EnableShield => {
                tracing::warn!(
                    load1 = sample.load1,
                    threshold,
                    ?marker_age_mins,
                    "Load above threshold, enabling shield",
                );
                self.enable(now).await
            }
            ToggleDecision::DisableShield => {
                tracing::info!(
                    load1 = sample.load1,
                    threshold,
                    ?marker_age_mins,
                    "Shield older than cooldown window, disabling",
                );
                self.disable().await
            }
            ToggleDecision::NoOp(NoOpReason::InvalidMarker) => {
                tracing::info!(load1 = sample.load1, threshold, "Removing invalid shield marker");
                self.clear_invalid(&marker)
            }
            ToggleDecision::NoOp(reason) => {
                match reason {
                    NoOpReason::RecentlyEnabled => tracing::info!(
                        load1 = sample.load1,
                        threshold,
                        ?marker_age_mins,
                        "Load above threshold but shield was enabled recently, skipping",
                    ),
                    NoOpReason::CoolingDown => tracing::info!(
                        load1 = sample.load1,
                        threshold,
                        ?marker_age_mins,
                        "Shield still inside cooldown window, no action",
                    ),
                    _ => tracing::info!(
                        load1 = sample.load1,
                        threshold,
                        "Load within threshold, no action",
                    ),
                }
                Outcome::from(reason)
            }
        }
    }

    async fn enable(&self, now: NaiveDateTime) -> Outcome {
        if self.remote.toggle_rule(true).await.is_err() {
            tracing::error!("Enabling shield failed");
            return Outcome::RemoteCallFailed;
        }
        match self.store.save(&ShieldMarker::new(now)) {
            Ok(()) => Outcome::Enabled,
            Err(e) => {
                // The rule is up but nothing records it; the next high-load
                // run will enable again.
                tracing::error!(error = %e, "Shield enabled but marker could not be written");
                Outcome::MarkerIoFailed
            }
        }
    }

    async fn disable(&self) -> Outcome {
        if self.remote.toggle_rule(false).await.is_err() {
            tracing::error!("Disabling shield failed, marker kept for next run");
            return Outcome::RemoteCallFailed;
        }
        match self.store.clear() {
            Ok(()) => Outcome::DisabledAfterCooldown,
            Err(e) => {
                tracing::error!(error = %e, "Shield disabled but marker could not be removed");
                Outcome::MarkerIoFailed
            }
        }
    }

    fn clear_invalid(&self, marker: &MarkerState) -> Outcome {
        if let MarkerState::Invalid(raw) = marker {
            tracing::debug!(raw = %raw, "Invalid marker content");
        }
        match self.store.clear() {
            Ok(()) => Outcome::NoActionNeeded,
            Err(e) => {
                tracing::error!(error = %e, "Failed to remove invalid shield marker");
                Outcome::MarkerIoFailed
            }
        }
    }
}

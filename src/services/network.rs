use crate::{
    card_client::{CardClient, NetworkIntent},
    services::{
        join::{JoinOutcome, JoinTarget, NetworkJoin},
        pacing::Pacer,
        progress::JoinObserver,
        status::StatusResolver,
    },
};
use anyhow::{Context, Result};
use log::{info, warn};
use std::io::Write;

/// Result of adding a network to the card
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Rejected(JoinOutcome),
}

/// Network configuration operations on the card
pub struct NetworkService;

impl NetworkService {
    /// Test whether the card can join `target`
    pub async fn test<C, R, P, O>(
        join: &NetworkJoin<'_, C, R, P>,
        target: &JoinTarget,
        observer: &mut O,
    ) -> JoinOutcome
    where
        C: CardClient,
        R: StatusResolver,
        P: Pacer,
        O: JoinObserver,
    {
        join.attempt(target, observer).await
    }

    /// Add `target` to the card's configured networks.
    ///
    /// Unless `force` is set the network is tested first and only added when
    /// the card manages to join it.
    pub async fn add<C, R, P, O, W>(
        client: &C,
        join: &NetworkJoin<'_, C, R, P>,
        target: &JoinTarget,
        force: bool,
        observer: &mut O,
        out: &mut W,
    ) -> Result<AddOutcome>
    where
        C: CardClient,
        R: StatusResolver,
        P: Pacer,
        O: JoinObserver,
        W: Write,
    {
        if force {
            info!("forced: skipping network test");
        } else {
            let outcome = join.attempt(target, observer).await;
            if !outcome.is_success() {
                warn!("not adding network '{}'", target.essid());
                writeln!(
                    out,
                    "Error connecting to network '{}', not adding.",
                    target.essid()
                )?;
                writeln!(out, "use --force to override")?;
                return Ok(AddOutcome::Rejected(outcome));
            }
        }

        client
            .send_network_action(target.request(NetworkIntent::Add))
            .await
            .context(format!("failed to add network '{}'", target.essid()))?;

        info!("added network '{}'", target.essid());
        Ok(AddOutcome::Added)
    }

    /// Remove the network named `essid` from the card
    pub async fn remove<C>(client: &C, target: &JoinTarget) -> Result<()>
    where
        C: CardClient,
    {
        client
            .send_network_action(target.request(NetworkIntent::Remove))
            .await
            .context(format!("failed to remove network '{}'", target.essid()))?;

        info!("removed network '{}'", target.essid());
        Ok(())
    }
}

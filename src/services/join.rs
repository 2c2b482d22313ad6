//! Network join: start a connection test on the card and poll its status
//! until it resolves to a terminal state or the poll budget runs out.

use crate::{
    card_client::{CardClient, NetType, NetworkIntent, NetworkRequest, StatusCode},
    config::JoinConfig,
    services::{
        pacing::{CancelToken, IntervalPacer, Pacer},
        progress::JoinObserver,
        status::{CardStatusResolver, ConnectionTestState, StatusResolver},
    },
};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_valid::Validate;
use std::fmt;

/// Network and optional passphrase for one join attempt
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct JoinTarget {
    #[validate(min_length = 1)]
    #[validate(max_length = 32)]
    essid: String,
    #[validate(min_length = 1)]
    #[validate(max_length = 64)]
    passphrase: Option<String>,
}

impl JoinTarget {
    pub fn new(essid: impl Into<String>, passphrase: Option<String>) -> Result<Self> {
        let target = Self {
            essid: essid.into(),
            passphrase,
        };

        target.validate().context("network validation failed")?;

        Ok(target)
    }

    pub fn essid(&self) -> &str {
        &self.essid
    }

    pub fn security(&self) -> SecurityLabel {
        if self.passphrase.is_some() {
            SecurityLabel::Secured
        } else {
            SecurityLabel::Unsecured
        }
    }

    pub fn request(&self, action: NetworkIntent) -> NetworkRequest {
        let net_type = match self.security() {
            SecurityLabel::Secured => NetType::Wpa,
            SecurityLabel::Unsecured => NetType::Unsecured,
        };

        NetworkRequest {
            action,
            essid: self.essid.clone(),
            passphrase: self.passphrase.clone(),
            net_type,
        }
    }
}

impl fmt::Debug for JoinTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinTarget")
            .field("essid", &self.essid)
            .field("security", &self.security())
            .finish()
    }
}

/// Declared security of a join attempt, reported in diagnostics only
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecurityLabel {
    Secured,
    Unsecured,
}

impl fmt::Display for SecurityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secured => f.write_str("secured"),
            Self::Unsecured => f.write_str("unsecured"),
        }
    }
}

/// One status sample taken by the join loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollObservation {
    pub code: StatusCode,
    pub iteration: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    NotScanning,
    UnknownState,
    Timeout,
    TransportError(String),
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotScanning => f.write_str("card stopped scanning"),
            Self::UnknownState => f.write_str("card reported an unknown state"),
            Self::Timeout => f.write_str("connection test timed out"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Last observation of a failed attempt and why it failed.
///
/// `code` is `None` and `state` empty when no status was observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinFailure {
    pub code: Option<StatusCode>,
    pub state: String,
    pub reason: FailureReason,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Success,
    Failed(JoinFailure),
}

impl JoinOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Test-and-poll procedure for joining a network
pub struct NetworkJoin<'a, C, R = CardStatusResolver, P = IntervalPacer> {
    client: &'a C,
    resolver: R,
    pacer: P,
    max_polls: u32,
    cancel: CancelToken,
}

impl<'a, C> NetworkJoin<'a, C>
where
    C: CardClient,
{
    pub fn new(client: &'a C, config: &JoinConfig) -> Self {
        NetworkJoin {
            client,
            resolver: CardStatusResolver,
            pacer: IntervalPacer::new(config.poll_interval),
            max_polls: config.max_polls,
            cancel: CancelToken::new(),
        }
    }
}

impl<'a, C, R, P> NetworkJoin<'a, C, R, P>
where
    C: CardClient,
    R: StatusResolver,
    P: Pacer,
{
    pub fn with_resolver<R2: StatusResolver>(self, resolver: R2) -> NetworkJoin<'a, C, R2, P> {
        NetworkJoin {
            client: self.client,
            resolver,
            pacer: self.pacer,
            max_polls: self.max_polls,
            cancel: self.cancel,
        }
    }

    pub fn with_pacer<P2: Pacer>(self, pacer: P2) -> NetworkJoin<'a, C, R, P2> {
        NetworkJoin {
            client: self.client,
            resolver: self.resolver,
            pacer,
            max_polls: self.max_polls,
            cancel: self.cancel,
        }
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one join attempt against `target`, reporting progress to `observer`
    pub async fn attempt<O>(&self, target: &JoinTarget, observer: &mut O) -> JoinOutcome
    where
        O: JoinObserver,
    {
        info!(
            "trying to connect to network '{}' ({})",
            target.essid(),
            target.security()
        );
        observer.started(target, target.security());

        let outcome = self.run(target, observer).await;

        match &outcome {
            JoinOutcome::Success => info!("connected to network '{}'", target.essid()),
            JoinOutcome::Failed(failure) => info!(
                "failed to connect to network '{}': {} (final state: {:?}/'{}')",
                target.essid(),
                failure.reason,
                failure.code,
                failure.state
            ),
        }
        observer.finished(target, &outcome);

        outcome
    }

    async fn run<O>(&self, target: &JoinTarget, observer: &mut O) -> JoinOutcome
    where
        O: JoinObserver,
    {
        let started = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("join cancelled while starting network test");
                return failed(None, "", FailureReason::Cancelled);
            }
            started = self.client.send_network_action(target.request(NetworkIntent::Test)) => started,
        };

        if let Err(e) = started {
            warn!("failed to start network test: {e:#}");
            return failed(None, "", FailureReason::TransportError(format!("{e:#}")));
        }

        let mut last_status: Option<StatusCode> = None;
        let mut last_state = String::new();

        for iteration in 1..=self.max_polls {
            if self.cancel.is_cancelled() {
                debug!("join cancelled before poll {iteration}");
                return failed(last_status, &last_state, FailureReason::Cancelled);
            }

            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("join cancelled during poll {iteration}");
                    return failed(last_status, &last_state, FailureReason::Cancelled);
                }
                polled = self.client.test_status() => polled,
            };

            let code = match polled {
                Ok(code) => code,
                Err(e) => {
                    warn!("failed to poll test status at poll {iteration}: {e:#}");
                    return failed(
                        last_status,
                        &last_state,
                        FailureReason::TransportError(format!("{e:#}")),
                    );
                }
            };

            let state = self.resolver.resolve(code);
            let observation = PollObservation { code, iteration };

            if last_status == Some(code) {
                debug!("poll {iteration}: status {code} unchanged");
                observer.heartbeat(observation);
            } else {
                debug!("poll {iteration}: status {code} ({state})");
                observer.transition(observation, &state);
                last_status = Some(code);
                last_state = state.name().to_string();
            }

            match &state {
                ConnectionTestState::Success => return JoinOutcome::Success,
                ConnectionTestState::NotScanning => {
                    return failed(Some(code), state.name(), FailureReason::NotScanning);
                }
                ConnectionTestState::Unknown => {
                    return failed(Some(code), state.name(), FailureReason::UnknownState);
                }
                ConnectionTestState::Other(_) => {}
            }

            if iteration < self.max_polls {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = self.pacer.pause() => {}
                }
            }
        }

        failed(last_status, &last_state, FailureReason::Timeout)
    }
}

fn failed(code: Option<StatusCode>, state: &str, reason: FailureReason) -> JoinOutcome {
    JoinOutcome::Failed(JoinFailure {
        code,
        state: state.to_string(),
        reason,
    })
}

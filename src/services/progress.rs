//! Diagnostic events of a join attempt and their human readable rendering.

use crate::{
    config::Verbosity,
    services::{
        join::{JoinOutcome, JoinTarget, PollObservation, SecurityLabel},
        status::ConnectionTestState,
    },
};
use log::warn;
use std::{fmt, io::Write};

/// Receives at most one transition or heartbeat per poll
pub trait JoinObserver {
    fn started(&mut self, _target: &JoinTarget, _security: SecurityLabel) {}
    fn transition(&mut self, observation: PollObservation, state: &ConnectionTestState);
    fn heartbeat(&mut self, observation: PollObservation);
    fn finished(&mut self, _target: &JoinTarget, _outcome: &JoinOutcome) {}
}

impl JoinObserver for () {
    fn transition(&mut self, _observation: PollObservation, _state: &ConnectionTestState) {}
    fn heartbeat(&mut self, _observation: PollObservation) {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinEvent {
    Started {
        essid: String,
        security: SecurityLabel,
    },
    Transition {
        observation: PollObservation,
        state: String,
    },
    Heartbeat(PollObservation),
    Finished(JoinOutcome),
}

impl JoinObserver for Vec<JoinEvent> {
    fn started(&mut self, target: &JoinTarget, security: SecurityLabel) {
        self.push(JoinEvent::Started {
            essid: target.essid().to_string(),
            security,
        });
    }

    fn transition(&mut self, observation: PollObservation, state: &ConnectionTestState) {
        self.push(JoinEvent::Transition {
            observation,
            state: state.name().to_string(),
        });
    }

    fn heartbeat(&mut self, observation: PollObservation) {
        self.push(JoinEvent::Heartbeat(observation));
    }

    fn finished(&mut self, _target: &JoinTarget, outcome: &JoinOutcome) {
        self.push(JoinEvent::Finished(outcome.clone()));
    }
}

/// Renders join progress for a terminal.
///
/// Below [`Verbosity::NORMAL`] only the final result line is written.
pub struct ProgressReporter<W: Write> {
    out: W,
    verbosity: Verbosity,
    essid: String,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W, verbosity: Verbosity) -> Self {
        Self {
            out,
            verbosity,
            essid: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, args: fmt::Arguments) {
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
            warn!("failed to write join progress: {e}");
        }
    }
}

impl<W: Write> JoinObserver for ProgressReporter<W> {
    fn started(&mut self, target: &JoinTarget, security: SecurityLabel) {
        self.essid = target.essid().to_string();

        if self.verbosity.shows_progress() {
            let essid = target.essid();
            self.emit(format_args!(
                "trying to connect to network: '{essid}' of type: '{security}'"
            ));
        }
    }

    fn transition(&mut self, observation: PollObservation, state: &ConnectionTestState) {
        // the card reports 0 while idle, only the result line describes it
        if self.verbosity.shows_progress() && observation.code != 0 {
            let essid = self.essid.clone();
            self.emit(format_args!(
                "\nTesting connection to '{essid}' ({}): {state}",
                observation.code
            ));
        }
    }

    fn heartbeat(&mut self, _observation: PollObservation) {
        if self.verbosity.shows_progress() {
            self.emit(format_args!("."));
        }
    }

    fn finished(&mut self, target: &JoinTarget, outcome: &JoinOutcome) {
        if self.verbosity.shows_progress() {
            self.emit(format_args!("\n"));
        }

        let essid = target.essid();
        match outcome {
            JoinOutcome::Success => self.emit(format_args!("Succeeded connecting to: '{essid}'\n")),
            JoinOutcome::Failed(failure) => {
                let code = failure
                    .code
                    .map_or_else(|| "-".to_string(), |code| code.to_string());
                self.emit(format_args!(
                    "Unable to connect to: '{essid}' (final state: {code}/'{}')\n",
                    failure.state
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::join::{FailureReason, JoinFailure};

    fn observation(code: u8, iteration: u32) -> PollObservation {
        PollObservation { code, iteration }
    }

    fn render(verbosity: Verbosity, outcome: JoinOutcome) -> String {
        let target = JoinTarget::new("HomeNet", None).unwrap();
        let mut reporter = ProgressReporter::new(Vec::new(), verbosity);

        reporter.started(&target, target.security());
        reporter.transition(observation(1, 1), &ConnectionTestState::other("locating network"));
        reporter.heartbeat(observation(1, 2));
        reporter.heartbeat(observation(1, 3));
        reporter.transition(observation(5, 4), &ConnectionTestState::Success);
        reporter.finished(&target, &outcome);

        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn renders_transitions_and_heartbeats() {
        let output = render(Verbosity::NORMAL, JoinOutcome::Success);

        assert_eq!(
            output,
            "trying to connect to network: 'HomeNet' of type: 'unsecured'\n\
             Testing connection to 'HomeNet' (1): locating network..\n\
             Testing connection to 'HomeNet' (5): success\n\
             Succeeded connecting to: 'HomeNet'\n"
        );
    }

    #[test]
    fn idle_status_has_no_transition_line() {
        let target = JoinTarget::new("HomeNet", None).unwrap();
        let mut reporter = ProgressReporter::new(Vec::new(), Verbosity::NORMAL);
        let outcome = JoinOutcome::Failed(JoinFailure {
            code: Some(0),
            state: "not scanning".to_string(),
            reason: FailureReason::NotScanning,
        });

        reporter.started(&target, target.security());
        reporter.transition(observation(1, 1), &ConnectionTestState::other("locating network"));
        reporter.transition(observation(0, 2), &ConnectionTestState::NotScanning);
        reporter.finished(&target, &outcome);

        assert_eq!(
            String::from_utf8(reporter.into_inner()).unwrap(),
            "trying to connect to network: 'HomeNet' of type: 'unsecured'\n\
             Testing connection to 'HomeNet' (1): locating network\n\
             Unable to connect to: 'HomeNet' (final state: 0/'not scanning')\n"
        );
    }

    #[test]
    fn quiet_prints_only_result() {
        let outcome = JoinOutcome::Failed(JoinFailure {
            code: Some(0),
            state: "not scanning".to_string(),
            reason: FailureReason::NotScanning,
        });

        assert_eq!(
            render(Verbosity::QUIET, outcome),
            "Unable to connect to: 'HomeNet' (final state: 0/'not scanning')\n"
        );
    }

    #[test]
    fn missing_code_prints_placeholder() {
        let outcome = JoinOutcome::Failed(JoinFailure {
            code: None,
            state: String::new(),
            reason: FailureReason::TransportError("unreachable".to_string()),
        });

        assert!(
            render(Verbosity::QUIET, outcome).contains("(final state: -/'')")
        );
    }

    #[test]
    fn event_log_records_in_order() {
        let target = JoinTarget::new("Office", Some("secret".to_string())).unwrap();
        let mut events = Vec::new();

        events.started(&target, target.security());
        events.transition(observation(2, 1), &ConnectionTestState::other("verifying network key"));
        events.heartbeat(observation(2, 2));
        events.finished(&target, &JoinOutcome::Success);

        assert_eq!(
            events,
            vec![
                JoinEvent::Started {
                    essid: "Office".to_string(),
                    security: SecurityLabel::Secured,
                },
                JoinEvent::Transition {
                    observation: observation(2, 1),
                    state: "verifying network key".to_string(),
                },
                JoinEvent::Heartbeat(observation(2, 2)),
                JoinEvent::Finished(JoinOutcome::Success),
            ]
        );
    }
}

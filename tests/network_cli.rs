use eyefi_ctl::{
    card_client::{NetworkIntent, StatusCode},
    config::{JoinConfig, Verbosity},
    services::{
        join::{FailureReason, JoinFailure, JoinOutcome, JoinTarget, NetworkJoin},
        network::{AddOutcome, NetworkService},
        pacing::{CancelToken, NoPacing},
        progress::ProgressReporter,
    },
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

#[mockall_double::double]
use eyefi_ctl::card_client::CardClient;

fn join_config(max_polls: u32) -> JoinConfig {
    JoinConfig {
        max_polls,
        poll_interval: Duration::ZERO,
    }
}

fn card_reporting(codes: &[StatusCode]) -> CardClient {
    let polls = Arc::new(Mutex::new(codes.iter().copied().collect::<VecDeque<_>>()));

    let mut card = CardClient::default();
    card.expect_send_network_action()
        .withf(|request| request.action == NetworkIntent::Test)
        .times(1)
        .returning(|_| Box::pin(async { Ok(()) }));
    card.expect_test_status().returning(move || {
        let code = polls.lock().unwrap().pop_front().unwrap_or(0);
        Box::pin(async move { Ok(code) })
    });
    card
}

#[tokio::test]
async fn test_prints_progress_until_success() {
    let card = card_reporting(&[1, 1, 2, 2, 2, 3, 4, 5]);
    let join = NetworkJoin::new(&card, &join_config(200)).with_pacer(NoPacing);
    let target = JoinTarget::new("HomeNet", Some("password1".to_string())).unwrap();
    let mut reporter = ProgressReporter::new(Vec::new(), Verbosity::NORMAL);

    let outcome = NetworkService::test(&join, &target, &mut reporter).await;

    assert_eq!(outcome, JoinOutcome::Success);
    assert_eq!(
        String::from_utf8(reporter.into_inner()).unwrap(),
        "trying to connect to network: 'HomeNet' of type: 'secured'\n\
         Testing connection to 'HomeNet' (1): locating network.\n\
         Testing connection to 'HomeNet' (2): verifying network key..\n\
         Testing connection to 'HomeNet' (3): waiting for DHCP\n\
         Testing connection to 'HomeNet' (4): testing connection to Eye-Fi server\n\
         Testing connection to 'HomeNet' (5): success\n\
         Succeeded connecting to: 'HomeNet'\n"
    );
}

#[tokio::test]
async fn test_times_out_in_last_state() {
    let card = card_reporting(&[3; 5]);
    let join = NetworkJoin::new(&card, &join_config(5)).with_pacer(NoPacing);
    let target = JoinTarget::new("Office", None).unwrap();
    let mut reporter = ProgressReporter::new(Vec::new(), Verbosity::QUIET);

    let outcome = NetworkService::test(&join, &target, &mut reporter).await;

    assert_eq!(
        outcome,
        JoinOutcome::Failed(JoinFailure {
            code: Some(3),
            state: "waiting for DHCP".to_string(),
            reason: FailureReason::Timeout,
        })
    );
    assert_eq!(
        String::from_utf8(reporter.into_inner()).unwrap(),
        "Unable to connect to: 'Office' (final state: 3/'waiting for DHCP')\n"
    );
}

#[tokio::test]
async fn add_refuses_when_card_stops_scanning() {
    let mut card = card_reporting(&[1, 0]);
    card.expect_send_network_action()
        .withf(|request| request.action == NetworkIntent::Add)
        .never();
    let join = NetworkJoin::new(&card, &join_config(200)).with_pacer(NoPacing);
    let target = JoinTarget::new("HomeNet", None).unwrap();
    let mut reporter = ProgressReporter::new(Vec::new(), Verbosity::QUIET);
    let mut out = Vec::new();

    let outcome = NetworkService::add(&card, &join, &target, false, &mut reporter, &mut out)
        .await
        .unwrap();

    assert!(matches!(outcome, AddOutcome::Rejected(_)));
    assert_eq!(
        String::from_utf8(reporter.into_inner()).unwrap(),
        "Unable to connect to: 'HomeNet' (final state: 0/'not scanning')\n"
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Error connecting to network 'HomeNet', not adding.\nuse --force to override\n"
    );
}

#[tokio::test]
async fn add_after_successful_test() {
    let mut card = card_reporting(&[4, 5]);
    card.expect_send_network_action()
        .withf(|request| {
            request.action == NetworkIntent::Add
                && request.essid == "HomeNet"
                && request.passphrase.as_deref() == Some("password1")
        })
        .times(1)
        .returning(|_| Box::pin(async { Ok(()) }));
    let join = NetworkJoin::new(&card, &join_config(200)).with_pacer(NoPacing);
    let target = JoinTarget::new("HomeNet", Some("password1".to_string())).unwrap();
    let mut out = Vec::new();

    let outcome = NetworkService::add(&card, &join, &target, false, &mut (), &mut out)
        .await
        .unwrap();

    assert_eq!(outcome, AddOutcome::Added);
    assert!(out.is_empty());
}

#[tokio::test]
async fn cancelled_test_keeps_last_observation() {
    let cancel = CancelToken::new();
    let polls = Arc::new(Mutex::new(0u32));

    let mut card = CardClient::default();
    card.expect_send_network_action()
        .returning(|_| Box::pin(async { Ok(()) }));
    card.expect_test_status().times(2).returning({
        let cancel = cancel.clone();
        let polls = polls.clone();
        move || {
            let mut polls = polls.lock().unwrap();
            *polls += 1;
            if *polls == 2 {
                cancel.cancel();
            }
            Box::pin(async { Ok(2) })
        }
    });

    let join = NetworkJoin::new(&card, &join_config(200))
        .with_pacer(NoPacing)
        .with_cancel_token(cancel);
    let target = JoinTarget::new("HomeNet", Some("password1".to_string())).unwrap();

    let outcome = NetworkService::test(&join, &target, &mut ()).await;

    assert_eq!(
        outcome,
        JoinOutcome::Failed(JoinFailure {
            code: Some(2),
            state: "verifying network key".to_string(),
            reason: FailureReason::Cancelled,
        })
    );
    assert_eq!(*polls.lock().unwrap(), 2);
}

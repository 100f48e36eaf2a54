mod common;

use common::*;
use std::collections::HashMap;
use ytetl::{ApiError, CredentialRotator, CredentialState};

fn probe_data() -> MockData {
    let mut data = MockData::default();
    data.videos.insert(PROBE_VIDEO.to_string(), mk_probe_video());
    data
}

#[test]
fn first_working_credential_wins() {
    let healthy = MockApi::new(probe_data());
    let broken = healthy.with_broken_probe();

    let clients = HashMap::from([
        ("key-1".to_string(), broken),
        ("key-2".to_string(), healthy.clone()),
        ("key-3".to_string(), healthy.clone()),
    ]);
    let mut rotator = CredentialRotator::new(
        ["key-1".to_string(), "key-2".to_string(), "key-3".to_string()],
        factory_by_key(clients),
    )
    .with_probe_video(PROBE_VIDEO);

    let client = rotator.acquire().unwrap();
    assert!(client.video_details(PROBE_VIDEO).unwrap().is_some());

    let creds = rotator.credentials();
    assert_eq!(creds[0].state, CredentialState::Exhausted);
    assert_eq!(creds[1].state, CredentialState::Valid);
    // Never probed: acquisition stops at the first success.
    assert_eq!(creds[2].state, CredentialState::Untested);
    assert_eq!(rotator.remaining(), 2);
}

#[test]
fn reacquire_is_stable_until_marked_exhausted() {
    let healthy = MockApi::new(probe_data());
    let mut rotator = CredentialRotator::new(
        ["key-1".to_string(), "key-2".to_string()],
        factory_for(&healthy),
    )
    .with_probe_video(PROBE_VIDEO);

    rotator.acquire().unwrap();
    rotator.acquire().unwrap();
    // Both acquisitions bound the same (first) credential.
    assert_eq!(rotator.credentials()[0].state, CredentialState::Valid);
    assert_eq!(rotator.credentials()[1].state, CredentialState::Untested);

    rotator.mark_current_exhausted();
    rotator.acquire().unwrap();
    assert_eq!(rotator.credentials()[0].state, CredentialState::Exhausted);
    assert_eq!(rotator.credentials()[1].state, CredentialState::Valid);
}

#[test]
fn all_broken_credentials_is_a_typed_error() {
    let broken = MockApi::new(probe_data()).with_broken_probe();
    let mut rotator = CredentialRotator::new(
        ["key-1".to_string(), "key-2".to_string()],
        factory_for(&broken),
    )
    .with_probe_video(PROBE_VIDEO);

    let err = rotator.acquire().err().expect("acquire should fail");
    assert!(matches!(err, ApiError::AllCredentialsExhausted));
    assert_eq!(rotator.remaining(), 0);
    for cred in rotator.credentials() {
        assert_eq!(cred.state, CredentialState::Exhausted);
    }
}

#[test]
fn empty_probe_result_counts_as_exhausted() {
    // The probe video is absent from the fixture entirely.
    let empty = MockApi::new(MockData::default());
    let mut rotator =
        CredentialRotator::new(["key-1".to_string()], factory_for(&empty)).with_probe_video(PROBE_VIDEO);

    let err = rotator.acquire().err().expect("acquire should fail");
    assert!(matches!(err, ApiError::AllCredentialsExhausted));
}

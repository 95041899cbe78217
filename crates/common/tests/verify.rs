//! Integration tests for verification against registered documents

mod support;

use common::fingerprint::FingerprintScheme;
use common::registry::Document;

use support::{contract, setup, signer};

#[tokio::test]
async fn test_hellowrld_upload_then_verify() {
    let (service, _, _) = setup(FingerprintScheme::Prefix32);

    let upload = service
        .upload(Document::new("hello.txt", "HELLOWRLD"), &contract(), &signer())
        .await;
    let fingerprint = upload.hash.clone().unwrap();
    assert_eq!(fingerprint.as_str(), "48454c4c4f57524c44");

    let verified = service.verify(fingerprint.as_str(), &contract()).await;

    assert!(verified.success);
    assert!(verified.exists);
    assert_eq!(verified.owner, Some(signer().address()));
    assert_eq!(verified.ipfs_cid, upload.cid.map(|cid| cid.to_string()));
    assert!(verified.timestamp.is_some());
    assert!(verified.error.is_none());
}

#[tokio::test]
async fn test_unregistered_fingerprint_does_not_exist() {
    let (service, _, ledger) = setup(FingerprintScheme::Sha3_256);

    let verified = service.verify("deadbeef", &contract()).await;

    assert!(verified.success);
    assert!(!verified.exists);
    assert!(verified.owner.is_none());
    assert!(verified.ipfs_cid.is_none());
    assert!(verified.timestamp.is_none());
    assert!(verified.error.is_none());
    assert_eq!(ledger.calls(), 1);
}

#[tokio::test]
async fn test_empty_fingerprint_makes_no_calls() {
    let (service, store, ledger) = setup(FingerprintScheme::Sha3_256);

    let verified = service.verify("", &contract()).await;

    assert!(!verified.success);
    assert!(!verified.exists);
    assert_eq!(store.calls() + ledger.calls(), 0);
}

#[tokio::test]
async fn test_prefix_scheme_collides_on_shared_prefix() {
    let (service, _, _) = setup(FingerprintScheme::Prefix32);
    let head = vec![b'a'; 32];
    let mut a = head.clone();
    a.extend_from_slice(b"first tail");
    let mut b = head;
    b.extend_from_slice(b"second tail");

    service
        .upload(Document::new("a.bin", a), &contract(), &signer())
        .await;
    let second = service
        .upload(Document::new("b.bin", b), &contract(), &signer())
        .await;

    // same fingerprint, so the ledger rejects the second registration
    assert!(second.success);
    assert!(second.registration_error.is_some());
}

#[tokio::test]
async fn test_registration_is_scoped_to_contract() {
    let (service, _, _) = setup(FingerprintScheme::Sha3_256);
    let upload = service
        .upload(Document::new("hello.txt", "HELLOWRLD"), &contract(), &signer())
        .await;

    let other = common::ledger::Address::from_bytes([0x01; 20]);
    let verified = service
        .verify(upload.hash.unwrap().as_str(), &other)
        .await;

    assert!(verified.success);
    assert!(!verified.exists);
}

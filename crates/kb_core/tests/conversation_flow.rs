//! Conversation handshake walkthroughs against the in-memory store.

mod common;

use std::sync::Arc;

use kb_core::{ConversationEngine, CoreError, MemoryStore, RecordStore};
use kb_proto::api::{ConversationCompleteRequest, ConversationInitiateRequest};
use kb_proto::payload;
use kb_proto::record::ConversationStatus;

use common::{b64, key, sign_as, StubVerifier};

async fn engine_with_store() -> (ConversationEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = ConversationEngine::new(store.clone(), Arc::new(StubVerifier))
        .await
        .expect("engine");
    (engine, store)
}

fn initiate_request(initiator: &str, responder: &str, kyber: &str) -> ConversationInitiateRequest {
    let signed = payload::conversation_initiate(responder, kyber).expect("payload");
    ConversationInitiateRequest {
        initiator_falcon_pubkey: initiator.to_string(),
        responder_falcon_pubkey: responder.to_string(),
        kyber_pubkey: kyber.to_string(),
        signature: sign_as(initiator, &signed),
    }
}

fn complete_request(
    initiator: &str,
    responder: &str,
    ciphertext: &str,
) -> ConversationCompleteRequest {
    let signed = payload::conversation_complete(initiator, ciphertext).expect("payload");
    ConversationCompleteRequest {
        initiator_falcon_pubkey: initiator.to_string(),
        responder_falcon_pubkey: responder.to_string(),
        kyber_ciphertext: ciphertext.to_string(),
        signature: sign_as(responder, &signed),
    }
}

#[tokio::test]
async fn initiate_then_complete_walkthrough() {
    let (engine, _store) = engine_with_store().await;
    let (alice, bob) = (key("alice"), key("bob"));
    let kyber = b64(b"kyber-public-key");

    let conv = engine
        .initiate(initiate_request(&alice, &bob, &kyber))
        .await
        .expect("initiate");
    assert_eq!(conv.status, ConversationStatus::Pending);

    let pending = engine.list_pending(&bob).await.expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kyber_pubkey, kyber);

    // The initiator is not the responder of this record.
    assert!(engine.list_pending(&alice).await.expect("list").is_empty());

    let ciphertext = b64(b"kyber-ciphertext");
    let completed = engine
        .complete(complete_request(&alice, &bob, &ciphertext))
        .await
        .expect("complete");
    assert_eq!(completed.status, ConversationStatus::Complete);
    assert_eq!(completed.kyber_ciphertext.as_deref(), Some(ciphertext.as_str()));

    // Gone from the pending view once completed.
    assert!(engine.list_pending(&bob).await.expect("list").is_empty());
}

#[tokio::test]
async fn second_initiate_is_conflict_and_leaves_original() {
    let (engine, _store) = engine_with_store().await;
    let (alice, bob) = (key("alice"), key("bob"));
    let first_kyber = b64(b"first-key");

    engine
        .initiate(initiate_request(&alice, &bob, &first_kyber))
        .await
        .expect("initiate");

    let err = engine
        .initiate(initiate_request(&alice, &bob, &b64(b"second-key")))
        .await
        .expect_err("duplicate initiate");
    assert!(matches!(err, CoreError::Conflict { state } if state == "pending"));

    let pending = engine.list_pending(&bob).await.expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kyber_pubkey, first_kyber);
}

#[tokio::test]
async fn tampered_signature_is_rejected_without_state_change() {
    let (engine, store) = engine_with_store().await;
    let (alice, bob, mallory) = (key("alice"), key("bob"), key("mallory"));
    let kyber = b64(b"kyber-public-key");

    // Signature computed over a different responder key.
    let signed = payload::conversation_initiate(&mallory, &kyber).expect("payload");
    let req = ConversationInitiateRequest {
        initiator_falcon_pubkey: alice.clone(),
        responder_falcon_pubkey: bob.clone(),
        kyber_pubkey: kyber,
        signature: sign_as(&alice, &signed),
    };
    let err = engine.initiate(req).await.expect_err("tampered payload");
    assert!(matches!(err, CoreError::Unauthenticated));
    assert!(store.is_empty());
}

#[tokio::test]
async fn complete_requires_the_responder_key() {
    let (engine, _store) = engine_with_store().await;
    let (alice, bob) = (key("alice"), key("bob"));
    engine
        .initiate(initiate_request(&alice, &bob, &b64(b"kyber")))
        .await
        .expect("initiate");

    // Signed by the initiator instead of the responder.
    let ciphertext = b64(b"ct");
    let signed = payload::conversation_complete(&alice, &ciphertext).expect("payload");
    let req = ConversationCompleteRequest {
        initiator_falcon_pubkey: alice.clone(),
        responder_falcon_pubkey: bob.clone(),
        kyber_ciphertext: ciphertext,
        signature: sign_as(&alice, &signed),
    };
    let err = engine.complete(req).await.expect_err("wrong signer");
    assert!(matches!(err, CoreError::Unauthenticated));

    // Still pending.
    assert_eq!(engine.list_pending(&bob).await.expect("list").len(), 1);
}

#[tokio::test]
async fn complete_with_malformed_initiator_key_is_validation() {
    let (engine, _store) = engine_with_store().await;
    let (alice, bob) = (key("alice"), key("bob"));
    engine
        .initiate(initiate_request(&alice, &bob, &b64(b"kyber")))
        .await
        .expect("initiate");

    let err = engine
        .complete(complete_request("!!!not-base64!!!", &bob, &b64(b"ct")))
        .await
        .expect_err("malformed key");
    assert!(matches!(
        err,
        CoreError::Validation(msg) if msg.contains("initiator_falcon_pubkey")
    ));
    assert_eq!(engine.list_pending(&bob).await.expect("list").len(), 1);
}

#[tokio::test]
async fn complete_without_initiate_is_not_found() {
    let (engine, store) = engine_with_store().await;
    let err = engine
        .complete(complete_request(&key("alice"), &key("bob"), &b64(b"ct")))
        .await
        .expect_err("no record");
    assert!(matches!(err, CoreError::NotFound));
    assert!(store.is_empty());
}

#[tokio::test]
async fn replayed_complete_is_conflict_and_state_unchanged() {
    let (engine, _store) = engine_with_store().await;
    let (alice, bob) = (key("alice"), key("bob"));
    engine
        .initiate(initiate_request(&alice, &bob, &b64(b"kyber")))
        .await
        .expect("initiate");

    let first_ct = b64(b"first-ciphertext");
    engine
        .complete(complete_request(&alice, &bob, &first_ct))
        .await
        .expect("complete");

    let err = engine
        .complete(complete_request(&alice, &bob, &b64(b"second-ciphertext")))
        .await
        .expect_err("replay");
    assert!(matches!(err, CoreError::Conflict { state } if state == "complete"));
}

#[tokio::test]
async fn self_pair_is_a_validation_error() {
    let (engine, store) = engine_with_store().await;
    let alice = key("alice");
    let err = engine
        .initiate(initiate_request(&alice, &alice, &b64(b"kyber")))
        .await
        .expect_err("self pair");
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn sweep_removes_only_stale_pending_records() {
    let (engine, store) = engine_with_store().await;
    let (alice, bob, carol) = (key("alice"), key("bob"), key("carol"));

    engine
        .initiate(initiate_request(&alice, &bob, &b64(b"kyber-a")))
        .await
        .expect("initiate");
    engine
        .initiate(initiate_request(&carol, &bob, &b64(b"kyber-c")))
        .await
        .expect("initiate");
    engine
        .complete(complete_request(&alice, &bob, &b64(b"ct")))
        .await
        .expect("complete");

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let removed = engine
        .sweep_expired(chrono::Duration::milliseconds(5))
        .await
        .expect("sweep");

    // Only carol's still-pending record is old enough to go; the completed
    // record is terminal and untouchable.
    assert_eq!(removed, 1);
    assert!(engine.list_pending(&bob).await.expect("list").is_empty());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn index_rebuilds_from_the_store() {
    let store = Arc::new(MemoryStore::new());
    let (alice, bob) = (key("alice"), key("bob"));
    {
        let engine = ConversationEngine::new(store.clone(), Arc::new(StubVerifier))
            .await
            .expect("engine");
        engine
            .initiate(initiate_request(&alice, &bob, &b64(b"kyber")))
            .await
            .expect("initiate");
    }

    // A fresh engine over the same store must serve the same views.
    let reopened = ConversationEngine::new(store.clone(), Arc::new(StubVerifier))
        .await
        .expect("engine");
    let pending = reopened.list_pending(&bob).await.expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(
        store
            .get(kb_core::RecordSpace::Conversations, &kb_core::PairKey::new(&alice, &bob))
            .await
            .expect("get")
            .expect("row")
            .state,
        "pending"
    );
}

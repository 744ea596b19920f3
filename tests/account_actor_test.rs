//! End-to-end account scenarios through the correlation proxy.

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use signalbridge_core::client::{AccountClient, ClientError};
use signalbridge_core::constants::events;
use signalbridge_core::error::{DispatchError, ProxyError, QueryError};
use signalbridge_core::messaging::{encode_envelope, PayloadData, SignalData};
use signalbridge_core::models::{Account, UpgradeResponse};
use signalbridge_core::orchestration::{request_response, AccountActor, AccountSettings, ProxySettings};
use signalbridge_core::substrate::{ActorId, Clock, DurableRuntime, ManualClock};
use signalbridge_core::SignalChannel;
use std::sync::Arc;

fn runtime_with_clock() -> (DurableRuntime, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ));
    (DurableRuntime::with_clock(clock.clone()), clock)
}

fn spawn_account(runtime: &DurableRuntime, name: &str, plan: &str) {
    runtime
        .spawn::<AccountActor>(
            name,
            Account::new(name).with_plan(plan),
            AccountSettings::default(),
        )
        .unwrap();
}

#[tokio::test]
async fn unauthorized_upgrade_is_rejected_and_plan_is_unchanged() {
    let (runtime, _) = runtime_with_clock();
    spawn_account(&runtime, "a1", "trial");
    let before = runtime.query(&ActorId::from("a1"), "account").unwrap();

    let result = request_response(
        &runtime,
        upgrade_payload("a1", "premium", "a2"),
        &ProxySettings::default(),
    )
    .await
    .unwrap();

    assert!(!result.success);
    assert_eq!(result.error_message(), Some("access denied to account from a2"));
    assert_eq!(runtime.query(&ActorId::from("a1"), "plan").unwrap(), "trial");
    assert_eq!(runtime.query(&ActorId::from("a1"), "account").unwrap(), before);
}

#[tokio::test]
async fn authorized_upgrade_sets_plan_and_valid_from_together() {
    let (runtime, clock) = runtime_with_clock();
    spawn_account(&runtime, "a1", "trial");
    clock.advance(chrono::Duration::minutes(3));

    let result = request_response(
        &runtime,
        upgrade_payload("a1", "premium", "a1"),
        &ProxySettings::default(),
    )
    .await
    .unwrap();

    assert!(result.success);
    assert!(result.error.is_none());
    let response: UpgradeResponse = result.payload_data.decode().unwrap();
    assert_eq!(response.valid_from, clock.now());

    // The reply is only sent after the query snapshot is refreshed.
    assert_eq!(runtime.query(&ActorId::from("a1"), "plan").unwrap(), "premium");
    let account: Account =
        serde_json::from_value(runtime.query(&ActorId::from("a1"), "account").unwrap()).unwrap();
    assert_eq!(account.plan_valid_from, Some(response.valid_from));
}

#[tokio::test]
async fn delete_replies_before_the_account_terminates() {
    let (runtime, clock) = runtime_with_clock();
    let mut lifecycle = runtime.publisher().subscribe();
    let handle = runtime
        .spawn::<AccountActor>("a1", Account::new("a1"), AccountSettings::default())
        .unwrap();
    clock.advance(chrono::Duration::hours(1));

    let result = request_response(&runtime, delete_payload("a1", "a1"), &ProxySettings::default())
        .await
        .unwrap();
    assert!(result.success);

    let account = handle.result().await.unwrap();
    assert_eq!(account.terminated, Some(clock.now()));

    let mut reply_sent = None;
    let mut account_completed = None;
    let mut position = 0;
    while let Ok(event) = lifecycle.try_recv() {
        position += 1;
        if event.name == events::SIGNAL_DISPATCHED && event.context["channel"] == "completed" {
            reply_sent.get_or_insert(position);
        }
        if event.name == events::ACTOR_COMPLETED && event.context["actor_id"] == "a1" {
            account_completed = Some(position);
        }
    }
    assert!(reply_sent.unwrap() < account_completed.unwrap());
}

#[tokio::test]
async fn command_queued_behind_a_delete_is_answered_with_not_found() {
    let (runtime, _) = runtime_with_clock();
    let collector = runtime.spawn::<ReplyCollector>("collector", (), ()).unwrap();
    let handle = runtime
        .spawn::<AccountActor>("a1", Account::new("a1"), AccountSettings::default())
        .unwrap();
    let id = ActorId::from("a1");

    // Both land in the mailbox before the account handles either.
    runtime
        .signal(&id, None, SignalChannel::DeleteAccount, delete_envelope("a1", "collector"))
        .unwrap();
    runtime
        .signal(
            &id,
            None,
            SignalChannel::UpgradeAccount,
            upgrade_envelope("premium", "a1", "collector"),
        )
        .unwrap();

    let account = handle.result().await.unwrap();
    assert!(account.is_terminated());
    assert_eq!(account.plan, "trial");

    runtime
        .signal(&ActorId::from("collector"), None, SignalChannel::DeleteAccount, vec![])
        .unwrap();
    let replies = collector.result().await.unwrap();
    assert_eq!(replies.len(), 2);
    assert!(replies[0].success);
    assert!(!replies[1].success);
    assert_eq!(replies[1].error_message(), Some("actor not found: a1"));
}

#[tokio::test(start_paused = true)]
async fn upgrade_racing_a_delete_gets_an_answer() {
    let runtime = DurableRuntime::new();
    spawn_account(&runtime, "a1", "trial");
    let settings = ProxySettings::default();

    let (delete, upgrade) = tokio::join!(
        request_response(&runtime, delete_payload("a1", "a1"), &settings),
        request_response(&runtime, upgrade_payload("a1", "premium", "a1"), &settings),
    );

    assert!(delete.unwrap().success);
    match upgrade {
        Ok(result) if result.success => {}
        Ok(result) => assert_eq!(result.error_message(), Some("actor not found: a1")),
        Err(ProxyError::Dispatch(DispatchError::ActorNotFound { .. })) => {}
        Err(other) => panic!("upgrade racing a delete ended with {other:?}"),
    }
    assert!(!runtime.is_running(&ActorId::from("a1")));
}

#[tokio::test]
async fn deleted_account_is_not_found() {
    let (runtime, _) = runtime_with_clock();
    let handle = runtime
        .spawn::<AccountActor>("a1", Account::new("a1"), AccountSettings::default())
        .unwrap();

    request_response(&runtime, delete_payload("a1", "a1"), &ProxySettings::default())
        .await
        .unwrap();
    handle.result().await.unwrap();

    let id = ActorId::from("a1");
    assert_eq!(
        runtime.signal(&id, None, SignalChannel::UpgradeAccount, vec![]),
        Err(DispatchError::ActorNotFound {
            actor_id: "a1".to_string()
        })
    );
    assert!(matches!(
        runtime.query(&id, "plan"),
        Err(QueryError::ActorNotFound { .. })
    ));

    let err = request_response(
        &runtime,
        upgrade_payload("a1", "premium", "a1"),
        &ProxySettings::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err,
        ProxyError::Dispatch(DispatchError::ActorNotFound {
            actor_id: "a1".to_string()
        })
    );
}

#[tokio::test]
async fn unauthorized_delete_leaves_account_running() {
    let (runtime, _) = runtime_with_clock();
    spawn_account(&runtime, "a1", "trial");

    let result = request_response(&runtime, delete_payload("a1", "mallory"), &ProxySettings::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(
        result.error_message(),
        Some("access denied to account from mallory")
    );
    assert!(runtime.is_running(&ActorId::from("a1")));
}

#[tokio::test]
async fn malformed_command_body_is_answered_with_an_error() {
    let (runtime, _) = runtime_with_clock();
    spawn_account(&runtime, "a1", "trial");

    let payload = signalbridge_core::Payload::new(
        "a1",
        SignalChannel::UpgradeAccount,
        PayloadData::Raw(b"not json".to_vec()),
    );
    let result = request_response(&runtime, payload, &ProxySettings::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error_message().is_some());
    assert_eq!(runtime.query(&ActorId::from("a1"), "plan").unwrap(), "trial");
}

#[tokio::test]
async fn replies_to_a_vanished_caller_do_not_stop_the_account() {
    let (runtime, _) = runtime_with_clock();
    spawn_account(&runtime, "a1", "trial");
    let id = ActorId::from("a1");

    // Same command delivered twice, answering a proxy that no longer exists.
    let envelope = upgrade_envelope("gold", "a1", "request-response-gone");
    runtime
        .signal(&id, None, SignalChannel::UpgradeAccount, envelope.clone())
        .unwrap();
    runtime
        .signal(&id, None, SignalChannel::UpgradeAccount, envelope)
        .unwrap();

    let result = request_response(
        &runtime,
        upgrade_payload("a1", "premium", "a1"),
        &ProxySettings::default(),
    )
    .await
    .unwrap();
    assert!(result.success);
    assert_eq!(runtime.query(&id, "plan").unwrap(), "premium");
}

#[tokio::test]
async fn commands_without_reply_address_are_ignored() {
    let (runtime, _) = runtime_with_clock();
    spawn_account(&runtime, "a1", "trial");
    let id = ActorId::from("a1");

    let envelope = encode_envelope(&SignalData {
        payload_data: upgrade_payload("a1", "premium", "a1").payload_data,
        completion_target_id: String::new(),
    })
    .unwrap();
    runtime
        .signal(&id, None, SignalChannel::UpgradeAccount, envelope)
        .unwrap();

    // Anything routed after it observes the ignored command as a no-op.
    let result = request_response(
        &runtime,
        upgrade_payload("a1", "trial", "intruder"),
        &ProxySettings::default(),
    )
    .await
    .unwrap();
    assert!(!result.success);
    assert_eq!(runtime.query(&id, "plan").unwrap(), "trial");
}

#[tokio::test]
async fn client_walks_the_account_lifecycle() {
    let config = signalbridge_core::BridgeConfig::default();
    let client = AccountClient::new(DurableRuntime::from_config(&config), &config);

    let handle = client.create_account(Account::new("account_1")).unwrap();
    assert_eq!(client.plan("account_1").unwrap(), "trial");
    assert_eq!(client.list_accounts().len(), 1);

    let err = client
        .upgrade("account_1", "premium", "account_2")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Rejected("access denied to account from account_2".to_string())
    );

    let response = client
        .upgrade("account_1", "premium", "account_1")
        .await
        .unwrap();
    let account = client.account("account_1").unwrap();
    assert_eq!(account.plan, "premium");
    assert_eq!(account.plan_valid_from, Some(response.valid_from));

    client.delete("account_1", "account_1").await.unwrap();
    let account = handle.result().await.unwrap();
    assert!(account.is_terminated());
    assert!(client.list_accounts().is_empty());
    assert!(matches!(
        client.plan("account_1"),
        Err(ClientError::Query(QueryError::ActorNotFound { .. }))
    ));
}

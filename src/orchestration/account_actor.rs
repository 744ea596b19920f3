//! # Account Actor
//!
//! Long-lived, per-account state machine. It reacts to upgrade and delete
//! commands forwarded by correlation proxies and to its own compaction timer,
//! one event at a time.
//!
//! Every problem with a command (bad body, wrong caller, unencodable
//! response) is answered with a failed `SignalResult`; command handling never
//! fails the actor. A delete is only applied once the success reply has been
//! acknowledged, so the caller always learns about the deletion before the
//! account disappears.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::constants::{queries, SignalChannel, DEFAULT_COMPACTION_INTERVAL, DEFAULT_PLAN};
use crate::error::{ActorFailure, DispatchError};
use crate::logging::log_error;
use crate::messaging::{decode_envelope, encode_envelope, PayloadData, SignalData, SignalResult};
use crate::models::{Account, AccountCommand, UpgradeRequest, UpgradeResponse};
use crate::state_machine::{AccountPhase, AccountState, ActorEvent, SendOutcome};
use crate::substrate::{
    ActorContext, ActorId, DurableActor, LateReply, QueryRegistry, SendId, Step, TimerId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSettings {
    pub compaction_interval: Duration,
    pub default_plan: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            compaction_interval: DEFAULT_COMPACTION_INTERVAL,
            default_plan: DEFAULT_PLAN.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct AccountActor {
    account: Account,
    phase: AccountPhase,
    compaction_timer: TimerId,
}

impl AccountActor {
    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn phase(&self) -> &AccountPhase {
        &self.phase
    }

    pub fn state(&self) -> AccountState {
        AccountState::of(&self.account)
    }

    fn on_command(&mut self, channel: SignalChannel, payload: &[u8], cx: &mut ActorContext) {
        let envelope: SignalData = match decode_envelope(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(account = %self.account.name, signal = %channel, error = %e, "Ignoring undecodable signal envelope");
                return;
            }
        };
        if envelope.completion_target_id.is_empty() {
            warn!(account = %self.account.name, signal = %channel, "Ignoring signal without completion target");
            return;
        }
        let reply_to = envelope.completion_target_id;

        let command = match AccountCommand::decode(channel, &envelope.payload_data) {
            Ok(command) => command,
            Err(e) => {
                self.reply(cx, &reply_to, SignalResult::failure(format!("invalid {channel} request: {e}")));
                return;
            }
        };

        if let Err(denied) = self.account.authorize(command.actor()) {
            info!(account = %self.account.name, actor = %denied.actor, signal = %channel, "Rejected unauthorized command");
            self.reply(cx, &reply_to, SignalResult::failure(denied.to_string()));
            return;
        }

        match command {
            AccountCommand::Upgrade(request) => {
                let result = self.upgrade(request, cx.now());
                self.reply(cx, &reply_to, result);
            }
            AccountCommand::Delete(_) => {
                match self.reply(cx, &reply_to, SignalResult::success(PayloadData::Empty)) {
                    Some(send_id) => {
                        debug!(account = %self.account.name, %send_id, "Delete accepted, awaiting reply acknowledgement");
                        self.phase = AccountPhase::AwaitingDeleteAck {
                            send_id,
                            completion_target_id: reply_to,
                        };
                    }
                    None => {
                        warn!(account = %self.account.name, "Delete not applied: success reply could not be sent");
                    }
                }
            }
        }
    }

    /// Apply an authorized upgrade. The plan change stands even if the
    /// response cannot be encoded.
    fn upgrade(&mut self, request: UpgradeRequest, now: DateTime<Utc>) -> SignalResult {
        let previous = std::mem::take(&mut self.account.plan);
        self.account.apply_upgrade(request.to, now);
        info!(
            account = %self.account.name,
            from = %previous,
            to = %self.account.plan,
            valid_from = %now,
            "Plan upgraded"
        );

        match PayloadData::raw_json(&UpgradeResponse { valid_from: now }) {
            Ok(body) => SignalResult::success(body),
            Err(e) => SignalResult::failure(format!("failed to marshal response: {e}")),
        }
    }

    fn reply(&self, cx: &mut ActorContext, to: &str, result: SignalResult) -> Option<SendId> {
        match encode_envelope(&result) {
            Ok(bytes) => Some(cx.signal_external(
                ActorId::from(to),
                None,
                SignalChannel::Completed,
                bytes,
            )),
            Err(e) => {
                log_error(
                    "account_actor",
                    "reply",
                    &e.to_string(),
                    Some(&format!("account={} reply_to={to}", self.account.name)),
                );
                None
            }
        }
    }

    fn on_ack(
        &mut self,
        send_id: SendId,
        outcome: SendOutcome,
        cx: &mut ActorContext,
    ) -> Step<Account, Account> {
        match &self.phase {
            AccountPhase::AwaitingDeleteAck {
                send_id: awaited,
                completion_target_id,
            } if *awaited == send_id => {
                if let SendOutcome::Failed(e) = &outcome {
                    warn!(
                        account = %self.account.name,
                        reply_to = %completion_target_id,
                        error = %e,
                        "Delete reply was not delivered, terminating anyway"
                    );
                }
                self.account.terminate(cx.now());
                self.phase = AccountPhase::AwaitingEvent;
                info!(account = %self.account.name, terminated = ?self.account.terminated, "Account terminated");
                Step::Complete(self.account.clone())
            }
            _ => {
                if let SendOutcome::Failed(e) = outcome {
                    warn!(account = %self.account.name, %send_id, error = %e, "Reply was not delivered");
                }
                Step::Continue
            }
        }
    }
}

impl DurableActor for AccountActor {
    type State = Account;
    type Settings = AccountSettings;
    type Output = Account;

    fn kind() -> &'static str {
        "AccountWorkflow"
    }

    fn activate(
        mut account: Account,
        settings: &AccountSettings,
        cx: &mut ActorContext,
    ) -> Result<Self, ActorFailure> {
        account.activate(cx.now(), &settings.default_plan);
        let compaction_timer = cx.start_timer(settings.compaction_interval);
        debug!(
            account = %account.name,
            plan = %account.plan,
            run_id = %cx.run_id(),
            "Account actor activated"
        );

        Ok(Self {
            account,
            phase: AccountPhase::AwaitingEvent,
            compaction_timer,
        })
    }

    fn handle(&mut self, event: ActorEvent, cx: &mut ActorContext) -> Step<Account, Account> {
        match event {
            ActorEvent::Signal { channel, payload } if channel.is_command() => {
                self.on_command(channel, &payload, cx);
                Step::Continue
            }
            ActorEvent::Signal { channel, .. } => {
                warn!(account = %self.account.name, signal = %channel, "Ignoring signal on non-command channel");
                Step::Continue
            }
            ActorEvent::SignalAcked { send_id, outcome } => self.on_ack(send_id, outcome, cx),
            ActorEvent::TimerFired { timer_id } if timer_id == self.compaction_timer => {
                debug!(account = %self.account.name, run_id = %cx.run_id(), "Compacting history");
                Step::ContinueAsNew(self.account.clone())
            }
            ActorEvent::TimerFired { timer_id } => {
                error!(account = %self.account.name, %timer_id, "Unknown timer fired");
                Step::Continue
            }
        }
    }

    fn register_queries(registry: &mut QueryRegistry<Self>) {
        registry.register(queries::PLAN, |actor: &AccountActor| {
            json!(actor.account.plan)
        });
        registry.register(queries::ACCOUNT, |actor: &AccountActor| {
            serde_json::to_value(&actor.account).unwrap_or_default()
        });
    }

    /// Commands queued behind a delete are answered with the error a caller
    /// arriving after termination gets, so no proxy waits on a reply that
    /// will never come.
    fn reply_to_late_signal(
        channel: SignalChannel,
        payload: &[u8],
        error: &DispatchError,
    ) -> Option<LateReply> {
        if !channel.is_command() {
            return None;
        }
        let envelope: SignalData = decode_envelope(payload).ok()?;
        if envelope.completion_target_id.is_empty() {
            return None;
        }
        let payload = encode_envelope(&SignalResult::failure(error.to_string())).ok()?;
        Some(LateReply {
            target: ActorId::from(envelope.completion_target_id),
            channel: SignalChannel::Completed,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeleteAccountRequest;
    use crate::substrate::{Command, RunId};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn activate(account: Account) -> (AccountActor, ActorContext) {
        let mut cx = ActorContext::new(ActorId::from(account.name.as_str()), RunId::new(), t0());
        let actor = AccountActor::activate(account, &AccountSettings::default(), &mut cx).unwrap();
        cx.take_commands();
        (actor, cx)
    }

    fn command<T: serde::Serialize>(channel: SignalChannel, body: &T, reply_to: &str) -> ActorEvent {
        let envelope = SignalData {
            payload_data: PayloadData::raw_json(body).unwrap(),
            completion_target_id: reply_to.to_string(),
        };
        ActorEvent::Signal {
            channel,
            payload: encode_envelope(&envelope).unwrap(),
        }
    }

    fn sent_result(cx: &mut ActorContext) -> (SendId, String, SignalResult) {
        match cx.take_commands().as_slice() {
            [Command::SignalExternal {
                send_id,
                target,
                channel: SignalChannel::Completed,
                payload,
                ..
            }] => (*send_id, target.to_string(), decode_envelope(payload).unwrap()),
            other => panic!("expected one reply, got {other:?}"),
        }
    }

    #[test]
    fn test_activation_sets_defaults_and_arms_compaction() {
        let mut cx = ActorContext::new(ActorId::from("a1"), RunId::new(), t0());
        let actor =
            AccountActor::activate(Account::new("a1"), &AccountSettings::default(), &mut cx).unwrap();
        assert_eq!(actor.account().plan, "trial");
        assert_eq!(actor.account().created, Some(t0()));
        assert_eq!(
            cx.take_commands(),
            vec![Command::StartTimer {
                timer_id: TimerId(1),
                after: DEFAULT_COMPACTION_INTERVAL,
            }]
        );
    }

    #[test]
    fn test_unauthorized_upgrade_is_rejected_without_change() {
        let (mut actor, mut cx) = activate(Account::new("a1").with_plan("trial"));
        let before = actor.account().clone();

        let step = actor.handle(
            command(
                SignalChannel::UpgradeAccount,
                &UpgradeRequest {
                    account: String::new(),
                    to: "premium".to_string(),
                    actor: "a2".to_string(),
                },
                "proxy-1",
            ),
            &mut cx,
        );

        assert_eq!(step, Step::Continue);
        assert_eq!(actor.account(), &before);
        let (_, target, result) = sent_result(&mut cx);
        assert_eq!(target, "proxy-1");
        assert!(!result.success);
        assert_eq!(result.error_message(), Some("access denied to account from a2"));
    }

    #[test]
    fn test_authorized_upgrade_replies_with_valid_from() {
        let (mut actor, mut cx) = activate(Account::new("a1").with_plan("trial"));
        let later = t0() + chrono::Duration::minutes(5);
        cx.begin(later);

        actor.handle(
            command(
                SignalChannel::UpgradeAccount,
                &UpgradeRequest {
                    account: "a1".to_string(),
                    to: "premium".to_string(),
                    actor: "a1".to_string(),
                },
                "proxy-2",
            ),
            &mut cx,
        );

        assert_eq!(actor.account().plan, "premium");
        assert_eq!(actor.account().plan_valid_from, Some(later));
        let (_, _, result) = sent_result(&mut cx);
        assert!(result.success);
        let response: UpgradeResponse = result.payload_data.decode().unwrap();
        assert_eq!(response.valid_from, later);
    }

    #[test]
    fn test_malformed_body_gets_error_reply() {
        let (mut actor, mut cx) = activate(Account::new("a1"));
        let envelope = SignalData {
            payload_data: PayloadData::Raw(b"{oops".to_vec()),
            completion_target_id: "proxy-3".to_string(),
        };
        actor.handle(
            ActorEvent::Signal {
                channel: SignalChannel::DeleteAccount,
                payload: encode_envelope(&envelope).unwrap(),
            },
            &mut cx,
        );

        let (_, _, result) = sent_result(&mut cx);
        assert!(!result.success);
        assert!(result.error_message().unwrap().starts_with("invalid DeleteAccountSignal request"));
        assert!(actor.phase() == &AccountPhase::AwaitingEvent);
    }

    #[test]
    fn test_missing_reply_address_is_ignored() {
        let (mut actor, mut cx) = activate(Account::new("a1"));
        actor.handle(
            command(
                SignalChannel::DeleteAccount,
                &DeleteAccountRequest {
                    account: "a1".to_string(),
                    actor: "a1".to_string(),
                },
                "",
            ),
            &mut cx,
        );
        assert!(cx.take_commands().is_empty());
        assert!(!actor.account().is_terminated());
    }

    #[test]
    fn test_delete_terminates_only_after_ack() {
        let (mut actor, mut cx) = activate(Account::new("a1"));
        let step = actor.handle(
            command(
                SignalChannel::DeleteAccount,
                &DeleteAccountRequest {
                    account: "a1".to_string(),
                    actor: "a1".to_string(),
                },
                "proxy-4",
            ),
            &mut cx,
        );
        assert_eq!(step, Step::Continue);
        assert!(!actor.account().is_terminated());
        assert!(actor.phase().is_awaiting_ack());

        let (send_id, _, result) = sent_result(&mut cx);
        assert!(result.success);

        let acked_at = t0() + chrono::Duration::seconds(1);
        cx.begin(acked_at);
        let step = actor.handle(
            ActorEvent::SignalAcked {
                send_id,
                outcome: SendOutcome::Delivered,
            },
            &mut cx,
        );
        match step {
            Step::Complete(account) => assert_eq!(account.terminated, Some(acked_at)),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(actor.state(), AccountState::Terminated);
    }

    #[test]
    fn test_compaction_timer_continues_with_same_account() {
        let (mut actor, mut cx) = activate(Account::new("a1").with_plan("gold"));
        let step = actor.handle(
            ActorEvent::TimerFired {
                timer_id: TimerId(1),
            },
            &mut cx,
        );
        assert_eq!(step, Step::ContinueAsNew(actor.account().clone()));
    }

    #[test]
    fn test_late_command_is_answered_with_not_found() {
        let gone = DispatchError::ActorNotFound {
            actor_id: "a1".to_string(),
        };
        let ActorEvent::Signal { channel, payload } = command(
            SignalChannel::UpgradeAccount,
            &UpgradeRequest {
                account: "a1".to_string(),
                to: "premium".to_string(),
                actor: "a1".to_string(),
            },
            "proxy-5",
        ) else {
            unreachable!()
        };

        let reply = AccountActor::reply_to_late_signal(channel, &payload, &gone).unwrap();
        assert_eq!(reply.target, ActorId::from("proxy-5"));
        assert_eq!(reply.channel, SignalChannel::Completed);
        let result: SignalResult = decode_envelope(&reply.payload).unwrap();
        assert!(!result.success);
        assert_eq!(result.error_message(), Some("actor not found: a1"));

        assert!(AccountActor::reply_to_late_signal(SignalChannel::Completed, &payload, &gone).is_none());
        assert!(AccountActor::reply_to_late_signal(channel, b"garbage", &gone).is_none());
    }

    #[test]
    fn test_queries_expose_plan_and_account() {
        let (actor, _) = activate(Account::new("a1").with_plan("premium"));
        let mut registry = QueryRegistry::new();
        AccountActor::register_queries(&mut registry);
        let answers = registry.evaluate(&actor);
        assert_eq!(answers[queries::PLAN], json!("premium"));
        assert_eq!(answers[queries::ACCOUNT]["name"], json!("a1"));
    }
}

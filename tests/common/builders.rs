use serde_json::json;
use signalbridge_core::error::ActorFailure;
use signalbridge_core::messaging::{
    decode_envelope, encode_envelope, Payload, PayloadData, SignalData, SignalResult,
};
use signalbridge_core::models::{DeleteAccountRequest, UpgradeRequest};
use signalbridge_core::state_machine::ActorEvent;
use signalbridge_core::substrate::{ActorContext, ActorId, DurableActor, QueryRegistry, Step};
use signalbridge_core::SignalChannel;

pub fn upgrade_payload(account: &str, to: &str, actor: &str) -> Payload {
    let body = PayloadData::raw_json(&UpgradeRequest {
        account: account.to_string(),
        to: to.to_string(),
        actor: actor.to_string(),
    })
    .unwrap();
    Payload::new(account, SignalChannel::UpgradeAccount, body)
}

pub fn delete_payload(account: &str, actor: &str) -> Payload {
    let body = PayloadData::raw_json(&DeleteAccountRequest {
        account: account.to_string(),
        actor: actor.to_string(),
    })
    .unwrap();
    Payload::new(account, SignalChannel::DeleteAccount, body)
}

/// Encoded `SignalData` for an upgrade that replies to `reply_to`
pub fn upgrade_envelope(to: &str, actor: &str, reply_to: &str) -> Vec<u8> {
    let payload = upgrade_payload("", to, actor);
    encode_envelope(&SignalData {
        payload_data: payload.payload_data,
        completion_target_id: reply_to.to_string(),
    })
    .unwrap()
}

/// Encoded `SignalData` for a delete that replies to `reply_to`
pub fn delete_envelope(actor: &str, reply_to: &str) -> Vec<u8> {
    let payload = delete_payload("", actor);
    encode_envelope(&SignalData {
        payload_data: payload.payload_data,
        completion_target_id: reply_to.to_string(),
    })
    .unwrap()
}

/// Replies to every command with a success result echoing the command body
#[derive(Debug)]
pub struct EchoResponder;

impl DurableActor for EchoResponder {
    type State = ();
    type Settings = ();
    type Output = ();

    fn kind() -> &'static str {
        "EchoResponder"
    }

    fn activate(_: (), _: &(), _: &mut ActorContext) -> Result<Self, ActorFailure> {
        Ok(Self)
    }

    fn handle(&mut self, event: ActorEvent, cx: &mut ActorContext) -> Step<(), ()> {
        if let ActorEvent::Signal { payload, .. } = event {
            let request: SignalData = decode_envelope(&payload).unwrap();
            let reply = SignalResult::success(request.payload_data);
            cx.signal_external(
                ActorId::from(request.completion_target_id),
                None,
                SignalChannel::Completed,
                encode_envelope(&reply).unwrap(),
            );
        }
        Step::Continue
    }
}

/// Accepts commands and never answers
#[derive(Debug)]
pub struct SilentTarget;

impl DurableActor for SilentTarget {
    type State = ();
    type Settings = ();
    type Output = ();

    fn kind() -> &'static str {
        "SilentTarget"
    }

    fn activate(_: (), _: &(), _: &mut ActorContext) -> Result<Self, ActorFailure> {
        Ok(Self)
    }

    fn handle(&mut self, _: ActorEvent, _: &mut ActorContext) -> Step<(), ()> {
        Step::Continue
    }
}

/// Collects every result delivered on its completed channel
#[derive(Debug)]
pub struct ReplyCollector {
    results: Vec<SignalResult>,
}

impl DurableActor for ReplyCollector {
    type State = ();
    type Settings = ();
    type Output = Vec<SignalResult>;

    fn kind() -> &'static str {
        "ReplyCollector"
    }

    fn activate(_: (), _: &(), _: &mut ActorContext) -> Result<Self, ActorFailure> {
        Ok(Self {
            results: Vec::new(),
        })
    }

    fn handle(&mut self, event: ActorEvent, _: &mut ActorContext) -> Step<(), Vec<SignalResult>> {
        match event {
            ActorEvent::Signal {
                channel: SignalChannel::Completed,
                payload,
            } => {
                self.results.push(decode_envelope(&payload).unwrap());
                Step::Continue
            }
            ActorEvent::Signal {
                channel: SignalChannel::DeleteAccount,
                ..
            } => Step::Complete(std::mem::take(&mut self.results)),
            _ => Step::Continue,
        }
    }

    fn register_queries(queries: &mut QueryRegistry<Self>) {
        queries.register("count", |collector: &ReplyCollector| {
            json!(collector.results.len())
        });
    }
}

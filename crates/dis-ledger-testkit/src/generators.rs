//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use dis_ledger_core::{format_timestamp, Keypair, Receipt, ReceiptBuilder};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a file-name-safe actor name such as `domain.terra`.
pub fn actor_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}\\.[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate an action name such as `console.approve.v1`.
pub fn action_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.[a-z]{1,8}){0,2}\\.v[0-9]".prop_map(String::from)
}

/// Generate an RFC 3339 timestamp between 2000 and 2100.
pub fn timestamp() -> impl Strategy<Value = String> {
    (946_684_800i64..4_102_444_800i64, 0u32..1_000_000_000u32).prop_map(|(secs, nanos)| {
        let at = chrono::DateTime::<chrono::Utc>::from_timestamp(secs, nanos).unwrap_or_default();
        format_timestamp(at)
    })
}

/// Generate free text that may contain the payload separator.
pub fn context_field() -> impl Strategy<Value = String> {
    "[ -~]{0,24}".prop_map(String::from)
}

/// Generate an arbitrary JSON value, nested up to a few levels.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "\\PC{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,6}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

/// Parameters for generating a receipt.
#[derive(Debug, Clone)]
pub struct ReceiptParams {
    pub keypair: Keypair,
    pub actor: String,
    pub action: String,
    pub created_at: String,
    pub frozen_core_hash: String,
    pub console_id: String,
    pub issuer_seat: String,
}

impl Arbitrary for ReceiptParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            keypair(),
            actor_name(),
            action_name(),
            timestamp(),
            context_field(),
            context_field(),
            context_field(),
        )
            .prop_map(
                |(keypair, actor, action, created_at, core, console, seat)| ReceiptParams {
                    keypair,
                    actor,
                    action,
                    created_at,
                    frozen_core_hash: core,
                    console_id: console,
                    issuer_seat: seat,
                },
            )
            .boxed()
    }
}

/// Generate a signed receipt from parameters.
pub fn receipt_from_params(params: &ReceiptParams) -> Receipt {
    ReceiptBuilder::new(&params.actor, &params.action)
        .created_at(&params.created_at)
        .frozen_core_hash(&params.frozen_core_hash)
        .console(&params.console_id)
        .seat(&params.issuer_seat)
        .sign(&params.keypair)
}

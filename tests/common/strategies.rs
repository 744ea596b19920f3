use proptest::prelude::*;

/// Strategy for generating account names
pub fn account_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

/// Strategy for generating plan names
pub fn plan_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("trial".to_string()),
        Just("premium".to_string()),
        Just("enterprise".to_string()),
        "[a-z]{1,12}",
    ]
}

/// Strategy for an account name paired with a different caller identity
pub fn owner_and_intruder_strategy() -> impl Strategy<Value = (String, String)> {
    (account_name_strategy(), account_name_strategy())
        .prop_filter("caller must differ from owner", |(owner, caller)| owner != caller)
}

//! Basic smoke test over the public API surface.

use contentgate::{GateConfig, GateRequest};

#[test]
fn crate_compiles() {
    // If this test runs, the public surface is wired up.
    let _ = std::any::type_name::<contentgate::AccessGate>();
    let _ = std::any::type_name::<contentgate::GateError>();
    let _ = std::any::type_name::<contentgate::TokenValidator>();
}

#[test]
fn default_config_is_usable() {
    let config = GateConfig::default();
    assert!(config.validate().is_ok());

    let request = GateRequest::new().with_bearer("tok");
    assert_eq!(
        contentgate::gate::extract_token(&request, &config.token_query_param, &config.token_cookie)
            .as_deref(),
        Some("tok")
    );
}

use std::env;

use serial_test::serial;
use stockroom::config::StockroomConfig;

const VARS: &[&str] = &[
    "STOCKROOM_SERVER_HOST",
    "STOCKROOM_SERVER_PORT",
    "STOCKROOM_DATABASE_URL",
    "STOCKROOM_LOGGING_ENABLED",
    "STOCKROOM_LOG_LEVEL",
    "STOCKROOM_JWT_SECRET",
    "STOCKROOM_JWT_ISSUER",
    "STOCKROOM_JWT_AUDIENCE",
    "STOCKROOM_TOKEN_EXPIRATION_SECS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_environment() {
    clear_env();

    let config = StockroomConfig::load().unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.database.url, "sqlite://stockroom.db");
    assert_eq!(config.auth.jwt_issuer, "stockroom");
    assert_eq!(config.auth.token_expiration_secs, 3600);

    // No secret configured: validation must refuse to start.
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env();
    env::set_var("STOCKROOM_SERVER_PORT", "9191");
    env::set_var("STOCKROOM_DATABASE_URL", "sqlite::memory:");
    env::set_var("STOCKROOM_LOG_LEVEL", "debug");
    env::set_var("STOCKROOM_JWT_SECRET", "env-secret");
    env::set_var("STOCKROOM_TOKEN_EXPIRATION_SECS", "120");

    let config = StockroomConfig::load().unwrap();

    assert_eq!(config.server.port, 9191);
    assert_eq!(config.database.url, "sqlite::memory:");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.auth.jwt_secret, "env-secret");
    assert_eq!(config.auth.token_expiration_secs, 120);
    assert!(config.validate().is_ok());

    clear_env();
}

#[test]
#[serial]
fn unparseable_numbers_fall_back() {
    clear_env();
    env::set_var("STOCKROOM_SERVER_PORT", "not-a-port");

    let config = StockroomConfig::load().unwrap();
    assert_eq!(config.server.port, 8080);

    clear_env();
}

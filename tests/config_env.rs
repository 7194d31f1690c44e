//! Configuration files and environment overrides
//!
//! Environment variables are process-wide, so these tests run serially.

use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

use onduty::config::{
    CalendarBackend, Config, ENV_GOOGLE_TOKEN, ENV_MAIL_SERVER, ENV_OPSGENIE_KEY, ENV_SLACK_TOKEN,
};

const CONFIG: &str = r#"
    generate_days = 14
    max_days_per_month = 6
    max_weekends_per_month = 2

    [calendar]
    oncall_calendar = "oncall@group.calendar.google.com"
    availability_calendar = "absent@group.calendar.google.com"

    [mail]
    server = "smtp.example.com:587"
    sender = "rotation@example.com"

    [opsgenie]
    api_key = "from-file"
    schedule_id = "sched"
    weekday_schedule = "weekday"
    weekend_schedule = "weekend"

    [[oncallers]]
    order = 0
    code = "ab"
    email = "ab@example.com"
    slack_id = "U100"

    [[oncallers]]
    order = 1
    code = "cd"
    email = "cd@example.com"
"#;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn clear_env() {
    for name in [ENV_GOOGLE_TOKEN, ENV_SLACK_TOKEN, ENV_OPSGENIE_KEY, ENV_MAIL_SERVER] {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_load_from_file() {
    clear_env();
    let file = config_file(CONFIG);

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.generate_days, 14);
    assert_eq!(config.calendar.backend, CalendarBackend::Google);
    assert_eq!(config.calendar.token, None);
    assert_eq!(config.mail.smtp.server, "smtp.example.com:587");
    assert_eq!(config.opsgenie.as_ref().unwrap().api_key, "from-file");
    assert!(config.slack.is_none());
    assert_eq!(config.roster().unwrap().codes(), vec!["ab", "cd"]);
}

#[test]
#[serial]
fn test_env_overrides_secrets() {
    clear_env();
    std::env::set_var(ENV_GOOGLE_TOKEN, "ya29.token");
    std::env::set_var(ENV_SLACK_TOKEN, "xoxb-env");
    std::env::set_var(ENV_OPSGENIE_KEY, "from-env");
    std::env::set_var(ENV_MAIL_SERVER, "relay.internal:25");
    let file = config_file(CONFIG);

    let config = Config::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.calendar.token.as_deref(), Some("ya29.token"));
    assert_eq!(config.slack.as_ref().unwrap().token, "xoxb-env");
    assert_eq!(config.opsgenie.as_ref().unwrap().api_key, "from-env");
    assert_eq!(config.mail.smtp.server, "relay.internal:25");
}

#[test]
#[serial]
fn test_blank_env_values_ignored() {
    clear_env();
    std::env::set_var(ENV_MAIL_SERVER, "   ");
    let file = config_file(CONFIG);

    let config = Config::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.mail.smtp.server, "smtp.example.com:587");
}

#[test]
#[serial]
fn test_invalid_file_is_rejected() {
    clear_env();

    let missing = Config::load("/nonexistent/onduty.toml".as_ref()).unwrap_err();
    assert!(missing.to_string().contains("Failed to read config file"));

    let file = config_file("generate_days = \"many\"");
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML config file"));

    // Opsgenie needs a schedule
    let file = config_file(&CONFIG.replace("schedule_id = \"sched\"", ""));
    assert!(Config::load(file.path()).is_err());
}

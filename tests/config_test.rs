//! Tests for config loading: file, environment overrides, validation

use serial_test::serial;
use sitesweep::config::Config;
use sitesweep::dispatcher::CheckCategory;
use std::io::Write;

const ENV_KEYS: &[&str] = &[
    "SITESWEEP_SITEMAP_URL",
    "SITEMAP_URL",
    "SITESWEEP_MAX_DEPTH",
    "SITESWEEP_AUTH_USERNAME",
    "SITESWEEP_AUTH_PASSWORD",
    "SITESWEEP_CONCURRENCY",
    "SITESWEEP_RUNNER",
    "SITESWEEP_DOMAIN",
    "DOMAIN",
    "SITESWEEP_WEBHOOK_URL",
    "SLACK_WEBHOOK",
    "SITESWEEP_SMTP_USER",
    "GMAIL_USER",
    "SITESWEEP_SMTP_PASSWORD",
    "GMAIL_PASS",
    "SITESWEEP_TWILIO_SID",
    "TWILIO_SID",
    "SITESWEEP_TWILIO_AUTH",
    "TWILIO_AUTH",
    "SITESWEEP_TWILIO_PHONE",
    "TWILIO_PHONE",
    "SITESWEEP_TO_PHONE",
    "TO_PHONE",
    "SITESWEEP_LOG_LEVEL",
    "SITESWEEP_LOG_FORMAT",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_defaults_without_file() {
    clear_env();
    let config = Config::load(Some(std::path::Path::new("/nonexistent/sitesweep.toml"))).unwrap();

    assert!(config.sitemap.url.is_none());
    assert_eq!(config.runner.program, "npx");
    assert_eq!(config.runner.concurrency, 1);
    assert_eq!(
        config.report.raw_dir,
        std::path::PathBuf::from("cypress/reports/mochawesome")
    );
    assert!(!config.notify.has_channels());
}

#[test]
#[serial]
fn test_file_then_env_override() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[sitemap]
url = "https://from-file.test/sitemap.xml"
max_depth = 4

[runner]
exclude = ["visual"]

[notify]
domain = "from-file.test"
"#
    )
    .unwrap();

    std::env::set_var("SITEMAP_URL", "https://from-env.test/sitemap_index.xml");
    std::env::set_var("SITESWEEP_CONCURRENCY", "4");
    std::env::set_var("DOMAIN", "from-env.test");

    let config = Config::load(Some(file.path())).unwrap();
    clear_env();

    assert_eq!(
        config.sitemap.url.as_deref(),
        Some("https://from-env.test/sitemap_index.xml")
    );
    assert_eq!(config.sitemap.max_depth, 4);
    assert_eq!(config.runner.concurrency, 4);
    assert_eq!(config.runner.exclude, vec![CheckCategory::Visual]);
    assert_eq!(config.notify.domain.as_deref(), Some("from-env.test"));
}

#[test]
#[serial]
fn test_legacy_channel_variables() {
    clear_env();
    std::env::set_var("SLACK_WEBHOOK", "https://hooks.slack.com/services/T/B/X");
    std::env::set_var("GMAIL_USER", "qa@example.com");
    std::env::set_var("GMAIL_PASS", "app-password");
    std::env::set_var("TWILIO_SID", "AC123");
    std::env::set_var("TWILIO_AUTH", "token");
    std::env::set_var("TWILIO_PHONE", "+15550001");
    std::env::set_var("TO_PHONE", "+15550002");

    let config = Config::from_env().unwrap();
    clear_env();

    let webhook = config.notify.webhook.expect("webhook configured");
    assert_eq!(webhook.url, "https://hooks.slack.com/services/T/B/X");

    let email = config.notify.email.expect("email configured");
    assert_eq!(email.username, "qa@example.com");
    assert_eq!(email.recipients(), vec!["qa@example.com".to_string()]);

    let sms = config.notify.sms.expect("sms configured");
    assert_eq!(sms.to, "+15550002");
    assert_eq!(
        sms.endpoint(),
        "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
    );
}

#[test]
#[serial]
fn test_incomplete_sms_variables_ignored() {
    clear_env();
    std::env::set_var("TWILIO_SID", "AC123");
    std::env::set_var("TWILIO_AUTH", "token");

    let config = Config::from_env().unwrap();
    clear_env();

    assert!(config.notify.sms.is_none());
}

#[test]
#[serial]
fn test_invalid_file_is_error() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runner]\nconcurrency = \"many\"").unwrap();

    assert!(Config::load(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_invalid_value_fails_validation() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runner]\nconcurrency = 0").unwrap();

    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(format!("{err:#}").contains("concurrency"));
}

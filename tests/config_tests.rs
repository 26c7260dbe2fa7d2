// Config loading and validation tests

use sitemonitor::config::AppConfig;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[server]
port = 8080
host = "0.0.0.0"

[database]
path = "data/sitemonitor.db"
max_pool_size = 4

[scheduler]
inter_target_delay_secs = 60
cycle_interval_secs = 600

[probe]
http_timeout_secs = 30
render_timeout_secs = 45
browser_enabled = false

[api]
recent_limit = 50

[targets]
sites = ["https://www.google.com", "https://www.bing.com", "http://localhost:8000/health"]
"#;

const MINIMAL_CONFIG: &str = r#"
[server]
port = 8080
host = "127.0.0.1"

[database]
path = "data/sitemonitor.db"

[targets]
sites = ["https://www.wikipedia.org"]
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.path, "data/sitemonitor.db");
    assert_eq!(config.database.max_pool_size, 4);
    assert_eq!(config.probe.render_timeout_secs, 45);
    assert!(!config.probe.browser_enabled);
    assert_eq!(config.targets.sites.len(), 3);
    assert_eq!(config.targets.sites[1], "https://www.bing.com");
}

#[test]
fn test_config_defaults_match_baseline_cadence() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("load_from_str");
    assert_eq!(config.database.max_pool_size, 5);
    assert_eq!(config.scheduler.inter_target_delay_secs, 60);
    assert_eq!(config.scheduler.cycle_interval_secs, 600);
    assert_eq!(config.probe.http_timeout_secs, 30);
    assert_eq!(config.probe.render_timeout_secs, 60);
    assert!(config.probe.browser_enabled);
    assert!(config.probe.chrome_executable.is_none());
    assert_eq!(config.api.recent_limit, 50);

    let sched = config.scheduler.to_scheduler_config();
    assert_eq!(sched.inter_target_delay, Duration::from_secs(60));
    assert_eq!(sched.cycle_interval, Duration::from_secs(600));
}

#[test]
fn test_config_accepts_stagger_longer_than_interval() {
    let cfg = VALID_CONFIG.replace("cycle_interval_secs = 600", "cycle_interval_secs = 30");
    let config = AppConfig::load_from_str(&cfg).expect("overfull cycle is allowed");
    let sched = config.scheduler.to_scheduler_config();
    assert_eq!(sched.idle_after_last_target(3), Duration::ZERO);
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8080", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/sitemonitor.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 4", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_zero_delay() {
    let bad = VALID_CONFIG.replace("inter_target_delay_secs = 60", "inter_target_delay_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("inter_target_delay_secs"));
}

#[test]
fn test_config_validation_rejects_zero_interval() {
    let bad = VALID_CONFIG.replace("cycle_interval_secs = 600", "cycle_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("cycle_interval_secs"));
}

#[test]
fn test_config_validation_rejects_schedule_longer_than_a_day() {
    let bad = VALID_CONFIG.replace("cycle_interval_secs = 600", "cycle_interval_secs = 9000000000000");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("cycle_interval_secs"));

    let bad = VALID_CONFIG.replace("inter_target_delay_secs = 60", "inter_target_delay_secs = 86401");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("inter_target_delay_secs"));

    let ok = VALID_CONFIG.replace("cycle_interval_secs = 600", "cycle_interval_secs = 86400");
    assert!(AppConfig::load_from_str(&ok).is_ok());
}

#[test]
fn test_config_validation_rejects_zero_timeouts() {
    let bad = VALID_CONFIG.replace("http_timeout_secs = 30", "http_timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("http_timeout_secs"));

    let bad = VALID_CONFIG.replace("render_timeout_secs = 45", "render_timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("render_timeout_secs"));
}

#[test]
fn test_config_validation_rejects_recent_limit_out_of_range() {
    let bad = VALID_CONFIG.replace("recent_limit = 50", "recent_limit = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("recent_limit"));

    let bad = VALID_CONFIG.replace("recent_limit = 50", "recent_limit = 5000");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("recent_limit"));
}

#[test]
fn test_config_validation_rejects_empty_targets() {
    let bad = MINIMAL_CONFIG.replace("sites = [\"https://www.wikipedia.org\"]", "sites = []");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("targets.sites"));
}

#[test]
fn test_config_validation_rejects_invalid_target_url() {
    let bad = MINIMAL_CONFIG.replace("https://www.wikipedia.org", "not a url");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("invalid URL"));

    let bad = MINIMAL_CONFIG.replace("https://www.wikipedia.org", "ftp://files.example.com");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("http or https"));
}

#[test]
fn test_config_validation_rejects_duplicate_targets() {
    let bad = MINIMAL_CONFIG.replace(
        "sites = [\"https://www.wikipedia.org\"]",
        "sites = [\"https://www.wikipedia.org\", \"https://www.wikipedia.org\"]",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn test_config_rejects_missing_targets_section() {
    let bad = MINIMAL_CONFIG.replace("[targets]", "").replace(
        "sites = [\"https://www.wikipedia.org\"]",
        "",
    );
    assert!(AppConfig::load_from_str(&bad).is_err());
}

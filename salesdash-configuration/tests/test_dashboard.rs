use std::time::Duration;

use pretty_assertions::assert_eq;
use salesdash::offload::TimeoutPolicy;
use salesdash::{CacheOptions, LoadingOptions, RetryPolicy, RetryPreset, StalePolicy};
use salesdash_configuration::{
    CachesConfig, ConfigError, DashboardConfig, HttpSourceConfig, OffloadSection, RetryConfig,
    RetrySection, TimeoutMode,
};

#[test]
fn test_empty_document_uses_defaults() {
    let config = DashboardConfig::from_yaml("{}").expect("failed to parse");
    assert_eq!(config, DashboardConfig::default());

    let options = config.coordinator_options().unwrap();
    assert_eq!(options.totals_retry, RetryPolicy::realtime());
    assert_eq!(options.breakdown_retry, RetryPolicy::background());
    assert_eq!(options.stale_policy, StalePolicy::Revalidate);
    assert_eq!(options.max_weeks, 10);
}

#[test]
fn test_full_document() {
    let yaml = r#"
upstream:
  base_url: "http://localhost:8080"
  totals_path: /v2/totals
  timeout: 10s
caches:
  daily:
    default_ttl: 1m
    max_entries: 60
    stale_while_revalidate: false
  monthly:
    default_ttl: 1h
    max_entries: 12
retry:
  totals:
    preset: interactive
  breakdown:
    preset: background
    max_attempts: 4
    base_delay: 250ms
    jitter: false
stale_policy: offload_revalidate
max_weeks: 6
loading:
  minimum_loading_time: 300ms
offload:
  timeout: 30s
  on_timeout: warn
"#;

    let config = DashboardConfig::from_yaml(yaml).expect("failed to parse");

    assert_eq!(
        config,
        DashboardConfig {
            upstream: Some(
                HttpSourceConfig::new("http://localhost:8080")
                    .totals_path("/v2/totals")
                    .timeout(Duration::from_secs(10))
            ),
            caches: CachesConfig {
                daily: CacheOptions {
                    default_ttl: Duration::from_secs(60),
                    max_entries: 60,
                    stale_while_revalidate: false,
                },
                weekly: CacheOptions::weekly(),
                monthly: CacheOptions {
                    default_ttl: Duration::from_secs(3600),
                    max_entries: 12,
                    stale_while_revalidate: false,
                },
            },
            retry: RetrySection {
                totals: RetryConfig::preset(RetryPreset::Interactive),
                breakdown: RetryConfig {
                    preset: RetryPreset::Background,
                    max_attempts: Some(4),
                    base_delay: Some(Duration::from_millis(250)),
                    jitter: Some(false),
                    ..RetryConfig::default()
                },
            },
            stale_policy: StalePolicy::OffloadRevalidate,
            max_weeks: 6,
            loading: LoadingOptions {
                minimum_loading_time: Duration::from_millis(300),
                settle_delay: Duration::from_millis(50),
            },
            offload: OffloadSection {
                timeout: Some(Duration::from_secs(30)),
                on_timeout: TimeoutMode::Warn,
                deduplicate: true,
            },
        }
    );

    let options = config.coordinator_options().unwrap();
    assert_eq!(options.totals_retry, RetryPolicy::interactive());
    assert_eq!(options.breakdown_retry.attempt_limit(), 4);
    assert_eq!(options.breakdown_retry.base_delay, Duration::from_millis(250));
    assert_eq!(options.breakdown_retry.max_delay, Duration::from_secs(60));
    assert!(!options.breakdown_retry.jitter);

    assert_eq!(
        config.offload.clone().into_offload_config().timeout_policy,
        TimeoutPolicy::Warn(Duration::from_secs(30))
    );
}

#[test]
fn test_out_of_range_attempts_rejected() {
    let yaml = r#"
retry:
  totals:
    max_attempts: 20
"#;
    let config = DashboardConfig::from_yaml(yaml).unwrap();
    let err = config.coordinator_options().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidMaxAttempts {
            section: "totals",
            value: 20
        }
    ));
}

#[test]
fn test_zero_capacity_rejected() {
    let yaml = r#"
upstream:
  base_url: "http://localhost:8080"
caches:
  weekly:
    default_ttl: 5m
    max_entries: 0
"#;
    let err = DashboardConfig::from_yaml(yaml)
        .unwrap()
        .into_coordinator()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroCapacity { cache: "weekly" }));
}

#[test]
fn test_zero_max_weeks_rejected() {
    let err = DashboardConfig::from_yaml("max_weeks: 0")
        .unwrap()
        .coordinator_options()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroMaxWeeks));
}

#[test]
fn test_client_requires_upstream() {
    let err = DashboardConfig::default().into_coordinator().unwrap_err();
    assert!(matches!(err, ConfigError::MissingUpstream));
}

#[test]
fn test_invalid_upstream_url() {
    let yaml = r#"
upstream:
  base_url: "not a url"
"#;
    let err = DashboardConfig::from_yaml(yaml)
        .unwrap()
        .into_coordinator()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Upstream(_)));
}

#[test]
fn test_unknown_preset_is_parse_error() {
    let yaml = r#"
retry:
  totals:
    preset: eventually
"#;
    let err = DashboardConfig::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[tokio::test]
async fn test_builds_query() {
    let yaml = r#"
upstream:
  base_url: "http://localhost:8080"
stale_policy: return
"#;
    let query = DashboardConfig::from_yaml(yaml)
        .unwrap()
        .into_query()
        .expect("failed to build query");

    assert_eq!(query.coordinator().caches().weekly().len(), 0);
    assert!(!query.state().is_loading);
}

#[test]
fn test_serialize_roundtrip() {
    let config = DashboardConfig {
        stale_policy: StalePolicy::Return,
        retry: RetrySection {
            totals: RetryConfig::preset(RetryPreset::Critical),
            ..RetrySection::default()
        },
        ..DashboardConfig::default()
    };
    let yaml = serde_saphyr::to_string(&config).expect("failed to serialize");
    assert_eq!(DashboardConfig::from_yaml(&yaml).unwrap(), config);
}

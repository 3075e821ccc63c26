mod common;

use ops_ledger::config::{Config, ConfigError, ConfigManager, StorageKind};

#[test]
fn missing_file_yields_defaults() {
    let manager = ConfigManager::with_base_dir(common::temp_dir()).unwrap();
    let config = manager.load().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.poll_interval_secs, 60);
    assert_eq!(config.reporting_currencies, vec!["USD", "EUR"]);
}

#[test]
fn saved_config_is_reloaded() {
    let base = common::temp_dir();
    let manager = ConfigManager::with_base_dir(base.clone()).unwrap();
    let config = Config {
        poll_interval_secs: 5,
        base_currency: "EUR".into(),
        reporting_currencies: vec!["EUR".into(), "UAH".into()],
        data_dir: Some(base.join("elsewhere")),
        storage: StorageKind::Memory,
    };
    manager.save(&config).unwrap();

    let reloaded = ConfigManager::with_base_dir(base.clone()).unwrap().load().unwrap();
    assert_eq!(reloaded, config);
    assert_eq!(manager.data_dir(&reloaded), base.join("elsewhere"));
    assert!(manager.path().ends_with("config/config.json"));
}

#[test]
fn default_data_dir_sits_under_base() {
    let base = common::temp_dir();
    let manager = ConfigManager::with_base_dir(base.clone()).unwrap();
    assert_eq!(manager.data_dir(&Config::default()), base.join("data"));
}

#[test]
fn invalid_config_is_not_saved() {
    let manager = ConfigManager::with_base_dir(common::temp_dir()).unwrap();
    let config = Config {
        base_currency: "dollars".into(),
        ..Config::default()
    };
    assert!(matches!(manager.save(&config), Err(ConfigError::Invalid(_))));
    assert!(!manager.path().exists());
}

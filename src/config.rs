use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::core_types::{Amount, DEFAULT_PROCESSING_DELAY_MS};
use crate::error::LabError;
use crate::scenario::TransferPlan;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

/// Initial state of one account
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub name: String,
    pub balance: Amount,
}

/// One scripted transfer step
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    /// Bounded join wait for the unguarded runner
    pub join_wait_ms: u64,
    /// Time the serialized runner keeps the gate after the transfer
    pub hold_ms: u64,
}

/// Account transfer scenario. Defaults are the three-account run
/// (A→B 100, B→A 200, C→A 1000).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    pub accounts: Vec<AccountConfig>,
    pub transfers: Vec<TransferConfig>,
    pub processing_delay_ms: u64,
    /// Extra wait after the last bounded join before inspecting balances
    pub settle_ms: u64,
    pub watchdog_interval_ms: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let account = |name: &str, balance| AccountConfig {
            name: name.to_string(),
            balance,
        };
        let transfer = |from: &str, to: &str, amount, wait_ms| TransferConfig {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            join_wait_ms: wait_ms,
            hold_ms: wait_ms,
        };
        Self {
            accounts: vec![
                account("Hangga", 1000),
                account("John", 1000),
                account("Alice", 2000),
            ],
            transfers: vec![
                transfer("Hangga", "John", 100, 10),
                transfer("John", "Hangga", 200, 20),
                transfer("Alice", "Hangga", 1000, 100),
            ],
            processing_delay_ms: DEFAULT_PROCESSING_DELAY_MS,
            settle_ms: 200,
            watchdog_interval_ms: 50,
        }
    }
}

impl ScenarioConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    /// Sum of all initial balances - the conserved total
    pub fn expected_total(&self) -> Amount {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    /// Convert the configured transfers into runnable plans
    pub fn plans(&self) -> Vec<TransferPlan> {
        self.transfers
            .iter()
            .map(|t| {
                TransferPlan::new(&t.from, &t.to, t.amount)
                    .with_join_wait(Duration::from_millis(t.join_wait_ms))
                    .with_hold(Duration::from_millis(t.hold_ms))
            })
            .collect()
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, LabError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| LabError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;
        Self::parse(&content, &config_path)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, LabError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, path: &str) -> Result<Self, LabError> {
        serde_yaml::from_str(content).map_err(|source| LabError::ConfigParse {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: lab.log
use_json: false
rotation: never
"#;

    #[test]
    fn test_minimal_config_uses_default_scenario() {
        let config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.scenario.accounts.len(), 3);
        assert_eq!(config.scenario.expected_total(), 4000);
        assert_eq!(config.scenario.processing_delay_ms, 10);
    }

    #[test]
    fn test_default_plans_keep_config_order() {
        let plans = ScenarioConfig::default().plans();
        let steps: Vec<_> = plans
            .iter()
            .map(|p| (p.from.as_str(), p.to.as_str(), p.amount))
            .collect();
        assert_eq!(
            steps,
            vec![
                ("Hangga", "John", 100),
                ("John", "Hangga", 200),
                ("Alice", "Hangga", 1000),
            ]
        );
        assert_eq!(plans[2].join_wait, Duration::from_millis(100));
        assert_eq!(plans[1].hold, Duration::from_millis(20));
    }

    #[test]
    fn test_custom_scenario() {
        let yaml = format!(
            "{}{}",
            MINIMAL,
            r#"
scenario:
  accounts:
    - { name: A, balance: 50 }
    - { name: B, balance: 0 }
  transfers:
    - { from: A, to: B, amount: 20, join_wait_ms: 5, hold_ms: 1 }
  processing_delay_ms: 1
  settle_ms: 10
  watchdog_interval_ms: 5
"#
        );
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.scenario.expected_total(), 50);
        assert_eq!(config.scenario.plans().len(), 1);
        assert_eq!(config.scenario.processing_delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_parse_error() {
        let err = AppConfig::from_yaml_str("log_level: [").unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE");
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("does-not-exist").unwrap_err();
        assert_eq!(err.code(), "CONFIG_READ");
    }
}

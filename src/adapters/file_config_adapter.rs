//! INI configuration adapter.
//!
//! Section and key names are case-insensitive. Numeric getters fall back to
//! the caller's default on absent or unparsable values; `validate_config`
//! is what turns bad values into errors.

use crate::domain::config_validation::parse_bool;
use crate::domain::error::RiskoffError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RiskoffError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| RiskoffError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, RiskoffError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| RiskoffError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// An empty configuration: every lookup takes its default.
    pub fn defaults() -> Self {
        Self { config: Ini::new() }
    }

    fn parsed<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        self.config
            .get(section, key)
            .and_then(|raw| raw.trim().parse::<T>().ok())
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.parsed(section, key).unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.parsed(section, key).unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn sections_and_keys_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string(
            "[Data]\nSymbol = QQQ\n[INDICATORS]\nLong_Window = 50\ndeviation_threshold = 0.025\n",
        )
        .unwrap();
        assert_eq!(adapter.get_string("data", "symbol"), Some("QQQ".to_string()));
        assert_eq!(adapter.get_int("indicators", "long_window", 30), 50);
        assert_eq!(adapter.get_double("indicators", "deviation_threshold", 0.03), 0.025);
    }

    #[test]
    fn absent_keys_take_defaults() {
        let adapter = FileConfigAdapter::defaults();
        assert_eq!(adapter.get_string("backtest", "cooldown_days"), None);
        assert_eq!(adapter.get_int("backtest", "cooldown_days", 5), 5);
        assert_eq!(adapter.get_double("backtest", "risk_free_rate", 0.0), 0.0);
        assert!(adapter.get_bool("sweep", "parallel", true));
    }

    #[test]
    fn unparsable_numbers_take_defaults() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ncooldown_days = abc\nrisk_free_rate = lots\n",
        )
        .unwrap();
        assert_eq!(adapter.get_int("backtest", "cooldown_days", 5), 5);
        assert_eq!(adapter.get_double("backtest", "risk_free_rate", 0.01), 0.01);
        // The raw text stays visible for validation.
        assert_eq!(
            adapter.get_string("backtest", "cooldown_days"),
            Some("abc".to_string())
        );
    }

    #[test]
    fn bool_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[sweep]\na = true\nb = yes\nc = 0\nd = No\ne = maybe\n")
                .unwrap();
        assert!(adapter.get_bool("sweep", "a", false));
        assert!(adapter.get_bool("sweep", "b", false));
        assert!(!adapter.get_bool("sweep", "c", true));
        assert!(!adapter.get_bool("sweep", "d", true));
        assert!(adapter.get_bool("sweep", "e", true));
    }

    #[test]
    fn from_file_reads_sections() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[output]\ndir = /tmp/riskoff\n[sweep]\ndeviation_pcts = 1, 2.5\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("output", "dir"), Some("/tmp/riskoff".to_string()));
        assert_eq!(
            adapter.get_string("sweep", "deviation_pcts"),
            Some("1, 2.5".to_string())
        );
    }

    #[test]
    fn missing_file_is_parse_error_naming_path() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/riskoff.ini").unwrap_err();
        match err {
            RiskoffError::ConfigParse { file, .. } => {
                assert_eq!(file, "/nonexistent/path/riskoff.ini")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

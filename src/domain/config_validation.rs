//! Configuration validation.
//!
//! Every key is optional; a present key must parse and fall within range.
//! Runs before any data is read.

use std::str::FromStr;

use crate::domain::error::RiskoffError;
use crate::domain::market_query::{Interval, Period};
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), RiskoffError> {
    validate_data_config(config)?;
    validate_indicator_config(config)?;
    validate_backtest_config(config)?;
    validate_evaluation_config(config)?;
    validate_sweep_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RiskoffError> {
    non_blank(config, "data", "symbol")?;
    non_blank(config, "data", "price_column")?;
    non_blank(config, "data", "dir")?;
    if let Some(raw) = config.get_string("data", "period") {
        raw.parse::<Period>()
            .map_err(|e| invalid("data", "period", e.to_string()))?;
    }
    if let Some(raw) = config.get_string("data", "interval") {
        raw.parse::<Interval>()
            .map_err(|e| invalid("data", "interval", e.to_string()))?;
    }
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), RiskoffError> {
    positive_int(config, "indicators", "short_window")?;
    positive_int(config, "indicators", "long_window")?;
    positive_int(config, "indicators", "volatility_window")?;
    if let Some(value) = number::<f64>(config, "indicators", "deviation_threshold")? {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(
                "indicators",
                "deviation_threshold",
                "deviation_threshold must be a non-negative fraction",
            ));
        }
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), RiskoffError> {
    positive_int(config, "backtest", "cooldown_days")?;
    if let Some(value) = number::<f64>(config, "backtest", "risk_free_rate")? {
        if !(0.0..1.0).contains(&value) {
            return Err(invalid(
                "backtest",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

pub fn validate_evaluation_config(config: &dyn ConfigPort) -> Result<(), RiskoffError> {
    positive_int(config, "evaluation", "horizon_days")?;
    Ok(())
}

pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(), RiskoffError> {
    if let Some(raw) = config.get_string("sweep", "deviation_pcts") {
        let pcts: Vec<f64> =
            parse_list(&raw).map_err(|reason| invalid("sweep", "deviation_pcts", reason))?;
        if pcts.is_empty() {
            return Err(invalid("sweep", "deviation_pcts", "list is empty"));
        }
        if pcts.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(invalid(
                "sweep",
                "deviation_pcts",
                "percentages must be non-negative",
            ));
        }
    }
    if let Some(raw) = config.get_string("sweep", "cooldown_days") {
        let days: Vec<usize> =
            parse_list(&raw).map_err(|reason| invalid("sweep", "cooldown_days", reason))?;
        if days.is_empty() {
            return Err(invalid("sweep", "cooldown_days", "list is empty"));
        }
        if days.contains(&0) {
            return Err(invalid(
                "sweep",
                "cooldown_days",
                "cooldowns must be at least 1",
            ));
        }
    }
    number::<usize>(config, "sweep", "min_signals")?;
    if let Some(raw) = config.get_string("sweep", "parallel") {
        if parse_bool(&raw).is_none() {
            return Err(invalid("sweep", "parallel", "expected true or false"));
        }
    }
    Ok(())
}

/// Parses a comma-separated list, ignoring blank entries.
pub fn parse_list<T: FromStr>(raw: &str) -> Result<Vec<T>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|_| format!("'{}' is not a valid list entry", item))
        })
        .collect()
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RiskoffError {
    RiskoffError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, RiskoffError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not a valid number", raw))),
    }
}

fn positive_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), RiskoffError> {
    match number::<i64>(config, section, key)? {
        Some(value) if value < 1 => Err(invalid(
            section,
            key,
            format!("{} must be a positive integer", key),
        )),
        _ => Ok(()),
    }
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), RiskoffError> {
    match config.get_string(section, key) {
        Some(s) if s.trim().is_empty() => Err(invalid(section, key, "value is empty")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn assert_invalid(content: &str, expected_key: &str) {
        let err = validate_config(&make_config(content)).unwrap_err();
        assert!(
            matches!(&err, RiskoffError::ConfigInvalid { key, .. } if key == expected_key),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[data]
dir = data
symbol = SPY
period = 2y
interval = 1d
price_column = adj_close

[indicators]
short_window = 10
long_window = 30
volatility_window = 20
deviation_threshold = 0.03

[backtest]
cooldown_days = 5
risk_free_rate = 0.02

[evaluation]
horizon_days = 5

[sweep]
deviation_pcts = 1, 2, 3, 4
cooldown_days = 1,3,5
min_signals = 10
parallel = false
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_config_uses_defaults() {
        assert!(validate_config(&make_config("")).is_ok());
    }

    #[test]
    fn zero_window_fails() {
        assert_invalid("[indicators]\nlong_window = 0\n", "long_window");
    }

    #[test]
    fn non_numeric_window_fails() {
        assert_invalid("[indicators]\nshort_window = ten\n", "short_window");
    }

    #[test]
    fn negative_threshold_fails() {
        assert_invalid(
            "[indicators]\ndeviation_threshold = -0.01\n",
            "deviation_threshold",
        );
    }

    #[test]
    fn zero_cooldown_fails() {
        assert_invalid("[backtest]\ncooldown_days = 0\n", "cooldown_days");
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        assert_invalid("[backtest]\nrisk_free_rate = 1.5\n", "risk_free_rate");
        assert_invalid("[backtest]\nrisk_free_rate = -0.05\n", "risk_free_rate");
    }

    #[test]
    fn zero_horizon_fails() {
        assert_invalid("[evaluation]\nhorizon_days = 0\n", "horizon_days");
    }

    #[test]
    fn bad_period_and_interval_fail() {
        assert_invalid("[data]\nperiod = 3q\n", "period");
        assert_invalid("[data]\ninterval = 1h\n", "interval");
    }

    #[test]
    fn blank_symbol_fails() {
        assert_invalid("[data]\nsymbol =   \n", "symbol");
    }

    #[test]
    fn sweep_lists_are_checked() {
        assert_invalid("[sweep]\ndeviation_pcts = 1, x, 3\n", "deviation_pcts");
        assert_invalid("[sweep]\ndeviation_pcts = 1, -2\n", "deviation_pcts");
        assert_invalid("[sweep]\ncooldown_days = 5, 0\n", "cooldown_days");
        assert_invalid("[sweep]\ncooldown_days = ,\n", "cooldown_days");
        assert_invalid("[sweep]\nmin_signals = -1\n", "min_signals");
        assert_invalid("[sweep]\nparallel = maybe\n", "parallel");
    }

    #[test]
    fn parse_list_skips_blanks() {
        let values: Vec<usize> = parse_list("1, 3,,5 ,").unwrap();
        assert_eq!(values, vec![1, 3, 5]);
        assert!(parse_list::<usize>("1, two").is_err());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("sometimes"), None);
    }
}

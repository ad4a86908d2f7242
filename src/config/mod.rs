// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use tracing_subscriber::filter::LevelFilter;

use crate::shim::econ::TokenAmount;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub fees: FeeConfig,
    pub wdpost: WdPostConfig,
    pub log: LogConfig,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, smart_default::SmartDefault)]
#[serde(default)]
pub struct FeeConfig {
    /// Upper bound of the gas fee of every Window PoSt message, in attoFIL.
    #[default(TokenAmount::from_whole(5))]
    #[serde(with = "token_amount_atto")]
    pub max_window_post_gas_fee: TokenAmount,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, smart_default::SmartDefault)]
#[serde(default)]
pub struct WdPostConfig {
    /// Number of epochs a message must be on chain before its receipt is
    /// trusted.
    #[default(5)]
    pub message_confidence: i64,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct LogLevelFilter(pub LevelFilter);

impl Serialize for LogLevelFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for LogLevelFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // Case insensitive.
        LevelFilter::from_str(&s)
            .map(Self)
            .map_err(|_| D::Error::custom(format!("unknown log level filter `{s}`")))
    }
}

impl fmt::Display for LogLevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct LogValue {
    pub module: String,
    pub level: LogLevelFilter,
}

impl LogValue {
    pub fn new(module: &str, level: LevelFilter) -> Self {
        Self {
            module: module.to_string(),
            level: LogLevelFilter(level),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub filters: Vec<LogValue>,
    /// Directory of the hourly rotated log files. No file logging if unset.
    pub log_dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn to_filter_string(&self) -> String {
        self.filters
            .iter()
            .map(|f| format!("{}={}", f.module, f.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filters: vec![
                LogValue::new("bellperson", LevelFilter::WARN),
                LogValue::new("filecoin_proofs", LevelFilter::WARN),
                LogValue::new("storage_proofs_core", LevelFilter::WARN),
            ],
            log_dir: None,
        }
    }
}

/// Token amounts are written as attoFIL strings, TOML integers are too narrow.
mod token_amount_atto {
    use std::str::FromStr as _;

    use num_bigint::BigInt;
    use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

    use crate::shim::econ::TokenAmount;

    pub fn serialize<S: Serializer>(
        amount: &TokenAmount,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.atto().to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<TokenAmount, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigInt::from_str(&s)
            .map(TokenAmount::from_atto)
            .map_err(|e| D::Error::custom(format!("invalid attoFIL amount `{s}`: {e}")))
    }
}

pub fn read_toml<S>(toml_string: &str) -> anyhow::Result<S>
where
    for<'de> S: serde::de::Deserialize<'de>,
{
    let new_struct: S = toml::from_str(toml_string)?;
    Ok(new_struct)
}

/// Reads the configuration at `path`, or the defaults when no path is given.
pub fn read_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let toml = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            read_toml(&toml).with_context(|| format!("parsing config file {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

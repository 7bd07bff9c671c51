use std::{
    env, fmt,
    net::{AddrParseError, SocketAddr},
};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REPLAY_OUTPUT_PATH: &str = "artifacts/replay.csv";
const DEFAULT_WALLET_SUPPLY_LIMIT_PCT: f64 = 70.0;
const DEFAULT_MAX_OPERATIONS: u64 = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub replay_output_path: String,
    pub wallet_supply_limit_pct: f64,
    pub max_operations: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidListenAddr(AddrParseError),
    InvalidReplayOutputPath,
    InvalidWalletSupplyLimitPct,
    InvalidMaxOperations,
    NonUnicodeListenAddr,
    NonUnicodeReplayOutput,
    NonUnicodeWalletSupplyLimitPct,
    NonUnicodeMaxOperations,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidListenAddr(err) => {
                write!(f, "LOOP_SERVER_ADDR is not a valid socket address: {err}")
            }
            Self::InvalidReplayOutputPath => {
                write!(
                    f,
                    "LOOP_SERVER_REPLAY_OUTPUT must not be empty or whitespace"
                )
            }
            Self::InvalidWalletSupplyLimitPct => {
                write!(
                    f,
                    "LOOP_WALLET_SUPPLY_LIMIT_PCT must be a finite percentage between 0 and 100"
                )
            }
            Self::InvalidMaxOperations => {
                write!(f, "LOOP_MAX_OPERATIONS must be a positive integer")
            }
            Self::NonUnicodeListenAddr => {
                write!(f, "LOOP_SERVER_ADDR contains non-unicode data")
            }
            Self::NonUnicodeReplayOutput => {
                write!(f, "LOOP_SERVER_REPLAY_OUTPUT contains non-unicode data")
            }
            Self::NonUnicodeWalletSupplyLimitPct => {
                write!(f, "LOOP_WALLET_SUPPLY_LIMIT_PCT contains non-unicode data")
            }
            Self::NonUnicodeMaxOperations => {
                write!(f, "LOOP_MAX_OPERATIONS contains non-unicode data")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidListenAddr(err) => Some(err),
            Self::InvalidReplayOutputPath => None,
            Self::InvalidWalletSupplyLimitPct => None,
            Self::InvalidMaxOperations => None,
            Self::NonUnicodeListenAddr => None,
            Self::NonUnicodeReplayOutput => None,
            Self::NonUnicodeWalletSupplyLimitPct => None,
            Self::NonUnicodeMaxOperations => None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = match env::var("LOOP_SERVER_ADDR") {
            Ok(value) => value.parse().map_err(ConfigError::InvalidListenAddr)?,
            Err(env::VarError::NotPresent) => DEFAULT_LISTEN_ADDR
                .parse()
                .expect("default listen address must be valid"),
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::NonUnicodeListenAddr);
            }
        };

        let replay_output_path = match env::var("LOOP_SERVER_REPLAY_OUTPUT") {
            Ok(value) => {
                if value.trim().is_empty() {
                    return Err(ConfigError::InvalidReplayOutputPath);
                }
                value
            }
            Err(env::VarError::NotPresent) => DEFAULT_REPLAY_OUTPUT_PATH.to_owned(),
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::NonUnicodeReplayOutput);
            }
        };

        let wallet_supply_limit_pct = match env::var("LOOP_WALLET_SUPPLY_LIMIT_PCT") {
            Ok(value) => {
                let parsed = match value.parse::<f64>() {
                    Ok(parsed) => parsed,
                    Err(_) => return Err(ConfigError::InvalidWalletSupplyLimitPct),
                };
                if !parsed.is_finite() || parsed <= 0.0 || parsed > 100.0 {
                    return Err(ConfigError::InvalidWalletSupplyLimitPct);
                }
                parsed
            }
            Err(env::VarError::NotPresent) => DEFAULT_WALLET_SUPPLY_LIMIT_PCT,
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::NonUnicodeWalletSupplyLimitPct);
            }
        };

        let max_operations = match env::var("LOOP_MAX_OPERATIONS") {
            Ok(value) => {
                let parsed = match value.parse::<u64>() {
                    Ok(parsed) => parsed,
                    Err(_) => return Err(ConfigError::InvalidMaxOperations),
                };
                if parsed == 0 {
                    return Err(ConfigError::InvalidMaxOperations);
                }
                parsed
            }
            Err(env::VarError::NotPresent) => DEFAULT_MAX_OPERATIONS,
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::NonUnicodeMaxOperations);
            }
        };

        Ok(Self {
            listen_addr,
            replay_output_path,
            wallet_supply_limit_pct,
            max_operations,
        })
    }
}

//! Consensus parameters and the proof-of-work algorithm schedule.
//!
//! Ferrite switches algorithms along the height axis:
//!
//! - SHA256d hashes the genesis block and everything before the FerroHash
//!   fork height.
//! - FerroHash, the memory-hard primary algorithm, activates at
//!   `ferrohash_fork_height` and rotates its key every
//!   `ferrohash_key_interval` blocks.
//! - Argon2id is the dormant emergency fallback. It activates only if a
//!   later hard fork sets `argon2_emergency_height`, and it strictly
//!   preempts FerroHash, so a compromised primary can be retired with a
//!   single parameter change rather than a code path.
//!
//! Every other component asks [`ConsensusParams::pow_algorithm`] rather
//! than comparing heights itself; algorithm naming never crosses this
//! boundary.

use ferrite_primitives::Hash256;
use std::fmt;

/// The proof-of-work algorithm active at a height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowAlgorithm {
    /// Double SHA-256. Genesis and pre-fork blocks.
    Sha256d,
    /// The key-rotated memory-hard primary algorithm.
    Ferrohash,
    /// The Argon2id emergency fallback.
    Argon2id,
}

impl PowAlgorithm {
    /// Human-readable name for logs and RPC.
    pub fn name(&self) -> &'static str {
        match self {
            PowAlgorithm::Sha256d => "SHA256d",
            PowAlgorithm::Ferrohash => "FerroHash",
            PowAlgorithm::Argon2id => "Argon2id",
        }
    }
}

impl fmt::Display for PowAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error when constructing [`ConsensusParams`] from configuration.
#[derive(Debug, Clone)]
pub struct ConsensusParamsError {
    /// The field that is missing or invalid.
    pub field: &'static str,
    /// Description of the error.
    pub message: String,
}

impl fmt::Display for ConsensusParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConsensusParams error for '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ConsensusParamsError {}

/// Configuration for loading [`ConsensusParams`] for a custom network.
///
/// All fields are optional so partial configs can be validated with
/// errors naming the missing field. Limits are the big-endian hex string
/// form; an empty `ferrohash_limit_hex`/`argon2_limit_hex` means "null,
/// use the fallback chain".
#[derive(Debug, Clone, Default)]
pub struct ConsensusParamsConfig {
    /// SHA256d proof-of-work limit as hex. Required, must be nonzero.
    pub sha256d_limit_hex: Option<String>,
    /// FerroHash proof-of-work limit as hex (None or empty = null).
    pub ferrohash_limit_hex: Option<String>,
    /// Argon2id proof-of-work limit as hex (None or empty = null).
    pub argon2_limit_hex: Option<String>,
    /// Height at which FerroHash activates.
    pub ferrohash_fork_height: Option<i32>,
    /// Blocks between FerroHash key rotations.
    pub ferrohash_key_interval: Option<i32>,
    /// Height at which the Argon2id emergency activates (-1 = never).
    pub argon2_emergency_height: Option<i32>,
    /// Argon2id memory cost in KiB.
    pub argon2_memory_kib: Option<u32>,
    /// Argon2id iteration count.
    pub argon2_time_cost: Option<u32>,
    /// Argon2id parallelism factor.
    pub argon2_parallelism: Option<u32>,
    /// Target block spacing in seconds.
    pub target_spacing: Option<i64>,
    /// Retarget window in seconds.
    pub target_timespan: Option<i64>,
    /// Permit minimum-difficulty blocks after a long gap (test networks).
    pub allow_min_difficulty_blocks: Option<bool>,
    /// Disable retargeting entirely (regression testing).
    pub no_retargeting: Option<bool>,
}

/// Parameters that influence chain consensus.
#[derive(Debug, Clone)]
pub struct ConsensusParams {
    /// Proof-of-work limit for SHA256d blocks. Always non-null.
    pub sha256d_limit: Hash256,
    /// Proof-of-work limit for FerroHash blocks. The limit resets at the
    /// fork so difficulty can find its level under the new algorithm.
    /// Null falls back to `sha256d_limit`.
    pub ferrohash_limit: Hash256,
    /// Proof-of-work limit for Argon2id blocks. Null falls back to
    /// `ferrohash_limit`.
    pub argon2_limit: Hash256,

    /// Height at which FerroHash activates.
    pub ferrohash_fork_height: i32,
    /// How often the FerroHash key rotates, in blocks.
    pub ferrohash_key_interval: i32,

    /// Height at which the Argon2id emergency activates. -1 means never;
    /// this stays -1 unless the primary algorithm is compromised.
    pub argon2_emergency_height: i32,
    /// Argon2id memory cost in KiB.
    pub argon2_memory_kib: u32,
    /// Argon2id iteration count.
    pub argon2_time_cost: u32,
    /// Argon2id parallelism factor.
    pub argon2_parallelism: u32,

    /// Target block spacing in seconds.
    pub target_spacing: i64,
    /// Retarget window in seconds.
    pub target_timespan: i64,
    /// Permit minimum-difficulty blocks after a `2 * target_spacing` gap.
    pub allow_min_difficulty_blocks: bool,
    /// Keep the target constant regardless of block times.
    pub no_retargeting: bool,
}

impl ConsensusParams {
    /// Mainnet parameters.
    pub fn mainnet() -> Self {
        ConsensusParams {
            sha256d_limit: Hash256::from_hex(
                "00000000ffff0000000000000000000000000000000000000000000000000000",
            )
            .expect("valid mainnet sha256d limit"),
            ferrohash_limit: Hash256::from_hex(
                "0000ffff00000000000000000000000000000000000000000000000000000000",
            )
            .expect("valid mainnet ferrohash limit"),
            // Null: the emergency inherits the FerroHash limit unless a
            // fork sets its own.
            argon2_limit: Hash256::ZERO,
            ferrohash_fork_height: 57_500,
            ferrohash_key_interval: 32,
            argon2_emergency_height: -1,
            argon2_memory_kib: 1 << 21, // 2 GiB, matching the primary's working set
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            target_spacing: 600,
            target_timespan: 14 * 24 * 60 * 60,
            allow_min_difficulty_blocks: false,
            no_retargeting: false,
        }
    }

    /// Regression-test parameters: instant fork, permissive limits, no
    /// retargeting.
    pub fn regtest() -> Self {
        let permissive = Hash256::from_hex(
            "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        )
        .expect("valid regtest limit");
        ConsensusParams {
            sha256d_limit: permissive,
            ferrohash_limit: permissive,
            argon2_limit: permissive,
            ferrohash_fork_height: 1,
            ferrohash_key_interval: 32,
            argon2_emergency_height: -1,
            argon2_memory_kib: 64,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            target_spacing: 600,
            target_timespan: 14 * 24 * 60 * 60,
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
        }
    }

    /// Load parameters from configuration, naming the field on error.
    pub fn from_config(config: &ConsensusParamsConfig) -> Result<Self, ConsensusParamsError> {
        fn required<T: Copy>(
            value: Option<T>,
            field: &'static str,
        ) -> Result<T, ConsensusParamsError> {
            value.ok_or(ConsensusParamsError {
                field,
                message: "required field missing".to_string(),
            })
        }

        fn limit(
            value: &Option<String>,
            field: &'static str,
        ) -> Result<Hash256, ConsensusParamsError> {
            match value.as_deref().map(str::trim) {
                None | Some("") => Ok(Hash256::ZERO),
                Some(hex) => {
                    let hex = hex
                        .strip_prefix("0x")
                        .or_else(|| hex.strip_prefix("0X"))
                        .unwrap_or(hex);
                    Hash256::from_hex(hex).map_err(|e| ConsensusParamsError {
                        field,
                        message: e.to_string(),
                    })
                }
            }
        }

        let sha256d_limit = limit(&config.sha256d_limit_hex, "sha256d_limit_hex")?;
        if sha256d_limit.is_null() {
            return Err(ConsensusParamsError {
                field: "sha256d_limit_hex",
                message: "limit must be present and nonzero".to_string(),
            });
        }

        let key_interval = required(config.ferrohash_key_interval, "ferrohash_key_interval")?;
        if key_interval <= 0 {
            return Err(ConsensusParamsError {
                field: "ferrohash_key_interval",
                message: format!("must be positive, got {key_interval}"),
            });
        }

        let target_spacing = required(config.target_spacing, "target_spacing")?;
        let target_timespan = required(config.target_timespan, "target_timespan")?;
        if target_spacing <= 0 || target_timespan < target_spacing {
            return Err(ConsensusParamsError {
                field: "target_spacing",
                message: format!(
                    "spacing {target_spacing} and timespan {target_timespan} must satisfy \
                     0 < spacing <= timespan"
                ),
            });
        }

        Ok(ConsensusParams {
            sha256d_limit,
            ferrohash_limit: limit(&config.ferrohash_limit_hex, "ferrohash_limit_hex")?,
            argon2_limit: limit(&config.argon2_limit_hex, "argon2_limit_hex")?,
            ferrohash_fork_height: required(
                config.ferrohash_fork_height,
                "ferrohash_fork_height",
            )?,
            ferrohash_key_interval: key_interval,
            argon2_emergency_height: config.argon2_emergency_height.unwrap_or(-1),
            argon2_memory_kib: required(config.argon2_memory_kib, "argon2_memory_kib")?,
            argon2_time_cost: required(config.argon2_time_cost, "argon2_time_cost")?,
            argon2_parallelism: required(config.argon2_parallelism, "argon2_parallelism")?,
            target_spacing,
            target_timespan,
            allow_min_difficulty_blocks: config.allow_min_difficulty_blocks.unwrap_or(false),
            no_retargeting: config.no_retargeting.unwrap_or(false),
        })
    }

    /// Blocks between difficulty adjustments.
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.target_timespan / self.target_spacing
    }

    /// Whether the Argon2id emergency fallback is active at `height`.
    pub fn is_argon2_emergency_active(&self, height: i32) -> bool {
        self.argon2_emergency_height >= 0 && height >= self.argon2_emergency_height
    }

    /// Whether FerroHash is the active algorithm at `height`.
    pub fn is_ferrohash_active(&self, height: i32) -> bool {
        height >= self.ferrohash_fork_height && !self.is_argon2_emergency_active(height)
    }

    /// The proof-of-work algorithm for `height`. Total for every
    /// non-negative height up to `i32::MAX`.
    pub fn pow_algorithm(&self, height: i32) -> PowAlgorithm {
        if self.is_argon2_emergency_active(height) {
            PowAlgorithm::Argon2id
        } else if self.is_ferrohash_active(height) {
            PowAlgorithm::Ferrohash
        } else {
            PowAlgorithm::Sha256d
        }
    }

    /// The proof-of-work limit for the algorithm active at `height`.
    ///
    /// Null limits fall back down the chain: a null Argon2 limit borrows
    /// the FerroHash limit, a null FerroHash limit borrows the SHA256d
    /// limit, and the SHA256d limit is always non-null.
    pub fn active_pow_limit(&self, height: i32) -> &Hash256 {
        match self.pow_algorithm(height) {
            PowAlgorithm::Argon2id => {
                if self.argon2_limit.is_null() {
                    self.ferrohash_fallback_limit()
                } else {
                    &self.argon2_limit
                }
            }
            PowAlgorithm::Ferrohash => self.ferrohash_fallback_limit(),
            PowAlgorithm::Sha256d => &self.sha256d_limit,
        }
    }

    fn ferrohash_fallback_limit(&self) -> &Hash256 {
        if self.ferrohash_limit.is_null() {
            &self.sha256d_limit
        } else {
            &self.ferrohash_limit
        }
    }

    /// The height of the block whose hash keys FerroHash at `height`.
    ///
    /// The key rotates every `ferrohash_key_interval` blocks and lags one
    /// full interval, so validators have the key block long before it is
    /// used. With interval 32:
    ///
    /// - heights 0..=63 key on block 0 (genesis)
    /// - heights 64..=95 key on block 32
    /// - heights 96..=127 key on block 64
    ///
    /// Early heights collapsing to genesis is a documented bootstrap
    /// trade-off.
    pub fn ferrohash_key_height(&self, height: i32) -> i32 {
        let key_height = (height / self.ferrohash_key_interval) * self.ferrohash_key_interval
            - self.ferrohash_key_interval;
        key_height.max(0)
    }
}

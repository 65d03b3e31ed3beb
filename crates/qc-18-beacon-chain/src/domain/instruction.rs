//! Instruction codec.
//!
//! Instructions travel as flat, positional lists of strings whose first
//! element is the kind tag. The raw lists are what gets hashed, so parsing
//! here is one-way: the typed form drives the state transition and
//! [`Instruction::to_fields`] reproduces the exact wire order for
//! instructions the node builds itself.

use shared_types::{CommitteeKey, ShardId};
use std::fmt;
use thiserror::Error;

pub const STAKE: &str = "stake";
pub const SWAP: &str = "swap";
pub const RANDOM: &str = "random";
pub const UNSTAKE: &str = "unstake";
pub const STOP_AUTO_STAKE: &str = "stopautostake";
pub const RETURN_STAKE: &str = "returnstaking";
pub const SET: &str = "set";
pub const DEL: &str = "del";

const BEACON_CHAIN: &str = "beacon";
const SHARD_CHAIN: &str = "shard";

/// Instruction rejected by sanity validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstructionError {
    #[error("empty instruction")]
    Empty,

    #[error("{kind}: expected {expected} fields, got {actual}")]
    FieldCount {
        kind: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("{kind}: {field} has {actual} entries, expected {expected}")]
    Cardinality {
        kind: &'static str,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{kind}: key list is empty")]
    NoKeys { kind: &'static str },

    #[error("malformed key {0:?}")]
    MalformedKey(String),

    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("unknown chain {0:?}")]
    InvalidChain(String),

    #[error("auto-stake flag must be true or false, got {0:?}")]
    InvalidFlag(String),
}

impl InstructionError {
    /// Stable label for metrics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::FieldCount { .. } => "field_count",
            Self::Cardinality { .. } => "cardinality",
            Self::NoKeys { .. } => "no_keys",
            Self::MalformedKey(_) => "malformed_key",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::InvalidChain(_) => "invalid_chain",
            Self::InvalidFlag(_) => "invalid_flag",
        }
    }
}

/// Which chain a stake targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeChain {
    Beacon,
    Shard,
}

impl StakeChain {
    fn as_str(self) -> &'static str {
        match self {
            Self::Beacon => BEACON_CHAIN,
            Self::Shard => SHARD_CHAIN,
        }
    }
}

/// Which committee a swap rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SwapTarget {
    Beacon,
    Shard(ShardId),
}

impl fmt::Display for SwapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beacon => f.write_str(BEACON_CHAIN),
            Self::Shard(id) => write!(f, "shard {id}"),
        }
    }
}

/// One new staker.
///
/// `tx_id` and `reward_receiver` are all-or-nothing across the entries of
/// one stake instruction: a column is written only when every entry has a
/// value, otherwise it is emitted empty and the instruction hash covers the
/// empty column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeEntry {
    pub key: CommitteeKey,
    pub tx_id: Option<String>,
    pub reward_receiver: Option<String>,
    pub auto_stake: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Stake {
        chain: StakeChain,
        entries: Vec<StakeEntry>,
    },
    Swap {
        target: SwapTarget,
        in_keys: Vec<CommitteeKey>,
        out_keys: Vec<CommitteeKey>,
    },
    Random {
        nonce: i64,
        btc_height: u64,
        request_timestamp: i64,
        oracle_timestamp: i64,
    },
    Unstake {
        keys: Vec<CommitteeKey>,
    },
    StopAutoStake {
        keys: Vec<CommitteeKey>,
    },
    /// Refund for stakes that duplicated an existing key.
    ReturnStake {
        keys: Vec<CommitteeKey>,
        tx_ids: Vec<String>,
    },
    Set {
        key: String,
        value: String,
    },
    Del {
        key: String,
        value: Option<String>,
    },
    /// Bridge and other instructions this core carries without interpreting.
    Opaque(Vec<String>),
}

impl Instruction {
    /// Parse and sanity-check one wire instruction.
    pub fn parse(fields: &[String]) -> Result<Self, InstructionError> {
        let tag = fields.first().ok_or(InstructionError::Empty)?;
        match tag.as_str() {
            STAKE => parse_stake(fields),
            SWAP => parse_swap(fields),
            RANDOM => parse_random(fields),
            UNSTAKE => {
                expect_len(fields, UNSTAKE, "2", |n| n == 2)?;
                Ok(Self::Unstake {
                    keys: parse_keys(&fields[1], UNSTAKE)?,
                })
            }
            STOP_AUTO_STAKE => {
                expect_len(fields, STOP_AUTO_STAKE, "2", |n| n == 2)?;
                Ok(Self::StopAutoStake {
                    keys: parse_keys(&fields[1], STOP_AUTO_STAKE)?,
                })
            }
            RETURN_STAKE => {
                expect_len(fields, RETURN_STAKE, "3", |n| n == 3)?;
                let keys = parse_keys(&fields[1], RETURN_STAKE)?;
                let tx_ids = split_list(&fields[2]);
                check_cardinality(RETURN_STAKE, "tx ids", keys.len(), tx_ids.len())?;
                Ok(Self::ReturnStake { keys, tx_ids })
            }
            SET => {
                expect_len(fields, SET, "3", |n| n == 3)?;
                Ok(Self::Set {
                    key: fields[1].clone(),
                    value: fields[2].clone(),
                })
            }
            DEL => {
                expect_len(fields, DEL, "2 or 3", |n| n == 2 || n == 3)?;
                Ok(Self::Del {
                    key: fields[1].clone(),
                    value: fields.get(2).cloned(),
                })
            }
            _ => Ok(Self::Opaque(fields.to_vec())),
        }
    }

    /// Wire form in protocol field order.
    pub fn to_fields(&self) -> Vec<String> {
        match self {
            Self::Stake { chain, entries } => vec![
                STAKE.to_string(),
                join_keys(entries.iter().map(|e| &e.key)),
                chain.as_str().to_string(),
                join_optional(entries.iter().map(|e| e.tx_id.as_deref())),
                join_optional(entries.iter().map(|e| e.reward_receiver.as_deref())),
                entries
                    .iter()
                    .map(|e| if e.auto_stake { "true" } else { "false" })
                    .collect::<Vec<_>>()
                    .join(","),
            ],
            Self::Swap {
                target,
                in_keys,
                out_keys,
            } => {
                let mut fields = vec![
                    SWAP.to_string(),
                    join_keys(in_keys.iter()),
                    join_keys(out_keys.iter()),
                ];
                match target {
                    SwapTarget::Beacon => fields.push(BEACON_CHAIN.to_string()),
                    SwapTarget::Shard(id) => {
                        fields.push(SHARD_CHAIN.to_string());
                        fields.push(id.to_string());
                    }
                }
                fields
            }
            Self::Random {
                nonce,
                btc_height,
                request_timestamp,
                oracle_timestamp,
            } => vec![
                RANDOM.to_string(),
                nonce.to_string(),
                btc_height.to_string(),
                request_timestamp.to_string(),
                oracle_timestamp.to_string(),
            ],
            Self::Unstake { keys } => vec![UNSTAKE.to_string(), join_keys(keys.iter())],
            Self::StopAutoStake { keys } => {
                vec![STOP_AUTO_STAKE.to_string(), join_keys(keys.iter())]
            }
            Self::ReturnStake { keys, tx_ids } => vec![
                RETURN_STAKE.to_string(),
                join_keys(keys.iter()),
                tx_ids.join(","),
            ],
            Self::Set { key, value } => vec![SET.to_string(), key.clone(), value.clone()],
            Self::Del { key, value } => {
                let mut fields = vec![DEL.to_string(), key.clone()];
                fields.extend(value.clone());
                fields
            }
            Self::Opaque(fields) => fields.clone(),
        }
    }

    /// Kind tag, for logs.
    pub fn tag(&self) -> &str {
        match self {
            Self::Stake { .. } => STAKE,
            Self::Swap { .. } => SWAP,
            Self::Random { .. } => RANDOM,
            Self::Unstake { .. } => UNSTAKE,
            Self::StopAutoStake { .. } => STOP_AUTO_STAKE,
            Self::ReturnStake { .. } => RETURN_STAKE,
            Self::Set { .. } => SET,
            Self::Del { .. } => DEL,
            Self::Opaque(fields) => fields.first().map_or("", String::as_str),
        }
    }
}

/// Parse every instruction, keeping position; failures stay in place.
pub fn parse_all(raw: &[Vec<String>]) -> Vec<Result<Instruction, InstructionError>> {
    raw.iter().map(|fields| Instruction::parse(fields)).collect()
}

fn parse_stake(fields: &[String]) -> Result<Instruction, InstructionError> {
    expect_len(fields, STAKE, "6", |n| n == 6)?;
    let keys = parse_keys(&fields[1], STAKE)?;
    let chain = match fields[2].as_str() {
        BEACON_CHAIN => StakeChain::Beacon,
        SHARD_CHAIN => StakeChain::Shard,
        other => return Err(InstructionError::InvalidChain(other.to_string())),
    };

    let tx_ids = split_list(&fields[3]);
    let receivers = split_list(&fields[4]);
    let flags = split_list(&fields[5]);
    check_cardinality(STAKE, "tx ids", keys.len(), tx_ids.len())?;
    check_cardinality(STAKE, "reward receivers", keys.len(), receivers.len())?;
    check_cardinality(STAKE, "auto-stake flags", keys.len(), flags.len())?;

    let flags = flags
        .iter()
        .map(|flag| match flag.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(InstructionError::InvalidFlag(other.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let entries = keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| StakeEntry {
            key,
            tx_id: tx_ids.get(i).cloned(),
            reward_receiver: receivers.get(i).cloned(),
            auto_stake: flags.get(i).copied().unwrap_or(false),
        })
        .collect();

    Ok(Instruction::Stake { chain, entries })
}

fn parse_swap(fields: &[String]) -> Result<Instruction, InstructionError> {
    expect_len(fields, SWAP, "4 or 5", |n| n == 4 || n == 5)?;
    let target = match (fields[3].as_str(), fields.len()) {
        (BEACON_CHAIN, 4) => SwapTarget::Beacon,
        (SHARD_CHAIN, 5) => SwapTarget::Shard(parse_number(&fields[4], "shard id")?),
        (BEACON_CHAIN | SHARD_CHAIN, actual) => {
            return Err(InstructionError::FieldCount {
                kind: SWAP,
                expected: if fields[3] == BEACON_CHAIN { "4" } else { "5" },
                actual,
            })
        }
        (other, _) => return Err(InstructionError::InvalidChain(other.to_string())),
    };
    Ok(Instruction::Swap {
        target,
        in_keys: parse_optional_keys(&fields[1])?,
        out_keys: parse_optional_keys(&fields[2])?,
    })
}

fn parse_random(fields: &[String]) -> Result<Instruction, InstructionError> {
    expect_len(fields, RANDOM, "5", |n| n == 5)?;
    Ok(Instruction::Random {
        nonce: parse_number(&fields[1], "nonce")?,
        btc_height: parse_number(&fields[2], "btc height")?,
        request_timestamp: parse_number(&fields[3], "request timestamp")?,
        oracle_timestamp: parse_number(&fields[4], "oracle timestamp")?,
    })
}

fn expect_len(
    fields: &[String],
    kind: &'static str,
    expected: &'static str,
    ok: impl Fn(usize) -> bool,
) -> Result<(), InstructionError> {
    if ok(fields.len()) {
        Ok(())
    } else {
        Err(InstructionError::FieldCount {
            kind,
            expected,
            actual: fields.len(),
        })
    }
}

/// Optional lists may be empty; otherwise they pair one-to-one with keys.
fn check_cardinality(
    kind: &'static str,
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), InstructionError> {
    if actual == 0 || actual == expected {
        Ok(())
    } else {
        Err(InstructionError::Cardinality {
            kind,
            field,
            expected,
            actual,
        })
    }
}

fn split_list(field: &str) -> Vec<String> {
    if field.is_empty() {
        Vec::new()
    } else {
        field.split(',').map(str::to_string).collect()
    }
}

fn parse_optional_keys(field: &str) -> Result<Vec<CommitteeKey>, InstructionError> {
    split_list(field)
        .into_iter()
        .map(|raw| {
            let key = CommitteeKey::from(raw);
            if key.is_well_formed() {
                Ok(key)
            } else {
                Err(InstructionError::MalformedKey(key.as_str().to_string()))
            }
        })
        .collect()
}

fn parse_keys(field: &str, kind: &'static str) -> Result<Vec<CommitteeKey>, InstructionError> {
    let keys = parse_optional_keys(field)?;
    if keys.is_empty() {
        return Err(InstructionError::NoKeys { kind });
    }
    Ok(keys)
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
) -> Result<T, InstructionError> {
    value.parse().map_err(|_| InstructionError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a CommitteeKey>) -> String {
    keys.map(CommitteeKey::as_str).collect::<Vec<_>>().join(",")
}

/// Comma list when every value is present, empty otherwise.
fn join_optional<'a>(values: impl Iterator<Item = Option<&'a str>>) -> String {
    let values: Vec<&str> = values.collect::<Option<Vec<_>>>().unwrap_or_default();
    values.join(",")
}

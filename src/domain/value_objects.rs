//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use crate::domain::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Eligibility state of a backend.
///
/// Only `Active` backends take part in selection. A backend that goes
/// `Down` and comes back re-enters the pool on the next selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendState {
    /// Eligible for selection
    Active,
    /// Excluded from every policy's candidate pool
    Down,
}

impl BackendState {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Down => "down",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl Default for BackendState {
    fn default() -> Self {
        Self::Active
    }
}

impl FromStr for BackendState {
    type Err = SchedulerError;

    /// Parse a state from its wire name (`active` / `down`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "down" => Ok(Self::Down),
            other => Err(SchedulerError::InvalidState(other.to_string())),
        }
    }
}

impl std::fmt::Display for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Selection algorithm configured for an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Cyclic rotation over the active set
    RoundRobin,
    /// Weight-proportional sampling without replacement
    Weighted,
    /// Uniform sampling without replacement
    Random,
    /// Every active backend, in stable order
    AllActive,
}

impl PolicyType {
    /// Every supported policy, in listing order.
    pub const ALL: [PolicyType; 4] = [
        PolicyType::RoundRobin,
        PolicyType::Weighted,
        PolicyType::Random,
        PolicyType::AllActive,
    ];

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Weighted => "weighted",
            Self::Random => "random",
            Self::AllActive => "all_active",
        }
    }

    /// Human-readable description shown when listing policies.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RoundRobin => "Rotate through active backends in a fixed cyclic order",
            Self::Weighted => "Pick distinct active backends with probability proportional to weight",
            Self::Random => "Pick distinct active backends uniformly at random",
            Self::AllActive => "Return all active backends in a stable order",
        }
    }
}

impl Default for PolicyType {
    fn default() -> Self {
        Self::AllActive
    }
}

impl FromStr for PolicyType {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Self::RoundRobin),
            "weighted" => Ok(Self::Weighted),
            "random" => Ok(Self::Random),
            "all_active" => Ok(Self::AllActive),
            other => Err(SchedulerError::InvalidPolicy(other.to_string())),
        }
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

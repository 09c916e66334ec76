use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::ConfigError;
use crate::math::{FixedNum, Location};

/// Smallest cluster edge that still has an interior distinct from its boundary.
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Per-step traversal costs shared by tile searches, cluster caches and the
/// hierarchical graph.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct CostModel {
    /// Orthogonal step on the same layer.
    pub straight_cost: f64,
    /// Diagonal step on the same layer.
    pub diagonal_cost: f64,
    /// Any step that changes layer, regardless of lateral offset.
    pub layer_change_cost: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            straight_cost: 1.0,
            diagonal_cost: std::f64::consts::SQRT_2,
            layer_change_cost: 2.0,
        }
    }
}

impl CostModel {
    /// Cost of one step between two neighbouring locations.
    pub fn step_cost(&self, from: Location, to: Location) -> FixedNum {
        let d = (from - to).abs();
        let cost = if d.z != 0 {
            self.layer_change_cost
        } else if d.x == 1 && d.y == 1 {
            self.diagonal_cost
        } else {
            self.straight_cost
        };
        FixedNum::checked_from_num(cost).unwrap_or(FixedNum::MAX)
    }

    /// Straight-line estimate; admissible for the default costs.
    pub fn estimate(&self, from: Location, to: Location) -> FixedNum {
        let straight = FixedNum::checked_from_num(self.straight_cost).unwrap_or(FixedNum::MAX);
        (from - to).magnitude().saturating_mul(straight)
    }

    /// First field that is not a finite, non-negative cost representable as
    /// [`FixedNum`].
    fn invalid_field(&self) -> Option<(&'static str, f64)> {
        [
            ("costs.straight_cost", self.straight_cost),
            ("costs.diagonal_cost", self.diagonal_cost),
            ("costs.layer_change_cost", self.layer_change_cost),
        ]
        .into_iter()
        .find(|&(_, value)| !is_valid_scalar(value))
    }
}

fn is_valid_scalar(value: f64) -> bool {
    value.is_finite() && value >= 0.0 && FixedNum::checked_from_num(value).is_some()
}

/// Static configuration of the hierarchical pathfinder. Loaded once and handed
/// to [`crate::Pathfinding::new`]; changing it requires rebuilding the graph.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Cluster edge length on x and y. Must be at least [`MIN_CLUSTER_SIZE`].
    pub cluster_size: usize,
    /// Cluster extent on z. `None` spans the whole world depth.
    pub cluster_depth: Option<usize>,
    /// Heuristic weight: 1.0 is plain A*, larger values search greedier.
    pub closer_modifier: f64,
    pub costs: CostModel,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            cluster_size: 10,
            cluster_depth: None,
            closer_modifier: 1.0,
            costs: CostModel::default(),
        }
    }
}

impl PathfindingConfig {
    pub fn with_cluster_size(cluster_size: usize) -> Self {
        Self {
            cluster_size,
            ..Self::default()
        }
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config = ron::from_str::<Self>(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject costs and modifiers that cannot be used as [`FixedNum`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.invalid_field() {
            Some((field, value)) => Err(ConfigError::InvalidValue { field, value }),
            None => Ok(()),
        }
    }

    pub(crate) fn invalid_field(&self) -> Option<(&'static str, f64)> {
        if !is_valid_scalar(self.closer_modifier) {
            return Some(("closer_modifier", self.closer_modifier));
        }
        self.costs.invalid_field()
    }

    /// Load from a RON file. Missing fields fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&contents)?;
        info!("Loaded pathfinding config from {}", path.display());
        Ok(config)
    }

    pub fn closer_modifier(&self) -> FixedNum {
        FixedNum::checked_from_num(self.closer_modifier).unwrap_or(FixedNum::ONE)
    }
}

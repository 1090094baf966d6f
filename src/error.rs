//! Error types shared across the crate.
//!
//! Every fallible operation returns [`Result`], which fixes the error type
//! to [`AuctionError`]. Input validation fails fast: a shape or sign problem
//! in a bid profile is a caller bug and surfaces immediately instead of
//! producing a silently wrong clearing.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuctionError>;

/// Errors that can occur when building or running auction components.
#[derive(Debug, Clone, PartialEq)]
pub enum AuctionError {
    /// A tensor argument has the wrong dimensions for the operation.
    ShapeMismatch {
        /// What was being validated (e.g. "bid profile", "allocations").
        context: &'static str,
        /// Expected dimensions, formatted for display.
        expected: String,
        /// Actual dimensions, formatted for display.
        actual: String,
    },
    /// A bid was negative or non-finite.
    InvalidBid {
        /// Player index within the profile.
        player: usize,
        /// Batch instance index.
        batch: usize,
        /// Offending value.
        value: f64,
    },
    /// A mechanism was asked to clear a profile with the wrong player count.
    PlayerCount {
        /// Players the mechanism supports.
        expected: usize,
        /// Players in the submitted profile.
        actual: usize,
    },
    /// A payment rule name was not recognized at construction.
    UnknownPaymentRule(String),
    /// A matrix-game action index is out of range for its player.
    InvalidAction {
        /// Player index within the profile.
        player: usize,
        /// Submitted action index.
        action: usize,
        /// Number of actions available to that player.
        n_actions: usize,
    },
    /// A mixed-strategy vector is not a probability distribution.
    InvalidDistribution {
        /// Player the strategy belongs to.
        player: usize,
        /// What failed (negative mass, wrong length, sum far from one).
        reason: String,
    },
    /// A numeric parameter is outside its valid range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Submitted value.
        value: f64,
        /// Human-readable constraint, e.g. "must lie in [0, 1]".
        constraint: &'static str,
    },
    /// The opponent pool cannot form complete profiles for a reward query.
    OpponentPool {
        /// Current pool size.
        pool: usize,
        /// Opponents needed per mechanism play.
        group: usize,
    },
    /// An operation is not supported by the chosen configuration.
    Unsupported(&'static str),
}

impl std::fmt::Display for AuctionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuctionError::ShapeMismatch {
                context,
                expected,
                actual,
            } => {
                write!(f, "{}: expected shape {}, got {}", context, expected, actual)
            }
            AuctionError::InvalidBid {
                player,
                batch,
                value,
            } => {
                write!(
                    f,
                    "Invalid bid {} for player {} in batch instance {} (bids must be finite and non-negative)",
                    value, player, batch
                )
            }
            AuctionError::PlayerCount { expected, actual } => {
                write!(f, "Mechanism expects {} players, profile has {}", expected, actual)
            }
            AuctionError::UnknownPaymentRule(rule) => {
                write!(f, "Unknown payment rule '{}'", rule)
            }
            AuctionError::InvalidAction {
                player,
                action,
                n_actions,
            } => {
                write!(
                    f,
                    "Action {} for player {} is out of range (game has {} actions)",
                    action, player, n_actions
                )
            }
            AuctionError::InvalidDistribution { player, reason } => {
                write!(f, "Strategy of player {} is not a distribution: {}", player, reason)
            }
            AuctionError::InvalidParameter {
                name,
                value,
                constraint,
            } => {
                write!(f, "Parameter {} = {} {}", name, value, constraint)
            }
            AuctionError::OpponentPool { pool, group } => {
                write!(
                    f,
                    "Opponent pool of size {} cannot be split into groups of {}",
                    pool, group
                )
            }
            AuctionError::Unsupported(what) => write!(f, "Unsupported operation: {}", what),
        }
    }
}

impl std::error::Error for AuctionError {}

//! Batched numeric containers for data-parallel auction evaluation.
//!
//! Everything in this crate is evaluated over a `batch` of independent
//! auction instances at once. The containers here store that data as flat
//! row-major `Vec<f64>` buffers with explicit shapes, so a mechanism can
//! clear hundreds of thousands of instances without per-instance allocation.
//!
//! Shapes follow one convention throughout:
//! - [`BatchMatrix`] is `(batch, items)`: one player's valuations or bids.
//! - [`BidProfile`] is `(batch, players, items)`: the input to a mechanism.
//! - [`Allocation`] is `(batch, players, items)`: winner indicators.
//! - [`Payments`] is `(batch, players)`: money owed per player.
//!
//! # Example
//! ```
//! use auction_solver::batch::{BatchMatrix, BidProfile};
//!
//! let a = BatchMatrix::from_vec(vec![5.0], 1, 1).unwrap();
//! let b = BatchMatrix::from_vec(vec![3.0], 1, 1).unwrap();
//! let profile = BidProfile::from_players(&[a, b]).unwrap();
//! assert_eq!(profile.n_players(), 2);
//! assert_eq!(profile.get(0, 0, 0), 5.0);
//! ```

use crate::error::{AuctionError, Result};

/// A `(batch, items)` matrix of one player's values, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchMatrix {
    data: Vec<f64>,
    batch: usize,
    items: usize,
}

impl BatchMatrix {
    /// Create a zero-filled matrix.
    pub fn zeros(batch: usize, items: usize) -> Self {
        Self {
            data: vec![0.0; batch * items],
            batch,
            items,
        }
    }

    /// Wrap an existing buffer, validating its length against the shape.
    pub fn from_vec(data: Vec<f64>, batch: usize, items: usize) -> Result<Self> {
        if data.len() != batch * items {
            return Err(AuctionError::ShapeMismatch {
                context: "batch matrix",
                expected: format!("({}, {}) = {} entries", batch, items, batch * items),
                actual: format!("{} entries", data.len()),
            });
        }
        Ok(Self { data, batch, items })
    }

    /// Number of batch instances (rows).
    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Number of item columns.
    pub fn n_items(&self) -> usize {
        self.items
    }

    /// Value at `(b, i)`.
    #[inline]
    pub fn get(&self, b: usize, i: usize) -> f64 {
        self.data[b * self.items + i]
    }

    /// Set the value at `(b, i)`.
    #[inline]
    pub fn set(&mut self, b: usize, i: usize, value: f64) {
        self.data[b * self.items + i] = value;
    }

    /// One batch instance's row.
    #[inline]
    pub fn row(&self, b: usize) -> &[f64] {
        &self.data[b * self.items..(b + 1) * self.items]
    }

    /// Mutable view of one batch instance's row.
    #[inline]
    pub fn row_mut(&mut self, b: usize) -> &mut [f64] {
        &mut self.data[b * self.items..(b + 1) * self.items]
    }

    /// Iterator over all rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.items)
    }

    /// Mutable iterator over all rows.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        self.data.chunks_exact_mut(self.items)
    }

    /// The whole flat buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Apply a function to every entry in place.
    pub fn map_in_place<F: Fn(f64) -> f64>(&mut self, f: F) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    /// Floor every entry at zero.
    pub fn clamp_min_zero(&mut self) {
        for v in &mut self.data {
            if *v < 0.0 {
                *v = 0.0;
            }
        }
    }

    /// Sort each row in non-increasing order (highest value first).
    pub fn sort_rows_descending(&mut self) {
        for row in self.data.chunks_exact_mut(self.items) {
            row.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        }
    }

    /// Mean of all entries. Zero for an empty matrix.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }
}

/// A `(batch, players, items)` stack of bids, the sole input to a mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct BidProfile {
    data: Vec<f64>,
    batch: usize,
    players: usize,
    items: usize,
}

impl BidProfile {
    /// Wrap an existing buffer, validating its length against the shape.
    pub fn from_vec(data: Vec<f64>, batch: usize, players: usize, items: usize) -> Result<Self> {
        if data.len() != batch * players * items {
            return Err(AuctionError::ShapeMismatch {
                context: "bid profile",
                expected: format!(
                    "({}, {}, {}) = {} entries",
                    batch,
                    players,
                    items,
                    batch * players * items
                ),
                actual: format!("{} entries", data.len()),
            });
        }
        Ok(Self {
            data,
            batch,
            players,
            items,
        })
    }

    /// Stack per-player matrices into a profile.
    ///
    /// All matrices must agree on batch size and item count; player order in
    /// the slice becomes player position in the profile.
    pub fn from_players(players: &[BatchMatrix]) -> Result<Self> {
        let first = players.first().ok_or(AuctionError::ShapeMismatch {
            context: "bid profile",
            expected: "at least one player".into(),
            actual: "0 players".into(),
        })?;
        let (batch, items) = (first.batch_size(), first.n_items());
        for (p, m) in players.iter().enumerate() {
            if m.batch_size() != batch || m.n_items() != items {
                return Err(AuctionError::ShapeMismatch {
                    context: "bid profile",
                    expected: format!("({}, {}) for every player", batch, items),
                    actual: format!("({}, {}) for player {}", m.batch_size(), m.n_items(), p),
                });
            }
        }

        let n_players = players.len();
        let mut data = vec![0.0; batch * n_players * items];
        for b in 0..batch {
            for (p, m) in players.iter().enumerate() {
                let dst = (b * n_players + p) * items;
                data[dst..dst + items].copy_from_slice(m.row(b));
            }
        }
        Ok(Self {
            data,
            batch,
            players: n_players,
            items,
        })
    }

    /// Number of batch instances.
    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Number of players.
    pub fn n_players(&self) -> usize {
        self.players
    }

    /// Number of item columns per player.
    pub fn n_items(&self) -> usize {
        self.items
    }

    /// Bid at `(b, p, i)`.
    #[inline]
    pub fn get(&self, b: usize, p: usize, i: usize) -> f64 {
        self.data[(b * self.players + p) * self.items + i]
    }

    /// One player's bid row within one batch instance.
    #[inline]
    pub fn bid_row(&self, b: usize, p: usize) -> &[f64] {
        let start = (b * self.players + p) * self.items;
        &self.data[start..start + self.items]
    }

    /// All bids of one batch instance, players concatenated in order.
    ///
    /// Multi-unit clearing flattens instances this way; index `k` in the
    /// slice maps back to player `k / n_items`, item `k % n_items`.
    #[inline]
    pub fn instance_slice(&self, b: usize) -> &[f64] {
        let width = self.players * self.items;
        &self.data[b * width..(b + 1) * width]
    }

    /// Extract one player's `(batch, items)` matrix as an owned copy.
    pub fn player_matrix(&self, p: usize) -> BatchMatrix {
        let mut out = BatchMatrix::zeros(self.batch, self.items);
        for b in 0..self.batch {
            out.row_mut(b).copy_from_slice(self.bid_row(b, p));
        }
        out
    }
}

/// A `(batch, players)` matrix of pure-action indices for a matrix game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionProfile {
    data: Vec<usize>,
    batch: usize,
    players: usize,
}

impl ActionProfile {
    /// Create a profile where every player plays action 0.
    pub fn zeros(batch: usize, players: usize) -> Self {
        Self {
            data: vec![0; batch * players],
            batch,
            players,
        }
    }

    /// Wrap an existing buffer, validating its length against the shape.
    pub fn from_vec(data: Vec<usize>, batch: usize, players: usize) -> Result<Self> {
        if data.len() != batch * players {
            return Err(AuctionError::ShapeMismatch {
                context: "action profile",
                expected: format!("({}, {}) = {} entries", batch, players, batch * players),
                actual: format!("{} entries", data.len()),
            });
        }
        Ok(Self {
            data,
            batch,
            players,
        })
    }

    /// Number of batch instances.
    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Number of players.
    pub fn n_players(&self) -> usize {
        self.players
    }

    /// Action of player `p` in instance `b`.
    #[inline]
    pub fn get(&self, b: usize, p: usize) -> usize {
        self.data[b * self.players + p]
    }

    /// Set the action of player `p` in instance `b`.
    #[inline]
    pub fn set(&mut self, b: usize, p: usize, action: usize) {
        self.data[b * self.players + p] = action;
    }
}

/// A `(batch, players, items)` stack of winner indicators.
///
/// Entries are 0.0 or 1.0 for deterministic mechanisms; the static test
/// mechanism writes realized Bernoulli draws, which are also 0/1.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    data: Vec<f64>,
    batch: usize,
    players: usize,
    items: usize,
}

impl Allocation {
    /// Create an empty (nobody wins anything) allocation.
    pub fn zeros(batch: usize, players: usize, items: usize) -> Self {
        Self {
            data: vec![0.0; batch * players * items],
            batch,
            players,
            items,
        }
    }

    /// Number of batch instances.
    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Number of players.
    pub fn n_players(&self) -> usize {
        self.players
    }

    /// Number of item columns per player.
    pub fn n_items(&self) -> usize {
        self.items
    }

    /// Indicator at `(b, p, i)`.
    #[inline]
    pub fn get(&self, b: usize, p: usize, i: usize) -> f64 {
        self.data[(b * self.players + p) * self.items + i]
    }

    /// Set the indicator at `(b, p, i)`.
    #[inline]
    pub fn set(&mut self, b: usize, p: usize, i: usize, value: f64) {
        self.data[(b * self.players + p) * self.items + i] = value;
    }

    /// Units won by player `p` in instance `b`.
    pub fn units_won(&self, b: usize, p: usize) -> f64 {
        let start = (b * self.players + p) * self.items;
        self.data[start..start + self.items].iter().sum()
    }

    /// Total units allocated in instance `b` across all players.
    pub fn instance_total(&self, b: usize) -> f64 {
        let width = self.players * self.items;
        self.data[b * width..(b + 1) * width].iter().sum()
    }

    /// Extract one player's `(batch, items)` indicator matrix.
    pub fn player_matrix(&self, p: usize) -> BatchMatrix {
        let mut out = BatchMatrix::zeros(self.batch, self.items);
        for b in 0..self.batch {
            let start = (b * self.players + p) * self.items;
            out.row_mut(b)
                .copy_from_slice(&self.data[start..start + self.items]);
        }
        out
    }
}

/// A `(batch, players)` matrix of payments.
#[derive(Debug, Clone, PartialEq)]
pub struct Payments {
    data: Vec<f64>,
    batch: usize,
    players: usize,
}

impl Payments {
    /// Create a zero payment matrix.
    pub fn zeros(batch: usize, players: usize) -> Self {
        Self {
            data: vec![0.0; batch * players],
            batch,
            players,
        }
    }

    /// Number of batch instances.
    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Number of players.
    pub fn n_players(&self) -> usize {
        self.players
    }

    /// Payment of player `p` in instance `b`.
    #[inline]
    pub fn get(&self, b: usize, p: usize) -> f64 {
        self.data[b * self.players + p]
    }

    /// Set the payment of player `p` in instance `b`.
    #[inline]
    pub fn set(&mut self, b: usize, p: usize, value: f64) {
        self.data[b * self.players + p] = value;
    }

    /// Add to the payment of player `p` in instance `b`.
    #[inline]
    pub fn add(&mut self, b: usize, p: usize, value: f64) {
        self.data[b * self.players + p] += value;
    }

    /// One player's payments across the batch, as an owned column.
    pub fn player_column(&self, p: usize) -> Vec<f64> {
        (0..self.batch).map(|b| self.get(b, p)).collect()
    }
}

/// What a mechanism play produces: who wins what, and who pays what.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Winner indicators, shape `(batch, players, items)`.
    pub allocations: Allocation,
    /// Payments, shape `(batch, players)`.
    pub payments: Payments,
}

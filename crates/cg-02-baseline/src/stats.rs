//! Pure statistics over a batch of successful transactions (§4.6).

use shared_types::entities::{BigUint, Transaction};

/// Recomputed baseline fields for one contract, derived from a window of
/// its recent successful transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineStats {
    pub avg_gas: u64,
    pub gas_std_dev: u64,
    pub avg_value: BigUint,
    pub value_std_dev: BigUint,
    pub min_gas: u64,
    pub max_gas: u64,
    /// `count / 7`, i.e. average transactions per day over the window.
    pub tx_frequency: f64,
    pub sample_count: u64,
}

/// Minimum sample count required before a baseline is trusted (§4.6).
pub const MIN_SAMPLES: usize = 10;

/// Computes [`BaselineStats`] over `txs`, or `None` if there are fewer
/// than [`MIN_SAMPLES`].
pub fn compute(txs: &[Transaction]) -> Option<BaselineStats> {
    if txs.len() < MIN_SAMPLES {
        return None;
    }
    let n = txs.len() as u64;

    let gas_sum: u128 = txs.iter().map(|t| u128::from(t.gas_used)).sum();
    let avg_gas = (gas_sum / u128::from(n)) as u64;
    let gas_var_sum: u128 = txs
        .iter()
        .map(|t| {
            let diff = (i128::from(t.gas_used) - i128::from(avg_gas)).unsigned_abs();
            diff * diff
        })
        .sum();
    let gas_std_dev = isqrt_u128(gas_var_sum / u128::from(n)) as u64;

    let value_sum = txs
        .iter()
        .fold(BigUint::zero(), |acc, t| acc + t.value);
    let avg_value = value_sum / BigUint::from_u64(n);
    let value_var_sum = txs.iter().fold(BigUint::zero(), |acc, t| {
        let diff = if t.value >= avg_value {
            t.value - avg_value
        } else {
            avg_value - t.value
        };
        acc + (diff * diff)
    });
    let value_std_dev = (value_var_sum / BigUint::from_u64(n)).isqrt();

    let min_gas = txs.iter().map(|t| t.gas_used).min().unwrap_or(0);
    let max_gas = txs.iter().map(|t| t.gas_used).max().unwrap_or(0);

    Some(BaselineStats {
        avg_gas,
        gas_std_dev,
        avg_value,
        value_std_dev,
        min_gas,
        max_gas,
        tx_frequency: n as f64 / 7.0,
        sample_count: n,
    })
}

/// Integer square root via Newton's method; mirrors
/// [`shared_types::entities::BigUint::isqrt`] for the `u128` domain,
/// where gas-variance sums comfortably fit without `U256` overhead.
fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

//! # Probability Utilities

/// Check that `prob` is a probability in ``[0, 1]``.
///
/// # Returns
///
/// `Ok(prob)`; or an error describing the bad value.
pub fn try_probability(prob: f64) -> anyhow::Result<f64> {
    if !(0.0..=1.0).contains(&prob) {
        anyhow::bail!("Probability must be in [0, 1], got {prob}");
    }
    Ok(prob)
}

/// Check that `prob` is a probability in ``[0, 1]``.
///
/// # Panics
///
/// If `prob` is not in ``[0, 1]``.
pub fn expect_probability(prob: f64) -> f64 {
    match try_probability(prob) {
        Ok(prob) => prob,
        Err(err) => panic!("{err}"),
    }
}

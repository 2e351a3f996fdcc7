//! Session reference generation: `{PREFIX}_{random alphanumeric}`.

use rand::distr::Alphanumeric;
use rand::{rng, Rng};

/// Mint a reference such as `PTK_a8Xk2LmQ9z`.
///
/// `prefix` is the provider literal including its trailing underscore.
pub fn generate_reference(prefix: &str, suffix_len: usize) -> String {
    let suffix: String = rng()
        .sample_iter(&Alphanumeric)
        .take(suffix_len)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, suffix)
}

//! Random sources feeding battle rolls.
//!
//! Battles only need one fraction per fight. [`SeededRandom`] gives a
//! reproducible stream derived from a user seed; [`RandomOrg`] asks
//! random.org for a two-decimal fraction over HTTP.
use crate::numbers::hundredths_to_fraction;
use hmac::{Hmac, Mac};
use log::{error, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

pub const RANDOM_ORG_URL: &str =
    "https://www.random.org/decimal-fractions/?num=1&dec=2&col=1&format=plain&rnd=new";
pub const RANDOM_ORG_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RandomError {
    #[error("request to random.org timed out")]
    Timeout,
    #[error("request to random.org failed: {0}")]
    Request(String),
    #[error("invalid response from random.org: {0}")]
    InvalidResponse(String),
}

/// Supplier of battle rolls in `[0, 1]`.
pub trait RandomSource {
    /// Draw the next fraction.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot produce a value.
    fn random_fraction(&mut self) -> Result<f64, RandomError>;
}

/// Deterministic two-decimal fractions in `[0, 1)` from a user-visible seed.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha20Rng,
    draws: u64,
}

impl SeededRandom {
    /// Construct the stream from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"battle")),
            draws: 0,
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
            draws: 0,
        }
    }

    /// Number of rolls drawn so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl RandomSource for SeededRandom {
    fn random_fraction(&mut self) -> Result<f64, RandomError> {
        self.draws = self.draws.saturating_add(1);
        Ok(hundredths_to_fraction(self.rng.gen_range(0..100)))
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Fractions fetched from random.org.
#[derive(Debug, Clone)]
pub struct RandomOrg {
    client: reqwest::blocking::Client,
    url: String,
}

impl RandomOrg {
    /// Client for the public random.org endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::Request`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, RandomError> {
        Self::with_endpoint(RANDOM_ORG_URL, RANDOM_ORG_TIMEOUT)
    }

    /// Client for an arbitrary endpoint speaking the same plain-text format.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::Request`] if the HTTP client cannot be built.
    pub fn with_endpoint(url: impl Into<String>, timeout: Duration) -> Result<Self, RandomError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RandomError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn fetch_body(&self) -> Result<String, RandomError> {
        info!("Fetching random number from {}", self.url);
        self.client
            .get(&self.url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| {
                if e.is_timeout() {
                    error!("Request to random.org timed out");
                    RandomError::Timeout
                } else {
                    error!("Request to random.org failed: {e}");
                    RandomError::Request(e.to_string())
                }
            })
    }
}

impl RandomSource for RandomOrg {
    fn random_fraction(&mut self) -> Result<f64, RandomError> {
        let body = self.fetch_body()?;
        let value = parse_fraction(&body)?;
        info!("Received random number: {value:.3}");
        Ok(value)
    }
}

/// Parse a plain-text random.org response body.
///
/// # Errors
///
/// Returns [`RandomError::InvalidResponse`] unless the trimmed body is a number in `[0, 1]`.
pub fn parse_fraction(body: &str) -> Result<f64, RandomError> {
    let trimmed = body.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| RandomError::InvalidResponse(trimmed.to_string()))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(RandomError::InvalidResponse(trimmed.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_fraction() {
        assert!((parse_fraction("0.42\n").unwrap() - 0.42).abs() < f64::EPSILON);
        assert!((parse_fraction("  1.00 ").unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_garbage_and_out_of_range() {
        assert_eq!(
            parse_fraction("invalid_number\n"),
            Err(RandomError::InvalidResponse("invalid_number".to_string()))
        );
        assert!(parse_fraction("1.5").is_err());
        assert!(parse_fraction("-0.1").is_err());
        assert!(parse_fraction("NaN").is_err());
    }

    #[test]
    fn seeded_stream_is_reproducible() {
        let mut a = SeededRandom::from_user_seed(1337);
        let mut b = SeededRandom::from_user_seed(1337);
        let first: Vec<f64> = (0..16).map(|_| a.random_fraction().unwrap()).collect();
        let second: Vec<f64> = (0..16).map(|_| b.random_fraction().unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(a.draws(), 16);
    }

    #[test]
    fn seeded_values_are_two_decimal_fractions() {
        let mut rng = SeededRandom::from_user_seed(7);
        for _ in 0..200 {
            let value = rng.random_fraction().unwrap();
            assert!((0.0..1.0).contains(&value));
            let hundredths = value * 100.0;
            assert!((hundredths - hundredths.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededRandom::from_user_seed(1);
        let mut b = SeededRandom::from_user_seed(2);
        let first: Vec<f64> = (0..16).map(|_| a.random_fraction().unwrap()).collect();
        let second: Vec<f64> = (0..16).map(|_| b.random_fraction().unwrap()).collect();
        assert_ne!(first, second);
    }
}

use std::str::FromStr;

use crate::{AttemptOutcome, RequestError, Result};

/// Status codes treated as a successful attempt.
///
/// Never empty. Codes keep the order they were given in, without duplicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptancePolicy {
    codes: Vec<u16>,
}

impl AcceptancePolicy {
    pub fn new<I>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = u16>,
    {
        let mut unique = Vec::new();
        for code in codes {
            if !(100..=999).contains(&code) {
                return Err(RequestError::Config(format!(
                    "status code {code} is outside 100..=999"
                )));
            }
            if !unique.contains(&code) {
                unique.push(code);
            }
        }
        if unique.is_empty() {
            return Err(RequestError::Config(
                "at least one accepted status code is required".to_owned(),
            ));
        }
        Ok(Self { codes: unique })
    }

    pub fn codes(&self) -> &[u16] {
        &self.codes
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.codes.contains(&status)
    }

    /// A transport failure is never acceptable, whatever the policy.
    pub fn is_acceptable(&self, outcome: &AttemptOutcome) -> bool {
        outcome.status().is_some_and(|status| self.accepts(status))
    }
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            codes: vec![200, 201, 204],
        }
    }
}

/// Parses a comma-separated list such as `"200, 201,204"`.
impl FromStr for AcceptancePolicy {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        let codes = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u16>().map_err(|_| {
                    RequestError::Config(format!("invalid accepted status code '{part}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(codes)
    }
}

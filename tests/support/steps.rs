//! Step parameter parsing for the behaviour suites.

use std::convert::Infallible;
use std::str::FromStr;

/// Step parameter with surrounding quotes removed.
#[derive(Clone, Debug)]
pub struct StepText(String);

impl FromStr for StepText {
    type Err = Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let raw = input
            .trim()
            .trim_matches(|candidate| matches!(candidate, '"' | '\''))
            .to_owned();

        Ok(Self(raw))
    }
}

impl StepText {
    /// Consumes the step value, yielding the parsed string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for StepText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

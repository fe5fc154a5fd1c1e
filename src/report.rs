//! Turning archive sizes into the numbers people actually care about.
//!
//! Deltas are signed and exact. Sizes that don't fit in an `i64`, or savings
//! that would overflow one, are errors. A pod that makes the app smaller, or a
//! set of pods that costs more together than apart, is flagged rather than
//! clamped.

use crate::pod::install::ResolvedPod;
use std::{
    cmp::Ordering,
    convert::TryFrom,
    fmt::{self, Display},
};
use thiserror::Error;

static SMALLER_THAN_BASELINE: &str = " [anomalous: smaller than baseline]";
static NEGATIVE_SAVINGS: &str =
    " [anomalous: combined larger than sum of individual measurements]";

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("No pods were measured, so there's nothing to report.")]
    NoPods,
    #[error("Expected {expected} individual measurements, but got {actual}.")]
    IndividualCountMismatch { expected: usize, actual: usize },
    #[error("An archive size of {size} bytes is too large to report.")]
    SizeOutOfRange { size: u64 },
    #[error("Shared dependency savings don't fit in 64 bits.")]
    SavingsOverflow,
}

fn checked_size(size: u64) -> Result<i64, ReportError> {
    i64::try_from(size).map_err(|_| ReportError::SizeOutOfRange { size })
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PodDelta {
    pub name: String,
    pub version: String,
    pub delta: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SizeReport {
    // Both non-negative, so any difference between sizes fits.
    baseline: i64,
    combined: i64,
    pods: Vec<ResolvedPod>,
    individual: Option<Vec<i64>>,
    savings: Option<i64>,
}

impl SizeReport {
    pub fn new(baseline: u64, combined: u64, pods: Vec<ResolvedPod>) -> Result<Self, ReportError> {
        if pods.is_empty() {
            return Err(ReportError::NoPods);
        }
        Ok(Self {
            baseline: checked_size(baseline)?,
            combined: checked_size(combined)?,
            pods,
            individual: None,
            savings: None,
        })
    }

    /// Adds the archive size of the baseline with each pod integrated on its
    /// own, in the same order as the pods were given.
    pub fn with_individual(mut self, sizes: Vec<u64>) -> Result<Self, ReportError> {
        if sizes.len() != self.pods.len() {
            return Err(ReportError::IndividualCountMismatch {
                expected: self.pods.len(),
                actual: sizes.len(),
            });
        }
        let sizes = sizes
            .into_iter()
            .map(checked_size)
            .collect::<Result<Vec<_>, _>>()?;
        if self.pods.len() >= 2 {
            let savings = sizes
                .iter()
                .try_fold(0i64, |sum, size| sum.checked_add(size - self.baseline))
                .and_then(|sum| sum.checked_sub(self.combined_delta()))
                .ok_or(ReportError::SavingsOverflow)?;
            self.savings = Some(savings);
        }
        self.individual = Some(sizes);
        Ok(self)
    }

    pub fn combined_delta(&self) -> i64 {
        self.combined - self.baseline
    }

    pub fn individual_deltas(&self) -> Option<Vec<PodDelta>> {
        self.individual.as_ref().map(|sizes| {
            self.pods
                .iter()
                .zip(sizes)
                .map(|(pod, size)| PodDelta {
                    name: pod.name.clone(),
                    version: pod.version.clone(),
                    delta: size - self.baseline,
                })
                .collect()
        })
    }

    /// How much smaller the pods are together than the sum of their parts,
    /// which is what sharing transitive dependencies saves. Only meaningful
    /// with two or more pods measured individually.
    pub fn shared_dependency_savings(&self) -> Option<i64> {
        self.savings
    }

    pub fn anomalies(&self) -> Vec<String> {
        let mut anomalies = Vec::new();
        if self.combined_delta() < 0 {
            anomalies.push(format!(
                "combined size {} is {} bytes below the baseline {}",
                self.combined,
                -self.combined_delta(),
                self.baseline
            ));
        }
        for pod in self.individual_deltas().unwrap_or_default() {
            if pod.delta < 0 {
                anomalies.push(format!(
                    "{} shrinks the app by {} bytes",
                    pod.name, -pod.delta
                ));
            }
        }
        if let Some(savings) = self.shared_dependency_savings().filter(|s| *s < 0) {
            anomalies.push(format!(
                "pods cost {} bytes more together than individually",
                savings.unsigned_abs()
            ));
        }
        anomalies
    }

    pub fn lines(&self) -> Vec<String> {
        fn flag(delta: i64, marker: &str) -> &str {
            if delta < 0 {
                marker
            } else {
                ""
            }
        }

        let combined = self.combined_delta();
        if let [pod] = self.pods.as_slice() {
            return vec![format!(
                "Size comes out to be {} bytes (measured at version {}){}",
                combined,
                pod.version,
                flag(combined, SMALLER_THAN_BASELINE)
            )];
        }
        let mut lines = vec![format!(
            "The pods combined add an extra size of {} bytes{}",
            combined,
            flag(combined, SMALLER_THAN_BASELINE)
        )];
        match self.individual_deltas() {
            Some(deltas) => lines.extend(deltas.iter().map(|pod| {
                format!(
                    "  {}: {} bytes (measured at version {}){}",
                    pod.name,
                    pod.delta,
                    pod.version,
                    flag(pod.delta, SMALLER_THAN_BASELINE)
                )
            })),
            None => lines.extend(self.pods.iter().map(|pod| {
                format!("  {} (measured at version {})", pod.name, pod.version)
            })),
        }
        if let Some(savings) = self.shared_dependency_savings() {
            lines.push(format!(
                "Shared dependency savings: {} bytes{}",
                savings,
                flag(savings, NEGATIVE_SAVINGS)
            ));
        }
        lines
    }
}

impl Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

/// Two explicitly named builds compared against each other.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectComparison {
    pub source: String,
    pub source_size: u64,
    pub target: String,
    pub target_size: u64,
}

impl Display for ProjectComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source_size.cmp(&self.target_size) {
            Ordering::Greater => write!(
                f,
                "{} is {} bytes larger than {}",
                self.source,
                self.source_size - self.target_size,
                self.target
            ),
            Ordering::Equal => write!(f, "{} and {} are the same size", self.source, self.target),
            Ordering::Less => write!(
                f,
                "{} is {} bytes smaller than {}",
                self.source,
                self.target_size - self.source_size,
                self.target
            ),
        }
    }
}

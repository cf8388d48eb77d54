//! Item outcome classification.
//!
//! Every item of a bulk response lands in exactly one [`Classification`].
//! The order of the checks is fixed: acknowledged statuses are accepted,
//! then the operator's ignore set is consulted, then the retry table, and
//! whatever is left is fatal for the batch.

use crate::{error::SettingsError, response::BulkOutcome};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Statuses retried by default: the cluster rejected execution under load.
pub const DEFAULT_RETRY_STATUSES: &[u16] = &[429];

/// What to do with one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Acknowledged by the cluster.
    Accept,
    /// Failed with a status the operator tolerates.
    Ignore,
    /// Failed transiently; send again.
    Retry,
    /// Failed for good; abort the batch.
    Fatal,
}

/// Item-level statuses that never abort a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnorePolicy {
    statuses: BTreeSet<u16>,
}

impl IgnorePolicy {
    /// Ignore nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Ignore the given statuses.
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    /// Whether `status` is tolerated.
    pub fn contains(&self, status: u16) -> bool {
        self.statuses.contains(&status)
    }

    /// Tolerated statuses in ascending order.
    pub fn statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.statuses.iter().copied()
    }

    /// True when nothing is tolerated.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl FromStr for IgnorePolicy {
    type Err = SettingsError;

    /// Parse a comma-separated list such as `"404,503"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status_list("status ignore", s).map(Self::new)
    }
}

pub(crate) fn parse_status_list(key: &str, value: &str) -> Result<Vec<u16>, SettingsError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u16>()
                .ok()
                .filter(|code| (100..600).contains(code))
                .ok_or_else(|| SettingsError::invalid(key, value, format!("`{}` is not a status code", s)))
        })
        .collect()
}

/// Status table used to classify bulk items.
///
/// Read-only once a client is built; shared by all submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    ignore: IgnorePolicy,
    retry: BTreeSet<u16>,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(IgnorePolicy::none(), DEFAULT_RETRY_STATUSES.iter().copied())
    }
}

impl StatusPolicy {
    /// Create a policy from an ignore set and a retry table.
    pub fn new(ignore: IgnorePolicy, retry: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ignore,
            retry: retry.into_iter().collect(),
        }
    }

    /// The ignore set.
    pub fn ignore(&self) -> &IgnorePolicy {
        &self.ignore
    }

    /// Retryable statuses in ascending order.
    pub fn retry_statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.retry.iter().copied()
    }

    /// Classify one status.
    pub fn classify(&self, status: u16) -> Classification {
        if (200..300).contains(&status) {
            Classification::Accept
        } else if self.ignore.contains(status) {
            Classification::Ignore
        } else if self.retry.contains(&status) {
            Classification::Retry
        } else {
            Classification::Fatal
        }
    }

    /// Sort every outcome into its class, keeping submission order inside
    /// each class.
    pub fn partition(&self, outcomes: Vec<BulkOutcome>) -> ClassifiedOutcomes {
        let mut classified = ClassifiedOutcomes::default();

        for outcome in outcomes {
            let bucket = match self.classify(outcome.status) {
                Classification::Accept => &mut classified.accepted,
                Classification::Ignore => &mut classified.ignored,
                Classification::Retry => &mut classified.retry,
                Classification::Fatal => &mut classified.fatal,
            };
            bucket.push(outcome);
        }

        classified
    }
}

/// Outcomes of one response, split by [`Classification`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedOutcomes {
    /// Acknowledged items.
    pub accepted: Vec<BulkOutcome>,
    /// Tolerated failures.
    pub ignored: Vec<BulkOutcome>,
    /// Transient failures to send again.
    pub retry: Vec<BulkOutcome>,
    /// Failures that abort the batch.
    pub fatal: Vec<BulkOutcome>,
}

impl ClassifiedOutcomes {
    /// True when the batch must abort.
    pub fn has_fatal(&self) -> bool {
        !self.fatal.is_empty()
    }

    /// Ordinals to resend.
    pub fn retry_ordinals(&self) -> impl Iterator<Item = usize> + '_ {
        self.retry.iter().map(|o| o.ordinal)
    }

    /// Number of items classified.
    pub fn len(&self) -> usize {
        self.accepted.len() + self.ignored.len() + self.retry.len() + self.fatal.len()
    }

    /// True when the response held no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every outcome, ordered by ordinal.
    pub fn into_outcomes(self) -> Vec<BulkOutcome> {
        let mut all: Vec<BulkOutcome> = self
            .accepted
            .into_iter()
            .chain(self.ignored)
            .chain(self.retry)
            .chain(self.fatal)
            .collect();
        all.sort_by_key(|o| o.ordinal);
        all
    }
}

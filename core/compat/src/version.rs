//! Dotted numeric versions for distro releases and kernels.

use std::cmp::Ordering;
use std::fmt;

/// Numeric dotted version compared component-wise.
///
/// Anything after the leading `digits.digits...` run is ignored, so
/// `4.15.0-1034-azure` compares as `4.15.0`. Missing components count as
/// zero: `4.15 == 4.15.0`.
#[derive(Debug, Clone, Eq)]
pub struct Version(Vec<u64>);

impl Version {
    pub fn parse(raw: &str) -> Self {
        let numeric: &str = raw
            .trim()
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or("");
        Self(
            numeric
                .split('.')
                .map_while(|part| part.parse().ok())
                .collect(),
        )
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// No numeric component could be read.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` lies in `[from, until)`; an absent `until` is unbounded.
    pub fn within(&self, from: &Version, until: Option<&Version>) -> bool {
        self >= from && until.map_or(true, |u| self < u)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

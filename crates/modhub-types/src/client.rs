use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A client release used to bucket manifests.
///
/// Short forms are padded with zeros, so `2.4` parses as `2.4.0`. The
/// original spelling is kept for display and for manifest file names.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientVersion {
    raw: String,
    version: Version,
}

impl ClientVersion {
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        let components = trimmed.split('.').count();
        let padded = match components {
            1 => format!("{trimmed}.0.0"),
            2 => format!("{trimmed}.0"),
            _ => trimmed.to_string(),
        };
        let version =
            Version::parse(&padded).map_err(|_| TypeError::InvalidClientVersion(raw.to_string()))?;
        Ok(Self {
            raw: trimmed.to_string(),
            version,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn semver(&self) -> &Version {
        &self.version
    }
}

impl fmt::Debug for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientVersion({})", self.raw)
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for ClientVersion {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClientVersion> for String {
    fn from(version: ClientVersion) -> Self {
        version.raw
    }
}

/// The client-version range a module version declares it works with.
///
/// Uses PEP 440 specifier syntax: a comma-separated list of clauses such as
/// `>=2.0,!=2.0.3` or `~=2.1`, all of which must hold. Releases compare
/// component by component with missing components read as zero, so `==2.1`
/// pins exactly 2.1.0 while `==2.1.*` admits every 2.1.x. An empty
/// expression matches every client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientRequirement {
    clauses: Vec<Specifier>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operator {
    Arbitrary,
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
}

/// Longest spelling first so `<=` is not read as `<`.
const OPERATORS: &[(&str, Operator)] = &[
    ("===", Operator::Arbitrary),
    ("~=", Operator::Compatible),
    ("==", Operator::Equal),
    ("!=", Operator::NotEqual),
    ("<=", Operator::LessEqual),
    (">=", Operator::GreaterEqual),
    ("<", Operator::Less),
    (">", Operator::Greater),
];

#[derive(Clone, Debug, PartialEq, Eq)]
struct Specifier {
    op: Operator,
    raw: String,
    release: Vec<u64>,
    /// `==X.*` / `!=X.*` prefix form.
    wildcard: bool,
}

impl ClientRequirement {
    /// A requirement that every client satisfies.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn parse(expr: &str) -> Result<Self, TypeError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Ok(Self::any());
        }
        let clauses = trimmed
            .split(',')
            .map(|clause| Specifier::parse(clause.trim()))
            .collect::<Result<Vec<_>, String>>()
            .map_err(|reason| TypeError::InvalidRequirement {
                expr: expr.to_string(),
                reason,
            })?;
        Ok(Self { clauses })
    }

    /// Returns `true` if `client` falls inside this range.
    pub fn matches(&self, client: &ClientVersion) -> bool {
        let v = client.semver();
        let release = [v.major, v.minor, v.patch];
        self.clauses.iter().all(|s| s.matches(client.as_str(), &release))
    }
}

impl Specifier {
    fn parse(clause: &str) -> Result<Self, String> {
        let (op, rest) = OPERATORS
            .iter()
            .find_map(|(spelling, op)| clause.strip_prefix(spelling).map(|rest| (*op, rest.trim())))
            .ok_or_else(|| format!("clause {clause:?} has no comparison operator"))?;
        if op == Operator::Arbitrary {
            return Ok(Self { op, raw: rest.to_string(), release: Vec::new(), wildcard: false });
        }

        let (version, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (rest, false),
        };
        if wildcard && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(format!("wildcard is only allowed with == and != in {clause:?}"));
        }
        let release = version
            .strip_prefix('v')
            .unwrap_or(version)
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| format!("bad release {version:?} in {clause:?}")))
            .collect::<Result<Vec<_>, _>>()?;
        if op == Operator::Compatible && release.len() < 2 {
            return Err(format!("~= needs at least two release components in {clause:?}"));
        }
        Ok(Self { op, raw: rest.to_string(), release, wildcard })
    }

    fn matches(&self, raw_client: &str, client: &[u64]) -> bool {
        let ord = compare_release(client, &self.release);
        match self.op {
            Operator::Arbitrary => raw_client == self.raw,
            Operator::Equal if self.wildcard => has_prefix(client, &self.release),
            Operator::NotEqual if self.wildcard => !has_prefix(client, &self.release),
            Operator::Equal => ord.is_eq(),
            Operator::NotEqual => ord.is_ne(),
            Operator::LessEqual => ord.is_le(),
            Operator::GreaterEqual => ord.is_ge(),
            Operator::Less => ord.is_lt(),
            Operator::Greater => ord.is_gt(),
            Operator::Compatible => {
                let prefix = &self.release[..self.release.len() - 1];
                ord.is_ge() && has_prefix(client, prefix)
            }
        }
    }
}

fn component(release: &[u64], i: usize) -> u64 {
    release.get(i).copied().unwrap_or(0)
}

fn compare_release(a: &[u64], b: &[u64]) -> std::cmp::Ordering {
    (0..a.len().max(b.len()))
        .map(|i| component(a, i).cmp(&component(b, i)))
        .find(|o| o.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}

fn has_prefix(release: &[u64], prefix: &[u64]) -> bool {
    prefix.iter().enumerate().all(|(i, p)| component(release, i) == *p)
}

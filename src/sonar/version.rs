//! Server capability gate

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// First server release with the compute-task and project-status APIs
pub const MINIMUM_SUPPORTED_VERSION: &str = "5.6";

/// Dotted numeric server version (`5.6`, `7.9.1.27448`, `10.4-SNAPSHOT`)
#[derive(Debug, Clone)]
pub struct ServerVersion {
    parts: Vec<u64>,
}

impl ServerVersion {
    /// Parse a version string as returned by `/api/server/version`.
    ///
    /// Each dot-separated component must start with a digit; anything after
    /// the leading digits of the last component (`-SNAPSHOT`, `-RC1`) is
    /// ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        let components: Vec<&str> = trimmed.split('.').collect();
        let last = components.len() - 1;
        for (idx, component) in components.iter().enumerate() {
            let digits: &str = match component.find(|c: char| !c.is_ascii_digit()) {
                Some(end) if idx == last => &component[..end],
                Some(_) => return None,
                None => component,
            };
            parts.push(digits.parse().ok()?);
        }

        Some(Self { parts })
    }

    fn part(&self, idx: usize) -> u64 {
        self.parts.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for ServerVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid server version '{}'", s))
    }
}

impl PartialEq for ServerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ServerVersion {}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.part(i).cmp(&other.part(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        f.write_str(&rendered.join("."))
    }
}

/// Whether a raw version string denotes a server the resolver can talk to.
///
/// Unparseable versions are unsupported.
pub fn is_supported(raw: &str, minimum: &ServerVersion) -> bool {
    ServerVersion::parse(raw).is_some_and(|v| &v >= minimum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn min() -> ServerVersion {
        ServerVersion::parse(MINIMUM_SUPPORTED_VERSION).unwrap()
    }

    #[rstest]
    #[case("5.6", true)]
    #[case("5.6.0", true)]
    #[case("5.6.1", true)]
    #[case("6.0", true)]
    #[case("7.9.1.27448", true)]
    #[case("10.4-SNAPSHOT", true)]
    #[case("2025.1.0.102418", true)]
    #[case(" 8.9 \n", true)]
    #[case("5.5", false)]
    #[case("5.5.99", false)]
    #[case("4.5.7", false)]
    #[case("", false)]
    #[case("latest", false)]
    #[case("5.x", false)]
    #[case("<html>", false)]
    fn test_is_supported(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(is_supported(raw, &min()), expected, "version {:?}", raw);
    }

    #[test]
    fn test_missing_components_compare_as_zero() {
        assert_eq!(
            ServerVersion::parse("5.6").unwrap(),
            ServerVersion::parse("5.6.0.0").unwrap()
        );
    }

    #[test]
    fn test_display() {
        let v: ServerVersion = "9.9.0-RC1".parse().unwrap();
        assert_eq!(v.to_string(), "9.9.0");
    }

    #[test]
    fn test_from_str_error() {
        let err = "abc".parse::<ServerVersion>().unwrap_err();
        assert!(err.contains("abc"));
    }
}

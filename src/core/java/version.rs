use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// A parsed `java.runtime.version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum JavaVersion {
    /// `1.8.0_152-b16` → major 8, update 152, build 16.
    Legacy { major: u32, update: u32, build: u32 },
    /// `10.0.2+13`.
    Modern {
        major: u32,
        minor: u32,
        revision: u32,
        build: u32,
    },
}

fn leading_number(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl JavaVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("1.") {
            // 8.0_152-b16
            let major = leading_number(rest)?;
            let (_, after_underscore) = rest.split_once('_')?;
            let update = leading_number(after_underscore)?;
            let build = after_underscore
                .split_once("-b")
                .and_then(|(_, b)| leading_number(b))
                .unwrap_or(0);
            return Some(JavaVersion::Legacy {
                major,
                update,
                build,
            });
        }

        let (core, build) = match raw.split_once('+') {
            Some((core, build)) => (core, leading_number(build).unwrap_or(0)),
            None => (raw, 0),
        };
        let mut parts = core.split('.');
        let major = parts.next().and_then(leading_number)?;
        let minor = parts.next().and_then(leading_number).unwrap_or(0);
        let revision = parts.next().and_then(leading_number).unwrap_or(0);
        Some(JavaVersion::Modern {
            major,
            minor,
            revision,
            build,
        })
    }

    pub fn major(&self) -> u32 {
        match *self {
            JavaVersion::Legacy { major, .. } | JavaVersion::Modern { major, .. } => major,
        }
    }

    /// Java 8 newer than update 52.
    pub fn is_supported(&self) -> bool {
        matches!(*self, JavaVersion::Legacy { major: 8, update, .. } if update > 52)
    }

    fn sort_key(&self) -> (u32, u32, u32, u32) {
        match *self {
            JavaVersion::Legacy {
                major,
                update,
                build,
            } => (major, 0, update, build),
            JavaVersion::Modern {
                major,
                minor,
                revision,
                build,
            } => (major, minor, revision, build),
        }
    }
}

impl Ord for JavaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for JavaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaVersion::Legacy {
                major,
                update,
                build,
            } => write!(f, "1.{major}.0_{update}-b{build}"),
            JavaVersion::Modern {
                major,
                minor,
                revision,
                build,
            } => write!(f, "{major}.{minor}.{revision}+{build}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_schemes() {
        assert_eq!(
            JavaVersion::parse("1.8.0_152-b16"),
            Some(JavaVersion::Legacy {
                major: 8,
                update: 152,
                build: 16
            })
        );
        assert_eq!(
            JavaVersion::parse("10.0.2+13"),
            Some(JavaVersion::Modern {
                major: 10,
                minor: 0,
                revision: 2,
                build: 13
            })
        );
        assert_eq!(
            JavaVersion::parse("17.0.9+9-LTS").map(|v| v.major()),
            Some(17)
        );
        assert_eq!(JavaVersion::parse("garbage"), None);
    }

    #[test]
    fn support_window_is_java8_after_update_52() {
        assert!(JavaVersion::parse("1.8.0_60-b27").unwrap().is_supported());
        assert!(!JavaVersion::parse("1.8.0_51-b16").unwrap().is_supported());
        assert!(!JavaVersion::parse("1.7.0_80-b15").unwrap().is_supported());
        assert!(!JavaVersion::parse("11.0.2+9").unwrap().is_supported());
    }

    #[test]
    fn ordering_follows_update_then_build() {
        let v = |u, b| JavaVersion::Legacy {
            major: 8,
            update: u,
            build: b,
        };
        assert!(v(60, 1) > v(60, 0));
        assert!(v(60, 0) > v(50, 99));
        assert_eq!(v(60, 1).cmp(&v(60, 1)), Ordering::Equal);
    }
}

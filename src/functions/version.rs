//! Version range matching used by `validate_version`.
//!
//! Ranges are `||`-separated alternatives of comma- or space-separated comparators.
//! A bare version means an exact match, `a - b` is an inclusive range, and `x`/`X`/`*`
//! are accepted as wildcard components. Versions may carry a leading `v` and omit
//! the minor or patch number.

use itertools::Itertools;
use semver::{Version, VersionReq};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("empty version range")]
    Empty,

    #[error("'{0}' has no version")]
    MissingVersion(String),

    #[error("wildcards are not allowed with '!='")]
    WildcardNotEqual,

    #[error(transparent)]
    Semver(#[from] semver::Error),
}

#[derive(Debug, Clone)]
enum Comparator {
    Req(VersionReq),
    NotEq(Version),
}

impl Comparator {
    fn matches(&self, v: &Version) -> bool {
        match self {
            Comparator::Req(req) => req.matches(v),
            Comparator::NotEq(other) => v != other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VersionRange {
    alternatives: Vec<Vec<Comparator>>,
}

impl VersionRange {
    pub fn parse(s: &str) -> Result<Self, RangeError> {
        if s.trim().is_empty() {
            return Err(RangeError::Empty);
        }
        let alternatives = s
            .split("||")
            .map(parse_alternative)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    pub fn matches(&self, v: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|comparators| comparators.iter().all(|c| c.matches(v)))
    }
}

/// Lenient version parsing: `v7.1` is read as `7.1.0` and `20.04` as `20.4.0`.
pub fn parse_version(s: &str) -> Result<Version, semver::Error> {
    let s = s.trim();
    let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
    let (core, rest) = split_core(s);
    let core = core.split('.').map(strip_leading_zeros).join(".");
    let padded = match core.matches('.').count() {
        0 => format!("{core}.0.0{rest}"),
        1 => format!("{core}.0{rest}"),
        _ => format!("{core}{rest}"),
    };
    Version::parse(&padded)
}

/// Splits `1.2.3-pre+build` into `1.2.3` and `-pre+build`.
fn split_core(s: &str) -> (&str, &str) {
    s.split_at(s.find(['-', '+']).unwrap_or(s.len()))
}

/// `04` is `4`, `00` is `0`. Anything not purely numeric is left for the parser to judge.
fn strip_leading_zeros(part: &str) -> &str {
    if part.len() > 1 && part.bytes().all(|b| b.is_ascii_digit()) {
        match part.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        }
    } else {
        part
    }
}

fn parse_alternative(alt: &str) -> Result<Vec<Comparator>, RangeError> {
    let tokens: Vec<&str> = alt
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(RangeError::Empty);
    }

    let mut out = Vec::new();
    let mut rest = tokens.into_iter().peekable();
    while let Some(tok) = rest.next() {
        // hyphen range: `1.2 - 1.4.5`
        if rest.peek() == Some(&"-") {
            let _ = rest.next();
            let upper = rest
                .next()
                .ok_or_else(|| RangeError::MissingVersion(format!("{tok} -")))?;
            out.push(comparator(">=", tok)?);
            out.push(comparator("<=", upper)?);
            continue;
        }

        let op_len = tok
            .find(|c: char| !matches!(c, '=' | '<' | '>' | '~' | '^' | '!'))
            .unwrap_or(tok.len());
        let (op, ver) = tok.split_at(op_len);
        let ver = if ver.is_empty() {
            rest.next().ok_or_else(|| RangeError::MissingVersion(op.to_string()))?
        } else {
            ver
        };
        out.push(comparator(op, ver)?);
    }
    Ok(out)
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

fn comparator(op: &str, ver: &str) -> Result<Comparator, RangeError> {
    let ver = ver.strip_prefix(['v', 'V']).unwrap_or(ver);
    if ver.is_empty() {
        return Err(RangeError::MissingVersion(op.to_string()));
    }
    let (core, rest) = split_core(ver);
    let parts: Vec<&str> = core.split('.').map(strip_leading_zeros).collect();
    let wildcard = parts.iter().any(|p| is_wildcard(p));
    let ver = format!("{}{rest}", parts.iter().join("."));

    let req = match op {
        "!=" if wildcard => return Err(RangeError::WildcardNotEqual),
        "!=" => return Ok(Comparator::NotEq(parse_version(&ver)?)),
        "" | "=" if wildcard => {
            VersionReq::parse(&parts.iter().map(|p| if is_wildcard(p) { "*" } else { *p }).join("."))?
        }
        _ if wildcard => {
            let fixed = parts.iter().take_while(|p| !is_wildcard(p)).join(".");
            if fixed.is_empty() {
                VersionReq::STAR
            } else {
                VersionReq::parse(&format!("{op}{fixed}"))?
            }
        }
        // a lone major covers its whole release line; otherwise a missing patch is 0
        "" | "=" if parts.len() == 1 => VersionReq::parse(&format!("={ver}"))?,
        "" | "=" => VersionReq::parse(&format!("={}", parse_version(&ver)?))?,
        _ => VersionReq::parse(&format!("{op}{ver}"))?,
    };
    Ok(Comparator::Req(req))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn check(range: &str, version: &str) -> bool {
        VersionRange::parse(range)
            .unwrap()
            .matches(&parse_version(version).unwrap())
    }

    #[test]
    fn lenient_versions() {
        assert_eq!(parse_version("v7.1").unwrap(), Version::new(7, 1, 0));
        assert_eq!(parse_version("7").unwrap(), Version::new(7, 0, 0));
        assert_eq!(parse_version("5.4.0-42-generic").unwrap().pre.as_str(), "42-generic");
        assert_eq!(parse_version("20.04").unwrap(), Version::new(20, 4, 0));
        assert_eq!(parse_version("8.00.010").unwrap(), Version::new(8, 0, 10));
        assert!(parse_version("seven").is_err());
        assert!(parse_version("").is_err());
    }

    #[test]
    fn simple_comparators() {
        assert!(check(">=7.0.0", "7.0.0"));
        assert!(!check(">=7.0.0", "6.8.0"));
        assert!(check("< 8", "7.9.9"));
        assert!(check("!=7.1.0", "7.2.0"));
        assert!(!check("!=7.1.0", "7.1.0"));
    }

    #[test]
    fn bare_version_is_exact() {
        assert!(check("7.1.0", "7.1.0"));
        assert!(!check("7.1.0", "7.1.1"));
        assert!(check("7.1", "7.1.0"));
        assert!(!check("7.1", "7.1.5"));
        assert!(!check("=7.1", "7.1.5"));
        assert!(check("7", "7.9.0"));
        assert!(!check("7", "8.0.0"));
    }

    #[test]
    fn leading_zeros_in_ranges() {
        assert!(check(">=18.04", "20.04"));
        assert!(!check(">=22.04", "20.04"));
        assert!(check("20.04", "20.4.0"));
        assert!(check("!=18.04", "20.04"));
    }

    #[test]
    fn conjunction_and_alternatives() {
        assert!(check(">=6.0, <7.0", "6.8.0"));
        assert!(check(">=6.0 <7.0", "6.8.0"));
        assert!(!check(">=6.0, <7.0", "7.0.0"));
        assert!(check("<6.0 || >=7.2", "7.3.0"));
        assert!(!check("<6.0 || >=7.2", "7.0.0"));
    }

    #[test]
    fn wildcards_tilde_caret_hyphen() {
        assert!(check("7.x", "7.9.1"));
        assert!(!check("7.x", "8.0.0"));
        assert!(check("*", "1.2.3"));
        assert!(check(">=7.x", "7.0.0"));
        assert!(check("~7.1", "7.1.5"));
        assert!(!check("~7.1", "7.2.0"));
        assert!(check("^7.1", "7.9.0"));
        assert!(check("7.0.0 - 7.4.0", "7.4.0"));
        assert!(!check("7.0.0 - 7.4.0", "7.4.1"));
    }

    #[test]
    fn invalid_ranges() {
        assert!(VersionRange::parse("").is_err());
        assert!(VersionRange::parse(">=").is_err());
        assert!(VersionRange::parse(">=1.0.0.0").is_err());
        assert!(VersionRange::parse("!=7.x").is_err());
        assert!(VersionRange::parse("abc").is_err());
        assert!(VersionRange::parse("1.0 ||").is_err());
    }
}

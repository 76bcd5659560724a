use semver::VersionReq;
use std::error::Error as StdError;
use std::fmt;

pub use semver::Version;

/// An npm range: one or more `||`-separated comparator sets.
#[derive(Debug, Clone)]
pub struct RangeSet {
    ranges: Vec<VersionReq>,
}

#[derive(Debug, Clone)]
pub struct Error {
    input: String,
    message: String,
}

impl Error {
    pub fn new(input: String, message: String) -> Self {
        Self { input, message }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.input)
    }
}

impl StdError for Error {}

impl RangeSet {
    pub fn parse(original: &str) -> Result<Self, Error> {
        let mut s = original.trim();

        if s.is_empty() || s == "latest" {
            s = "*";
        }

        let mut ranges = Vec::new();

        for part in s.split("||") {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let normalized = normalize_and_part(part);

            let req = VersionReq::parse(&normalized)
                .map_err(|err| Error::new(original.to_string(), err.to_string()))?;

            ranges.push(req);
        }

        if ranges.is_empty() {
            ranges.push(VersionReq::STAR);
        }

        Ok(RangeSet { ranges })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.ranges.iter().any(|r| r.matches(version))
    }

    /// Highest version among `candidates` that satisfies the range.
    /// Candidates that are not valid semver are skipped.
    pub fn max_satisfying<'a, I>(&self, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<(Version, &'a str)> = None;

        for candidate in candidates {
            let Ok(version) = Version::parse(candidate) else {
                continue;
            };

            if !self.matches(&version) {
                continue;
            }

            match &best {
                Some((current, _)) if version <= *current => {}
                _ => best = Some((version, candidate)),
            }
        }

        best.map(|(_, raw)| raw)
    }
}

/// Rewrites one npm comparator set into the syntax `semver::VersionReq` accepts.
fn normalize_and_part(part: &str) -> String {
    let tokens: Vec<&str> = part.split_whitespace().collect();

    if tokens.len() == 3 && tokens[1] == "-" {
        return format!(">={}, <={}", strip_v(tokens[0]), strip_v(tokens[2]));
    }

    let mut result = String::new();

    for (i, token) in tokens.iter().enumerate() {
        let after_operator = i > 0 && is_bare_operator(tokens[i - 1]);

        if i > 0 {
            if after_operator {
                result.push(' ');
            } else {
                result.push_str(", ");
            }
        }

        result.push_str(&normalize_token(token, after_operator));
    }
    result
}

fn normalize_token(token: &str, after_operator: bool) -> String {
    if after_operator || is_bare_operator(token) {
        return token.to_string();
    }

    let token = strip_v(token);

    // npm reads a bare full version as an exact pin; semver reads it as a caret.
    if token.starts_with(|c: char| c.is_ascii_digit()) && Version::parse(token).is_ok() {
        return format!("={}", token);
    }

    // `1` and `1.2` are `1.x` and `1.2.x` to npm; semver would read a caret.
    if is_partial_version(token) {
        return format!("{}.*", token);
    }

    token.to_string()
}

fn is_partial_version(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() < 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

fn is_bare_operator(token: &str) -> bool {
    matches!(token, "=" | ">" | ">=" | "<" | "<=" | "~" | "^")
}

fn strip_v(token: &str) -> &str {
    let ops = token.trim_start_matches(['=', '>', '<', '~', '^']);
    if ops.len() == token.len() {
        token.strip_prefix('v').unwrap_or(token)
    } else {
        token
    }
}

//! Ant-style path patterns.
//!
//! - `?` matches one character inside a segment
//! - `*` matches zero or more characters inside a segment
//! - `**` matches zero or more whole segments
//! - a pattern ending in `/` is shorthand for `<pattern>/**`
//!
//! Matching is case-sensitive and ignores leading, trailing and doubled
//! slashes in both pattern and path.

use std::fmt;

/// A pre-tokenised Ant-style pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct AntPattern {
    raw: String,
    segments: Vec<String>,
}

impl AntPattern {
    pub fn new(pattern: &str) -> Self {
        let mut segments = tokenize(pattern);
        if pattern.ends_with('/') {
            segments.push("**".to_string());
        }
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if the whole path matches the pattern.
    pub fn matches(&self, path: &str) -> bool {
        let path = tokenize(path);
        match_segments(&self.segments, &path)
    }

    /// Returns `true` if `path` is a strict prefix of the literal pattern text
    /// at a `/` boundary (`org/acme` for `org/acme/lib/**`). Wildcard
    /// segments only ever equal themselves, so `secret.txt` is not a prefix
    /// of `**/*.jar`.
    pub fn has_literal_prefix(&self, path: &str) -> bool {
        let path = tokenize(path);
        path.len() < self.segments.len()
            && path.iter().zip(&self.segments).all(|(p, s)| p == s)
    }
}

impl fmt::Debug for AntPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AntPattern({:?})", self.raw)
    }
}

fn tokenize(s: &str) -> Vec<String> {
    s.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn match_segments<P: AsRef<str>, S: AsRef<str>>(pattern: &[P], path: &[S]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };
    if head.as_ref() == "**" {
        return (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]));
    }
    match path.split_first() {
        None => false,
        Some((segment, tail)) => {
            match_segment(head.as_ref(), segment.as_ref()) && match_segments(rest, tail)
        }
    }
}

/// Wildcard match of a single segment with `*` and `?`.
fn match_segment(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

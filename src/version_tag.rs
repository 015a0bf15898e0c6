use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

/// The two version components that take part in compatibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionComponent {
    Major,
    Minor,
}

impl VersionComponent {
    /// Components in the order they are compared
    pub const ALL: [VersionComponent; 2] = [VersionComponent::Major, VersionComponent::Minor];

    pub fn index(self) -> usize {
        match self {
            VersionComponent::Major => 0,
            VersionComponent::Minor => 1,
        }
    }
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionComponent::Major => write!(f, "major"),
            VersionComponent::Minor => write!(f, "minor"),
        }
    }
}

/// A dotted version string split into its segments.
///
/// Only the major and minor segments are significant. A missing segment reads as `"0"`.
/// Segments are kept as text so that two textually equal segments can be compared
/// without being parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag<'a> {
    raw: &'a str,
    segments: Vec<&'a str>,
}

impl<'a> VersionTag<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            segments: split_segments(raw),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The trimmed text of a segment, `"0"` when the tag is too short
    pub fn segment(&self, component: VersionComponent) -> &'a str {
        self.segments
            .get(component.index())
            .copied()
            .map(str::trim)
            .unwrap_or("0")
    }

    /// Parse a segment as an integer
    pub fn component(&self, component: VersionComponent) -> Result<i32, VersionTagError> {
        let segment = self.segment(component);
        segment
            .parse::<i32>()
            .map_err(|source| VersionTagError::InvalidSegment {
                version: self.raw.to_string(),
                component,
                segment: segment.to_string(),
                source,
            })
    }

    pub fn major(&self) -> Result<i32, VersionTagError> {
        self.component(VersionComponent::Major)
    }

    pub fn minor(&self) -> Result<i32, VersionTagError> {
        self.component(VersionComponent::Minor)
    }
}

impl fmt::Display for VersionTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Splits on `.` dropping trailing empty segments. A string without any `.` is kept
/// whole, so the empty string is a single empty (unparsable) segment.
fn split_segments(raw: &str) -> Vec<&str> {
    if !raw.contains('.') {
        return vec![raw];
    }

    let mut segments: Vec<&str> = raw.split('.').collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments
}

#[derive(Debug, Error)]
pub enum VersionTagError {
    #[error("Invalid {component} segment '{segment}' in version '{version}': {source}")]
    InvalidSegment {
        version: String,
        component: VersionComponent,
        segment: String,
        #[source]
        source: ParseIntError,
    },
}

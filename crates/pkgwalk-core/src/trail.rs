//! Trails: the nested-directory route from the project root to a
//! package.
//!
//! A trail is the ordered list of package names crossed on the way
//! down an installed tree. The project root is the empty trail; each
//! hop descends through one `node_modules` directory.

use std::fmt;
use std::path::PathBuf;

/// Directory name npm uses for installed dependencies.
pub const PACKAGES_DIR: &str = "node_modules";

/// Ordered sequence of package names from the project root down to a
/// nested package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Trail(Vec<String>);

impl Trail {
    /// The identity trail of the project root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// A new trail extended by one segment.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    /// Drop the innermost segment, returning it if one existed.
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Root-relative installed path for this trail.
    ///
    /// The empty trail maps to `.`; every segment inserts a
    /// `node_modules` hop before the package name, so `[a, b]` maps to
    /// `node_modules/a/node_modules/b`.
    #[must_use]
    pub fn rel_path(&self) -> PathBuf {
        if self.0.is_empty() {
            return PathBuf::from(".");
        }
        let mut path = PathBuf::new();
        for segment in &self.0 {
            path.push(PACKAGES_DIR);
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        f.write_str(&self.0.join(" > "))
    }
}

impl<S: Into<String>> FromIterator<S> for Trail {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

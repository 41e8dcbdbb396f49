//! Disconnection window sets and their single-string encoding.
//!
//! A window set is stored and transported as one string whose elements are
//! joined by the configured separator (`;` by default). Decoding trims each
//! element and drops empty ones, so encode/decode are inverse for every set
//! built through [`WindowSet::new`].

use std::fmt;

/// Errors raised when building a window set from raw elements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowSetError {
    /// An element was blank after trimming.
    #[error("window entries must not be blank")]
    BlankEntry,
    /// An element contained the separator and would not survive encoding.
    #[error("window entry `{entry}` contains the separator `{separator}`")]
    ContainsSeparator {
        /// Offending entry.
        entry: String,
        /// Separator in use.
        separator: char,
    },
}

/// Ordered list of disconnection windows for one queue on one day.
///
/// Order is meaningful: it mirrors the source table, so two sets with the
/// same entries in a different order are different values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WindowSet(Vec<String>);

impl WindowSet {
    /// Build a set from already-clean entries.
    ///
    /// # Examples
    /// ```
    /// use schedule_watch::domain::WindowSet;
    ///
    /// let set = WindowSet::new(vec!["08:00-10:00".to_owned()], ';').expect("valid");
    /// assert_eq!(set.encode(';'), "08:00-10:00");
    /// ```
    pub fn new(entries: Vec<String>, separator: char) -> Result<Self, WindowSetError> {
        for entry in &entries {
            if entry.trim().is_empty() {
                return Err(WindowSetError::BlankEntry);
            }
            if entry.contains(separator) {
                return Err(WindowSetError::ContainsSeparator {
                    entry: entry.clone(),
                    separator,
                });
            }
        }
        Ok(Self(entries))
    }

    /// Decode a separator-joined string.
    ///
    /// # Examples
    /// ```
    /// use schedule_watch::domain::WindowSet;
    ///
    /// let set = WindowSet::decode("08:00-10:00; 18:00-20:00;", ';');
    /// assert_eq!(set.len(), 2);
    /// assert_eq!(set.encode(';'), "08:00-10:00;18:00-20:00");
    /// ```
    pub fn decode(raw: &str, separator: char) -> Self {
        Self(
            raw.split(separator)
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Whether `entry` can describe a time window at all.
    ///
    /// Lines without a single digit are placeholders such as "немає".
    ///
    /// # Examples
    /// ```
    /// use schedule_watch::domain::WindowSet;
    ///
    /// assert!(WindowSet::looks_like_window("08:00-10:00"));
    /// assert!(!WindowSet::looks_like_window("немає"));
    /// ```
    pub fn looks_like_window(entry: &str) -> bool {
        entry.chars().any(|c| c.is_ascii_digit())
    }

    /// Join the entries with `separator`.
    pub fn encode(&self, separator: char) -> String {
        let mut buffer = [0_u8; 4];
        self.0.join(separator.encode_utf8(&mut buffer))
    }

    /// Iterate the entries in source order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there is no window at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WindowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("\n"))
    }
}

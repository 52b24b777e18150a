//! Qualified names.
//!
//! A name owns its qualified form once; the prefix and local parts are
//! slices of it. An unprefixed name's local part is the whole qualified
//! string.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    qualified: String,
    // byte length of the prefix, 0 when there is none
    prefix_len: usize,
}

impl QName {
    /// Builds a name from its qualified spelling, splitting on the first `:`.
    pub fn new(qualified: String) -> Self {
        let prefix_len = qualified.find(':').unwrap_or(0);
        QName {
            qualified,
            prefix_len,
        }
    }

    pub fn from_parts(prefix: &str, local: &str) -> Self {
        QName {
            qualified: format!("{prefix}:{local}"),
            prefix_len: prefix.len(),
        }
    }

    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    pub fn prefix(&self) -> Option<&str> {
        if self.prefix_len == 0 {
            None
        } else {
            Some(&self.qualified[..self.prefix_len])
        }
    }

    pub fn local_name(&self) -> &str {
        if self.prefix_len == 0 {
            &self.qualified
        } else {
            &self.qualified[self.prefix_len + 1..]
        }
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprefixed_local_aliases_qualified() {
        let name = QName::new("ball".to_string());
        assert_eq!(name.qualified(), "ball");
        assert_eq!(name.prefix(), None);
        assert_eq!(name.local_name(), "ball");
    }

    #[test]
    fn prefixed_name_splits() {
        let name = QName::new("x:b".to_string());
        assert_eq!(name.qualified(), "x:b");
        assert_eq!(name.prefix(), Some("x"));
        assert_eq!(name.local_name(), "b");

        let name = QName::from_parts("svg", "rect");
        assert_eq!(name.qualified(), "svg:rect");
        assert_eq!(name.prefix(), Some("svg"));
        assert_eq!(name.local_name(), "rect");
    }
}

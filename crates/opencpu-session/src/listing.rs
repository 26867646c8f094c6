//! Session directory listing.

/// Prefix of R object entries.
pub const OBJECT_PREFIX: &str = "R/";

/// Prefix of file entries.
pub const FILE_PREFIX: &str = "files/";

/// Resources advertised by a session directory, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndex {
    pub objects: Vec<String>,
    pub files: Vec<String>,
    /// Entries matching neither prefix (`source`, `stdout`, `graphics/1`, ...).
    pub others: Vec<String>,
}

impl ResourceIndex {
    /// Parse a newline-separated listing body.
    ///
    /// Empty lines are dropped; everything else is partitioned by prefix.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut index = Self::default();
        for entry in body.split('\n').filter(|line| !line.is_empty()) {
            let bucket = if entry.starts_with(OBJECT_PREFIX) {
                &mut index.objects
            } else if entry.starts_with(FILE_PREFIX) {
                &mut index.files
            } else {
                &mut index.others
            };
            bucket.push(entry.to_string());
        }
        index
    }

    /// Whether `R/{name}` (or a path below it) is listed.
    #[must_use]
    pub fn has_object(&self, name: &str) -> bool {
        let entry = format!("{OBJECT_PREFIX}{name}");
        let nested = format!("{entry}/");
        self.objects
            .iter()
            .any(|listed| *listed == entry || listed.starts_with(&nested))
    }

    /// Whether `files/{name}` is listed.
    #[must_use]
    pub fn has_file(&self, name: &str) -> bool {
        let entry = format!("{FILE_PREFIX}{name}");
        self.files.iter().any(|listed| *listed == entry)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.files.is_empty() && self.others.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_preserves_order() {
        let index = ResourceIndex::parse("R/.val\nsource\nR/a\nfiles/out.csv\n\nR/b\nfiles/plot.png\n");
        assert_eq!(index.objects, vec!["R/.val", "R/a", "R/b"]);
        assert_eq!(index.files, vec!["files/out.csv", "files/plot.png"]);
        assert_eq!(index.others, vec!["source"]);
    }

    #[test]
    fn test_prefix_match_not_substring() {
        let index = ResourceIndex::parse("graphics/R/1\nold/files/x\nR/files/y\n");
        assert_eq!(index.objects, vec!["R/files/y"]);
        assert!(index.files.is_empty());
        assert_eq!(index.others, vec!["graphics/R/1", "old/files/x"]);
    }

    #[test]
    fn test_object_membership() {
        let index = ResourceIndex::parse("R/a\nR/model/coefficients\n");
        assert!(index.has_object("a"));
        assert!(index.has_object("model"));
        assert!(!index.has_object("mod"));
        assert!(!index.has_object("b"));
    }

    #[test]
    fn test_file_membership_is_exact() {
        let index = ResourceIndex::parse("files/out.csv\n");
        assert!(index.has_file("out.csv"));
        assert!(!index.has_file("out"));
        assert!(!index.has_file("missing.csv"));
    }

    #[test]
    fn test_empty_body() {
        assert!(ResourceIndex::parse("").is_empty());
        assert!(ResourceIndex::parse("\n\n").is_empty());
    }
}

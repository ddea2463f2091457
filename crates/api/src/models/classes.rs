use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A class rewritten (or removed, when `data` is `None`) by bytecode transformation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransformedClass {
    pub file_name: String,
    #[serde(with = "serde_bytes", default)]
    pub data: Option<Vec<u8>>,
}

impl TransformedClass {
    pub fn replaced(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data: Some(data),
        }
    }

    pub fn removed(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            data: None,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.data.is_none()
    }
}

/// Transformed classes grouped by the jar they were read from.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct TransformedClasses {
    by_jar: IndexMap<PathBuf, Vec<TransformedClass>>,
}

impl TransformedClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, jar: impl Into<PathBuf>, class: TransformedClass) {
        self.by_jar.entry(jar.into()).or_default().push(class);
    }

    pub fn is_empty(&self) -> bool {
        self.by_jar.is_empty()
    }

    pub fn for_jar(&self, jar: &Path) -> &[TransformedClass] {
        self.by_jar.get(jar).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every file name touched in `jar`, replaced or removed.
    pub fn files_for_jar(&self, jar: &Path) -> BTreeSet<String> {
        self.for_jar(jar)
            .iter()
            .map(|c| c.file_name.clone())
            .collect()
    }

    pub fn removed_for_jar(&self, jar: &Path) -> BTreeSet<String> {
        self.for_jar(jar)
            .iter()
            .filter(|c| c.is_removed())
            .map(|c| c.file_name.clone())
            .collect()
    }

    /// Jars sorted by path, and classes within a jar sorted by file name.
    pub fn sorted(&self) -> Vec<(&Path, Vec<&TransformedClass>)> {
        let mut jars: Vec<_> = self.by_jar.iter().collect();
        jars.sort_by(|a, b| a.0.cmp(b.0));
        jars.into_iter()
            .map(|(jar, classes)| {
                let mut classes: Vec<_> = classes.iter().collect();
                classes.sort_by(|a, b| a.file_name.cmp(&b.file_name));
                (jar.as_path(), classes)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransformedClass> {
        self.by_jar.values().flatten()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedClass {
    /// Binary name, e.g. `org.acme.Foo$Bar` (slash-separated internal names are accepted too).
    pub name: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl GeneratedClass {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn binary_name(&self) -> String {
        self.name.replace('/', ".")
    }

    pub fn resource_name(&self) -> String {
        format!("{}.class", self.name.replace('.', "/"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResource {
    pub name: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl GeneratedResource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_is_stable_over_insertion_order() {
        let mut classes = TransformedClasses::new();
        classes.add("/repo/z.jar", TransformedClass::replaced("b/B.class", vec![1]));
        classes.add("/repo/a.jar", TransformedClass::removed("x/Y.class"));
        classes.add("/repo/z.jar", TransformedClass::replaced("a/A.class", vec![2]));

        let sorted = classes.sorted();
        assert_eq!(sorted[0].0, Path::new("/repo/a.jar"));
        assert_eq!(sorted[1].1[0].file_name, "a/A.class");
        assert_eq!(sorted[1].1[1].file_name, "b/B.class");
    }

    #[test]
    fn test_removed_for_jar() {
        let mut classes = TransformedClasses::new();
        classes.add("/repo/a.jar", TransformedClass::removed("x/Y.class"));
        classes.add("/repo/a.jar", TransformedClass::replaced("x/Z.class", vec![]));

        let jar = Path::new("/repo/a.jar");
        assert_eq!(classes.removed_for_jar(jar).len(), 1);
        assert_eq!(classes.files_for_jar(jar).len(), 2);
        assert!(classes.for_jar(Path::new("/repo/b.jar")).is_empty());
    }

    #[test]
    fn test_generated_class_names() {
        let class = GeneratedClass::new("org.acme.Foo$Bar", vec![]);
        assert_eq!(class.resource_name(), "org/acme/Foo$Bar.class");
        let class = GeneratedClass::new("org/acme/Foo", vec![]);
        assert_eq!(class.binary_name(), "org.acme.Foo");
        assert_eq!(class.resource_name(), "org/acme/Foo.class");
    }
}

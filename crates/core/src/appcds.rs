use crate::error::{PackageError, Result};
use jarforge_api::{GeneratedClass, TransformedClasses};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CLASS_LIST: &str = "generatedAndTransformed.lst";

/// Lists the classes the build produced or rewrote so an AppCDS archive can include them.
pub fn write_class_list(
    directory: &Path,
    generated: &[GeneratedClass],
    transformed: &TransformedClasses,
) -> Result<PathBuf> {
    let mut classes = String::new();
    for class in generated {
        classes.push_str(&class.binary_name());
        classes.push('\n');
    }
    for class in transformed.iter().filter(|c| !c.is_removed()) {
        let name = class
            .file_name
            .strip_suffix(".class")
            .unwrap_or(&class.file_name);
        classes.push_str(&name.replace('/', "."));
        classes.push('\n');
    }

    std::fs::create_dir_all(directory).map_err(PackageError::io(directory))?;
    let path = directory.join(CLASS_LIST);
    std::fs::write(&path, classes).map_err(PackageError::io(&path))?;
    debug!("Wrote AppCDS class list {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarforge_api::TransformedClass;
    use tempfile::tempdir;

    #[test]
    fn test_class_list() {
        let dir = tempdir().unwrap();
        let generated = vec![
            GeneratedClass::new("org/acme/Gen$1", vec![]),
            GeneratedClass::new("org.acme.Other", vec![]),
        ];
        let mut transformed = TransformedClasses::new();
        transformed.add("/r/a.jar", TransformedClass::replaced("org/lib/Fixed.class", vec![1]));
        transformed.add("/r/a.jar", TransformedClass::removed("org/lib/Gone.class"));

        let path = write_class_list(dir.path(), &generated, &transformed).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "org.acme.Gen$1\norg.acme.Other\norg.lib.Fixed\n"
        );
    }
}

use jarforge_core::descriptor::ApplicationDescriptor;
use jarforge_core::layout::fast_jar::APPLICATION_DAT;
use jarforge_core::layout::legacy::AOT_DESCRIPTOR_ENTRY;
use jarforge_core::layout::mutable::{
    APPMODEL_DAT, DEPLOYMENT_CLASS_PATH_DAT, read_application_model, read_deployment_class_path,
};
use jarforge_core::{PackageError, content};
use std::path::Path;

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", decode(path)?);
    Ok(())
}

fn decode(path: &Path) -> Result<String, PackageError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let json = match name.as_str() {
        APPMODEL_DAT => serde_json::to_string_pretty(&read_application_model(path)?)?,
        DEPLOYMENT_CLASS_PATH_DAT => serde_json::to_string_pretty(&read_deployment_class_path(path)?)?,
        APPLICATION_DAT => serde_json::to_string_pretty(&ApplicationDescriptor::read(path)?)?,
        _ if name.ends_with(".jar") => {
            let bytes = content::read(path, AOT_DESCRIPTOR_ENTRY)?.ok_or_else(|| {
                PackageError::Configuration(vec![format!(
                    "{} does not contain {}",
                    path.display(),
                    AOT_DESCRIPTOR_ENTRY
                )])
            })?;
            serde_json::to_string_pretty(&ApplicationDescriptor::from_bytes(&bytes)?)?
        }
        _ => {
            return Err(PackageError::Configuration(vec![format!(
                "Don't know how to decode {}",
                path.display()
            )]));
        }
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_decode_descriptor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(APPLICATION_DAT);
        let descriptor = ApplicationDescriptor {
            main_class: "org.acme.Main".to_string(),
            jars: Vec::new(),
            parent_first: vec!["lib/boot/a.jar".to_string()],
            non_existent_resources: Vec::new(),
            resource_index: None,
        };
        descriptor.write(&path).unwrap();

        let json = decode(&path).unwrap();
        assert!(json.contains("\"main_class\": \"org.acme.Main\""));
        assert!(json.contains("lib/boot/a.jar"));
    }

    #[test]
    fn test_unknown_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(decode(&path), Err(PackageError::Configuration(_))));
    }
}

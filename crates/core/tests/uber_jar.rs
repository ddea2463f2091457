mod common;

use chrono::{TimeZone, Utc};
use common::*;
use jarforge_api::{GeneratedResource, TransformedClass};
use jarforge_archive::MANIFEST_PATH;
use jarforge_archive::manifest::{CLASS_PATH, MAIN_CLASS, MULTI_RELEASE};
use jarforge_core::{Format, FormatRequirement, JarType, PackageConfig};

fn uber_config() -> PackageConfig {
    let mut config = config();
    config.jar.kind = JarType::UberJar;
    config
}

#[test]
fn test_service_files_are_concatenated_in_dependency_order() {
    let project = Project::new();
    let first = project.jar(
        "first-1.0.jar",
        &[("META-INF/services/com.example.Spi", b"org.first.Impl")],
    );
    let second = project.jar(
        "second-1.0.jar",
        &[("META-INF/services/com.example.Spi", b"org.second.Impl")],
    );
    let inputs = project.inputs(vec![dep("first", &first), dep("second", &second)]);

    let config = uber_config();
    let produced = engine(&config).assemble(&inputs, &config).unwrap();

    assert_eq!(produced.format, Format::UberJar);
    assert_eq!(
        read_entry(&produced.runner, "META-INF/services/com.example.Spi").unwrap(),
        b"org.first.Impl\norg.second.Impl\n"
    );
}

#[test]
fn test_uber_jar_contents() {
    let project = Project::new();
    let lib_a = project.jar(
        "lib-a-1.0.jar",
        &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\nMain-Class: org.lib.Tool\r\n\r\n"),
            ("META-INF/LIB.SF", b"sig"),
            ("META-INF/LICENSE", b"license"),
            ("org/lib/A.class", b"a"),
            ("shared.txt", b"from lib-a"),
        ],
    );
    let lib_b = project.jar(
        "lib-b-1.0.jar",
        &[
            ("org/libb/B.class", b"b"),
            ("shared.txt", b"from lib-b"),
            ("META-INF/versions/11/org/libb/B.class", b"b11"),
        ],
    );
    let provided_jar = project.jar("provided-1.0.jar", &[("org/p/P.class", b"p")]);
    let inputs = project.inputs(vec![
        dep("lib-a", &lib_a),
        dep("lib-b", &lib_b),
        provided("provided", &provided_jar),
    ]);

    let config = uber_config();
    let produced = engine(&config).assemble(&inputs, &config).unwrap();
    let runner = &produced.runner;

    assert_eq!(*runner, project.target.join("app-1.0-runner.jar"));
    assert!(produced.library_dir.is_none());
    assert_eq!(produced.classifier.as_deref(), Some("runner"));

    let files = file_names(runner);
    assert_eq!(files[0], MANIFEST_PATH);
    for expected in ["org/acme/Main.class", "org/lib/A.class", "org/libb/B.class"] {
        assert!(files.contains(&expected.to_string()), "{expected} missing");
    }
    assert!(!files.contains(&"META-INF/LIB.SF".to_string()));
    assert!(!files.contains(&"META-INF/LICENSE".to_string()));
    assert!(!files.iter().any(|f| f.starts_with("org/p/")));
    assert_eq!(read_entry(runner, "shared.txt").unwrap(), b"from lib-a");

    let manifest = manifest(runner);
    let main = manifest.main_attributes();
    assert_eq!(main.get(MAIN_CLASS), Some("org.acme.Main"));
    assert_eq!(main.get(CLASS_PATH), None);
    assert_eq!(main.get(MULTI_RELEASE), Some("true"));

    let sbom = produced.manifest_config.unwrap();
    let main_component = sbom.main_component.unwrap();
    assert_eq!(main_component.path.as_deref(), Some("app-1.0-runner.jar"));
    assert_eq!(main_component.dependencies.len(), 2);
}

#[test]
fn test_build_output_shadows_dependency_content() {
    let project = Project::new();
    let lib_a = project.jar(
        "lib-a-1.0.jar",
        &[
            ("org/lib/Fixed.class", b"old"),
            ("org/lib/Gone.class", b"gone"),
            ("application.properties", b"greeting=lib"),
            ("META-INF/generated.txt", b"lib"),
        ],
    );
    let mut inputs = project.inputs(vec![dep("lib-a", &lib_a)]);
    inputs
        .transformed_classes
        .add(&lib_a, TransformedClass::replaced("org/lib/Fixed.class", b"new".to_vec()));
    inputs
        .transformed_classes
        .add(&lib_a, TransformedClass::removed("org/lib/Gone.class"));
    inputs.generated_resources = vec![GeneratedResource::new("META-INF/generated.txt", b"build".to_vec())];

    let config = uber_config();
    let produced = engine(&config).assemble(&inputs, &config).unwrap();
    let runner = &produced.runner;

    assert_eq!(read_entry(runner, "org/lib/Fixed.class").unwrap(), b"new");
    assert!(read_entry(runner, "org/lib/Gone.class").is_none());
    assert_eq!(read_entry(runner, "META-INF/generated.txt").unwrap(), b"build");
    assert_eq!(read_entry(runner, "application.properties").unwrap(), b"greeting=hello");
}

#[test]
fn test_configured_merges_and_ignores() {
    let project = Project::new();
    let lib_a = project.jar(
        "lib-a-1.0.jar",
        &[("META-INF/spring.handlers", b"a=A"), ("META-INF/unwanted.txt", b"x")],
    );
    let lib_b = project.jar("lib-b-1.0.jar", &[("META-INF/spring.handlers", b"b=B")]);
    let mut inputs = project.inputs(vec![dep("lib-a", &lib_a), dep("lib-b", &lib_b)]);
    inputs.uber_ignored_resources = vec!["META-INF/unwanted.txt".to_string()];

    let mut config = uber_config();
    config.jar.user_merged_resources = vec!["META-INF/spring.handlers".to_string()];
    let produced = engine(&config).assemble(&inputs, &config).unwrap();

    assert_eq!(
        read_entry(&produced.runner, "META-INF/spring.handlers").unwrap(),
        b"a=A\nb=B\n"
    );
    assert!(read_entry(&produced.runner, "META-INF/unwanted.txt").is_none());
}

#[test]
fn test_original_jar_is_reported() {
    let project = Project::new();
    std::fs::create_dir_all(&project.target).unwrap();
    let plain = project.target.join("app-1.0.jar");
    write_jar(&plain, &[("org/acme/Main.class", b"main")]);
    let inputs = project.inputs(Vec::new());

    let config = uber_config();
    let produced = engine(&config).assemble(&inputs, &config).unwrap();
    assert_eq!(produced.original_jar, Some(plain));
}

#[test]
fn test_empty_runner_suffix_replaces_plain_jar() {
    let project = Project::new();
    std::fs::create_dir_all(&project.target).unwrap();
    let plain = project.target.join("app-1.0.jar");
    write_jar(&plain, &[("stale.txt", b"old")]);
    let inputs = project.inputs(Vec::new());

    let mut config = uber_config();
    config.runner_suffix = String::new();
    let produced = engine(&config).assemble(&inputs, &config).unwrap();

    assert_eq!(produced.runner, plain);
    assert_eq!(produced.original_jar, None);
    assert_eq!(produced.classifier, None);
    let files = file_names(&produced.runner);
    assert!(files.contains(&"org/acme/Main.class".to_string()));
    assert!(!files.contains(&"stale.txt".to_string()));
    let leftovers: Vec<String> = list_dir(&project.target)
        .into_iter()
        .filter(|n| n.starts_with('.'))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn test_extension_requirement_forces_uber_jar() {
    let project = Project::new();
    let mut inputs = project.inputs(Vec::new());
    inputs.format_requirements = vec![FormatRequirement::UberJar];

    let config = config();
    let produced = engine(&config).assemble(&inputs, &config).unwrap();
    assert_eq!(produced.format, Format::UberJar);
    assert!(!project.target.join("quarkus-app").exists());
}

#[test]
fn test_reproducible_with_fixed_timestamp() {
    let build = || {
        let project = Project::new();
        let lib_a = project.jar(
            "lib-a-1.0.jar",
            &[
                ("META-INF/services/com.example.Spi", b"org.lib.Impl"),
                ("org/lib/A.class", b"a"),
            ],
        );
        let inputs = project.inputs(vec![dep("lib-a", &lib_a)]);
        let mut config = uber_config();
        config.output_timestamp = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let produced = engine(&config).assemble(&inputs, &config).unwrap();
        std::fs::read(produced.runner).unwrap()
    };
    assert_eq!(build(), build());
}

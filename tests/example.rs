//! Integration tests for the `example` commands.
use powerprep::cli::RunOpts;
use powerprep::cli::example::{example_names, extract_example, handle_example_run_command};
use powerprep::scenario::ScenarioInputs;
use powerprep::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("POWERPREP_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..Default::default()
    };
    handle_example_run_command("simple", &opts, Some(Settings::default())).unwrap();
    assert!(tempdir.path().join("clusters.csv").is_file());
}

/// Check that every bundled example can be extracted and loaded
#[test]
fn test_extract_examples() {
    assert!(example_names().contains(&"simple"));

    for name in example_names() {
        let tempdir = tempdir().unwrap();
        let path = tempdir.path().join(name);
        extract_example(name, &path).unwrap();
        ScenarioInputs::from_path(&path).unwrap();

        // Can't extract over an existing directory
        assert!(extract_example(name, &path).is_err());
    }
}

#[test]
fn test_extract_unknown_example() {
    let tempdir = tempdir().unwrap();
    assert_eq!(
        extract_example("missing", &tempdir.path().join("missing"))
            .unwrap_err()
            .to_string(),
        "Example not found."
    );
}

use anyhow::Result;

use crate::config::{Config, ControlVersion, DEFAULT_CTL_BINARY, DEFAULT_HOME, DEFAULT_STRUCTURED_OUTPUT_VERSION};

#[test]
fn config_deserializes_from_full_env() -> Result<()> {
    let config: Config = envy::from_iter(vec![
        ("RUST_LOG".into(), "debug".into()),
        ("HOME".into(), "/home/rabbit".into()),
        ("CTL_BINARY".into(), "/usr/sbin/rabbitmqctl".into()),
        ("CTL_VERSION".into(), "3.8.9-1".into()),
        ("STRUCTURED_OUTPUT_VERSION".into(), "3.9".into()),
    ])?;

    assert!(config.rust_log == "debug", "unexpected value parsed for RUST_LOG, got {}, expected {}", config.rust_log, "debug");
    assert!(config.home == "/home/rabbit", "unexpected value parsed for HOME, got {}, expected {}", config.home, "/home/rabbit");
    assert!(
        config.ctl_binary == "/usr/sbin/rabbitmqctl",
        "unexpected value parsed for CTL_BINARY, got {}, expected {}",
        config.ctl_binary,
        "/usr/sbin/rabbitmqctl"
    );
    let expected_version: ControlVersion = "3.8.9".parse()?;
    assert!(
        config.ctl_version.as_ref() == Some(&expected_version),
        "unexpected value parsed for CTL_VERSION, got {:?}, expected {:?}",
        config.ctl_version,
        expected_version
    );
    assert!(!config.requires_structured_output(), "expected 3.8.9 to be below a 3.9 threshold");

    Ok(())
}

#[test]
fn config_deserializes_from_sparse_env() -> Result<()> {
    let config: Config = envy::from_iter(Vec::<(String, String)>::new())?;

    assert!(config.rust_log == "info", "unexpected default for RUST_LOG, got {}", config.rust_log);
    assert!(config.home == DEFAULT_HOME, "unexpected default for HOME, got {}, expected {}", config.home, DEFAULT_HOME);
    assert!(
        config.ctl_binary == DEFAULT_CTL_BINARY,
        "unexpected default for CTL_BINARY, got {}, expected {}",
        config.ctl_binary,
        DEFAULT_CTL_BINARY
    );
    assert!(config.ctl_version.is_none(), "expected CTL_VERSION to default to None, got {:?}", config.ctl_version);
    let expected_threshold: ControlVersion = DEFAULT_STRUCTURED_OUTPUT_VERSION.parse()?;
    assert_eq!(config.structured_output_version, expected_threshold, "unexpected default structured output threshold");
    assert!(!config.requires_structured_output(), "unknown versions must use the legacy status invocation");

    Ok(())
}

#[test]
fn structured_output_required_at_threshold() -> Result<()> {
    for (version, expected) in [("3.7.28", false), ("3.8.0", true), ("3.8", true), ("3.10.2-1.el8", true), ("4.0.0", true)] {
        let config: Config = envy::from_iter(vec![("CTL_VERSION".to_string(), version.to_string())])?;
        assert_eq!(
            config.requires_structured_output(),
            expected,
            "unexpected structured output requirement for version {}",
            version
        );
    }
    Ok(())
}

#[test]
fn invalid_version_is_rejected() {
    let res = envy::from_iter::<_, Config>(vec![("CTL_VERSION".to_string(), "3.x.1".to_string())]);
    assert!(res.is_err(), "expected an error for a non-numeric version component, got {:?}", res);
}

#[test]
fn version_ordering_ignores_trailing_zeros() -> Result<()> {
    let short: ControlVersion = "3.8".parse()?;
    let long: ControlVersion = "3.8.0".parse()?;
    let newer: ControlVersion = "3.10.0".parse()?;
    assert_eq!(short, long, "expected 3.8 and 3.8.0 to compare equal");
    assert!(newer > long, "expected 3.10.0 to be newer than 3.8.0");
    assert_eq!(newer.to_string(), "3.10.0");
    Ok(())
}

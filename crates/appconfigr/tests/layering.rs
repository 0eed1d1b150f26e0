use appconfigr::resolver::from_environment;
use appconfigr::{AppConfig, AppConfigr, ConfigError, Format, Properties, VariableResolver};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, PartialEq)]
struct Server {
    host: String,
    port: u16,
    #[serde(default)]
    features: Vec<String>,
}

#[derive(Debug, Deserialize, AppConfig)]
struct Endpoint {
    host: String,
    port: u16,
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write config");
}

#[test]
fn overlays_take_precedence_in_order() {
    let base = tempfile::tempdir().expect("base");
    let site = tempfile::tempdir().expect("site");
    let local = tempfile::tempdir().expect("local");
    write(
        base.path(),
        "server.conf",
        "host: 0.0.0.0\nport: 80\nfeatures: [a, b]\n",
    );
    write(site.path(), "server.conf", "port: 8080\nfeatures: [c]\n");
    write(local.path(), "server.conf", "port: 9090\n");

    let configs = AppConfigr::from_directory(base.path())
        .overlay_directory(site.path())
        .overlay_directory(local.path())
        .build()
        .unwrap();

    let server: Server = configs.bind("server.conf").expect("merged server");
    assert_eq!(
        server,
        Server {
            host: "0.0.0.0".into(),
            port: 9090,
            features: vec!["c".into()],
        }
    );
}

#[test]
fn file_only_in_overlay_is_found() {
    let base = tempfile::tempdir().expect("base");
    let overlay = tempfile::tempdir().expect("overlay");
    write(overlay.path(), "server.conf", "host: h\nport: 1\n");

    let configs = AppConfigr::from_directory(base.path())
        .overlay_directory(overlay.path())
        .build()
        .unwrap();
    assert_eq!(configs.document("server.conf").unwrap(), json!({ "host": "h", "port": 1 }));
}

#[test]
fn missing_overlay_directory_is_skipped() {
    let base = tempfile::tempdir().expect("base");
    write(base.path(), "server.conf", "host: h\nport: 1\n");

    let configs = AppConfigr::from_directory(base.path())
        .overlay_directory(base.path().join("does-not-exist"))
        .build()
        .unwrap();
    let server: Server = configs.bind("server.conf").unwrap();
    assert_eq!(server.port, 1);
    assert_eq!(configs.overlays().len(), 1);
}

#[test]
fn null_in_overlay_keeps_base_value() {
    let base = tempfile::tempdir().expect("base");
    let overlay = tempfile::tempdir().expect("overlay");
    write(base.path(), "server.conf", "host: h\nport: 1\n");
    write(overlay.path(), "server.conf", "host:\nport: 2\n");

    let configs = AppConfigr::from_directory(base.path())
        .overlay_directory(overlay.path())
        .build()
        .unwrap();
    let server: Server = configs.bind("server.conf").unwrap();
    assert_eq!(server.host, "h");
    assert_eq!(server.port, 2);
}

#[test]
fn toml_format_applies_to_every_directory() {
    let base = tempfile::tempdir().expect("base");
    let overlay = tempfile::tempdir().expect("overlay");
    write(base.path(), "server.conf", "host = \"h\"\nport = 1\n");
    write(overlay.path(), "server.conf", "port = 2\n");

    let configs = AppConfigr::from_directory(base.path())
        .overlay_directory(overlay.path())
        .format(Format::Toml)
        .build()
        .unwrap();
    assert_eq!(configs.format(), Format::Toml);
    let server: Server = configs.bind("server.conf").unwrap();
    assert_eq!((server.host.as_str(), server.port), ("h", 2));
}

#[test]
fn parse_errors_name_the_offending_file() {
    let base = tempfile::tempdir().expect("base");
    write(base.path(), "server.conf", "host: [unclosed\n");

    let configs = AppConfigr::from_directory(base.path()).build().unwrap();
    match configs.document("server.conf") {
        Err(ConfigError::Parse { format, path, .. }) => {
            assert_eq!(format, Format::Yaml);
            assert_eq!(path, base.path().join("server.conf"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn dotenv_file_seeds_properties() {
    let base = tempfile::tempdir().expect("base");
    write(base.path(), "endpoint.conf", "host: ${LAYERING_HOST}\nport: ${LAYERING_PORT}\n");
    write(base.path(), ".env", "LAYERING_HOST=from-dotenv\nLAYERING_PORT=7000\n");

    let configs = AppConfigr::from_directory(base.path())
        .dotenv_file(base.path().join(".env"))
        .property("LAYERING_PORT", "7001")
        .build()
        .unwrap();
    let endpoint: Endpoint = configs.config().unwrap();
    assert_eq!(endpoint.host, "from-dotenv");
    assert_eq!(endpoint.port, 7001);
}

#[test]
fn plain_bind_keeps_substituted_values_as_strings() {
    let base = tempfile::tempdir().expect("base");
    write(base.path(), "server.conf", "host: h\nport: ${LAYERING_RAW_PORT}\n");

    let configs = AppConfigr::from_directory(base.path())
        .property("LAYERING_RAW_PORT", "7001")
        .build()
        .unwrap();
    assert_eq!(
        configs.document("server.conf").unwrap(),
        json!({ "host": "h", "port": "7001" })
    );
    assert!(matches!(
        configs.bind::<Server>("server.conf"),
        Err(ConfigError::Bind { .. })
    ));
    let endpoint: Endpoint = configs.config_named("server.conf").unwrap();
    assert_eq!(endpoint.port, 7001);
}

#[test]
fn references_in_comments_are_ignored() {
    let base = tempfile::tempdir().expect("base");
    write(
        base.path(),
        "server.conf",
        "# set host to ${LAYERING_SURELY_UNSET_HOST} in production\nhost: h\nport: 1\n",
    );

    let configs = AppConfigr::from_directory(base.path()).build().unwrap();
    let server: Server = configs.bind("server.conf").expect("comment not resolved");
    assert_eq!(server.host, "h");
}

#[test]
fn quoted_references_work_in_toml_and_json() {
    let base = tempfile::tempdir().expect("base");
    write(
        base.path(),
        "endpoint.conf",
        "host = \"${LAYERING_TOML_HOST}\"\nport = \"${LAYERING_TOML_PORT}\"\n",
    );
    write(
        base.path(),
        "endpoint.json",
        r#"{"host": "${LAYERING_TOML_HOST}", "port": "${LAYERING_TOML_PORT}"}"#,
    );
    let props: Properties = [
        ("LAYERING_TOML_HOST", "a \"quoted\" = host"),
        ("LAYERING_TOML_PORT", "99"),
    ]
    .into_iter()
    .collect();

    let toml = AppConfigr::from_directory(base.path())
        .format(Format::Toml)
        .resolver(props.clone())
        .build()
        .unwrap();
    let endpoint: Endpoint = toml.config().unwrap();
    assert_eq!((endpoint.host.as_str(), endpoint.port), ("a \"quoted\" = host", 99));

    let json = AppConfigr::from_directory(base.path())
        .format(Format::Json)
        .resolver(props)
        .build()
        .unwrap();
    let endpoint: Endpoint = json.config_named("endpoint.json").unwrap();
    assert_eq!((endpoint.host.as_str(), endpoint.port), ("a \"quoted\" = host", 99));
}

#[test]
fn missing_dotenv_file_fails_the_build() {
    let base = tempfile::tempdir().expect("base");
    let result = AppConfigr::from_directory(base.path())
        .dotenv_file(base.path().join("missing.env"))
        .build();
    assert!(matches!(result, Err(ConfigError::Dotenv(_))));
}

#[test]
fn custom_resolver_replaces_the_chain() {
    struct Upper;
    impl VariableResolver for Upper {
        fn resolve(&self, name: &str) -> appconfigr::Resolution {
            appconfigr::Resolution::Found(name.to_uppercase())
        }
    }

    let base = tempfile::tempdir().expect("base");
    write(base.path(), "server.conf", "host: ${db.host}\nport: 5\n");

    let configs = AppConfigr::from_directory(base.path())
        .property("db.host", "ignored")
        .resolver(Upper)
        .build()
        .unwrap();
    let server: Server = configs.bind("server.conf").unwrap();
    assert_eq!(server.host, "DB.HOST");
}

#[test]
fn chained_resolvers_plug_into_the_builder() {
    let base = tempfile::tempdir().expect("base");
    write(base.path(), "server.conf", "host: ${CHAIN_HOST}\nport: 5\n");

    let primary: Properties = [("OTHER", "x")].into_iter().collect();
    let secondary: Properties = [("CHAIN_HOST", "second")].into_iter().collect();
    let configs = AppConfigr::from_directory(base.path())
        .resolver(primary.with_fallback(from_environment()).with_fallback(secondary))
        .build()
        .unwrap();
    let server: Server = configs.bind("server.conf").unwrap();
    assert_eq!(server.host, "second");
}

#[test]
fn bind_type_mismatch_names_the_document() {
    let base = tempfile::tempdir().expect("base");
    write(base.path(), "server.conf", "host: h\nport: not-a-port\n");

    let configs = AppConfigr::from_directory(base.path()).build().unwrap();
    match configs.bind::<Server>("server.conf") {
        Err(err @ ConfigError::Bind { .. }) => {
            assert!(err.to_string().starts_with("cannot bind configuration [server.conf]"));
        }
        other => panic!("expected bind error, got {other:?}"),
    }
}

#[test]
fn empty_file_binds_as_empty_mapping() {
    let base = tempfile::tempdir().expect("base");
    write(base.path(), "empty.conf", "");

    let configs = AppConfigr::from_directory(base.path()).build().unwrap();
    assert_eq!(configs.document("empty.conf").unwrap(), json!({}));
}

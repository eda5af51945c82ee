use assert_fs::NamedTempFile;
use assert_fs::prelude::*;
use kw_watch::MockClusterApi;

use super::*;

fn parse(args: &[&str]) -> Options {
    Options::try_parse_from([&["kwatch"][..], args].concat()).unwrap()
}

#[rstest]
fn test_defaults() {
    let config = build_config(&parse(&[])).unwrap();
    assert_eq!(config.namespace.as_deref(), Some(DEFAULT_NAMESPACE));
    assert!(config.kinds.is_empty());
    assert!(!config.watch_all);
}

#[rstest]
fn test_all_namespaces() {
    let config = build_config(&parse(&["--all-namespaces", "--namespace", "foo"])).unwrap();
    assert_eq!(config.namespace, None);
}

#[rstest]
fn test_explicit_kind_is_resolved_later() {
    let config = build_config(&parse(&["--kind", "Deployment", "--api-version", "apps/v1", "-n", "prod"])).unwrap();
    assert_eq!(config.namespace.as_deref(), Some("prod"));
    assert!(config.kinds.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_explicit_kind_cluster_scoped() {
    let mut api = MockClusterApi::new();
    api.expect_api_resources()
        .withf(|api_version| api_version == "v1")
        .times(1)
        .returning(|_| Ok(serde_json::from_value(core_v1_discovery()).unwrap()));

    let args = parse(&["--kind", "Namespace", "--api-version", "v1"]);
    let kind = explicit_kind(&args, &api).await.unwrap();

    assert_eq!(kind, ResourceKind::new("", "v1", NAMESPACE_KIND, false).with_plural("namespaces"));
}

#[rstest]
#[tokio::test]
async fn test_explicit_kind_lookup_fails() {
    let mut api = MockClusterApi::new();
    api.expect_api_resources()
        .times(1)
        .returning(|gv| Err(kw_watch::WatchError::discovery_failed(gv)));

    let args = parse(&["--kind", "Widget", "--api-version", "example.com/v1"]);
    let kind = explicit_kind(&args, &api).await.unwrap();

    assert!(kind.namespaced());
    assert_eq!(kind.plural(), "widgets");
}

#[rstest]
#[tokio::test]
async fn test_no_explicit_kind() {
    let mut api = MockClusterApi::new();
    api.expect_api_resources().never();

    assert_eq!(explicit_kind(&parse(&["--all"]), &api).await, None);
}

#[rstest]
#[case::kind_only(&["--kind", "Pod"])]
#[case::api_version_only(&["--api-version", "v1"])]
fn test_kind_requires_api_version(#[case] args: &[&str]) {
    assert!(Options::try_parse_from([&["kwatch"][..], args].concat()).is_err());
}

#[rstest]
fn test_watch_all() {
    let config = build_config(&parse(&["--all"])).unwrap();
    assert!(config.watch_all);
}

#[rstest]
fn test_config_file_precedence() {
    // Removed when dropped, even if an assertion fails
    let file = NamedTempFile::new("kwatch.yml").unwrap();
    file.write_str("namespace: from-file\nkinds:\n  - apiVersion: v1\n    kind: ConfigMap\n")
        .unwrap();
    let filename = file.path().to_str().unwrap();

    let config = build_config(&parse(&["--config-file", filename])).unwrap();
    assert_eq!(config.namespace.as_deref(), Some("from-file"));
    assert_eq!(config.kinds, vec![ResourceKind::new("", "v1", CONFIG_MAP_KIND, true)]);

    let config = build_config(&parse(&["-c", filename, "-n", "from-flag"])).unwrap();
    assert_eq!(config.namespace.as_deref(), Some("from-flag"));

    let config = build_config(&parse(&["-c", filename, "-A"])).unwrap();
    assert_eq!(config.namespace, None);
}

#[rstest]
fn test_missing_config_file() {
    assert!(build_config(&parse(&["--config-file", "/this/file/does/not/exist.yml"])).is_err());
}

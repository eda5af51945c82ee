use std::fs::File;

use kw_core::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

fn default_namespaced() -> bool {
    true
}

/// One entry in the `kinds` list of a config file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindEntry {
    pub api_version: String,
    pub kind: String,

    #[serde(default = "default_namespaced")]
    pub namespaced: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
}

impl From<KindEntry> for ResourceKind {
    fn from(entry: KindEntry) -> Self {
        let kind = ResourceKind::from_api_version(&entry.api_version, &entry.kind, entry.namespaced);
        match entry.plural {
            Some(p) => kind.with_plural(&p),
            None => kind,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    namespace: Option<String>,

    #[serde(default)]
    watch_all: bool,

    #[serde(default)]
    kinds: Vec<KindEntry>,
}

/// What the supervisor should watch, and where.
///
/// `namespace` scopes every namespaced kind; `None` means all namespaces.  If `kinds` is
/// non-empty it wins, otherwise `watch_all` selects every watchable kind the cluster serves, and
/// with neither set the supervisor falls back to [`DEFAULT_WATCHED_KINDS`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct WatcherConfig {
    pub namespace: Option<String>,
    pub kinds: Vec<ResourceKind>,
    pub watch_all: bool,
}

impl From<ConfigFile> for WatcherConfig {
    fn from(input: ConfigFile) -> Self {
        WatcherConfig {
            namespace: input.namespace,
            kinds: input.kinds.into_iter().map(ResourceKind::from).collect(),
            watch_all: input.watch_all,
        }
    }
}

impl WatcherConfig {
    pub fn load(filename: &str) -> anyhow::Result<WatcherConfig> {
        Ok(serde_yaml::from_reader(File::open(filename)?)?)
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<WatcherConfig> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

use std::collections::HashSet;

use kw_core::prelude::*;
use tracing::*;

use crate::cluster::ClusterApi;
use crate::errors::*;

/// Ask the cluster for every resource type it serves and keep the ones that can be watched.
///
/// Group-versions that fail to list are logged and skipped; discovery only fails outright if
/// nothing at all could be listed.
pub async fn discover_watchable(api: &dyn ClusterApi) -> anyhow::Result<Vec<ResourceKind>> {
    let catalog = api.api_catalog().await?;
    for (gv, reason) in &catalog.failures {
        warn!("could not list resources for {gv}, skipping: {reason}");
    }

    if catalog.resource_lists.is_empty() && !catalog.failures.is_empty() {
        return Err(WatchError::discovery_failed(&format!(
            "no resource lists available ({} group-versions failed)",
            catalog.failures.len()
        )));
    }

    let kinds = watchable_kinds(&catalog.resource_lists);
    info!("discovered {} watchable resource types", kinds.len());
    Ok(kinds)
}

/// Look up a single kind in its group-version's resource list so that it picks up the server's
/// namespaced flag and plural.  If the lookup fails, or the kind isn't listed, the kind is assumed
/// to be namespaced and the plural comes from the static table.
pub async fn resolve_kind(api: &dyn ClusterApi, api_version: &str, kind: &str) -> ResourceKind {
    let fallback = || ResourceKind::from_api_version(api_version, kind, true);

    let list = match api.api_resources(api_version).await {
        Ok(list) => list,
        Err(err) => {
            warn!("could not look up {kind} in {api_version}, assuming it is namespaced: {err}");
            return fallback();
        },
    };

    match list.resources.iter().find(|r| r.kind == kind && !r.name.contains('/')) {
        Some(res) => ResourceKind::from_api_version(api_version, kind, res.namespaced).with_plural(&res.name),
        None => {
            warn!("{api_version} does not list {kind}, assuming it is namespaced");
            fallback()
        },
    }
}

/// Flatten a set of resource lists into the kinds that support the "watch" verb.
/// Subresources (anything with a "/" in its name, like "pods/log") are never watchable on their
/// own, and a given (group-version, kind, name) triple only shows up once.
pub fn watchable_kinds(lists: &[metav1::APIResourceList]) -> Vec<ResourceKind> {
    let mut seen = HashSet::new();
    let mut kinds = vec![];

    for list in lists {
        for res in &list.resources {
            if res.name.contains('/') || !res.verbs.iter().any(|v| v == WATCH_VERB) {
                continue;
            }

            if !seen.insert((list.group_version.clone(), res.kind.clone(), res.name.clone())) {
                continue;
            }

            debug!("found watchable resource {} ({})", res.name, list.group_version);
            kinds.push(ResourceKind::from_api_version(&list.group_version, &res.kind, res.namespaced).with_plural(&res.name));
        }
    }

    kinds
}

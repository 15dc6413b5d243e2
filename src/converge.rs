use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

use crate::error::Error;
use crate::options::{ExpectOption, GroupSelector, SelectOption};
use crate::retry;
use crate::store::GameServerStore;
use crate::types::GameServer;

/// GameServerSets to scan, plus the only GameServer names to accept when ids were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    pub gss_names: Vec<String>,
    pub gs_names: HashSet<String>,
}

/// Why a GameServer was left out of the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotSelectedId,
    OpsStateMismatch,
    NetworkDisabledMismatch,
    ExcludedImage,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::NotSelectedId => "not in selected ids",
            Rejection::OpsStateMismatch => "opsState mismatch",
            Rejection::NetworkDisabledMismatch => "networkDisabled mismatch",
            Rejection::ExcludedImage => "runs an excluded image",
        }
    }
}

/// Repeats full passes every `interval` until one succeeds or `timeout` runs out.
/// Nothing is carried over between passes.
pub async fn converge<S>(
    store: &S,
    select: &SelectOption,
    expect: &ExpectOption,
    interval: Duration,
    timeout: Duration,
) -> Result<Vec<GameServer>, Error>
where
    S: GameServerStore + ?Sized,
{
    retry::poll_until_timeout(interval, timeout, move || run_once(store, select, expect))
        .await
        .map_err(|timed_out| Error::Timeout {
            timeout,
            last_error: timed_out.last_error.map(Box::new),
        })
}

/// One full pass: resolve, select and update. Returns the updated GameServers.
pub async fn run_once<S>(
    store: &S,
    select: &SelectOption,
    expect: &ExpectOption,
) -> Result<Vec<GameServer>, Error>
where
    S: GameServerStore + ?Sized,
{
    let selected = select_game_servers(store, select).await?;
    update_game_servers(store, &select.namespace, &selected, expect).await?;
    Ok(selected)
}

pub async fn resolve_candidates<S>(store: &S, select: &SelectOption) -> Result<Candidates, Error>
where
    S: GameServerStore + ?Sized,
{
    let gss_names = match &select.groups {
        GroupSelector::Named(names) => names.clone(),
        GroupSelector::All => store
            .list_game_server_sets(&select.namespace)
            .await
            .map_err(Error::ListGameServerSetsFailed)?
            .iter()
            .map(|gss| gss.name())
            .collect(),
    };

    let gs_names = gss_names
        .iter()
        .flat_map(|gss_name| {
            select
                .ids
                .iter()
                .map(move |id| format!("{}-{}", gss_name, id))
        })
        .collect();

    Ok(Candidates { gss_names, gs_names })
}

/// Lists the GameServers of every candidate GameServerSet and keeps those
/// meeting all configured criteria, in listing order.
pub async fn select_game_servers<S>(
    store: &S,
    select: &SelectOption,
) -> Result<Vec<GameServer>, Error>
where
    S: GameServerStore + ?Sized,
{
    let candidates = resolve_candidates(store, select).await?;

    let mut selected = Vec::new();
    for gss_name in &candidates.gss_names {
        let game_servers = store
            .list_game_servers(&select.namespace, gss_name)
            .await
            .map_err(|source| Error::ListGameServersFailed {
                gss: gss_name.clone(),
                source,
            })?;

        for gs in game_servers {
            match check(store, select, &candidates, &gs).await? {
                None => selected.push(gs),
                Some(rejection) => {
                    tracing::debug!(name = %gs.name(), reason = rejection.as_str(), "skipping GameServer");
                }
            }
        }
    }

    let names = selected.iter().map(|gs| gs.name()).collect::<Vec<_>>();
    tracing::info!(?names, "selected GameServers");

    Ok(selected)
}

/// Runs the criteria cheapest first. The pod is only fetched when every
/// metadata criterion already matched.
async fn check<S>(
    store: &S,
    select: &SelectOption,
    candidates: &Candidates,
    gs: &GameServer,
) -> Result<Option<Rejection>, Error>
where
    S: GameServerStore + ?Sized,
{
    if let Some(rejection) = check_metadata(select, candidates, gs) {
        return Ok(Some(rejection));
    }

    if select.not_container_image.is_empty() {
        return Ok(None);
    }

    let name = gs.name();
    let pod = store
        .get_pod(&select.namespace, &name)
        .await
        .map_err(|source| Error::GetPodFailed { name, source })?;

    if runs_excluded_image(&container_images(&pod), &select.not_container_image) {
        Ok(Some(Rejection::ExcludedImage))
    } else {
        Ok(None)
    }
}

fn check_metadata(
    select: &SelectOption,
    candidates: &Candidates,
    gs: &GameServer,
) -> Option<Rejection> {
    if !candidates.gs_names.is_empty() && !candidates.gs_names.contains(&gs.name()) {
        return Some(Rejection::NotSelectedId);
    }

    if let Some(ops_state) = select.ops_state.as_ref() {
        if &gs.spec.ops_state != ops_state {
            return Some(Rejection::OpsStateMismatch);
        }
    }

    if let Some(network_disabled) = select.network_disabled {
        if gs.spec.network_disabled != network_disabled {
            return Some(Rejection::NetworkDisabledMismatch);
        }
    }

    None
}

fn container_images(pod: &Pod) -> BTreeMap<String, String> {
    pod.spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| {
                    (
                        container.name.clone(),
                        container.image.clone().unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn runs_excluded_image(
    actual: &BTreeMap<String, String>,
    excluded: &BTreeMap<String, String>,
) -> bool {
    excluded
        .iter()
        .any(|(container, image)| actual.get(container) == Some(image))
}

impl ExpectOption {
    /// Copy of `gs` with the requested fields overwritten.
    pub fn apply(&self, gs: &GameServer) -> GameServer {
        let mut gs = gs.clone();
        if let Some(network_disabled) = self.network_disabled {
            gs.spec.network_disabled = network_disabled;
        }
        if let Some(ops_state) = self.ops_state.as_ref() {
            gs.spec.ops_state = ops_state.clone();
        }
        gs
    }
}

/// Writes the expected fields to each GameServer, stopping at the first failure.
pub async fn update_game_servers<S>(
    store: &S,
    namespace: &str,
    game_servers: &[GameServer],
    expect: &ExpectOption,
) -> Result<(), Error>
where
    S: GameServerStore + ?Sized,
{
    for gs in game_servers {
        let updated = expect.apply(gs);
        let namespace = gs.namespace().unwrap_or_else(|| namespace.to_string());

        store
            .update_game_server(&namespace, &updated)
            .await
            .map_err(|source| Error::UpdateGameServerFailed {
                name: gs.name(),
                source,
            })?;

        tracing::info!(
            name = %gs.name(),
            ops_state = %updated.spec.ops_state,
            network_disabled = updated.spec.network_disabled,
            "updated GameServer"
        );
    }
    Ok(())
}

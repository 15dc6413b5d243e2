use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use crate::types::{GameServer, GameServerSet, OWNER_GSS_LABEL};

/// Read/write access to the resources the updater works on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameServerStore: Send + Sync {
    /// Lists every GameServerSet in `namespace`.
    async fn list_game_server_sets(&self, namespace: &str) -> Result<Vec<GameServerSet>, kube::Error>;

    /// Lists the GameServers owned by the GameServerSet `gss_name`.
    async fn list_game_servers(
        &self,
        namespace: &str,
        gss_name: &str,
    ) -> Result<Vec<GameServer>, kube::Error>;

    /// Fetches the pod backing a GameServer, which shares its name.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, kube::Error>;

    /// Replaces the whole GameServer object.
    async fn update_game_server(
        &self,
        namespace: &str,
        game_server: &GameServer,
    ) -> Result<GameServer, kube::Error>;
}

pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GameServerStore for KubeStore {
    async fn list_game_server_sets(&self, namespace: &str) -> Result<Vec<GameServerSet>, kube::Error> {
        let gss_api = Api::<GameServerSet>::namespaced(self.client.clone(), namespace);
        Ok(gss_api.list(&ListParams::default()).await?.items)
    }

    async fn list_game_servers(
        &self,
        namespace: &str,
        gss_name: &str,
    ) -> Result<Vec<GameServer>, kube::Error> {
        let gs_api = Api::<GameServer>::namespaced(self.client.clone(), namespace);
        let label_selector = format!("{}={}", OWNER_GSS_LABEL, gss_name);
        Ok(gs_api
            .list(&ListParams::default().labels(&label_selector))
            .await?
            .items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, kube::Error> {
        let pod_api = Api::<Pod>::namespaced(self.client.clone(), namespace);
        pod_api.get(name).await
    }

    async fn update_game_server(
        &self,
        namespace: &str,
        game_server: &GameServer,
    ) -> Result<GameServer, kube::Error> {
        let gs_api = Api::<GameServer>::namespaced(self.client.clone(), namespace);
        gs_api
            .replace(&game_server.name(), &PostParams::default(), game_server)
            .await
    }
}

use crate::{
    error::{ClientError, ClientResult},
    game::Mode,
    update::ApplyPlan,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

const USER_AGENT: &str = "twcompanion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub slug: String,
    pub name: String,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    #[serde(rename = "targetFile")]
    pub target_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub mode: Mode,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub exists: HashMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemActionRequest {
    pub slug: String,
    pub mode: Mode,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
}

/// Standard `{ok, error?, needAdmin?}` reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub need_admin: bool,
}

impl Envelope {
    pub fn into_result(self) -> ClientResult<()> {
        classify(self.ok, self.need_admin, self.error)
    }
}

fn classify(ok: bool, need_admin: bool, error: Option<String>) -> ClientResult<()> {
    if need_admin {
        return Err(ClientError::Permission(
            error.unwrap_or_else(|| "Administrator rights are required".to_string()),
        ));
    }
    if !ok {
        return Err(ClientError::Domain(
            error.unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckRequest {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
}

/// Remote file that differs from the local copy. Passed back untouched on apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    pub path: String,
    #[serde(default)]
    pub size_expected: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub backup_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub update_needed: bool,
    #[serde(default)]
    pub items: Vec<UpdateItem>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyUpdatesRequest {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    pub items: Vec<UpdateItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailedUpdate {
    pub path: String,
    #[serde(alias = "error", default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyUpdatesResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub failed: Vec<FailedUpdate>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub need_admin: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdateStatus {
    #[serde(default)]
    pub update_needed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub version: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUpdateStatus {
    #[serde(default)]
    pub update_available: bool,
    #[serde(default)]
    pub latest_version: Option<ReleaseInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectPathResponse {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionConfig {
    pub win_mode: u8,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialState {
    #[serde(default)]
    pub plus_exists: bool,
    #[serde(default)]
    pub plus_up_exists: bool,
    #[serde(default)]
    pub custom_path: Option<String>,
    #[serde(default)]
    pub default_path_exists: bool,
}

/// Request/response contract with the local backend service.
pub trait Backend: Send + Sync {
    fn initial_state(&self) -> ClientResult<InitialState>;
    fn items(&self, category: &str) -> ClientResult<Vec<CatalogItem>>;
    fn status(&self, request: &StatusRequest) -> ClientResult<HashMap<String, bool>>;
    fn install(&self, request: &ItemActionRequest) -> ClientResult<()>;
    fn uninstall(&self, request: &ItemActionRequest) -> ClientResult<()>;
    fn check_updates(&self, request: &UpdateCheckRequest) -> ClientResult<UpdateCheckResponse>;
    fn apply_updates(&self, plan: &ApplyPlan) -> ClientResult<ApplyUpdatesResponse>;
    fn game_update_status(&self) -> ClientResult<GameUpdateStatus>;
    fn run_game_patcher(&self) -> ClientResult<()>;
    fn check_app_update(&self) -> ClientResult<AppUpdateStatus>;
    fn apply_app_update(&self, release: &ReleaseInfo) -> ClientResult<()>;
    fn select_path(&self) -> ClientResult<SelectPathResponse>;
    fn reset_path(&self) -> ClientResult<()>;
    fn resolution_config(&self) -> ClientResult<ResolutionConfig>;
    fn save_resolution_config(&self, config: &ResolutionConfig) -> ClientResult<()>;
    fn relaunch_admin(&self) -> ClientResult<()>;
    fn launch(&self, mode: Mode) -> ClientResult<()>;
}

/// Backend reached over HTTP with JSON bodies.
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(120))
            .timeout_write(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    fn get_data<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.agent.get(&self.url(path)).call()?;
        Ok(response.into_json()?)
    }

    fn post_data<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.agent.post(&self.url(path)).send_json(body)?;
        Ok(response.into_json()?)
    }

    /// Envelope endpoints report failures with error status codes and a JSON body.
    fn post_reply<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> ClientResult<T> {
        let request = self.agent.post(&self.url(path));
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(err.into()),
        };
        Ok(response.into_json()?)
    }

    fn post_envelope<B: Serialize>(&self, path: &str, body: Option<&B>) -> ClientResult<()> {
        self.post_reply::<B, Envelope>(path, body)?.into_result()
    }
}

impl Backend for HttpBackend {
    fn initial_state(&self) -> ClientResult<InitialState> {
        self.get_data("get-initial-state")
    }

    fn items(&self, category: &str) -> ClientResult<Vec<CatalogItem>> {
        let items: Option<Vec<CatalogItem>> = self.get_data(&format!("items/{category}"))?;
        Ok(items.unwrap_or_default())
    }

    fn status(&self, request: &StatusRequest) -> ClientResult<HashMap<String, bool>> {
        let response: StatusResponse = self.post_data("status", request)?;
        Ok(response.exists)
    }

    fn install(&self, request: &ItemActionRequest) -> ClientResult<()> {
        self.post_envelope("install", Some(request))
    }

    fn uninstall(&self, request: &ItemActionRequest) -> ClientResult<()> {
        self.post_envelope("uninstall", Some(request))
    }

    fn check_updates(&self, request: &UpdateCheckRequest) -> ClientResult<UpdateCheckResponse> {
        self.post_reply("check-updates", Some(request))
    }

    fn apply_updates(&self, plan: &ApplyPlan) -> ClientResult<ApplyUpdatesResponse> {
        self.post_reply("apply-updates", Some(plan.request()))
    }

    fn game_update_status(&self) -> ClientResult<GameUpdateStatus> {
        self.get_data("game-update-status")
    }

    fn run_game_patcher(&self) -> ClientResult<()> {
        self.post_envelope::<()>("run-game-patcher", None)
    }

    fn check_app_update(&self) -> ClientResult<AppUpdateStatus> {
        self.get_data("check-app-update")
    }

    fn apply_app_update(&self, release: &ReleaseInfo) -> ClientResult<()> {
        self.post_envelope("apply-app-update", Some(release))
    }

    fn select_path(&self) -> ClientResult<SelectPathResponse> {
        let response = match self.agent.post(&self.url("select-path")).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => {
                let envelope: Envelope = response.into_json()?;
                envelope.into_result()?;
                return Ok(SelectPathResponse::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(response.into_json()?)
    }

    fn reset_path(&self) -> ClientResult<()> {
        let response = match self.agent.post(&self.url("reset-path")).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => {
                let envelope: Envelope = response.into_json()?;
                return envelope.into_result();
            }
            Err(err) => return Err(err.into()),
        };
        // Success replies with the refreshed initial state; only the status matters here.
        let _ = response.into_string();
        Ok(())
    }

    fn resolution_config(&self) -> ClientResult<ResolutionConfig> {
        self.get_data("resolution-config")
    }

    fn save_resolution_config(&self, config: &ResolutionConfig) -> ClientResult<()> {
        self.post_envelope("resolution-config", Some(config))
    }

    fn relaunch_admin(&self) -> ClientResult<()> {
        self.post_envelope::<()>("relaunch-admin", None)
    }

    fn launch(&self, mode: Mode) -> ClientResult<()> {
        self.post_envelope::<()>(&format!("launch/{}", mode.as_str()), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_admin_wins_over_ok_flag() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"ok":false,"error":"access denied","needAdmin":true}"#)
                .expect("envelope");
        assert_eq!(
            envelope.into_result(),
            Err(ClientError::Permission("access denied".to_string()))
        );

        let envelope: Envelope =
            serde_json::from_str(r#"{"ok":false,"error":"item not found"}"#).expect("envelope");
        assert_eq!(
            envelope.into_result(),
            Err(ClientError::Domain("item not found".to_string()))
        );

        let envelope: Envelope = serde_json::from_str(r#"{"ok":true}"#).expect("envelope");
        assert_eq!(envelope.into_result(), Ok(()));
    }

    #[test]
    fn catalog_item_uses_wire_names() {
        let raw = r#"{"name":"Clean Room","slug":"clean-room","category":"room",
            "fileURL":"https://cdn/x.bin","imageURL":"https://cdn/x.png","targetFile":"room/x.bin"}"#;
        let item: CatalogItem = serde_json::from_str(raw).expect("item");
        assert_eq!(item.slug, "clean-room");
        assert_eq!(item.image_url, "https://cdn/x.png");
        assert_eq!(item.target_file, "room/x.bin");
    }

    #[test]
    fn failed_update_accepts_error_key() {
        let raw = r#"{"ok":false,"failed":[{"path":"edata/a.pak","error":"locked"}],"message":"done"}"#;
        let response: ApplyUpdatesResponse = serde_json::from_str(raw).expect("response");
        assert_eq!(response.failed[0].reason, "locked");
        assert!(!response.need_admin);
    }

    #[test]
    fn request_bodies_are_camel_case() {
        let request = ItemActionRequest {
            slug: "fast-ui".to_string(),
            mode: Mode::PlusUp,
            category: "interface".to_string(),
            custom_path: Some("D:\\TW".to_string()),
        };
        let value = serde_json::to_value(&request).expect("json");
        assert_eq!(value["mode"], "plusup");
        assert_eq!(value["customPath"], "D:\\TW");

        let request = StatusRequest {
            mode: Mode::Plus,
            files: vec!["a".to_string()],
            custom_path: None,
        };
        let value = serde_json::to_value(&request).expect("json");
        assert!(value.get("customPath").is_none());
    }

    #[test]
    fn app_update_status_tolerates_missing_release() {
        let status: AppUpdateStatus =
            serde_json::from_str(r#"{"updateAvailable":false}"#).expect("status");
        assert!(status.latest_version.is_none());
    }
}

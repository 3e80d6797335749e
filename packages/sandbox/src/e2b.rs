// ABOUTME: HTTP sandbox client for the E2B execution provider
// ABOUTME: Maps the provider REST API onto the SandboxClient/SandboxHandle traits

use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{SandboxClient, SandboxHandle};
use crate::error::{Result, SandboxError};
use crate::types::{CodeExecution, CommandOpts, CommandResult, ConnectOpts, CreateOpts};
use crucible_core::filetree::ProviderEntry;

const DEFAULT_API_URL: &str = "https://api.e2b.dev";

/// Provider configuration, read from the environment once at startup
///
/// A missing key is not a startup failure: it surfaces as a
/// Configuration error on the first call that needs it, so the operator
/// sees a 503 rather than a dead server.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub api_key: Option<String>,
    pub api_url: String,
}

impl SandboxConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("E2B_API_KEY").ok().filter(|key| !key.is_empty()),
            api_url: env::var("E2B_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        }
    }
}

/// Reqwest-backed client for the provider REST API
pub struct HttpSandboxClient {
    http: Client,
    config: SandboxConfig,
}

impl HttpSandboxClient {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(SandboxConfig::from_env())
    }

    fn resolve_key(&self, override_key: Option<&str>) -> Result<String> {
        override_key
            .map(String::from)
            .or_else(|| self.config.api_key.clone())
            .ok_or_else(|| {
                SandboxError::Configuration("E2B_API_KEY is not set".to_string())
            })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSandboxRequest<'a> {
    template: &'a str,
    timeout_ms: u64,
    metadata: &'a HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSandboxResponse {
    sandbox_id: String,
}

#[derive(Serialize)]
struct WriteFileRequest<'a> {
    path: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ReadFileResponse {
    content: String,
}

#[derive(Serialize)]
struct RunCommandRequest<'a> {
    command: &'a str,
    envs: &'a HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<&'a str>,
}

#[derive(Serialize)]
struct RunCodeRequest<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct GetHostResponse {
    host: String,
}

#[async_trait]
impl SandboxClient for HttpSandboxClient {
    async fn create(&self, template: &str, opts: CreateOpts) -> Result<Box<dyn SandboxHandle>> {
        let api_key = self.resolve_key(opts.api_key.as_deref())?;

        debug!("Creating sandbox from template {}", template);
        let response = self
            .http
            .post(format!("{}/sandboxes", self.config.api_url))
            .header("X-API-Key", &api_key)
            .json(&CreateSandboxRequest {
                template,
                timeout_ms: opts.timeout_ms,
                metadata: &opts.metadata,
            })
            .send()
            .await?;

        let created: CreateSandboxResponse = decode(response).await?;
        info!("Created sandbox {} ({})", created.sandbox_id, template);

        Ok(Box::new(HttpSandboxHandle {
            http: self.http.clone(),
            api_url: self.config.api_url.clone(),
            api_key,
            sandbox_id: created.sandbox_id,
            template: template.to_string(),
        }))
    }

    async fn connect(&self, sandbox_id: &str, opts: ConnectOpts) -> Result<Box<dyn SandboxHandle>> {
        let api_key = self.resolve_key(opts.api_key.as_deref())?;

        debug!("Connecting to sandbox {}", sandbox_id);
        let response = self
            .http
            .post(format!(
                "{}/sandboxes/{}/connect",
                self.config.api_url, sandbox_id
            ))
            .header("X-API-Key", &api_key)
            .json(&serde_json::json!({ "timeoutMs": opts.timeout_ms }))
            .send()
            .await?;

        let connected: CreateSandboxResponse = decode(response).await?;

        Ok(Box::new(HttpSandboxHandle {
            http: self.http.clone(),
            api_url: self.config.api_url.clone(),
            api_key,
            sandbox_id: connected.sandbox_id,
            template: String::new(),
        }))
    }
}

/// Handle to one live sandbox; owned exclusively by the run that created it
struct HttpSandboxHandle {
    http: Client,
    api_url: String,
    api_key: String,
    sandbox_id: String,
    template: String,
}

impl HttpSandboxHandle {
    fn url(&self, suffix: &str) -> String {
        format!("{}/sandboxes/{}/{}", self.api_url, self.sandbox_id, suffix)
    }
}

#[async_trait]
impl SandboxHandle for HttpSandboxHandle {
    fn sandbox_id(&self) -> &str {
        &self.sandbox_id
    }

    fn template(&self) -> &str {
        &self.template
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("files"))
            .header("X-API-Key", &self.api_key)
            .json(&WriteFileRequest { path, content })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let response = self
            .http
            .get(self.url("files"))
            .header("X-API-Key", &self.api_key)
            .query(&[("path", path)])
            .send()
            .await?;
        let body: ReadFileResponse = decode(response).await?;
        Ok(body.content)
    }

    async fn list_files(&self, path: &str) -> Result<Vec<ProviderEntry>> {
        let response = self
            .http
            .get(self.url("files/list"))
            .header("X-API-Key", &self.api_key)
            .query(&[("path", path), ("depth", "16")])
            .send()
            .await?;
        decode(response).await
    }

    async fn run_command(&self, command: &str, opts: CommandOpts) -> Result<CommandResult> {
        debug!("Running command in sandbox {}: {}", self.sandbox_id, command);
        let response = self
            .http
            .post(self.url("commands"))
            .header("X-API-Key", &self.api_key)
            .json(&RunCommandRequest {
                command,
                envs: &opts.envs,
                cwd: opts.cwd.as_deref(),
            })
            .send()
            .await?;
        decode(response).await
    }

    async fn run_code(&self, code: &str) -> Result<CodeExecution> {
        debug!("Executing code in sandbox {}", self.sandbox_id);
        let response = self
            .http
            .post(self.url("code"))
            .header("X-API-Key", &self.api_key)
            .json(&RunCodeRequest { code })
            .send()
            .await?;
        decode(response).await
    }

    async fn get_host(&self, port: u16) -> Result<String> {
        let response = self
            .http
            .get(self.url("host"))
            .header("X-API-Key", &self.api_key)
            .query(&[("port", port.to_string())])
            .send()
            .await?;
        let body: GetHostResponse = decode(response).await?;
        Ok(body.host)
    }

    async fn kill(&self) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/sandboxes/{}", self.api_url, self.sandbox_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Reject non-2xx responses with the provider's own message attached
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SandboxError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check(response).await?;
    Ok(response.json::<T>().await?)
}

//! reqwest adapter for the recruitment backend's REST API.

mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{CredentialStore, Credentials, RefreshCoordinator, RefreshError, TokenRefresher};
use crate::config::BackendConfig;
use crate::workflows::applications::{
    AnalysisResult, ApplicantDirectory, ApplicantId, ApplicantProfile, Application,
    ApplicationGateway, ApplicationId, ApplicationSummary, JobDirectory, JobId, JobOpening,
    NewApplication, ServiceError,
};

use wire::{
    error_message, AnalysisDto, ApplicantDto, ApplicationDto, CreateApplicationDto, JobDto,
    RefreshRequestDto, RefreshResponseDto, SummaryDto,
};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Authenticated client for the job, applicant and application endpoints.
///
/// A 401 triggers one shared token refresh and a single replay of the request.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    refresh: RefreshCoordinator<HttpTokenRefresher>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, store: CredentialStore) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let refresher = Arc::new(HttpTokenRefresher {
            client: client.clone(),
            base_url: config.base_url.clone(),
        });
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            refresh: RefreshCoordinator::new(refresher, store),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.refresh.store()
    }

    async fn get<T>(&self, path: &str, resource: &'static str) -> Result<T, ServiceError>
    where
        T: DeserializeOwned,
    {
        self.call::<T, ()>(Method::GET, path, None, resource).await
    }

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        resource: &'static str,
    ) -> Result<T, ServiceError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = format!("{}/{}", self.base_url, path);
        let token = self.credentials().access_token();
        let mut response = self
            .dispatch(method.clone(), &url, body, token.as_deref())
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let Some(stale) = token else {
                return Err(ServiceError::Unauthorized("no session".to_string()));
            };
            debug!(%url, "access token rejected, refreshing");
            let fresh = self
                .refresh
                .refresh_from(&stale)
                .await
                .map_err(|error| ServiceError::Unauthorized(error.to_string()))?;
            response = self
                .dispatch(method, &url, body, Some(&fresh.access_token))
                .await?;
        }

        decode(response, resource).await
    }

    async fn dispatch<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ServiceError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut request = self.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(|error| {
            warn!(%url, %error, "backend request failed");
            ServiceError::Unavailable(error.to_string())
        })
    }
}

async fn decode<T>(response: reqwest::Response, resource: &'static str) -> Result<T, ServiceError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| ServiceError::Unavailable(error.to_string()))?;

    if !status.is_success() {
        return Err(classify(status, &body, resource));
    }
    serde_json::from_str(&body).map_err(|error| ServiceError::Decode(error.to_string()))
}

fn classify(status: StatusCode, body: &str, resource: &'static str) -> ServiceError {
    let message = error_message(body);
    match status.as_u16() {
        404 => ServiceError::NotFound { resource },
        409 => ServiceError::Conflict(message),
        401 => ServiceError::Unauthorized(message),
        400..=499 => ServiceError::Validation(message),
        code => ServiceError::Server {
            status: code,
            message,
        },
    }
}

#[async_trait]
impl JobDirectory for HttpBackend {
    async fn job(&self, id: JobId) -> Result<JobOpening, ServiceError> {
        let dto: JobDto = self.get(&format!("Job/{id}"), "job").await?;
        Ok(dto.into())
    }
}

#[async_trait]
impl ApplicantDirectory for HttpBackend {
    async fn profile(&self, id: ApplicantId) -> Result<ApplicantProfile, ServiceError> {
        let dto: ApplicantDto = self.get(&format!("Applicant/{id}"), "applicant").await?;
        Ok(dto.into())
    }
}

#[async_trait]
impl ApplicationGateway for HttpBackend {
    async fn create(&self, request: NewApplication) -> Result<Application, ServiceError> {
        let body = CreateApplicationDto::from(&request);
        let dto: ApplicationDto = self
            .call(Method::POST, "Application", Some(&body), "application")
            .await?;
        dto.into_application(&request)
    }

    async fn analyze(&self, id: ApplicationId) -> Result<AnalysisResult, ServiceError> {
        let dto: AnalysisDto = self
            .get(&format!("Application/analyze/{id}"), "application")
            .await?;
        Ok(dto.into_result(id))
    }

    async fn list(&self, applicant: ApplicantId) -> Result<Vec<ApplicationSummary>, ServiceError> {
        let rows: Vec<SummaryDto> = self
            .get(
                &format!("ApplicantDashboard/{applicant}/Applications"),
                "applicant",
            )
            .await?;
        Ok(rows.into_iter().map(ApplicationSummary::from).collect())
    }
}

/// Calls `Account/RefreshToken` with the stale pair.
pub struct HttpTokenRefresher {
    client: Client,
    base_url: String,
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, stale: &Credentials) -> Result<Credentials, RefreshError> {
        let refresh_token = stale
            .refresh_token
            .as_deref()
            .ok_or(RefreshError::MissingCredentials)?;
        let response = self
            .client
            .post(format!("{}/Account/RefreshToken", self.base_url))
            .json(&RefreshRequestDto::new(&stale.access_token, refresh_token))
            .send()
            .await
            .map_err(|error| RefreshError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| RefreshError::Transport(error.to_string()))?;
        if !status.is_success() {
            return Err(RefreshError::Rejected(error_message(&body)));
        }

        let dto: RefreshResponseDto = serde_json::from_str(&body)
            .map_err(|error| RefreshError::Rejected(error.to_string()))?;
        dto.into_credentials(stale)
    }
}

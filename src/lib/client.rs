//! HTTP access to the field-capture backends.

use super::activities::{
    sort_most_recent_first, Activity, MutationResponse, ScheduleActivityRequest,
    ScheduleActivityResponse,
};
use super::config::Config;
use super::envelope::{parse_leaders, ApiResponse, Envelope, Leader};
use super::error::{Error, Result};
use super::items::{ProjectUnit, RecognitionResponse, Report, ReportDraft};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

const DEFAULT_COORDINATES_TYPE: &str = "Point";
const DEFAULT_COORDINATES_DATA: &str = "[-76.5225, 3.4516]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub require_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions { require_auth: true }
    }
}

impl RequestOptions {
    pub const PUBLIC: RequestOptions = RequestOptions {
        require_auth: false,
    };
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(ApiClient { http, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute URLs are used as they are, anything else is appended to the
    /// configured API base.
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.config.api_url, endpoint)
        }
    }

    fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<RequestBuilder> {
        let url = self.resolve_url(endpoint);
        let builder = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");
        let builder = if options.require_auth {
            let token = self.config.token.as_ref().ok_or(Error::MissingToken)?;
            builder.bearer_auth(token)
        } else {
            builder
        };
        info!(%method, %url, "request");
        Ok(builder)
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, %body, "request failed");
            return Err(Error::Status { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        Self::send(self.request(Method::GET, endpoint, options)?).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T> {
        Self::send(self.request(Method::POST, endpoint, options)?.json(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T> {
        Self::send(self.request(Method::PUT, endpoint, options)?.json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        Self::send(self.request(Method::DELETE, endpoint, options)?).await
    }

    /// `GET /init/parques`
    pub async fn parks(&self) -> Result<Vec<ProjectUnit>> {
        let response: ApiResponse<ProjectUnit> =
            self.get("/init/parques", RequestOptions::default()).await?;
        response.into_data()
    }

    /// `GET /grupo-operativo/reportes`. A successful answer without a data
    /// list means there are no reports yet.
    pub async fn reports(&self) -> Result<Vec<Report>> {
        let response: ApiResponse<Report> = self
            .get("/grupo-operativo/reportes", RequestOptions::default())
            .await?;
        if !response.success {
            return Err(Error::InvalidResponse(
                response
                    .message
                    .unwrap_or_else(|| "reports request was not successful".into()),
            ));
        }
        Ok(response.data.unwrap_or_default())
    }

    /// Sends a recognition as multipart form data to the capture backend.
    /// The token is attached when one is configured.
    pub async fn submit_recognition(&self, draft: &ReportDraft) -> Result<RecognitionResponse> {
        let coordinates_data = match &draft.coordinates_data {
            Some(data) => data.clone(),
            None => {
                warn!(
                    fallback = DEFAULT_COORDINATES_DATA,
                    "recognition without coordinates"
                );
                DEFAULT_COORDINATES_DATA.into()
            }
        };
        let text = |field: &Option<String>| field.clone().unwrap_or_default();

        let mut form = Form::new()
            .text("tipo_intervencion", text(&draft.intervention_type))
            .text(
                "descripcion_intervencion",
                text(&draft.intervention_description),
            )
            .text("direccion", text(&draft.address))
            .text(
                "coordinates_type",
                draft
                    .coordinates_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_COORDINATES_TYPE.into()),
            )
            .text("coordinates_data", coordinates_data)
            .text("observaciones", text(&draft.observations));
        for photo in &draft.photos {
            let part = Part::bytes(photo.bytes.clone()).file_name(photo.file_name.clone());
            let part = match &photo.content_type {
                Some(content_type) => part.mime_str(content_type)?,
                None => part,
            };
            form = form.part("photos", part);
        }

        let url = format!(
            "{}/grupo-operativo/reconocimiento",
            self.config.capture_api_url
        );
        info!(%url, photos = draft.photos.len(), "submitting recognition");
        let mut builder = self.http.post(&url).header(ACCEPT, "application/json");
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| value.get("message")?.as_str().map(String::from));
            return Err(match message {
                Some(message) => Error::Rejected(message),
                None => Error::Status { status, body },
            });
        }

        let result: RecognitionResponse = serde_json::from_str(&body)?;
        if !result.success {
            return Err(Error::Rejected(result.message.unwrap_or_else(|| {
                "Error al registrar el reconocimiento".into()
            })));
        }
        info!(id = ?result.id, "recognition registered");
        Ok(result)
    }

    /// Activities of the district green plan, most recent first.
    pub async fn activities(&self) -> Result<Vec<Activity>> {
        let response: ApiResponse<Activity> = self
            .get("/actividades_plan_distrito_verde", RequestOptions::default())
            .await?;
        let mut activities = match response {
            ApiResponse {
                success: true,
                data: Some(data),
                ..
            } => data,
            _ => vec![],
        };
        sort_most_recent_first(&mut activities);
        Ok(activities)
    }

    /// Group-leader catalogue. Failures are logged and yield an empty list.
    pub async fn leaders(&self) -> Vec<Leader> {
        let result: Result<Envelope<Value>> =
            self.get(&self.config.leaders_url, RequestOptions::PUBLIC).await;
        match result {
            Ok(envelope) => parse_leaders(envelope),
            Err(err) => {
                error!(error = %err, "could not load group leaders");
                vec![]
            }
        }
    }

    pub async fn schedule_activity(
        &self,
        request: &ScheduleActivityRequest,
    ) -> Result<ScheduleActivityResponse> {
        let url = format!("{}/programar_actividad", self.config.activities_url);
        self.post(&url, request, RequestOptions::PUBLIC).await
    }

    /// `<activities>/plan_distrito_verde/<id>` with `id` percent-encoded.
    fn activity_url(&self, id: &str) -> Result<Url> {
        let base = &self.config.activities_url;
        let mut url =
            Url::parse(base).map_err(|err| Error::InvalidUrl(format!("{}: {}", base, err)))?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .push("plan_distrito_verde")
            .push(id);
        Ok(url)
    }

    pub async fn delete_activity(&self, id: &str) -> Result<MutationResponse> {
        let url = self.activity_url(id)?;
        self.delete(url.as_str(), RequestOptions::PUBLIC).await
    }

    pub async fn modify_activity(
        &self,
        id: &str,
        changes: &Map<String, Value>,
    ) -> Result<MutationResponse> {
        let url = self.activity_url(id)?;
        self.put(url.as_str(), changes, RequestOptions::PUBLIC).await
    }
}

//! Onshape REST client with basic authentication

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::core::api::CadApi;
use crate::core::config::ExporterConfig;
use crate::core::credentials::Credentials;
use crate::core::errors::{ExportError, Result};
use crate::core::models::{
    DocumentRef, ElementConfiguration, ElementInfo, EncodedConfiguration, EncodingRequest,
    ParameterValue, PartStudioMetadata, StlExportParams, TranslationJob, TranslationRequest,
};

/// Accept header for the versioned metadata endpoints
const ONSHAPE_JSON: &str = "application/vnd.onshape.v1+json";

/// Accept/Content-Type pair for the translation endpoints
const TRANSLATION_JSON: &str = "application/json;charset=UTF-8; qs=0.09";

const OCTET_STREAM: &str = "application/octet-stream";

/// HTTP implementation of [`CadApi`]
#[derive(Debug, Clone)]
pub struct OnshapeClient {
    client: reqwest::Client,
    /// Same settings, but 3xx responses are returned instead of followed
    no_redirect: reqwest::Client,
    base_url: Arc<str>,
    credentials: Arc<Credentials>,
}

impl OnshapeClient {
    /// Create a new client
    pub fn new(config: &ExporterConfig, credentials: Credentials) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(std::time::Duration::from_secs(30)))
            .build()?;
        let no_redirect = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            credentials: Arc::new(credentials),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str, accept: &'static str) -> RequestBuilder {
        debug!("[{}] {}", method, url);
        self.client
            .request(method, url)
            .basic_auth(&self.credentials.access_key, Some(&self.credentials.secret_key))
            .header(ACCEPT, HeaderValue::from_static(accept))
    }

    /// Send and map transport failures and non-success statuses to errors
    async fn send(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| ExportError::NetworkError {
            message: e.to_string(),
        })?;

        let status = response.status();
        debug!(" [HTTP {}] {}", status.as_u16(), response.url());

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ExportError::api(status.as_u16(), &body))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.request(Method::GET, &self.url(path), ONSHAPE_JSON);
        let response = Self::send(builder).await?;
        Self::parse_json(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, media_type: &'static str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(" JSON: {}", serde_json::to_string(body).unwrap_or_default());
        }
        let builder = self
            .request(Method::POST, &url, media_type)
            .header(CONTENT_TYPE, HeaderValue::from_static(media_type))
            .json(body);
        let response = Self::send(builder).await?;
        Self::parse_json(response).await
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExportError::NetworkError {
                message: e.to_string(),
            })?;
        debug!(" -> {} bytes received", bytes.len());

        serde_json::from_slice(&bytes).map_err(|e| ExportError::InvalidResponseError {
            message: e.to_string(),
        })
    }

    async fn read_bytes(response: Response) -> Result<Vec<u8>> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExportError::NetworkError {
                message: e.to_string(),
            })?;
        debug!(" -> {} bytes received", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CadApi for OnshapeClient {
    async fn list_elements(&self, doc: &DocumentRef) -> Result<Vec<ElementInfo>> {
        let path = format!(
            "/api/v6/documents/d/{}/w/{}/elements",
            doc.document_id, doc.workspace_id
        );
        self.get_json(&path).await
    }

    async fn part_studio_metadata(&self, doc: &DocumentRef) -> Result<PartStudioMetadata> {
        let path = format!(
            "/api/v6/partstudios/d/{}/w/{}/e/{}/metadata",
            doc.document_id, doc.workspace_id, doc.element_id
        );
        self.get_json(&path).await
    }

    async fn element_configuration(&self, doc: &DocumentRef) -> Result<ElementConfiguration> {
        let path = format!(
            "/api/v6/elements/d/{}/w/{}/e/{}/configuration",
            doc.document_id, doc.workspace_id, doc.element_id
        );
        self.get_json(&path).await
    }

    async fn encode_configuration(
        &self,
        doc: &DocumentRef,
        parameters: &[ParameterValue],
    ) -> Result<EncodedConfiguration> {
        let path = format!(
            "/api/v6/elements/d/{}/e/{}/configurationencodings",
            doc.document_id, doc.element_id
        );
        let body = EncodingRequest {
            parameters: parameters.to_vec(),
        };
        self.post_json(&path, &body, ONSHAPE_JSON).await
    }

    async fn create_translation(
        &self,
        doc: &DocumentRef,
        request: &TranslationRequest,
    ) -> Result<TranslationJob> {
        let path = format!(
            "/api/v6/partstudios/d/{}/w/{}/e/{}/translations",
            doc.document_id, doc.workspace_id, doc.element_id
        );
        self.post_json(&path, request, TRANSLATION_JSON).await
    }

    async fn translation_status(&self, translation_id: &str) -> Result<TranslationJob> {
        let url = self.url(&format!("/api/v6/translations/{}", translation_id));
        let response = Self::send(self.request(Method::GET, &url, TRANSLATION_JSON)).await?;
        Self::parse_json(response).await
    }

    async fn download_external_data(&self, doc: &DocumentRef, data_id: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!(
            "/api/v6/documents/d/{}/externaldata/{}",
            doc.document_id, data_id
        ));
        let response = Self::send(self.request(Method::GET, &url, OCTET_STREAM)).await?;
        Self::read_bytes(response).await
    }

    async fn export_stl(&self, doc: &DocumentRef, params: &StlExportParams) -> Result<Vec<u8>> {
        let url = self.url(&format!(
            "/api/v6/partstudios/d/{}/w/{}/e/{}/stl",
            doc.document_id, doc.workspace_id, doc.element_id
        ));
        debug!("[GET] {} Params: {:?}", url, params);

        // The first response is normally a redirect to the tessellation result
        let response = self
            .no_redirect
            .get(&url)
            .basic_auth(&self.credentials.access_key, Some(&self.credentials.secret_key))
            .header(ACCEPT, HeaderValue::from_static(OCTET_STREAM))
            .query(params)
            .send()
            .await
            .map_err(|e| ExportError::NetworkError {
                message: e.to_string(),
            })?;

        let location = response
            .status()
            .is_redirection()
            .then(|| response.headers().get(LOCATION))
            .flatten()
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let response = match location {
            Some(location) => {
                let target = response
                    .url()
                    .join(&location)
                    .map_err(|e| ExportError::InvalidResponseError {
                        message: format!("bad redirect location {}: {}", location, e),
                    })?;
                debug!("Following redirect to {}", target);
                let builder = self
                    .no_redirect
                    .get(target)
                    .basic_auth(&self.credentials.access_key, Some(&self.credentials.secret_key))
                    .header(ACCEPT, HeaderValue::from_static(OCTET_STREAM));
                Self::send(builder).await?
            }
            None if response.status().is_success() => response,
            None => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(ExportError::api(status, &body));
            }
        };

        Self::read_bytes(response).await
    }
}

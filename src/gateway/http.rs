//! Reqwest-backed gateway to the backend script endpoint.
//!
//! Reads go out as `GET` with query parameters, writes as `POST` with a JSON
//! body. Every response is a `{success, ...}` envelope.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use super::credential::{CredentialGuard, CredentialProvider};
use super::envelope::{Envelope, FilePayload, Request};
use super::types::{DriveFile, FileUpload, SheetData, UploadedFile, WriteResult};
use super::{RemoteGateway, SheetRange};
use crate::config::GatewayConfig;
use crate::{CrmError, LOG_TARGET, SharedClock};

pub struct HttpGateway {
    client: Client,
    endpoint: Url,
    credentials: CredentialGuard,
    clock: SharedClock,
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns `CrmError::ConfigurationError` when no endpoint is configured
    /// or the HTTP client cannot be built.
    pub fn new(
        config: &GatewayConfig,
        provider: Arc<dyn CredentialProvider>,
        clock: SharedClock,
    ) -> Result<Self, CrmError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            CrmError::ConfigurationError("gateway endpoint is not configured".to_owned())
        })?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CrmError::ConfigurationError(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            credentials: CredentialGuard::new(provider, clock.clone(), config.refresh_margin),
            clock,
        })
    }

    async fn get(&self, action: &str, params: &[(&str, &str)]) -> Result<Envelope, CrmError> {
        let token = self.credentials.token().await?;
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("accessToken", token.expose_secret());
        }
        self.send(self.client.get(url), action).await
    }

    async fn post(&self, body: &Request<'_>) -> Result<Envelope, CrmError> {
        let request = self.client.post(self.endpoint.clone()).json(body);
        self.send(request, body.action()).await
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Envelope, CrmError> {
        let result = async {
            let response = request
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| map_transport_error(action, &e))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| map_transport_error(action, &e))?;
            if !status.is_success() {
                return Err(map_status_error(action, status, &body));
            }

            let envelope: Envelope = serde_json::from_slice(&body).map_err(|e| {
                CrmError::Transport(format!("{action}: invalid response envelope: {e}"))
            })?;
            envelope.into_success(action)
        }
        .await;

        if let Err(e) = &result {
            log::error!(
                target: LOG_TARGET,
                "msg=\"backend call failed\", action={action}, error={e:?}"
            );
        }
        result
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_read_range", skip_all, err)
    )]
    async fn read_range(&self, range: &SheetRange) -> Result<SheetData, CrmError> {
        let requested = range.to_string();
        let envelope = self
            .get("getSheetData", &[("range", requested.as_str())])
            .await?;

        let (effective, values) = envelope
            .data
            .map(super::envelope::SheetPayload::into_parts)
            .unwrap_or_default();

        log::debug!(
            target: LOG_TARGET,
            "msg=\"sheet data loaded\", range=\"{requested}\", rows={}",
            values.len()
        );

        Ok(SheetData {
            range: effective.map_or_else(|| range.clone(), |r| SheetRange::parse(&r)),
            values,
            fetched_at: self.clock.utc(),
        })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_append_row", skip_all, err)
    )]
    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<WriteResult, CrmError> {
        let token = self.credentials.token().await?;
        let envelope = self
            .post(&Request::AppendSheetData {
                range: SheetRange::new(sheet, "A:A").to_string(),
                values: vec![row],
                access_token: &token,
            })
            .await?;

        Ok(write_result(envelope))
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_update_range", skip_all, err)
    )]
    async fn update_range(
        &self,
        range: &SheetRange,
        values: &[Vec<String>],
    ) -> Result<WriteResult, CrmError> {
        let token = self.credentials.token().await?;
        let envelope = self
            .post(&Request::UpdateSheetData {
                range: range.to_string(),
                values,
                access_token: &token,
            })
            .await?;

        Ok(write_result(envelope))
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_delete_row", skip_all, err)
    )]
    async fn delete_row(&self, sheet: &str, row_index: u32) -> Result<(), CrmError> {
        let token = self.credentials.token().await?;
        self.post(&Request::DeleteSheetRow {
            sheet,
            row_index,
            access_token: &token,
        })
        .await?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_upload_file", skip_all, err)
    )]
    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, CrmError> {
        let token = self.credentials.token().await?;
        let envelope = self
            .post(&Request::UploadFile {
                folder_id: &upload.folder_id,
                file: FilePayload {
                    name: &upload.file_name,
                    mime_type: &upload.mime_type,
                    bytes: BASE64.encode(&upload.bytes),
                },
                description: upload.description.as_deref(),
                access_token: &token,
            })
            .await?;

        let file_id = envelope.file_id.ok_or_else(|| {
            CrmError::Transport("uploadFile: response is missing fileId".to_owned())
        })?;
        Ok(UploadedFile {
            file_id,
            web_view_link: envelope.web_view_link,
        })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_list_files", skip_all, err)
    )]
    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, CrmError> {
        let envelope = self.get("listFiles", &[("folderId", folder_id)]).await?;
        Ok(envelope.files.unwrap_or_default())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_delete_file", skip_all, err)
    )]
    async fn delete_file(&self, file_id: &str) -> Result<(), CrmError> {
        let token = self.credentials.token().await?;
        self.post(&Request::DeleteFile {
            file_id,
            access_token: &token,
        })
        .await?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_sheet_id", skip_all, err)
    )]
    async fn sheet_id(&self, sheet: &str) -> Result<Option<u64>, CrmError> {
        let envelope = self.get("getSheetId", &[("sheetName", sheet)]).await?;
        Ok(envelope.sheet_id)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gateway_create_sheet", skip_all, err)
    )]
    async fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<u64, CrmError> {
        let token = self.credentials.token().await?;
        let envelope = self
            .post(&Request::CreateSheet {
                sheet_name: sheet,
                headers,
                access_token: &token,
            })
            .await?;

        envelope.sheet_id.ok_or_else(|| {
            CrmError::Transport("createSheet: response is missing sheetId".to_owned())
        })
    }
}

fn write_result(envelope: Envelope) -> WriteResult {
    WriteResult {
        updated_cells: envelope.updated_cells.unwrap_or(0),
        updated_range: envelope.updated_range,
    }
}

fn map_transport_error(action: &str, error: &reqwest::Error) -> CrmError {
    if error.is_timeout() {
        CrmError::Transport(format!("{action}: request timed out: {error}"))
    } else {
        CrmError::Transport(format!("{action}: {error}"))
    }
}

fn map_status_error(action: &str, status: StatusCode, body: &[u8]) -> CrmError {
    let preview = body_preview(body);
    if preview.is_empty() {
        CrmError::Transport(format!("{action}: status {}", status.as_u16()))
    } else {
        CrmError::Transport(format!("{action}: status {}: {preview}", status.as_u16()))
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

use droplite_core::{
    api::FileId,
    models::{files::FileRecord, theme::ThemeConfig},
    FileKind,
};
use log::warn;
use reqwest::{multipart, Client, Response, StatusCode};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with {0}")]
    Status(StatusCode),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Thin REST client for the droplite backend. Every call is a single attempt.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        ApiClient {
            client: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn download_url(&self, id: FileId) -> String {
        format!("{}/files/{}", self.base, id)
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>, ClientError> {
        let response = self
            .client
            .get(format!("{}/files", self.base))
            .send()
            .await?;
        let body: serde_json::Value = error_for_status(response)?.json().await?;
        Ok(coerce_records(body))
    }

    pub async fn upload_file(&self, filename: &str, data: Vec<u8>) -> Result<(), ClientError> {
        let mime = FileKind::from_filename(filename).mime_type(filename);
        let part = multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(format!("{}/files", self.base))
            .multipart(form)
            .send()
            .await?;
        error_for_status(response)?;
        Ok(())
    }

    /// Any 2xx (204 included) counts as deleted. Other statuses are not told apart.
    pub async fn delete_file(&self, id: FileId) -> Result<(), ClientError> {
        let response = self.client.delete(self.download_url(id)).send().await?;
        error_for_status(response)?;
        Ok(())
    }

    pub async fn download_file(&self, id: FileId) -> Result<Response, ClientError> {
        let response = self.client.get(self.download_url(id)).send().await?;
        error_for_status(response)
    }

    pub async fn get_theme(&self) -> Result<ThemeConfig, ClientError> {
        let response = self
            .client
            .get(format!("{}/theme", self.base))
            .send()
            .await?;
        Ok(error_for_status(response)?.json().await?)
    }

    pub async fn save_theme(&self, config: &ThemeConfig) -> Result<(), ClientError> {
        let response = self
            .client
            .post(format!("{}/theme", self.base))
            .json(config)
            .send()
            .await?;
        error_for_status(response)?;
        Ok(())
    }
}

fn error_for_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status(status))
    }
}

/// A non-array body becomes an empty list. Array elements that do not decode
/// as records are skipped one by one, the rest are kept.
pub fn coerce_records(body: serde_json::Value) -> Vec<FileRecord> {
    let serde_json::Value::Array(items) = body else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|x| match serde_json::from_value::<FileRecord>(x) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("Skipping malformed file record: {}", err);
                None
            }
        })
        .collect()
}

/// Extracts the file name from a `Content-Disposition: attachment; filename="..."`
/// header. Quoted names may contain `\"` and `\\` escapes.
pub fn attachment_filename(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let name = match rest.strip_prefix('"') {
        Some(quoted) => {
            let mut name = String::new();
            let mut chars = quoted.chars();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => name.extend(chars.next()),
                    c => name.push(c),
                }
            }
            name
        }
        None => rest.split(';').next()?.trim().to_string(),
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

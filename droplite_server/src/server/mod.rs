use std::{env::var, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use droplite_core::{
    allowed_extension,
    api::{FileId, UploadResponse},
    models::{files::FileRecord, theme::ThemeConfig},
};
use error::ApiError;
use models::theme::ThemePreferences;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::ServiceExt;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeFile,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

mod error;
mod models;

/// Droplite file server
#[derive(Parser, Debug)]
pub struct ServeCommand {
    /// Path to the server config file
    #[arg(short = 'c', long)]
    config: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct ServerConfigFile {
    pub database_url: Option<String>,
    pub port: Option<String>,
    pub uploads_directory: Option<String>,
    pub max_upload_bytes: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub uploads_directory: String,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Environment first, then the config file, then built-in defaults.
    pub fn resolve(file: Option<&ServerConfigFile>) -> anyhow::Result<Self> {
        Ok(ServerConfig {
            database_url: var("DATABASE_URL")
                .ok()
                .or(file.and_then(|x| x.database_url.clone()))
                .unwrap_or("sqlite://files.db?mode=rwc".to_string()),
            port: var("PORT")
                .ok()
                .or(file.and_then(|x| x.port.clone()))
                .unwrap_or("8080".to_string())
                .parse()
                .context("invalid port")?,
            uploads_directory: var("DROPLITE_UPLOADS_DIRECTORY")
                .ok()
                .or(file.and_then(|x| x.uploads_directory.clone()))
                .unwrap_or("uploads".to_string()),
            max_upload_bytes: match var("DROPLITE_MAX_UPLOAD_BYTES") {
                Ok(value) => value.parse().context("invalid upload limit")?,
                Err(_) => file
                    .and_then(|x| x.max_upload_bytes)
                    .unwrap_or(10 * 1024 * 1024 /* 10mb */),
            },
        })
    }
}

pub struct AppState {
    pub pool: SqlitePool,
    pub config: ServerConfig,
}

impl ServeCommand {
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!("Droplite Server v{}", env!("CARGO_PKG_VERSION"));

        let config_path = self.config.clone().unwrap_or(
            var("DROPLITE_CONFIG_PATH").unwrap_or("droplite.server.toml".to_string()),
        );
        let server_config_file = if let Ok(text) = std::fs::read_to_string(&config_path) {
            Some(toml::from_str::<ServerConfigFile>(&text)?)
        } else {
            None
        };
        let config = ServerConfig::resolve(server_config_file.as_ref())?;

        tokio::fs::create_dir_all(&config.uploads_directory).await?;

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!().run(&pool).await?;

        let state = Arc::new(AppState {
            pool,
            config: config.clone(),
        });

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
        info!("Serving on 0.0.0.0:{}", config.port);
        axum::serve(listener, router(state)).await?;

        Ok(())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(|| async { "Droplite server" }))
        .route("/files", get(file_list).post(file_upload))
        .route("/files/:file_id", get(file_download).delete(file_delete))
        .route("/theme", get(theme_get).post(theme_set))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(15)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn file_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let files = models::files::File::get_all(&state.pool).await?;
    Ok(Json(files.into_iter().map(|x| x.into()).collect()))
}

async fn file_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let original_filename = field
            .file_name()
            .map(|x| x.to_string())
            .ok_or(ApiError::BadRequest("File is required"))?;
        let extension = allowed_extension(&original_filename)
            .ok_or(ApiError::BadRequest("File type not allowed"))?;
        let mimetype = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;

        let filename = format!("{}{}", Uuid::new_v4(), extension);
        let path = std::path::Path::new(&state.config.uploads_directory).join(&filename);
        tokio::fs::write(&path, &data).await?;

        let inserted = models::files::File::insert(
            &filename,
            &original_filename,
            &mimetype,
            data.len() as i64,
            &state.pool,
        )
        .await;
        let id = match inserted {
            Ok(id) => id,
            Err(err) => {
                // No row will ever point at the stored bytes.
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!("Could not remove {}: {}", path.display(), remove_err);
                }
                return Err(err.into());
            }
        };
        info!("Stored {} as {} ({} bytes)", original_filename, filename, data.len());
        return Ok(Json(UploadResponse { id }));
    }
    Err(ApiError::BadRequest("File is required"))
}

async fn file_download(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<FileId>,
    req: Request,
) -> Result<Response, ApiError> {
    let file = models::files::File::get_optional(&file_id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;
    let mut response =
        ServeFile::new(std::path::Path::new(&state.config.uploads_directory).join(&file.filename))
            .oneshot(req)
            .await
            .into_response();
    if response.status().is_success() {
        let headers = response.headers_mut();
        if let Ok(value) =
            HeaderValue::from_bytes(content_disposition(&file.original_filename).as_bytes())
        {
            headers.insert(CONTENT_DISPOSITION, value);
        }
        if !file.mimetype.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&file.mimetype) {
                headers.insert(CONTENT_TYPE, value);
            }
        }
    }
    Ok(response)
}

/// `attachment` disposition with the name as a quoted string. Quotes and
/// backslashes are escaped, control characters become `_`.
fn content_disposition(original_filename: &str) -> String {
    let mut name = String::with_capacity(original_filename.len());
    for c in original_filename.chars() {
        match c {
            '"' | '\\' => {
                name.push('\\');
                name.push(c);
            }
            c if c.is_control() => name.push('_'),
            c => name.push(c),
        }
    }
    format!("attachment; filename=\"{}\"", name)
}

async fn file_delete(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<FileId>,
) -> Result<StatusCode, ApiError> {
    let file = models::files::File::get_optional(&file_id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;
    let path = std::path::Path::new(&state.config.uploads_directory).join(&file.filename);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        warn!("Could not remove {}: {}", path.display(), err);
    }
    models::files::File::delete(&file.id, &state.pool).await?;
    info!("Deleted file {} ({})", file.id, file.original_filename);
    Ok(StatusCode::NO_CONTENT)
}

async fn theme_get(State(state): State<Arc<AppState>>) -> Result<Json<ThemeConfig>, ApiError> {
    let preferences = ThemePreferences::get_optional(&state.pool).await?;
    Ok(Json(preferences.map(|x| x.into()).unwrap_or_default()))
}

async fn theme_set(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ThemeConfig>,
) -> Result<StatusCode, ApiError> {
    ThemePreferences::upsert(&config, &state.pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::{
        multipart::{MultipartForm, Part},
        TestServer,
    };
    use droplite_core::ThemeMode;

    async fn create_test_state() -> (Arc<AppState>, tempfile::TempDir) {
        let uploads = tempfile::tempdir().unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        let state = Arc::new(AppState {
            pool,
            config: ServerConfig {
                database_url: "sqlite::memory:".to_string(),
                port: 0,
                uploads_directory: uploads.path().to_string_lossy().to_string(),
                max_upload_bytes: 1024 * 1024,
            },
        });
        (state, uploads)
    }

    async fn create_test_server() -> (TestServer, tempfile::TempDir) {
        let (state, uploads) = create_test_state().await;
        (TestServer::new(router(state)).unwrap(), uploads)
    }

    fn upload_form(name: &str, mime: &str, data: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(data.to_vec()).file_name(name).mime_type(mime),
        )
    }

    #[tokio::test]
    async fn test_empty_list_is_an_array() {
        let (server, _uploads) = create_test_server().await;
        let response = server.get("/files").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "[]");
    }

    #[tokio::test]
    async fn test_upload_list_download_delete() {
        let (server, uploads) = create_test_server().await;

        let response = server
            .post("/files")
            .multipart(upload_form("a.txt", "text/plain", b"hello"))
            .await;
        response.assert_status_ok();
        let upload: UploadResponse = response.json();

        let files: Vec<FileRecord> = server.get("/files").await.json();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, upload.id);
        assert_eq!(files[0].original_filename, "a.txt");
        assert_eq!(files[0].mimetype, "text/plain");
        assert_eq!(files[0].size, 5);
        assert!(files[0].filename.ends_with(".txt"));
        assert!(uploads.path().join(&files[0].filename).exists());

        let response = server.get(&format!("/files/{}", upload.id)).await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().to_vec(), b"hello".to_vec());
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"a.txt\""
        );
        assert_eq!(response.header("content-type"), "text/plain");

        server
            .delete(&format!("/files/{}", upload.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert!(!uploads.path().join(&files[0].filename).exists());

        server
            .delete(&format!("/files/{}", upload.id))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/files/{}", upload.id))
            .await
            .assert_status_not_found();
        assert_eq!(server.get("/files").await.text(), "[]");
    }

    #[tokio::test]
    async fn test_newest_upload_is_listed_first() {
        let (server, _uploads) = create_test_server().await;
        for name in ["first.json", "second.png"] {
            server
                .post("/files")
                .multipart(upload_form(name, "application/octet-stream", b"{}"))
                .await
                .assert_status_ok();
        }
        let files: Vec<FileRecord> = server.get("/files").await.json();
        let names: Vec<_> = files.iter().map(|x| x.original_filename.as_str()).collect();
        assert_eq!(names, vec!["second.png", "first.json"]);
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension() {
        let (server, _uploads) = create_test_server().await;
        let response = server
            .post("/files")
            .multipart(upload_form("run.sh", "text/x-sh", b"echo hi"))
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.text(), "File type not allowed");
        assert_eq!(server.get("/files").await.text(), "[]");
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let (server, _uploads) = create_test_server().await;
        let form = MultipartForm::new().add_text("comment", "no file here");
        let response = server.post("/files").multipart(form).await;
        response.assert_status_bad_request();
        assert_eq!(response.text(), "File is required");
    }

    #[tokio::test]
    async fn test_download_missing_on_disk_is_not_found() {
        let (server, uploads) = create_test_server().await;
        let upload: UploadResponse = server
            .post("/files")
            .multipart(upload_form("gone.txt", "text/plain", b"bye"))
            .await
            .json();
        let files: Vec<FileRecord> = server.get("/files").await.json();
        std::fs::remove_file(uploads.path().join(&files[0].filename)).unwrap();

        server
            .get(&format!("/files/{}", upload.id))
            .await
            .assert_status_not_found();
        // A missing disk file does not block removal of the record.
        server
            .delete(&format!("/files/{}", upload.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_theme_defaults_and_round_trip() {
        let (server, _uploads) = create_test_server().await;

        let theme: ThemeConfig = server.get("/theme").await.json();
        assert_eq!(theme, ThemeConfig::default());

        let update = ThemeConfig {
            theme: ThemeMode::Light,
            gradient_from: "#000000".to_string(),
            gradient_to: "#ffffff".to_string(),
            gradient_on: false,
        };
        server
            .post("/theme")
            .json(&update)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let theme: ThemeConfig = server.get("/theme").await.json();
        assert_eq!(theme, update);

        let update = ThemeConfig {
            gradient_on: true,
            ..update
        };
        server.post("/theme").json(&update).await;
        let theme: ThemeConfig = server.get("/theme").await.json();
        assert!(theme.gradient_on);
    }

    #[test]
    fn test_config_file_fills_unset_values() {
        let file = ServerConfigFile {
            uploads_directory: Some("/srv/droplite".to_string()),
            max_upload_bytes: Some(42),
            ..Default::default()
        };
        let config = ServerConfig::resolve(Some(&file)).unwrap();
        if var("DROPLITE_UPLOADS_DIRECTORY").is_err() {
            assert_eq!(config.uploads_directory, "/srv/droplite");
        }
        if var("DROPLITE_MAX_UPLOAD_BYTES").is_err() {
            assert_eq!(config.max_upload_bytes, 42);
        }
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_bytes() {
        let (state, uploads) = create_test_state().await;
        let server = TestServer::new(router(state.clone())).unwrap();
        state.pool.close().await;

        let response = server
            .post("/files")
            .multipart(upload_form("a.txt", "text/plain", b"hello"))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_escapes_quoted_names() {
        let (state, uploads) = create_test_state().await;
        std::fs::write(uploads.path().join("stored.txt"), b"hi").unwrap();
        let id = models::files::File::insert(
            "stored.txt",
            "say \"hi\"\\now.txt",
            "text/plain",
            2,
            &state.pool,
        )
        .await
        .unwrap();
        let server = TestServer::new(router(state)).unwrap();

        let response = server.get(&format!("/files/{}", id)).await;

        response.assert_status_ok();
        assert_eq!(
            response.header("content-disposition"),
            r#"attachment; filename="say \"hi\"\\now.txt""#
        );
    }

    #[test]
    fn test_content_disposition_replaces_control_characters() {
        assert_eq!(
            content_disposition("a\r\nb.txt"),
            "attachment; filename=\"a__b.txt\""
        );
        assert_eq!(
            content_disposition("résumé.txt"),
            "attachment; filename=\"résumé.txt\""
        );
    }
}

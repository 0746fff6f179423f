use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use colored::Colorize;
use droplite_core::{allowed_extension, api::FileId, models::files::FileRecord, FileKind};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::{
    api::{attachment_filename, ApiClient, ClientError},
    ui::{AssumeYes, Confirm, Notifier, Toast},
};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this file?";

/// One displayable line of the file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub id: FileId,
    pub kind: FileKind,
    pub filename: String,
    pub mimetype: String,
    pub size: String,
    pub uploaded: String,
    pub download_url: String,
}

#[derive(Default)]
struct ViewState {
    files: Vec<FileRecord>,
    loading: bool,
    uploading: bool,
    deleting_id: Option<FileId>,
    error: Option<String>,
}

/// Local copy of the backend's file collection plus the busy flags the view reads.
///
/// Operations take `&self` and may overlap. Responses are applied in the order
/// they arrive, so the last refresh to complete wins. Clones share the same view.
#[derive(Clone)]
pub struct FileCollection {
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<ViewState>>,
}

impl FileCollection {
    pub fn new(api: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        FileCollection {
            api,
            notifier,
            state: Arc::new(Mutex::new(ViewState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.state().files.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn is_uploading(&self) -> bool {
        self.state().uploading
    }

    pub fn deleting_id(&self) -> Option<FileId> {
        self.state().deleting_id
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Original name of a listed file, or its id when it is not in the collection.
    pub fn display_name(&self, id: FileId) -> String {
        self.state()
            .files
            .iter()
            .find(|x| x.id == id)
            .map(|x| x.original_filename.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Replaces the whole collection. On failure the previous records stay.
    pub async fn list(&self) -> Result<(), ClientError> {
        {
            let mut state = self.state();
            state.loading = true;
            state.error = None;
        }
        let result = self.api.list_files().await;

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(files) => {
                state.files = files;
                Ok(())
            }
            Err(err) => {
                warn!("Listing files failed: {}", err);
                state.error = Some("Failed to fetch files".to_string());
                Err(err)
            }
        }
    }

    pub async fn upload(&self, path: &Path) -> Result<(), ClientError> {
        let filename = path
            .file_name()
            .map(|x| x.to_string_lossy().to_string())
            .unwrap_or_default();
        if allowed_extension(&filename).is_none() {
            warn!(
                "{} is not a .txt, .png, .jpg, .jpeg or .json file, the server may refuse it",
                filename.yellow()
            );
        }

        {
            let mut state = self.state();
            state.uploading = true;
            state.error = None;
        }
        let result = self.send_upload(path, &filename).await;
        self.state().uploading = false;

        match result {
            Ok(()) => {
                // A failed refresh is reported by list itself.
                let _ = self.list().await;
                self.notifier
                    .notify(Toast::success("Upload successful", filename));
                Ok(())
            }
            Err(err) => {
                self.state().error = Some("Upload failed".to_string());
                self.notifier
                    .notify(Toast::error("Upload failed", err.to_string()));
                Err(err)
            }
        }
    }

    async fn send_upload(&self, path: &Path, filename: &str) -> Result<(), ClientError> {
        let data = tokio::fs::read(path).await?;
        info!("[{}] Uploading {}...", "@".purple(), filename.purple());
        self.api.upload_file(filename, data).await
    }

    /// Returns `Ok(false)` when the user declined; nothing is sent in that case.
    pub async fn delete(
        &self,
        id: FileId,
        filename: &str,
        confirm: &dyn Confirm,
    ) -> Result<bool, ClientError> {
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(false);
        }

        {
            let mut state = self.state();
            state.deleting_id = Some(id);
            state.error = None;
        }
        let result = self.api.delete_file(id).await;
        self.state().deleting_id = None;

        match result {
            Ok(()) => {
                let _ = self.list().await;
                self.notifier.notify(Toast::success("File deleted", filename));
                Ok(true)
            }
            Err(err) => {
                self.state().error = Some("Delete failed".to_string());
                self.notifier
                    .notify(Toast::error("Delete failed", err.to_string()));
                Err(err)
            }
        }
    }

    /// Deletes a file known only by id. The confirmation comes first, the
    /// listing that names the file for the toast is only fetched once it is given.
    pub async fn delete_by_id(
        &self,
        id: FileId,
        confirm: &dyn Confirm,
    ) -> Result<bool, ClientError> {
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(false);
        }
        let _ = self.list().await;
        let filename = self.display_name(id);
        self.delete(id, &filename, &AssumeYes).await
    }

    /// Streams a stored file to `output`, or to the current directory under its
    /// original name when no output is given.
    pub async fn download(
        &self,
        id: FileId,
        output: Option<&Path>,
    ) -> Result<PathBuf, ClientError> {
        let response = self.api.download_file(id).await?;

        let known_name = self
            .state()
            .files
            .iter()
            .find(|x| x.id == id)
            .map(|x| x.original_filename.clone());
        let served_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|x| attachment_filename(&String::from_utf8_lossy(x.as_bytes())));
        let name = known_name
            .or(served_name)
            .unwrap_or_else(|| format!("file-{}", id));
        let target = match output {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(
                Path::new(&name)
                    .file_name()
                    .map(|x| x.to_os_string())
                    .unwrap_or_else(|| format!("file-{}", id).into()),
            ),
        };

        self.notifier.notify(Toast::info("Download started", name));

        let total_size = response.content_length();
        let bar = if let Some(size) = total_size {
            let bar = ProgressBar::new(size);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:.cyan/blue}] {bytes}/{total_bytes}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        } else {
            ProgressBar::new_spinner()
        };

        let mut file = std::fs::File::create(&target)?;
        let mut bar_progress: u64 = 0;
        let mut file_stream = response.bytes_stream();
        while let Some(chunk) = file_stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            bar_progress += chunk.len() as u64;
            bar.set_position(bar_progress);
        }
        bar.finish();

        Ok(target)
    }

    pub fn download_url(&self, id: FileId) -> String {
        self.api.download_url(id)
    }

    pub fn rows(&self) -> Vec<FileRow> {
        self.state()
            .files
            .iter()
            .map(|x| FileRow {
                id: x.id,
                kind: x.kind(),
                filename: x.original_filename.clone(),
                mimetype: x.mimetype.clone(),
                size: x.size.to_string(),
                uploaded: x
                    .upload_date
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                download_url: self.api.download_url(x.id),
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let (error, loading, uploading, deleting_id) = {
            let state = self.state();
            (
                state.error.clone(),
                state.loading,
                state.uploading,
                state.deleting_id,
            )
        };

        let mut out = String::new();
        if let Some(error) = error {
            out.push_str(&format!("{} {}\n", "Error:".bright_red(), error));
        }
        if uploading {
            out.push_str("Uploading...\n");
        }
        if let Some(id) = deleting_id {
            out.push_str(&format!("Deleting file {}...\n", id));
        }
        if loading {
            out.push_str("Loading...\n");
            return out;
        }
        let rows = self.rows();
        if rows.is_empty() {
            out.push_str("No files found. Upload your first file!\n");
            return out;
        }

        let headers = [
            "ID",
            "Type",
            "File Name",
            "MIME Type",
            "Size (bytes)",
            "Upload Date",
            "Download",
        ];
        let cells: Vec<[String; 7]> = rows
            .into_iter()
            .map(|x| {
                [
                    x.id.to_string(),
                    x.kind.icon().to_string(),
                    x.filename,
                    x.mimetype,
                    x.size,
                    x.uploaded,
                    x.download_url,
                ]
            })
            .collect();
        let mut widths = headers.map(|x| x.chars().count());
        for row in cells.iter() {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let header_line = headers
            .iter()
            .zip(widths.iter())
            .map(|(h, w)| format!("{:<w$}", h, w = *w))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(&format!("{}\n", header_line.trim_end().bold()));
        for row in cells.iter() {
            let line = row
                .iter()
                .zip(widths.iter())
                .map(|(c, w)| format!("{:<w$}", c, w = *w))
                .collect::<Vec<_>>()
                .join("  ");
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

//! Commands for the image score extractor.
//!
//! 1. select_files / load_files_from_paths: replace the selection
//! 2. process_files: run the batch, publish all rows at the end
//! 3. extraction_snapshot / process_button_label: what the UI renders
//! 4. build_results_csv / export_results_csv: download the successful rows

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::core_state::{CoreError, CoreState};
use crate::in_flight::OperationKind;
use crate::pipeline::extraction::{
    build_csv, has_successful_results, run_extraction, CsvExport, ExtractionProgress,
    ExtractionResult, UploadedFile,
};

const KIND: OperationKind = OperationKind::ScoreExtraction;

/// A selected file as listed in the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSnapshot {
    pub files: Vec<SelectedFile>,
    pub results: Vec<ExtractionResult>,
    pub is_loading: bool,
    /// Progress line while loading, empty otherwise.
    pub status: String,
    pub error: Option<String>,
    pub can_process: bool,
    pub can_download: bool,
    pub process_label: String,
}

/// Label of the process button.
pub fn process_label(is_loading: bool, file_count: usize) -> String {
    if is_loading {
        "Processing...".to_string()
    } else if file_count == 1 {
        "Process 1 File".to_string()
    } else {
        format!("Process {file_count} Files")
    }
}

/// Replace the selection. Clears the previous results and error.
///
/// An empty selection (a drop with no files) changes nothing. Refused while a
/// run is active; checked under the lock `process_files` holds while it
/// claims the gate.
pub fn select_files(state: &CoreState, files: Vec<UploadedFile>) -> Result<usize, String> {
    let mut ext = state.extraction().map_err(|e| e.to_string())?;
    if state.is_busy(KIND) {
        return Err(CoreError::Busy(KIND).to_string());
    }
    if files.is_empty() {
        tracing::debug!("Empty selection ignored");
        return Ok(ext.files.len());
    }
    ext.files = files;
    ext.results.clear();
    ext.error = None;
    tracing::debug!(count = ext.files.len(), "Files selected");
    Ok(ext.files.len())
}

/// Read files from disk and select them. Nothing changes if any read fails.
pub async fn load_files_from_paths(
    state: &Arc<CoreState>,
    paths: Vec<PathBuf>,
) -> Result<usize, String> {
    let loaded = tokio::task::spawn_blocking(move || {
        paths
            .iter()
            .map(|p| UploadedFile::from_path(p))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| format!("Task failed: {e}"))?;

    match loaded {
        Ok(files) => select_files(state, files),
        Err(e) => {
            let message = e.to_string();
            if let Ok(mut ext) = state.extraction() {
                ext.error = Some(message.clone());
            }
            Err(message)
        }
    }
}

/// Run the extraction over the current selection.
///
/// Empty selection: returns no rows and makes no model call. While a run is
/// active a second call fails with `Busy`. Rows are published together when
/// the run ends; until then `results` stays empty and `status` tracks progress.
pub async fn process_files(state: &Arc<CoreState>) -> Result<Vec<ExtractionResult>, String> {
    // Snapshot the selection and claim the gate under one lock.
    let (files, _guard) = {
        let mut ext = state.extraction().map_err(|e| e.to_string())?;
        if ext.files.is_empty() {
            return Ok(Vec::new());
        }
        let guard = state
            .gate(KIND)
            .try_acquire(KIND)
            .ok_or_else(|| CoreError::Busy(KIND).to_string())?;
        ext.results.clear();
        ext.error = None;
        ext.status = None;
        (ext.files.clone(), guard)
    };

    let worker = Arc::clone(state);
    let outcome = tokio::task::spawn_blocking(move || {
        let model = worker.model();
        let report = |progress: &ExtractionProgress| {
            if let Ok(mut ext) = worker.extraction() {
                ext.status = Some(progress.message());
            }
        };
        run_extraction(model.as_ref(), &files, Some(&report))
    })
    .await;

    let mut ext = state.extraction().map_err(|e| e.to_string())?;
    ext.status = None;
    let results = outcome.map_err(|e| format!("Task failed: {e}"))?;
    ext.results = results.clone();
    Ok(results)
}

pub fn process_button_label(state: &CoreState) -> Result<String, String> {
    let count = state.extraction().map_err(|e| e.to_string())?.files.len();
    Ok(process_label(state.is_busy(KIND), count))
}

pub fn extraction_snapshot(state: &CoreState) -> Result<ExtractionSnapshot, String> {
    let is_loading = state.is_busy(KIND);
    let ext = state.extraction().map_err(|e| e.to_string())?;
    Ok(ExtractionSnapshot {
        files: ext
            .files
            .iter()
            .map(|f| SelectedFile {
                name: f.name.clone(),
                media_type: f.media_type.clone(),
                size: f.bytes.len(),
            })
            .collect(),
        results: ext.results.clone(),
        is_loading,
        status: ext.status.clone().unwrap_or_default(),
        error: ext.error.clone(),
        can_process: !ext.files.is_empty() && !is_loading,
        can_download: has_successful_results(&ext.results),
        process_label: process_label(is_loading, ext.files.len()),
    })
}

/// CSV of the successful rows, for shells that hand the bytes to a download.
pub fn build_results_csv(state: &CoreState) -> Result<CsvExport, String> {
    let ext = state.extraction().map_err(|e| e.to_string())?;
    build_csv(&ext.results).map_err(|e| e.to_string())
}

/// Write `diem_so_hoc_sinh.csv` into `dir`.
pub fn export_results_csv(state: &CoreState, dir: PathBuf) -> Result<PathBuf, String> {
    let export = build_results_csv(state)?;
    export.write_to(&dir).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::{MockModelClient, ModelError};
    use crate::preferences::PreferenceStore;
    use crate::speech::MockSpeech;

    const OK_A: &str = r#"{"ten_hoc_sinh": "Nguyen Van A", "diem_so": "8.5"}"#;
    const OK_B: &str = r#"{"ten_hoc_sinh": "Tran Thi B", "diem_so": "9"}"#;

    fn state_with(client: MockModelClient) -> (tempfile::TempDir, Arc<MockModelClient>, Arc<CoreState>) {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(client);
        let state = Arc::new(CoreState::new(
            client.clone(),
            Arc::new(MockSpeech::new()),
            PreferenceStore::in_dir(dir.path()),
        ));
        (dir, client, state)
    }

    fn png(name: &str) -> UploadedFile {
        UploadedFile::new(name, "image/png", vec![1, 2, 3])
    }

    #[test]
    fn label_reflects_loading_and_count() {
        assert_eq!(process_label(false, 1), "Process 1 File");
        assert_eq!(process_label(false, 2), "Process 2 Files");
        assert_eq!(process_label(false, 3), "Process 3 Files");
        assert_eq!(process_label(false, 0), "Process 0 Files");
        assert_eq!(process_label(true, 3), "Processing...");
    }

    #[tokio::test]
    async fn empty_selection_is_a_no_op() {
        let (_dir, client, state) = state_with(MockModelClient::new(OK_A));
        let results = process_files(&state).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(client.call_count(), 0);
        assert!(!state.is_busy(KIND));
    }

    #[tokio::test]
    async fn publishes_results_and_clears_status() {
        let (_dir, client, state) = state_with(
            MockModelClient::new(OK_B)
                .then(OK_A)
                .then_fail(ModelError::Transport("offline".into()))
                .then(OK_B),
        );
        select_files(&state, vec![png("a.png"), png("b.png"), png("c.png")]).unwrap();

        let results = process_files(&state).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(client.call_count(), 3);

        let snap = extraction_snapshot(&state).unwrap();
        assert_eq!(snap.results, results);
        assert!(!snap.is_loading);
        assert_eq!(snap.status, "");
        assert!(snap.can_download);
        assert_eq!(snap.results[1].error_message.as_deref(), Some("Network error: offline"));
        assert_eq!(snap.process_label, "Process 3 Files");
    }

    #[tokio::test]
    async fn second_run_while_busy_is_refused() {
        let (_dir, client, state) = state_with(MockModelClient::new(OK_A));
        select_files(&state, vec![png("a.png")]).unwrap();

        let _held = state.gate(KIND).try_acquire(KIND).unwrap();
        let err = process_files(&state).await.unwrap_err();
        assert_eq!(err, "Score extraction already in progress");
        assert_eq!(client.call_count(), 0);
        assert_eq!(process_button_label(&state).unwrap(), "Processing...");
        assert!(!extraction_snapshot(&state).unwrap().can_process);
    }

    #[tokio::test]
    async fn gate_released_after_run() {
        let (_dir, _client, state) = state_with(MockModelClient::new(OK_A));
        select_files(&state, vec![png("a.png")]).unwrap();
        process_files(&state).await.unwrap();
        assert!(!state.is_busy(KIND));
        assert!(process_files(&state).await.is_ok());
    }

    #[tokio::test]
    async fn new_selection_clears_results() {
        let (_dir, _client, state) = state_with(MockModelClient::new(OK_A));
        select_files(&state, vec![png("a.png")]).unwrap();
        process_files(&state).await.unwrap();

        select_files(&state, vec![png("b.png"), png("c.png")]).unwrap();
        let snap = extraction_snapshot(&state).unwrap();
        assert!(snap.results.is_empty());
        assert_eq!(snap.files.len(), 2);
        assert_eq!(snap.files[0].name, "b.png");
        assert!(!snap.can_download);
    }

    #[tokio::test]
    async fn selection_refused_while_running() {
        let (_dir, _client, state) = state_with(MockModelClient::new(OK_A));
        select_files(&state, vec![png("a.png")]).unwrap();

        let _held = state.gate(KIND).try_acquire(KIND).unwrap();
        let err = select_files(&state, vec![png("b.png"), png("c.png")]).unwrap_err();
        assert_eq!(err, "Score extraction already in progress");
        let snap = extraction_snapshot(&state).unwrap();
        assert_eq!(snap.files.len(), 1);
        assert_eq!(snap.files[0].name, "a.png");
    }

    #[tokio::test]
    async fn empty_selection_keeps_files_and_results() {
        let (_dir, _client, state) = state_with(MockModelClient::new(OK_A));
        select_files(&state, vec![png("a.png")]).unwrap();
        process_files(&state).await.unwrap();

        assert_eq!(select_files(&state, Vec::new()).unwrap(), 1);
        let snap = extraction_snapshot(&state).unwrap();
        assert_eq!(snap.files.len(), 1);
        assert_eq!(snap.results.len(), 1);
        assert!(snap.can_download);
    }

    #[tokio::test]
    async fn load_from_paths_guesses_media_type() {
        let (dir, _client, state) = state_with(MockModelClient::new(OK_A));
        let path = dir.path().join("paper.jpg");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let count = load_files_from_paths(&state, vec![path]).await.unwrap();
        assert_eq!(count, 1);
        let snap = extraction_snapshot(&state).unwrap();
        assert_eq!(snap.files[0].media_type, "image/jpeg");
        assert_eq!(snap.files[0].size, 3);
    }

    #[tokio::test]
    async fn load_missing_path_keeps_selection() {
        let (dir, _client, state) = state_with(MockModelClient::new(OK_A));
        select_files(&state, vec![png("a.png")]).unwrap();

        let missing = dir.path().join("nope.png");
        assert!(load_files_from_paths(&state, vec![missing]).await.is_err());
        let snap = extraction_snapshot(&state).unwrap();
        assert_eq!(snap.files.len(), 1);
        assert!(snap.error.is_some());
    }

    #[tokio::test]
    async fn export_writes_successes() {
        let (dir, _client, state) = state_with(
            MockModelClient::new(OK_B)
                .then(OK_A)
                .then_fail(ModelError::EmptyResponse("no candidates".into())),
        );
        select_files(&state, vec![png("a.png"), png("b.png")]).unwrap();
        process_files(&state).await.unwrap();

        let path = export_results_csv(&state, dir.path().to_path_buf()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "\"ten_hoc_sinh\",\"diem_so\",\"file_name\"\n\"Nguyen Van A\",\"8.5\",\"a.png\""
        );
    }

    #[tokio::test]
    async fn export_refused_without_successes() {
        let (dir, _client, state) =
            state_with(MockModelClient::failing(ModelError::Transport("offline".into())));
        select_files(&state, vec![png("a.png")]).unwrap();
        process_files(&state).await.unwrap();

        let err = export_results_csv(&state, dir.path().to_path_buf()).unwrap_err();
        assert_eq!(err, "No successful extractions to download.");
        assert!(!dir.path().join("diem_so_hoc_sinh.csv").exists());
    }
}

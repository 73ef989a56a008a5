#![allow(dead_code)]

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::{Arc, Mutex};

use grabber_engine::{
    CancellationToken, DownloadError, EngineEvent, ExtractionError, FetchError, FetchOutput,
    Fetcher, FlatInfo, HookEvent, MediaAdapter, MediaService, ProgressHook, ProgressSink,
    ServiceError, ServiceRequest, TrackEntry, TrackRequest,
};
use tokio::sync::Notify;

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::LogLine(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn overall(&self) -> Vec<u8> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Overall { percent } => Some(*percent),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Scripted stand-in for the extraction service.
#[derive(Default)]
pub struct FakeService {
    pub flat: Mutex<Option<Result<FlatInfo, ServiceError>>>,
    pub flat_calls: Mutex<Vec<(String, Option<u32>)>>,
    pub outcomes: Mutex<VecDeque<Result<(), ServiceError>>>,
    pub hook_script: Vec<HookEvent>,
    pub requests: Mutex<Vec<ServiceRequest>>,
}

impl FakeService {
    pub fn with_flat(info: FlatInfo) -> Self {
        Self {
            flat: Mutex::new(Some(Ok(info))),
            ..Self::default()
        }
    }

    pub fn with_outcomes(outcomes: Vec<Result<(), ServiceError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ServiceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaService for FakeService {
    async fn extract_flat(&self, url: &str, limit: Option<u32>) -> Result<FlatInfo, ServiceError> {
        self.flat_calls
            .lock()
            .unwrap()
            .push((url.to_string(), limit));
        let scripted = self
            .flat
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ServiceError::Failed("no scan scripted".to_string())));
        scripted.map(|info| match (info, limit) {
            (FlatInfo::Collection(mut items), Some(limit)) => {
                items.truncate(limit as usize);
                FlatInfo::Collection(items)
            }
            (info, _) => info,
        })
    }

    async fn download(
        &self,
        request: &ServiceRequest,
        hook: &dyn ProgressHook,
        _cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        for event in &self.hook_script {
            if hook.on_event(event.clone()).is_err() {
                return Err(ServiceError::Aborted);
            }
        }
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Scripted stand-in for the adapter, used to drive the pipeline and the engine.
#[derive(Default)]
pub struct FakeAdapter {
    pub entries: Vec<TrackEntry>,
    pub calls: Mutex<Vec<TrackRequest>>,
    pub failing_urls: Vec<String>,
    /// Cancels the run's token while serving the n-th call (1-based).
    pub cancel_on_call: Option<usize>,
    /// When set, every download waits for a permit before returning.
    pub gate: Option<Arc<Notify>>,
}

impl FakeAdapter {
    pub fn with_entries(titles: &[&str]) -> Self {
        Self {
            entries: titles
                .iter()
                .enumerate()
                .map(|(i, title)| {
                    TrackEntry::new(i + 1, *title, format!("https://video.example.com/{title}"))
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn called_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|req| req.url.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl MediaAdapter for FakeAdapter {
    async fn scan_playlist(
        &self,
        _url: &str,
        limit: Option<NonZeroU32>,
    ) -> Result<Vec<TrackEntry>, ExtractionError> {
        let mut entries = self.entries.clone();
        if let Some(limit) = limit {
            entries.truncate(limit.get() as usize);
        }
        Ok(entries)
    }

    async fn download_one(
        &self,
        request: &TrackRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.cancel_on_call == Some(call_number) {
            cancel.cancel();
        }
        if self.failing_urls.contains(&request.url) {
            return Err(DownloadError::Failed("HTTP Error 404: Not Found".to_string()));
        }
        sink.emit(EngineEvent::LogLine(format!("downloaded {}", request.url)));
        Ok(())
    }
}

/// Records direct fetches without touching the network.
#[derive(Default)]
pub struct RecordingFetcher {
    pub urls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn fetched(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        _sink: &dyn ProgressSink,
        _cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(FetchOutput {
            path: destination.to_path_buf(),
            final_url: url.to_string(),
            bytes_written: 0,
            total: Some(0),
        })
    }
}

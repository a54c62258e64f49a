//! Synthesis task lifecycle: create, then poll until completed or exhausted.
//!
//! ```text
//! Created -> {Pending, InProgress}* -> Completed
//!                                   \-> Exhausted (local, after max_attempts)
//! ```
//!
//! Only the literal `"completed"` status ends the loop early. Every other
//! status, failure-looking ones included, counts as still running. A transport
//! failure on any query ends the lifecycle immediately.

use super::progress::{noop_sink, PollProgress, ProgressSink};
use super::types::{SynthesisRequest, SynthesisTask, SynthesisTaskEnvelope, TaskId};
use crate::config::PollConfig;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

pub const SYNTHESIS_TASKS_PATH: &str = "/synthesisTasks";

/// Remote side of the task lifecycle. Returns raw response bodies; the
/// poller owns their interpretation.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn submit(&self, request: &SynthesisRequest) -> Result<Bytes>;
    async fn query(&self, task_id: &TaskId) -> Result<Bytes>;
}

#[async_trait]
impl TaskService for HttpTransport {
    async fn submit(&self, request: &SynthesisRequest) -> Result<Bytes> {
        let response = self.post(SYNTHESIS_TASKS_PATH, request).await?;
        read_body(response).await
    }

    async fn query(&self, task_id: &TaskId) -> Result<Bytes> {
        let path = format!("{}/{}", SYNTHESIS_TASKS_PATH, task_id.as_str());
        let response = self.get(&path).await?;
        read_body(response).await
    }
}

#[async_trait]
impl<T: TaskService + ?Sized> TaskService for Arc<T> {
    async fn submit(&self, request: &SynthesisRequest) -> Result<Bytes> {
        (**self).submit(request).await
    }

    async fn query(&self, task_id: &TaskId) -> Result<Bytes> {
        (**self).query(task_id).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<Bytes> {
    response
        .bytes()
        .await
        .map_err(|e| Error::Transport(crate::transport::TransportError::Http(e)))
}

/// Drives create and poll-to-completion for synthesis tasks.
///
/// Holds no per-task state: every call keeps its own attempt counter and
/// timer, so one poller can serve any number of concurrent tasks.
pub struct TaskPoller<S> {
    service: S,
    config: PollConfig,
    progress: Arc<dyn ProgressSink>,
}

impl<S: TaskService> TaskPoller<S> {
    /// `max_attempts` below 1 is raised to 1 so at least one query is made.
    pub fn new(service: S, mut config: PollConfig) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        Self {
            service,
            config,
            progress: noop_sink(),
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Submit `request` and return the task id issued by the service.
    pub async fn create_task(&self, request: &SynthesisRequest) -> Result<TaskId> {
        let body = self.service.submit(request).await?;
        let task_id = extract_task_id(&body)?;
        info!(task_id = %task_id, voice = %request.voice_id, "synthesis task created");
        Ok(task_id)
    }

    /// One status query, no completion requirement.
    pub async fn fetch_status(&self, task_id: &TaskId) -> Result<SynthesisTask> {
        let body = self.service.query(task_id).await?;
        let envelope: SynthesisTaskEnvelope = serde_json::from_slice(&body).map_err(|e| {
            Error::malformed_with_context(
                format!("unreadable task status: {}", e),
                ErrorContext::new()
                    .with_field_path("SynthesisTask")
                    .with_details(format!("task {}", task_id))
                    .with_source("poller"),
            )
        })?;
        Ok(envelope.synthesis_task)
    }

    /// Poll `task_id` until it reports `completed`.
    ///
    /// Issues at most `max_attempts` queries spaced by exactly `interval`,
    /// without sleeping after the last one. Fails with
    /// [`Error::PollTimeout`] when no query reports completion.
    pub async fn await_completion(&self, task_id: &TaskId) -> Result<SynthesisTask> {
        let max_attempts = self.config.max_attempts;
        let interval = self.config.interval();

        for attempt in 1..=max_attempts {
            let task = self.fetch_status(task_id).await?;

            if task.is_completed() {
                if task.output_uri().is_none() {
                    return Err(Error::malformed_with_context(
                        "task completed without an output location",
                        ErrorContext::new()
                            .with_field_path("SynthesisTask.OutputUri")
                            .with_details(format!("task {}", task_id))
                            .with_source("poller"),
                    ));
                }
                info!(task_id = %task_id, attempt, "synthesis task completed");
                return Ok(task);
            }

            info!(
                task_id = %task_id,
                attempt,
                max_attempts,
                status = %task.task_status,
                "synthesis task in progress"
            );
            let progress = PollProgress {
                task_id: task_id.clone(),
                attempt,
                max_attempts,
                status: task.task_status,
            };
            self.progress.on_progress(&progress).await;

            if attempt < max_attempts {
                debug!(task_id = %task_id, delay_ms = self.config.interval_ms, "waiting before next poll");
                tokio::time::sleep(interval).await;
            }
        }

        Err(Error::PollTimeout {
            task_id: task_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Create the task and wait for it.
    pub async fn run(&self, request: &SynthesisRequest) -> Result<SynthesisTask> {
        let task_id = self.create_task(request).await?;
        self.await_completion(&task_id).await
    }
}

fn extract_task_id(body: &[u8]) -> Result<TaskId> {
    let creation_error = |msg: String| {
        Error::task_creation_with_context(
            msg,
            ErrorContext::new()
                .with_field_path("SynthesisTask.TaskId")
                .with_source("poller"),
        )
    };

    let json: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| creation_error(format!("response is not JSON: {}", e)))?;
    json.get("SynthesisTask")
        .and_then(|t| t.get("TaskId"))
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(TaskId::new)
        .ok_or_else(|| creation_error("response has no TaskId".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use crate::tts::progress::InMemoryProgressSink;
    use crate::tts::types::{TaskStatus, TimestampType};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Clone)]
    enum Reply {
        Status(&'static str),
        Completed(&'static str),
        Fail(u16),
        Raw(&'static str),
    }

    /// Scripted service; the last reply repeats once the script runs out.
    struct ScriptedService {
        create_reply: Result<Bytes>,
        replies: Mutex<VecDeque<Reply>>,
        queries: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedService {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                create_reply: Ok(Bytes::from(
                    json!({"SynthesisTask": {"TaskId": "task-1", "TaskStatus": "scheduled"}})
                        .to_string(),
                )),
                replies: Mutex::new(replies.into()),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }

        fn gaps(&self) -> Vec<Duration> {
            let q = self.queries.lock().unwrap();
            q.windows(2).map(|w| w[1].1 - w[0].1).collect()
        }
    }

    fn status_body(id: &str, status: &str, uri: Option<&str>) -> Bytes {
        let mut task = json!({"TaskId": id, "TaskStatus": status, "VoiceId": "Scarlett"});
        if let Some(uri) = uri {
            task["OutputUri"] = json!(uri);
        }
        Bytes::from(json!({ "SynthesisTask": task }).to_string())
    }

    #[async_trait]
    impl TaskService for ScriptedService {
        async fn submit(&self, _request: &SynthesisRequest) -> Result<Bytes> {
            match &self.create_reply {
                Ok(b) => Ok(b.clone()),
                Err(_) => Err(Error::Transport(TransportError::Status {
                    status: 401,
                    message: "unauthorized".into(),
                })),
            }
        }

        async fn query(&self, task_id: &TaskId) -> Result<Bytes> {
            self.queries
                .lock()
                .unwrap()
                .push((task_id.to_string(), Instant::now()));
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            };
            match reply {
                Some(Reply::Status(s)) => Ok(status_body(task_id.as_str(), s, None)),
                Some(Reply::Completed(uri)) => {
                    Ok(status_body(task_id.as_str(), "completed", Some(uri)))
                }
                Some(Reply::Fail(status)) => Err(Error::Transport(TransportError::Status {
                    status,
                    message: "boom".into(),
                })),
                Some(Reply::Raw(s)) => Ok(Bytes::from_static(s.as_bytes())),
                None => panic!("no scripted reply"),
            }
        }
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest {
            text: vec!["hello".into()],
            voice_id: "Scarlett".into(),
            bitrate: "192k".into(),
            timestamp_type: TimestampType::Word,
        }
    }

    fn poller(service: Arc<ScriptedService>) -> TaskPoller<Arc<ScriptedService>> {
        TaskPoller::new(service, PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_fourth_query_with_output_uri() {
        let service = ScriptedService::new(vec![
            Reply::Status("processing"),
            Reply::Status("processing"),
            Reply::Status("processing"),
            Reply::Completed("https://x/y.mp3"),
        ]);
        let sink = Arc::new(InMemoryProgressSink::new());
        let poller = poller(service.clone()).with_progress_sink(sink.clone());

        let task_id = poller.create_task(&request()).await.unwrap();
        assert_eq!(task_id.as_str(), "task-1");

        let task = poller.await_completion(&task_id).await.unwrap();
        assert_eq!(task.output_uri(), Some("https://x/y.mp3"));
        assert_eq!(task.task_status, TaskStatus::Completed);
        assert_eq!(service.query_count(), 4);
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events()[2].attempt, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn always_pending_times_out_after_ten_queries() {
        let service = ScriptedService::new(vec![Reply::Status("pending")]);
        let poller = poller(service.clone());
        let start = Instant::now();

        let err = poller
            .await_completion(&TaskId::new("task-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { attempts: 10, .. }));
        assert_eq!(service.query_count(), 10);
        assert!(start.elapsed() >= Duration::from_millis(18_000));
        for gap in service.gaps() {
            assert!(gap >= Duration::from_millis(2000), "gap too short: {:?}", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_status_is_polled_like_pending() {
        let service = ScriptedService::new(vec![Reply::Status("failed")]);
        let err = poller(service.clone())
            .await_completion(&TaskId::new("task-1"))
            .await
            .unwrap_err();
        assert!(err.is_poll_timeout());
        assert_eq!(service.query_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_aborts_without_further_queries() {
        let service = ScriptedService::new(vec![
            Reply::Status("pending"),
            Reply::Fail(500),
            Reply::Completed("https://x/never.mp3"),
        ]);
        let err = poller(service.clone())
            .await_completion(&TaskId::new("task-1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(service.query_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn task_id_is_used_verbatim_for_every_query() {
        let service = ScriptedService::new(vec![
            Reply::Status("pending"),
            Reply::Completed("https://x/y.mp3"),
        ]);
        let id = TaskId::new("Ab-12_xyz");
        poller(service.clone()).await_completion(&id).await.unwrap();
        let queries = service.queries.lock().unwrap();
        assert!(queries.iter().all(|(q, _)| q == "Ab-12_xyz"));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_without_output_is_rejected() {
        let service = ScriptedService::new(vec![Reply::Raw(
            r#"{"SynthesisTask": {"TaskId": "task-1", "TaskStatus": "completed"}}"#,
        )]);
        let err = poller(service)
            .await_completion(&TaskId::new("task-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_status_body_aborts() {
        let service = ScriptedService::new(vec![Reply::Raw("<html>oops</html>")]);
        let err = poller(service.clone())
            .await_completion(&TaskId::new("task-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
        assert_eq!(service.query_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_bound_is_honoured() {
        let service = ScriptedService::new(vec![Reply::Status("pending")]);
        let poller = TaskPoller::new(service.clone(), PollConfig::new(Duration::from_millis(10), 3));
        let err = poller.await_completion(&TaskId::new("t")).await.unwrap_err();
        assert!(matches!(err, Error::PollTimeout { attempts: 3, .. }));
        assert_eq!(service.query_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn odd_character_count_still_returns_completed_task() {
        let service = ScriptedService::new(vec![
            Reply::Raw(r#"{"SynthesisTask": {"TaskId": "task-1", "TaskStatus": "pending", "RequestCharacters": 5.0}}"#),
            Reply::Raw(
                r#"{"SynthesisTask": {"TaskId": "task-1", "TaskStatus": "completed", "OutputUri": "https://x/y.mp3", "RequestCharacters": "n/a"}}"#,
            ),
        ]);
        let task = poller(service.clone())
            .await_completion(&TaskId::new("task-1"))
            .await
            .unwrap();
        assert_eq!(task.output_uri(), Some("https://x/y.mp3"));
        assert_eq!(task.request_characters, None);
        assert_eq!(service.query_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_still_queries_once() {
        let service = ScriptedService::new(vec![Reply::Status("pending")]);
        let poller = TaskPoller::new(service.clone(), PollConfig::new(Duration::from_millis(10), 0));
        assert_eq!(poller.config().max_attempts, 1);

        let err = poller.await_completion(&TaskId::new("t")).await.unwrap_err();
        assert!(matches!(err, Error::PollTimeout { attempts: 1, .. }));
        assert_eq!(service.query_count(), 1);
    }

    #[test]
    fn task_id_extraction() {
        assert_eq!(
            extract_task_id(br#"{"SynthesisTask": {"TaskId": "abc"}}"#)
                .unwrap()
                .as_str(),
            "abc"
        );
        for body in [
            &br#"{"SynthesisTask": {}}"#[..],
            br#"{"SynthesisTask": {"TaskId": ""}}"#,
            br#"{"TaskId": "abc"}"#,
            b"not json",
        ] {
            assert!(matches!(
                extract_task_id(body),
                Err(Error::TaskCreation { .. })
            ));
        }
    }

    #[tokio::test]
    async fn create_failure_produces_no_task_id() {
        let service = Arc::new(ScriptedService {
            create_reply: Err(Error::configuration("unused")),
            replies: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        });
        let err = poller(service.clone()).create_task(&request()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(service.query_count(), 0);
    }
}

//! Observable request state for front ends.
//!
//! [`SpeechSession`] forwards calls to a [`SpeechClient`] and mirrors each one
//! into a [`SessionSnapshot`] published on a `tokio::sync::watch` channel:
//! `Loading` when the call starts, then `Success` or `Error`.

use crate::tts::{
    AudioOutput, SpeechClient, SpeechOptions, SpeechResponse, StreamOptions, SynthesisOptions,
    SynthesisTask, TaskId,
};
use crate::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Last useful result of a task call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Created(TaskId),
    Task(SynthesisTask),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub request_state: RequestState,
    pub status: Option<SessionStatus>,
}

pub struct SpeechSession {
    client: Arc<SpeechClient>,
    state: watch::Sender<SessionSnapshot>,
}

impl SpeechSession {
    pub fn new(client: Arc<SpeechClient>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self { client, state }
    }

    pub fn client(&self) -> &Arc<SpeechClient> {
        &self.client
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    fn set_state(&self, request_state: RequestState) {
        self.state.send_modify(|s| s.request_state = request_state);
    }

    fn finish(&self, status: Option<Option<SessionStatus>>, request_state: RequestState) {
        self.state.send_modify(|s| {
            if let Some(status) = status {
                s.status = status;
            }
            s.request_state = request_state;
        });
    }

    /// On failure the stored status is cleared.
    pub async fn create_task(&self, text: &str, options: &SynthesisOptions) -> Result<TaskId> {
        self.set_state(RequestState::Loading);
        match self.client.create_task(text, options).await {
            Ok(task_id) => {
                self.finish(
                    Some(Some(SessionStatus::Created(task_id.clone()))),
                    RequestState::Success,
                );
                Ok(task_id)
            }
            Err(e) => {
                error!(error = %e, "creating synthesis task failed");
                self.finish(Some(None), RequestState::Error);
                Err(e)
            }
        }
    }

    pub async fn await_completion(&self, task_id: &TaskId) -> Result<SynthesisTask> {
        self.set_state(RequestState::Loading);
        match self.client.await_completion(task_id).await {
            Ok(task) => {
                self.finish(
                    Some(Some(SessionStatus::Task(task.clone()))),
                    RequestState::Success,
                );
                Ok(task)
            }
            Err(e) => {
                error!(error = %e, task_id = %task_id, "fetching task status failed");
                self.finish(None, RequestState::Error);
                Err(e)
            }
        }
    }

    pub async fn stream(&self, text: &str, options: &StreamOptions) -> Result<AudioOutput> {
        self.set_state(RequestState::Loading);
        let result = self.client.stream(text, options).await;
        self.settle(result, "streaming failed")
    }

    pub async fn speech(&self, text: &str, options: &SpeechOptions) -> Result<SpeechResponse> {
        self.set_state(RequestState::Loading);
        let result = self.client.speech(text, options).await;
        self.settle(result, "speech synthesis failed")
    }

    fn settle<T>(&self, result: Result<T>, what: &str) -> Result<T> {
        match &result {
            Ok(_) => self.set_state(RequestState::Success),
            Err(e) => {
                error!(error = %e, "{}", what);
                self.set_state(RequestState::Error);
            }
        }
        result
    }
}

//! Scripted provider doubles and fixtures for pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storyreel_core::approval::{transition_path, ApprovalStatus};
use storyreel_core::segment::{ApprovalField, FieldChange, SegmentState};
use storyreel_core::task::{RemoteTaskState, TaskStatus};
use storyreel_core::types::DbId;
use storyreel_providers::{
    ImageGenerator, ImageOutput, ImageRequest, ProviderError, Providers, ScriptGenerator,
    ScriptRequest, ScriptSegment, SpeechOutput, SpeechRequest, SpeechSynthesizer, VideoGenerator,
    VideoRequest, VideoSubmission,
};

use crate::store::{NewProject, NewSegment, WorkflowStore};
use crate::MemoryStore;

#[derive(Default)]
pub(crate) struct Calls {
    pub script: AtomicU32,
    pub speech: AtomicU32,
    pub image: AtomicU32,
    pub submit: AtomicU32,
    pub poll: AtomicU32,
    pub cancel: AtomicU32,
}

/// Provider double with call counters, a failure switch and a queue of
/// scripted poll responses. An empty queue answers `processing`.
#[derive(Default)]
pub(crate) struct FakeProvider {
    pub calls: Calls,
    pub fail: AtomicBool,
    pub submit_status: Mutex<Option<TaskStatus>>,
    polls: Mutex<VecDeque<Result<RemoteTaskState, ProviderError>>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn push_poll(&self, response: Result<RemoteTaskState, ProviderError>) {
        self.polls
            .lock()
            .expect("poll queue")
            .push_back(response);
    }

    pub fn push_status(&self, status: TaskStatus, video_url: Option<&str>) {
        self.push_poll(Ok(RemoteTaskState {
            status,
            video_url: video_url.map(str::to_string),
            progress: None,
            error: None,
        }));
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ScriptGenerator for FakeProvider {
    async fn generate(&self, request: &ScriptRequest) -> Result<Vec<ScriptSegment>, ProviderError> {
        self.calls.script.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok((1..=2)
            .map(|order| ScriptSegment {
                order,
                script: format!("{} part {order}", request.title),
                video_prompt: Some(format!("shot {order}")),
            })
            .collect())
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeProvider {
    async fn synthesize(&self, _request: &SpeechRequest) -> Result<SpeechOutput, ProviderError> {
        let n = self.calls.speech.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(SpeechOutput {
            audio_url: format!("https://cdn.test/audio-{n}.mp3"),
        })
    }
}

#[async_trait]
impl ImageGenerator for FakeProvider {
    async fn generate(&self, _request: &ImageRequest) -> Result<ImageOutput, ProviderError> {
        let n = self.calls.image.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(ImageOutput {
            url: format!("https://cdn.test/image-{n}.png"),
        })
    }
}

#[async_trait]
impl VideoGenerator for FakeProvider {
    async fn submit(&self, _request: &VideoRequest) -> Result<VideoSubmission, ProviderError> {
        let n = self.calls.submit.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let status = self
            .submit_status
            .lock()
            .expect("submit status")
            .unwrap_or(TaskStatus::Pending);
        Ok(VideoSubmission {
            task_id: format!("task-{n}"),
            status,
        })
    }

    async fn poll(&self, _task_id: &str) -> Result<RemoteTaskState, ProviderError> {
        self.calls.poll.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.polls
            .lock()
            .expect("poll queue")
            .pop_front()
            .unwrap_or(Ok(RemoteTaskState {
                status: TaskStatus::Processing,
                video_url: None,
                progress: None,
                error: None,
            }))
    }

    async fn cancel(&self, _task_id: &str) -> Result<(), ProviderError> {
        self.calls.cancel.fetch_add(1, Ordering::SeqCst);
        self.check()
    }
}

pub(crate) fn providers(fake: &Arc<FakeProvider>) -> Providers {
    Providers {
        script: fake.clone(),
        speech: fake.clone(),
        image: fake.clone(),
        video: fake.clone(),
    }
}

/// A project with `count` draft segments.
pub(crate) async fn seeded_project(store: &MemoryStore, count: i32) -> (DbId, Vec<SegmentState>) {
    let project = store
        .create_project(&NewProject {
            name: "Harbor".into(),
            description: Some("Boats leave at dawn.".into()),
        })
        .await
        .unwrap();
    let inputs: Vec<NewSegment> = (1..=count)
        .map(|order| NewSegment {
            order,
            script: format!("Scene {order}"),
            video_prompt: None,
        })
        .collect();
    let segments = store
        .replace_segments(project.id, &inputs)
        .await
        .unwrap()
        .unwrap();
    (project.id, segments)
}

/// Force `field` to `status` on a segment by walking legal hops.
pub(crate) async fn walk_to(
    store: &MemoryStore,
    segment_id: DbId,
    field: ApprovalField,
    status: ApprovalStatus,
) {
    let segment = store.find_segment(segment_id).await.unwrap().unwrap();
    let from = segment.status(field);
    let Some(path) = transition_path(from, status) else {
        return;
    };
    let mut prev = from;
    let changes: Vec<_> = path
        .into_iter()
        .map(|to| {
            let change = FieldChange {
                segment_id,
                field,
                from: prev,
                to,
            };
            prev = to;
            change
        })
        .collect();
    if !changes.is_empty() {
        store.apply_status_changes(&changes, Some("fixture")).await.unwrap();
    }
}

//! Simulation mode: deterministic stand-ins for every AI service.
//!
//! Selected explicitly with `AI_PROVIDER_MODE=simulated`. Video tasks
//! report `processing` for a configurable number of polls and then
//! complete.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use storyreel_core::task::{RemoteTaskState, TaskStatus};

use crate::error::ProviderError;
use crate::image::{ImageGenerator, ImageOutput, ImageRequest};
use crate::script::{ScriptGenerator, ScriptRequest, ScriptSegment};
use crate::speech::{SpeechOutput, SpeechRequest, SpeechSynthesizer};
use crate::video::{VideoGenerator, VideoRequest, VideoSubmission};

const SIMULATED_CDN: &str = "https://simulated.storyreel.local";

#[derive(Debug, Default)]
struct SimulatedTask {
    polls: u32,
    cancelled: bool,
}

pub struct SimulatedProvider {
    /// Number of polls a task reports `processing` before completing.
    polls_to_complete: u32,
    tasks: Mutex<HashMap<String, SimulatedTask>>,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new(2)
    }
}

impl SimulatedProvider {
    pub fn new(polls_to_complete: u32) -> Self {
        Self {
            polls_to_complete,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// How many times `task_id` has been polled.
    pub fn poll_count(&self, task_id: &str) -> u32 {
        self.tasks
            .lock()
            .map(|tasks| tasks.get(task_id).map_or(0, |t| t.polls))
            .unwrap_or(0)
    }

    fn lock_tasks(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, SimulatedTask>>, ProviderError> {
        self.tasks
            .lock()
            .map_err(|_| ProviderError::Malformed("simulated task table poisoned".into()))
    }
}

/// Split a description into sentence-sized scenes.
fn scenes_from(description: &str) -> Vec<String> {
    description
        .split_terminator(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{s}."))
        .collect()
}

#[async_trait]
impl ScriptGenerator for SimulatedProvider {
    async fn generate(&self, request: &ScriptRequest) -> Result<Vec<ScriptSegment>, ProviderError> {
        let mut scenes = scenes_from(&request.description);
        if scenes.is_empty() {
            scenes = vec![
                format!("{} begins.", request.title),
                format!("{} unfolds.", request.title),
                format!("{} ends.", request.title),
            ];
        }
        Ok(scenes
            .into_iter()
            .enumerate()
            .map(|(i, script)| ScriptSegment {
                order: i as i32 + 1,
                video_prompt: Some(format!("Cinematic shot: {script}")),
                script,
            })
            .collect())
    }
}

#[async_trait]
impl SpeechSynthesizer for SimulatedProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechOutput, ProviderError> {
        tracing::debug!(chars = request.text.len(), "Simulated speech synthesis");
        Ok(SpeechOutput {
            audio_url: format!("{SIMULATED_CDN}/audio/{}.mp3", uuid::Uuid::new_v4()),
        })
    }
}

#[async_trait]
impl ImageGenerator for SimulatedProvider {
    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput, ProviderError> {
        tracing::debug!(prompt = %request.prompt, "Simulated image generation");
        Ok(ImageOutput {
            url: format!("{SIMULATED_CDN}/images/{}.png", uuid::Uuid::new_v4()),
        })
    }
}

#[async_trait]
impl VideoGenerator for SimulatedProvider {
    async fn submit(&self, request: &VideoRequest) -> Result<VideoSubmission, ProviderError> {
        let task_id = format!("sim-{}", uuid::Uuid::new_v4());
        self.lock_tasks()?.insert(task_id.clone(), SimulatedTask::default());
        tracing::debug!(task_id = %task_id, prompt = %request.prompt, "Simulated video submission");
        Ok(VideoSubmission {
            task_id,
            status: TaskStatus::Pending,
        })
    }

    async fn poll(&self, task_id: &str) -> Result<RemoteTaskState, ProviderError> {
        let mut tasks = self.lock_tasks()?;
        let task = tasks.get_mut(task_id).ok_or_else(|| ProviderError::Api {
            status: 404,
            body: format!("unknown task {task_id}"),
        })?;
        task.polls += 1;

        if task.cancelled {
            return Ok(RemoteTaskState {
                status: TaskStatus::Failed,
                video_url: None,
                progress: None,
                error: Some("cancelled".into()),
            });
        }
        if task.polls > self.polls_to_complete {
            return Ok(RemoteTaskState {
                status: TaskStatus::Completed,
                video_url: Some(format!("{SIMULATED_CDN}/videos/{task_id}.mp4")),
                progress: Some(1.0),
                error: None,
            });
        }
        Ok(RemoteTaskState {
            status: TaskStatus::Processing,
            video_url: None,
            progress: Some(task.polls as f32 / (self.polls_to_complete + 1) as f32),
            error: None,
        })
    }

    async fn cancel(&self, task_id: &str) -> Result<(), ProviderError> {
        if let Some(task) = self.lock_tasks()?.get_mut(task_id) {
            task.cancelled = true;
        }
        Ok(())
    }
}

//! Workflow orchestrator.
//!
//! Receives approve/reject intents and generation requests, validates them
//! against the approval state machine, persists through the
//! [`WorkflowStore`] and keeps the derived project stage cache current.

use std::sync::Arc;

use serde::Serialize;
use storyreel_core::approval::ApprovalStatus;
use storyreel_core::audit::{sort_history, StatusChangeEvent};
use storyreel_core::candidate::{CandidateStatus, MediaCandidate, MediaKind};
use storyreel_core::error::CoreError;
use storyreel_core::segment::{plan_review_staging, plan_transition, ApprovalField, SegmentState};
use storyreel_core::stage::{self, ReviewStage, StageSummary};
use storyreel_core::types::DbId;
use storyreel_providers::{ImageRequest, Providers, ScriptRequest, SpeechRequest};

use crate::error::WorkflowError;
use crate::review;
use crate::store::{NewCandidate, NewProject, NewSegment, ProjectRecord, WorkflowStore};

/// A project with freshly derived stage and status and its segments.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: ProjectRecord,
    pub segments: Vec<SegmentState>,
}

/// Result of an approval batch on one segment.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub segment: SegmentState,
    pub events: Vec<StatusChangeEvent>,
    pub stage: StageSummary,
}

#[derive(Debug, Clone, Default)]
pub struct ImageParams {
    /// Defaults to the segment's video prompt, then its script.
    pub prompt: Option<String>,
    pub aspect_ratio: Option<String>,
    pub model: Option<String>,
    pub safety_filter_level: Option<String>,
    pub person_generation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AudioParams {
    pub voice: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RegenerateParams {
    /// Must be `true`; regeneration deletes every existing segment.
    pub confirm: bool,
    /// Defaults to the project description.
    pub description: Option<String>,
    pub system_instruction: Option<String>,
}

pub struct WorkflowController {
    store: Arc<dyn WorkflowStore>,
    providers: Providers,
}

impl WorkflowController {
    pub fn new(store: Arc<dyn WorkflowStore>, providers: Providers) -> Self {
        Self { store, providers }
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub async fn create_project(&self, input: NewProject) -> Result<ProjectRecord, WorkflowError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("Project name must not be empty".into()).into());
        }
        let project = self
            .store
            .create_project(&NewProject {
                name: name.to_string(),
                description: input.description,
            })
            .await?;
        tracing::info!(project_id = project.id, "Project created");
        Ok(project)
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectRecord>, WorkflowError> {
        Ok(self.store.list_projects().await?)
    }

    /// Load a project, recomputing stage and status from its segments and
    /// writing the cache through when it is stale.
    pub async fn get_project(&self, project_id: DbId) -> Result<ProjectView, WorkflowError> {
        let mut project = self.load_project(project_id).await?;
        let segments = self.store.list_segments(project_id).await?;

        let summary = stage::summarize(&segments);
        if summary.differs_from(project.current_stage, project.status) {
            self.store.update_project_cache(project_id, summary).await?;
            tracing::debug!(
                project_id,
                cached_stage = %project.current_stage,
                stage = %summary.current_stage,
                "Refreshed stale project stage cache",
            );
            project.current_stage = summary.current_stage;
            project.status = summary.status;
        }

        Ok(ProjectView { project, segments })
    }

    /// Delete a project together with its segments, candidates and history.
    pub async fn delete_project(&self, project_id: DbId) -> Result<(), WorkflowError> {
        if !self.store.delete_project(project_id).await? {
            return Err(not_found("Project", project_id));
        }
        tracing::info!(project_id, "Project deleted");
        Ok(())
    }

    /// Replace every segment with a fresh script generation.
    ///
    /// Destructive and irreversible, so it must be confirmed explicitly.
    /// The script is generated before anything is deleted; an upstream
    /// failure leaves the existing segments untouched.
    pub async fn regenerate_all(
        &self,
        project_id: DbId,
        params: RegenerateParams,
    ) -> Result<ProjectView, WorkflowError> {
        if !params.confirm {
            return Err(CoreError::Precondition(
                "Regenerating segments deletes all existing segments and must be confirmed".into(),
            )
            .into());
        }
        let project = self.load_project(project_id).await?;

        let request = ScriptRequest {
            title: project.name.clone(),
            description: params
                .description
                .or(project.description.clone())
                .unwrap_or_default(),
            system_instruction: params.system_instruction,
        };
        let script = self.providers.script.generate(&request).await?;
        if script.is_empty() {
            return Err(CoreError::Upstream("Script generation returned no segments".into()).into());
        }

        let inputs: Vec<NewSegment> = script
            .into_iter()
            .map(|s| NewSegment {
                order: s.order,
                script: s.script,
                video_prompt: s.video_prompt,
            })
            .collect();
        let segments = self
            .store
            .replace_segments(project_id, &inputs)
            .await?
            .ok_or_else(|| not_found("Project", project_id))?;
        tracing::info!(project_id, segments = segments.len(), "Segments regenerated");

        let changes: Vec<_> = segments
            .iter()
            .flat_map(|s| plan_review_staging(s, ApprovalField::Script))
            .collect();
        if !changes.is_empty() {
            let events = self
                .store
                .apply_status_changes(&changes, Some("script generated"))
                .await?;
            review::log_changes(&events);
        }

        self.get_project(project_id).await
    }

    // -----------------------------------------------------------------------
    // Approvals
    // -----------------------------------------------------------------------

    pub async fn get_segment(&self, segment_id: DbId) -> Result<SegmentState, WorkflowError> {
        self.load_segment(segment_id).await
    }

    /// Approve every field of `stage` on one segment, all or nothing.
    pub async fn approve(
        &self,
        segment_id: DbId,
        stage: ReviewStage,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        self.transition(segment_id, stage.fields(), ApprovalStatus::Approved, None)
            .await
    }

    /// Reject every field of `stage` on one segment, all or nothing.
    pub async fn reject(
        &self,
        segment_id: DbId,
        stage: ReviewStage,
        reason: Option<&str>,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        self.transition(segment_id, stage.fields(), ApprovalStatus::Rejected, reason)
            .await
    }

    /// Move each of `fields` to `to` as one validated batch.
    ///
    /// Every transition is checked before anything is written; the first
    /// invalid field aborts the batch and is named in the error.
    pub async fn transition(
        &self,
        segment_id: DbId,
        fields: &[ApprovalField],
        to: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        let segment = self.load_segment(segment_id).await?;
        let changes = plan_transition(&segment, fields, to)?;

        let events = self.store.apply_status_changes(&changes, reason).await?;
        review::log_changes(&events);

        let segment = self.load_segment(segment_id).await?;
        let stage = review::refresh_stage(self.store.as_ref(), segment.project_id).await?;
        Ok(ApprovalOutcome {
            segment,
            events,
            stage,
        })
    }

    /// Approve `stage` on every segment of a project in one atomic batch.
    pub async fn approve_stage_for_project(
        &self,
        project_id: DbId,
        stage: ReviewStage,
    ) -> Result<ProjectView, WorkflowError> {
        self.load_project(project_id).await?;
        let segments = self.store.list_segments(project_id).await?;
        if segments.is_empty() {
            return Err(CoreError::Precondition(format!(
                "Project {project_id} has no segments to approve"
            ))
            .into());
        }

        let mut changes = Vec::new();
        for segment in &segments {
            changes.extend(plan_transition(segment, stage.fields(), ApprovalStatus::Approved)?);
        }
        let events = self
            .store
            .apply_status_changes(&changes, Some("approved for whole project"))
            .await?;
        review::log_changes(&events);

        self.get_project(project_id).await
    }

    /// Status change history of one segment, oldest first.
    pub async fn history(&self, segment_id: DbId) -> Result<Vec<StatusChangeEvent>, WorkflowError> {
        self.load_segment(segment_id).await?;
        let mut events = self.store.list_status_changes(segment_id).await?;
        sort_history(&mut events);
        Ok(events)
    }

    // -----------------------------------------------------------------------
    // Candidates
    // -----------------------------------------------------------------------

    /// Make one candidate the selected one for its segment and kind.
    ///
    /// Selecting a completed candidate puts the kind's approval field up for
    /// review unless it is already approved.
    pub async fn select_candidate(
        &self,
        segment_id: DbId,
        kind: MediaKind,
        candidate_id: DbId,
    ) -> Result<MediaCandidate, WorkflowError> {
        let candidate = self
            .store
            .select_candidate(segment_id, kind, candidate_id)
            .await?;
        tracing::info!(segment_id, candidate_id, kind = %kind, "Candidate selected");

        if candidate.status == CandidateStatus::Completed {
            review::stage_review(
                self.store.as_ref(),
                segment_id,
                kind.approval_field(),
                "candidate selected",
            )
            .await?;
        }
        Ok(candidate)
    }

    /// Generate an image synchronously and store it as the selected
    /// candidate. Nothing is stored when the service fails.
    pub async fn generate_image(
        &self,
        segment_id: DbId,
        params: ImageParams,
    ) -> Result<MediaCandidate, WorkflowError> {
        let segment = self.load_segment(segment_id).await?;
        let prompt = params
            .prompt
            .or_else(|| segment.video_prompt.clone())
            .unwrap_or_else(|| segment.script.clone());

        let request = ImageRequest {
            prompt,
            aspect_ratio: params.aspect_ratio,
            model: params.model,
            safety_filter_level: params.safety_filter_level,
            person_generation: params.person_generation,
        };
        let output = self.providers.image.generate(&request).await.map_err(|e| {
            tracing::warn!(segment_id, error = %e, "Image generation failed");
            e
        })?;

        let metadata = serde_json::json!({
            "prompt": request.prompt,
            "aspect_ratio": request.aspect_ratio,
            "model": request.model,
        });
        self.store_completed(segment_id, MediaKind::Image, output.url, metadata)
            .await
    }

    /// Synthesize narration for the segment script and store it as the
    /// selected audio candidate. Nothing is stored when the service fails.
    pub async fn generate_audio(
        &self,
        segment_id: DbId,
        params: AudioParams,
    ) -> Result<MediaCandidate, WorkflowError> {
        let segment = self.load_segment(segment_id).await?;
        let request = SpeechRequest {
            text: segment.script.clone(),
            voice: params.voice,
            model: params.model,
        };
        let output = self.providers.speech.synthesize(&request).await.map_err(|e| {
            tracing::warn!(segment_id, error = %e, "Speech synthesis failed");
            e
        })?;

        let metadata = serde_json::json!({
            "voice": request.voice,
            "model": request.model,
        });
        self.store_completed(segment_id, MediaKind::Audio, output.audio_url, metadata)
            .await
    }

    pub async fn health_check(&self) -> Result<(), WorkflowError> {
        Ok(self.store.health_check().await?)
    }

    // ---- private helpers ----

    async fn store_completed(
        &self,
        segment_id: DbId,
        kind: MediaKind,
        url: String,
        metadata: serde_json::Value,
    ) -> Result<MediaCandidate, WorkflowError> {
        let candidate = self
            .store
            .insert_candidate(&NewCandidate {
                segment_id,
                kind,
                url: Some(url),
                status: CandidateStatus::Completed,
                is_selected: true,
                task_handle: None,
                metadata,
            })
            .await?;
        tracing::info!(segment_id, candidate_id = candidate.id, kind = %kind, "Candidate generated");

        review::stage_review(
            self.store.as_ref(),
            segment_id,
            kind.approval_field(),
            "candidate generated",
        )
        .await?;
        Ok(candidate)
    }

    async fn load_project(&self, project_id: DbId) -> Result<ProjectRecord, WorkflowError> {
        self.store
            .find_project(project_id)
            .await?
            .ok_or_else(|| not_found("Project", project_id))
    }

    async fn load_segment(&self, segment_id: DbId) -> Result<SegmentState, WorkflowError> {
        self.store
            .find_segment(segment_id)
            .await?
            .ok_or_else(|| not_found("Segment", segment_id))
    }
}

fn not_found(entity: &'static str, id: DbId) -> WorkflowError {
    WorkflowError::Core(CoreError::NotFound { entity, id })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use assert_matches::assert_matches;
    use storyreel_core::stage::{ProjectStatus, WorkflowStage};
    use storyreel_core::task::{PollPolicy, RemoteTaskState, TaskStatus};

    use crate::testing::{providers, seeded_project, walk_to, FakeProvider};
    use crate::tracker::{TaskTracker, VideoParams};
    use crate::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, Arc<FakeProvider>, WorkflowController) {
        let store = Arc::new(MemoryStore::new());
        let fake = FakeProvider::new();
        let controller = WorkflowController::new(store.clone(), providers(&fake));
        (store, fake, controller)
    }

    async fn regenerated(controller: &WorkflowController) -> ProjectView {
        let project = controller
            .create_project(NewProject {
                name: "Lighthouse".into(),
                description: Some("A keeper waits. A ship arrives.".into()),
            })
            .await
            .unwrap();
        controller
            .regenerate_all(
                project.id,
                RegenerateParams {
                    confirm: true,
                    ..RegenerateParams::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn blank_project_name_is_rejected() {
        let (_store, _fake, controller) = setup();
        let result = controller
            .create_project(NewProject {
                name: "   ".into(),
                description: None,
            })
            .await;
        assert_matches!(result, Err(WorkflowError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn regenerate_requires_confirmation() {
        let (store, fake, controller) = setup();
        let (project_id, _segments) = seeded_project(&store, 1).await;

        let result = controller
            .regenerate_all(project_id, RegenerateParams::default())
            .await;
        assert_matches!(result, Err(WorkflowError::Core(CoreError::Precondition(_))));
        assert_eq!(FakeProvider::count(&fake.calls.script), 0);
        assert_eq!(store.list_segments(project_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn regenerate_replaces_segments_and_stages_script_review() {
        let (store, _fake, controller) = setup();
        let view = regenerated(&controller).await;

        assert_eq!(view.segments.len(), 2);
        for segment in &view.segments {
            assert_eq!(segment.script_approval_status, ApprovalStatus::Processing);
            assert_eq!(segment.audio_approval_status, ApprovalStatus::Draft);
            let history = store.list_status_changes(segment.id).await.unwrap();
            assert!(history
                .iter()
                .all(|e| e.reason.as_deref() == Some("script generated")));
        }
        assert_eq!(view.project.current_stage, WorkflowStage::ScriptGeneration);
    }

    #[tokio::test]
    async fn failed_regeneration_keeps_existing_segments() {
        let (store, fake, controller) = setup();
        let (project_id, segments) = seeded_project(&store, 3).await;
        fake.set_failing(true);

        let result = controller
            .regenerate_all(
                project_id,
                RegenerateParams {
                    confirm: true,
                    ..RegenerateParams::default()
                },
            )
            .await;
        assert_matches!(result, Err(WorkflowError::Upstream(_)));

        let kept = store.list_segments(project_id).await.unwrap();
        assert_eq!(kept, segments);
    }

    #[tokio::test]
    async fn script_approval_is_all_or_nothing() {
        let (store, _fake, controller) = setup();
        let view = regenerated(&controller).await;
        let segment_id = view.segments[0].id;

        let result = controller.approve(segment_id, ReviewStage::Script).await;
        assert_matches!(
            result,
            Err(WorkflowError::Core(CoreError::InvalidTransition {
                field: ApprovalField::Audio,
                from: ApprovalStatus::Draft,
                to: ApprovalStatus::Approved,
            }))
        );

        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(segment.script_approval_status, ApprovalStatus::Processing);
    }

    #[tokio::test]
    async fn approving_script_stage_everywhere_advances_project() {
        let (_store, _fake, controller) = setup();
        let view = regenerated(&controller).await;
        let project_id = view.project.id;

        let first = view.segments[0].id;
        controller
            .generate_audio(first, AudioParams::default())
            .await
            .unwrap();
        let outcome = controller.approve(first, ReviewStage::Script).await.unwrap();
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.stage.current_stage, WorkflowStage::ScriptGeneration);

        let second = view.segments[1].id;
        controller
            .generate_audio(second, AudioParams::default())
            .await
            .unwrap();
        let outcome = controller.approve(second, ReviewStage::Script).await.unwrap();
        assert_eq!(outcome.stage.current_stage, WorkflowStage::ImageGeneration);

        let project = controller.get_project(project_id).await.unwrap().project;
        assert_eq!(project.current_stage, WorkflowStage::ImageGeneration);
        assert_eq!(project.status, ProjectStatus::Draft);
    }

    #[tokio::test]
    async fn approve_stage_for_project_is_one_batch() {
        let (store, _fake, controller) = setup();
        let (project_id, segments) = seeded_project(&store, 2).await;
        walk_to(&store, segments[0].id, ApprovalField::Image, ApprovalStatus::Processing).await;

        let result = controller
            .approve_stage_for_project(project_id, ReviewStage::Image)
            .await;
        assert_matches!(
            result,
            Err(WorkflowError::Core(CoreError::InvalidTransition { .. }))
        );
        let first = store.find_segment(segments[0].id).await.unwrap().unwrap();
        assert_eq!(first.image_approval_status, ApprovalStatus::Processing);

        walk_to(&store, segments[1].id, ApprovalField::Image, ApprovalStatus::Processing).await;
        let view = controller
            .approve_stage_for_project(project_id, ReviewStage::Image)
            .await
            .unwrap();
        assert!(view
            .segments
            .iter()
            .all(|s| s.image_approval_status == ApprovalStatus::Approved));
    }

    #[tokio::test]
    async fn approve_stage_for_empty_project_fails() {
        let (store, _fake, controller) = setup();
        let (project_id, _segments) = seeded_project(&store, 0).await;
        assert_matches!(
            controller
                .approve_stage_for_project(project_id, ReviewStage::Script)
                .await,
            Err(WorkflowError::Core(CoreError::Precondition(_)))
        );
    }

    #[tokio::test]
    async fn get_project_repairs_stale_cache() {
        let (store, _fake, controller) = setup();
        let (project_id, _segments) = seeded_project(&store, 1).await;
        store
            .update_project_cache(
                project_id,
                StageSummary {
                    current_stage: WorkflowStage::Completed,
                    status: ProjectStatus::Completed,
                },
            )
            .await
            .unwrap();

        let view = controller.get_project(project_id).await.unwrap();
        assert_eq!(view.project.current_stage, WorkflowStage::ScriptGeneration);
        assert_eq!(view.project.status, ProjectStatus::Draft);

        let cached = store.find_project(project_id).await.unwrap().unwrap();
        assert_eq!(cached.current_stage, WorkflowStage::ScriptGeneration);
    }

    #[tokio::test]
    async fn image_generation_selects_new_candidate_and_stages_review() {
        let (store, _fake, controller) = setup();
        let (_project_id, segments) = seeded_project(&store, 1).await;
        let segment_id = segments[0].id;

        let first = controller
            .generate_image(segment_id, ImageParams::default())
            .await
            .unwrap();
        let second = controller
            .generate_image(segment_id, ImageParams::default())
            .await
            .unwrap();

        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(segment.images.len(), 2);
        assert_eq!(segment.selected(MediaKind::Image).map(|c| c.id), Some(second.id));
        assert_ne!(first.id, second.id);
        assert_eq!(segment.image_approval_status, ApprovalStatus::Processing);
    }

    #[tokio::test]
    async fn failed_image_generation_creates_nothing() {
        let (store, fake, controller) = setup();
        let (_project_id, segments) = seeded_project(&store, 1).await;
        fake.set_failing(true);

        let result = controller
            .generate_image(segments[0].id, ImageParams::default())
            .await;
        assert_matches!(result, Err(WorkflowError::Upstream(_)));

        let segment = store.find_segment(segments[0].id).await.unwrap().unwrap();
        assert!(segment.images.is_empty());
        assert_eq!(segment.image_approval_status, ApprovalStatus::Draft);
    }

    #[tokio::test]
    async fn selecting_candidate_reopens_rejected_review() {
        let (store, _fake, controller) = setup();
        let (_project_id, segments) = seeded_project(&store, 1).await;
        let segment_id = segments[0].id;

        let first = controller
            .generate_image(segment_id, ImageParams::default())
            .await
            .unwrap();
        controller
            .generate_image(segment_id, ImageParams::default())
            .await
            .unwrap();
        controller
            .reject(segment_id, ReviewStage::Image, Some("too dark"))
            .await
            .unwrap();

        let selected = controller
            .select_candidate(segment_id, MediaKind::Image, first.id)
            .await
            .unwrap();
        assert!(selected.is_selected);

        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(segment.image_approval_status, ApprovalStatus::Processing);
        assert_eq!(segment.selected(MediaKind::Image).map(|c| c.id), Some(first.id));
    }

    #[tokio::test]
    async fn video_approval_needs_completed_video() {
        let (store, _fake, controller) = setup();
        let (_project_id, segments) = seeded_project(&store, 1).await;
        let segment_id = segments[0].id;
        walk_to(&store, segment_id, ApprovalField::Video, ApprovalStatus::Processing).await;

        assert_matches!(
            controller.approve(segment_id, ReviewStage::Video).await,
            Err(WorkflowError::Core(CoreError::Precondition(_)))
        );
    }

    #[tokio::test]
    async fn replaced_video_is_not_approvable_after_its_successor_fails() {
        let (store, fake, controller) = setup();
        let (_project_id, segments) = seeded_project(&store, 1).await;
        let segment_id = segments[0].id;
        let tracker = TaskTracker::new(
            store.clone(),
            fake.clone(),
            PollPolicy {
                interval: Duration::from_millis(5),
                max_attempts: Some(10),
                max_duration: None,
            },
        );
        let params = || VideoParams {
            image_url: Some("https://cdn.test/still.png".into()),
            ..VideoParams::default()
        };

        let first = tracker.submit(segment_id, params()).await.unwrap();
        fake.push_status(TaskStatus::Completed, Some("https://cdn.test/first.mp4"));
        let done = tracker
            .poll(first.task_handle.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(done.candidate.status, CandidateStatus::Completed);

        let second = tracker.submit(segment_id, params()).await.unwrap();
        fake.push_poll(Ok(RemoteTaskState {
            status: TaskStatus::Failed,
            video_url: None,
            progress: None,
            error: Some("render crashed".into()),
        }));
        tracker
            .poll(second.task_handle.as_deref().unwrap())
            .await
            .unwrap();

        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(segment.video_approval_status, ApprovalStatus::Processing);
        assert!(segment.videos.iter().all(|v| !v.is_selected));

        assert_matches!(
            controller.approve(segment_id, ReviewStage::Video).await,
            Err(WorkflowError::Core(CoreError::Precondition(_)))
        );

        controller
            .select_candidate(segment_id, MediaKind::Video, first.id)
            .await
            .unwrap();
        let outcome = controller.approve(segment_id, ReviewStage::Video).await.unwrap();
        assert_eq!(outcome.segment.video_approval_status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn history_is_chronological_and_carries_reasons() {
        let (store, _fake, controller) = setup();
        let (_project_id, segments) = seeded_project(&store, 1).await;
        let segment_id = segments[0].id;
        walk_to(&store, segment_id, ApprovalField::Final, ApprovalStatus::Processing).await;
        controller
            .reject(segment_id, ReviewStage::Final, Some("audio drifts"))
            .await
            .unwrap();

        let history = controller.history(segment_id).await.unwrap();
        let hops: Vec<_> = history.iter().map(|e| (e.from_status, e.to_status)).collect();
        assert_eq!(
            hops,
            vec![
                (ApprovalStatus::Draft, ApprovalStatus::Submitted),
                (ApprovalStatus::Submitted, ApprovalStatus::Processing),
                (ApprovalStatus::Processing, ApprovalStatus::Rejected),
            ]
        );
        assert_eq!(history[2].reason.as_deref(), Some("audio drifts"));
    }

    #[tokio::test]
    async fn deleting_missing_project_is_not_found() {
        let (_store, _fake, controller) = setup();
        assert_matches!(
            controller.delete_project(404).await,
            Err(WorkflowError::Core(CoreError::NotFound { entity: "Project", id: 404 }))
        );
    }
}

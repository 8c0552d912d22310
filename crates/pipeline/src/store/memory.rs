//! In-memory [`WorkflowStore`] used by tests and simulation runs.
//!
//! One `RwLock` guards the whole state, so every method is atomic with
//! respect to the others.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use storyreel_core::approval::ApprovalStatus;
use storyreel_core::audit::{sort_history, StatusChangeEvent};
use storyreel_core::candidate::{self, CandidateStatus, MediaCandidate, MediaKind};
use storyreel_core::error::CoreError;
use storyreel_core::segment::{ensure_video_completed, ApprovalField, FieldChange, SegmentState};
use storyreel_core::stage::{ProjectStatus, StageSummary, WorkflowStage};
use storyreel_core::task::CandidateUpdate;
use storyreel_core::types::DbId;
use tokio::sync::RwLock;

use super::{NewCandidate, NewProject, NewSegment, ProjectRecord, WorkflowStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryState {
    last_id: DbId,
    projects: BTreeMap<DbId, ProjectRecord>,
    segments: BTreeMap<DbId, SegmentState>,
    events: Vec<StatusChangeEvent>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn candidate_mut(&mut self, id: DbId) -> Option<&mut MediaCandidate> {
        self.segments
            .values_mut()
            .flat_map(|s| s.images.iter_mut().chain(s.videos.iter_mut()).chain(s.audios.iter_mut()))
            .find(|c| c.id == id)
    }

    fn candidates(&self) -> impl Iterator<Item = &MediaCandidate> {
        self.segments
            .values()
            .flat_map(|s| s.images.iter().chain(s.videos.iter()).chain(s.audios.iter()))
    }

    fn remove_segments_of(&mut self, project_id: DbId) {
        self.segments.retain(|_, s| s.project_id != project_id);
        let segments = &self.segments;
        self.events.retain(|e| segments.contains_key(&e.segment_id));
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn segment_not_found(id: DbId) -> StoreError {
    StoreError::Domain(CoreError::NotFound {
        entity: "Segment",
        id,
    })
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn create_project(&self, input: &NewProject) -> Result<ProjectRecord, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let project = ProjectRecord {
            id: state.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
            current_stage: WorkflowStage::ScriptGeneration,
            status: ProjectStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.projects.values().rev().cloned().collect())
    }

    async fn find_project(&self, id: DbId) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn delete_project(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.projects.remove(&id).is_none() {
            return Ok(false);
        }
        state.remove_segments_of(id);
        Ok(true)
    }

    async fn update_project_cache(
        &self,
        id: DbId,
        summary: StageSummary,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(false);
        };
        if !summary.differs_from(project.current_stage, project.status) {
            return Ok(false);
        }
        project.current_stage = summary.current_stage;
        project.status = summary.status;
        project.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_segments(&self, project_id: DbId) -> Result<Vec<SegmentState>, StoreError> {
        let state = self.state.read().await;
        let mut segments: Vec<SegmentState> = state
            .segments
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        segments.sort_by_key(|s| (s.order, s.id));
        Ok(segments)
    }

    async fn find_segment(&self, id: DbId) -> Result<Option<SegmentState>, StoreError> {
        Ok(self.state.read().await.segments.get(&id).cloned())
    }

    async fn replace_segments(
        &self,
        project_id: DbId,
        segments: &[NewSegment],
    ) -> Result<Option<Vec<SegmentState>>, StoreError> {
        let mut state = self.state.write().await;
        if !state.projects.contains_key(&project_id) {
            return Ok(None);
        }
        state.remove_segments_of(project_id);

        let mut created = Vec::with_capacity(segments.len());
        for input in segments {
            let segment = SegmentState {
                id: state.next_id(),
                project_id,
                order: input.order,
                script: input.script.clone(),
                video_prompt: input.video_prompt.clone(),
                script_approval_status: ApprovalStatus::Draft,
                image_approval_status: ApprovalStatus::Draft,
                video_approval_status: ApprovalStatus::Draft,
                audio_approval_status: ApprovalStatus::Draft,
                final_approval_status: ApprovalStatus::Draft,
                images: Vec::new(),
                videos: Vec::new(),
                audios: Vec::new(),
            };
            state.segments.insert(segment.id, segment.clone());
            created.push(segment);
        }
        Ok(Some(created))
    }

    async fn apply_status_changes(
        &self,
        changes: &[FieldChange],
        reason: Option<&str>,
    ) -> Result<Vec<StatusChangeEvent>, StoreError> {
        let mut state = self.state.write().await;

        // Validate against copies first; nothing is written on failure.
        let mut staged: HashMap<DbId, SegmentState> = HashMap::new();
        for change in changes {
            let segment = match staged.entry(change.segment_id) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let current = state
                        .segments
                        .get(&change.segment_id)
                        .ok_or_else(|| segment_not_found(change.segment_id))?;
                    e.insert(current.clone())
                }
            };
            let actual = segment.status(change.field);
            if actual != change.from {
                return Err(StoreError::Domain(CoreError::Conflict(format!(
                    "Segment {} {} is {actual}, expected {}",
                    change.segment_id, change.field, change.from
                ))));
            }
            if change.field == ApprovalField::Video && change.to == ApprovalStatus::Approved {
                ensure_video_completed(segment)?;
            }
            segment.set_status(change.field, change.to);
        }

        state.segments.extend(staged);

        let now = Utc::now();
        let mut events = Vec::with_capacity(changes.len());
        for change in changes {
            let event = StatusChangeEvent {
                id: state.next_id(),
                segment_id: change.segment_id,
                field: change.field,
                from_status: change.from,
                to_status: change.to,
                reason: reason.map(str::to_string),
                created_at: now,
            };
            state.events.push(event.clone());
            events.push(event);
        }
        Ok(events)
    }

    async fn insert_candidate(&self, input: &NewCandidate) -> Result<MediaCandidate, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let segment = state
            .segments
            .get_mut(&input.segment_id)
            .ok_or_else(|| segment_not_found(input.segment_id))?;

        let now = Utc::now();
        let list = segment.candidates_mut(input.kind);
        candidate::add_candidate(
            list,
            MediaCandidate {
                id,
                segment_id: input.segment_id,
                kind: input.kind,
                url: input.url.clone(),
                status: input.status,
                is_selected: input.is_selected,
                task_handle: input.task_handle.clone(),
                metadata: input.metadata.clone(),
                poll_attempts: 0,
                created_at: now,
                updated_at: now,
            },
        );
        list.last()
            .cloned()
            .ok_or_else(|| StoreError::Domain(CoreError::Internal("candidate not stored".into())))
    }

    async fn select_candidate(
        &self,
        segment_id: DbId,
        kind: MediaKind,
        candidate_id: DbId,
    ) -> Result<MediaCandidate, StoreError> {
        let mut state = self.state.write().await;
        let segment = state
            .segments
            .get_mut(&segment_id)
            .ok_or_else(|| segment_not_found(segment_id))?;
        let selected = candidate::select_candidate(segment.candidates_mut(kind), candidate_id)?;
        Ok(selected.clone())
    }

    async fn find_candidate(&self, id: DbId) -> Result<Option<MediaCandidate>, StoreError> {
        let state = self.state.read().await;
        let found = state.candidates().find(|c| c.id == id).cloned();
        Ok(found)
    }

    async fn find_candidate_by_task(
        &self,
        task_handle: &str,
    ) -> Result<Option<MediaCandidate>, StoreError> {
        let state = self.state.read().await;
        let found = state
            .candidates()
            .find(|c| c.task_handle.as_deref() == Some(task_handle))
            .cloned();
        Ok(found)
    }

    async fn list_in_flight_videos(&self) -> Result<Vec<MediaCandidate>, StoreError> {
        let state = self.state.read().await;
        let mut videos: Vec<MediaCandidate> = state
            .candidates()
            .filter(|c| c.kind == MediaKind::Video && c.status.is_pending() && c.task_handle.is_some())
            .cloned()
            .collect();
        videos.sort_by_key(|c| (c.created_at, c.id));
        Ok(videos)
    }

    async fn update_candidate_if(
        &self,
        id: DbId,
        expected: CandidateStatus,
        update: &CandidateUpdate,
    ) -> Result<Option<MediaCandidate>, StoreError> {
        let mut state = self.state.write().await;
        let Some(candidate) = state.candidate_mut(id) else {
            return Ok(None);
        };
        if candidate.status != expected {
            return Ok(None);
        }
        candidate.status = update.status;
        candidate.url = update.url.clone();
        candidate.metadata = update.metadata.clone();
        if !update.status.is_selectable() {
            candidate.is_selected = false;
        }
        candidate.updated_at = Utc::now();
        Ok(Some(candidate.clone()))
    }

    async fn record_poll_attempt(&self, id: DbId) -> Result<Option<i32>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.candidate_mut(id).map(|c| {
            c.poll_attempts += 1;
            c.poll_attempts
        }))
    }

    async fn list_status_changes(
        &self,
        segment_id: DbId,
    ) -> Result<Vec<StatusChangeEvent>, StoreError> {
        let state = self.state.read().await;
        let mut events: Vec<StatusChangeEvent> = state
            .events
            .iter()
            .filter(|e| e.segment_id == segment_id)
            .cloned()
            .collect();
        sort_history(&mut events);
        Ok(events)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use storyreel_core::approval::ApprovalStatus::*;
    use storyreel_core::segment::ApprovalField;

    async fn seeded() -> (MemoryStore, DbId, DbId) {
        let store = MemoryStore::new();
        let project = store
            .create_project(&NewProject {
                name: "Tide".into(),
                description: None,
            })
            .await
            .unwrap();
        let segments = store
            .replace_segments(
                project.id,
                &[NewSegment {
                    order: 1,
                    script: "The sea rises.".into(),
                    video_prompt: None,
                }],
            )
            .await
            .unwrap()
            .unwrap();
        (store, project.id, segments[0].id)
    }

    fn image(segment_id: DbId, status: CandidateStatus, selected: bool) -> NewCandidate {
        NewCandidate {
            segment_id,
            kind: MediaKind::Image,
            url: Some("https://cdn.test/i.png".into()),
            status,
            is_selected: selected,
            task_handle: None,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn stale_batch_is_rejected_without_writes() {
        let (store, _project_id, segment_id) = seeded().await;
        let changes = [
            FieldChange { segment_id, field: ApprovalField::Script, from: Draft, to: Submitted },
            FieldChange { segment_id, field: ApprovalField::Audio, from: Processing, to: Approved },
        ];

        let result = store.apply_status_changes(&changes, None).await;
        assert_matches!(result, Err(StoreError::Domain(CoreError::Conflict(_))));

        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(segment.script_approval_status, Draft);
        assert!(store.list_status_changes(segment_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn video_approval_rechecks_selection_at_write_time() {
        let (store, _project_id, segment_id) = seeded().await;
        let video = |status, url: Option<&str>| NewCandidate {
            segment_id,
            kind: MediaKind::Video,
            url: url.map(str::to_string),
            status,
            is_selected: true,
            task_handle: None,
            metadata: serde_json::json!({}),
        };
        store
            .insert_candidate(&video(CandidateStatus::Completed, Some("https://cdn.test/v.mp4")))
            .await
            .unwrap();
        // A newer submission takes the selection after the caller planned.
        store
            .insert_candidate(&video(CandidateStatus::Pending, None))
            .await
            .unwrap();

        let changes = [
            FieldChange { segment_id, field: ApprovalField::Video, from: Draft, to: Submitted },
            FieldChange { segment_id, field: ApprovalField::Video, from: Submitted, to: Processing },
            FieldChange { segment_id, field: ApprovalField::Video, from: Processing, to: Approved },
        ];
        let result = store.apply_status_changes(&changes, None).await;
        assert_matches!(result, Err(StoreError::Domain(CoreError::Precondition(_))));

        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(segment.video_approval_status, Draft);
        assert!(store.list_status_changes(segment_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn selecting_on_missing_segment_reports_the_segment() {
        let (store, _project_id, segment_id) = seeded().await;
        let image = store
            .insert_candidate(&image(segment_id, CandidateStatus::Completed, true))
            .await
            .unwrap();
        let missing = segment_id + 1000;
        assert_matches!(
            store.select_candidate(missing, MediaKind::Image, image.id).await,
            Err(StoreError::Domain(CoreError::NotFound { entity: "Segment", id })) if id == missing
        );
    }

    #[tokio::test]
    async fn sequential_hops_on_one_field_apply_in_order() {
        let (store, _project_id, segment_id) = seeded().await;
        let changes = [
            FieldChange { segment_id, field: ApprovalField::Image, from: Draft, to: Submitted },
            FieldChange { segment_id, field: ApprovalField::Image, from: Submitted, to: Processing },
        ];
        let events = store.apply_status_changes(&changes, Some("ready")).await.unwrap();
        assert_eq!(events.len(), 2);

        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(segment.image_approval_status, Processing);
    }

    #[tokio::test]
    async fn insert_and_select_keep_single_selection() {
        let (store, _project_id, segment_id) = seeded().await;
        let first = store
            .insert_candidate(&image(segment_id, CandidateStatus::Completed, true))
            .await
            .unwrap();
        let second = store
            .insert_candidate(&image(segment_id, CandidateStatus::Completed, true))
            .await
            .unwrap();
        let failed = store
            .insert_candidate(&image(segment_id, CandidateStatus::Failed, true))
            .await
            .unwrap();
        assert!(!failed.is_selected);

        store
            .select_candidate(segment_id, MediaKind::Image, first.id)
            .await
            .unwrap();
        let segment = store.find_segment(segment_id).await.unwrap().unwrap();
        assert_eq!(candidate::selected_count(&segment.images), 1);
        assert_eq!(segment.selected(MediaKind::Image).unwrap().id, first.id);
        assert_ne!(first.id, second.id);

        assert_matches!(
            store.select_candidate(segment_id, MediaKind::Image, failed.id).await,
            Err(StoreError::Domain(CoreError::Precondition(_)))
        );
        assert_matches!(
            store.select_candidate(segment_id, MediaKind::Video, first.id).await,
            Err(StoreError::Domain(CoreError::NotFound { .. }))
        );
    }

    #[tokio::test]
    async fn candidate_update_is_compare_and_set() {
        let (store, _project_id, segment_id) = seeded().await;
        let pending = store
            .insert_candidate(&image(segment_id, CandidateStatus::Pending, true))
            .await
            .unwrap();
        let update = CandidateUpdate {
            status: CandidateStatus::Failed,
            url: None,
            metadata: serde_json::json!({ "failure_reason": "boom" }),
        };

        let updated = store
            .update_candidate_if(pending.id, CandidateStatus::Pending, &update)
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_selected);
        assert!(store
            .update_candidate_if(pending.id, CandidateStatus::Pending, &update)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_project_cascades() {
        let (store, project_id, segment_id) = seeded().await;
        store
            .insert_candidate(&image(segment_id, CandidateStatus::Completed, true))
            .await
            .unwrap();
        store
            .apply_status_changes(
                &[FieldChange { segment_id, field: ApprovalField::Final, from: Draft, to: Submitted }],
                None,
            )
            .await
            .unwrap();

        assert!(store.delete_project(project_id).await.unwrap());
        assert!(store.find_segment(segment_id).await.unwrap().is_none());
        assert!(store.list_status_changes(segment_id).await.unwrap().is_empty());
        assert!(!store.delete_project(project_id).await.unwrap());
    }
}

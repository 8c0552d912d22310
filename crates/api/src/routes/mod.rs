pub mod health;

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{candidate, project, segment, task};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// GET    /projects                                        list
/// POST   /projects                                        create
/// GET    /projects/{id}                                   view
/// DELETE /projects/{id}                                   delete
/// POST   /projects/{id}/segments/regenerate               regenerate_segments
/// POST   /projects/{id}/stages/{stage}/approve            approve_stage
///
/// GET    /segments/{id}                                   get_by_id
/// POST   /segments/{id}/stages/{stage}/approve            approve
/// POST   /segments/{id}/stages/{stage}/reject             reject
/// POST   /segments/{id}/transition                        transition
/// GET    /segments/{id}/history                           history
/// POST   /segments/{id}/images                            generate_image
/// POST   /segments/{id}/audios                            generate_audio
/// POST   /segments/{id}/videos                            submit_video
/// PUT    /segments/{id}/candidates/{kind}/{candidate_id}/select  select
///
/// GET    /tasks/{task_handle}                             poll
/// POST   /candidates/{id}/cancel                          cancel
/// ```
pub fn api_routes() -> Router<AppState> {
    let projects = Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/{id}", get(project::get_by_id).delete(project::delete))
        .route(
            "/{id}/segments/regenerate",
            post(project::regenerate_segments),
        )
        .route("/{id}/stages/{stage}/approve", post(project::approve_stage));

    let segments = Router::new()
        .route("/{id}", get(segment::get_by_id))
        .route("/{id}/stages/{stage}/approve", post(segment::approve))
        .route("/{id}/stages/{stage}/reject", post(segment::reject))
        .route("/{id}/transition", post(segment::transition))
        .route("/{id}/history", get(segment::history))
        .route("/{id}/images", post(candidate::generate_image))
        .route("/{id}/audios", post(candidate::generate_audio))
        .route("/{id}/videos", post(task::submit_video))
        .route(
            "/{id}/candidates/{kind}/{candidate_id}/select",
            put(candidate::select),
        );

    Router::new()
        .nest("/projects", projects)
        .nest("/segments", segments)
        .route("/tasks/{task_handle}", get(task::poll))
        .route("/candidates/{id}/cancel", post(task::cancel))
}

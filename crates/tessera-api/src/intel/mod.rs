//! The RAG intelligence API, mounted under `/api/intel`.

pub mod documents;
pub mod knowledge_bases;
pub mod projects;
pub mod reports;
pub mod subjects;
pub mod workflows;

use axum::{
  Router,
  routing::{get, post, put},
};
use tessera_core::store::SiteStore;

use crate::ApiState;

pub fn router<S>() -> Router<ApiState<S>>
where
  S: SiteStore + 'static,
{
  Router::new()
    // Knowledge bases
    .route(
      "/knowledge-bases",
      get(knowledge_bases::list::<S>).post(knowledge_bases::create::<S>),
    )
    .route(
      "/knowledge-bases/{id}",
      get(knowledge_bases::get_one::<S>)
        .put(knowledge_bases::update::<S>)
        .delete(knowledge_bases::delete_one::<S>),
    )
    // Documents
    .route("/documents", get(documents::list::<S>).post(documents::create::<S>))
    .route(
      "/documents/{id}",
      get(documents::get_one::<S>).delete(documents::remove::<S>),
    )
    .route("/documents/{id}/chunks", get(documents::chunks::<S>))
    .route(
      "/documents/{id}/projects/{project_id}",
      post(documents::link::<S>).delete(documents::unlink::<S>),
    )
    // Projects
    .route("/projects", get(projects::list::<S>).post(projects::create::<S>))
    .route(
      "/projects/{id}",
      get(projects::get_one::<S>)
        .put(projects::update::<S>)
        .delete(projects::delete_one::<S>),
    )
    .route("/projects/{id}/documents", get(projects::documents::<S>))
    .route(
      "/project-types",
      get(projects::list_types::<S>).post(projects::create_type::<S>),
    )
    .route(
      "/project-types/{id}",
      put(projects::update_type::<S>).delete(projects::delete_type::<S>),
    )
    // Workflows and runs
    .route("/workflows", get(workflows::list::<S>).post(workflows::create::<S>))
    .route(
      "/workflows/{id}",
      get(workflows::get_one::<S>)
        .put(workflows::update::<S>)
        .delete(workflows::delete_one::<S>),
    )
    .route("/workflows/{id}/run", post(workflows::run::<S>))
    .route("/runs/{run_id}", get(workflows::get_run::<S>))
    // Research subjects
    .route(
      "/research-subjects",
      get(subjects::list::<S>).post(subjects::create::<S>),
    )
    .route(
      "/research-subjects/{id}",
      get(subjects::get_one::<S>)
        .put(subjects::update::<S>)
        .delete(subjects::delete_one::<S>),
    )
    .route("/research-subjects/{id}/duplicate", post(subjects::duplicate::<S>))
    .route("/research-subjects/{id}/workflows", get(subjects::workflows::<S>))
    // Reports
    .route("/reports", get(reports::list::<S>).post(reports::callback::<S>))
    .route("/reports/{run_id}", get(reports::get_one::<S>))
    .route("/reports/{run_id}/view", get(reports::view::<S>))
    .route("/reports/{run_id}/html", get(reports::html::<S>))
}

//! The editor-facing admin API, mounted under `/api/admin`.

pub mod analytics;
pub mod items;
pub mod pages;
pub mod sections;
pub mod theme;

use axum::{
  Extension, Router,
  routing::{get, patch, post},
};
use strum::IntoEnumIterator as _;
use tessera_core::{item::ItemKind, store::SiteStore};

use crate::ApiState;

pub fn router<S>() -> Router<ApiState<S>>
where
  S: SiteStore + 'static,
{
  let mut router = Router::new()
    // Pages
    .route("/pages", get(pages::list::<S>).post(pages::create::<S>))
    .route(
      "/pages/{id}",
      get(pages::get_one::<S>).put(pages::update::<S>).delete(pages::delete_one::<S>),
    )
    .route("/pages/{id}/duplicate", post(pages::duplicate::<S>))
    .route(
      "/pages/{id}/sections",
      get(pages::list_sections::<S>)
        .post(pages::attach_section::<S>)
        .put(pages::replace_sections::<S>),
    )
    .route(
      "/pages/{id}/sections/{section_id}",
      patch(pages::update_link::<S>).delete(pages::detach_section::<S>),
    )
    // Sections
    .route("/sections", get(sections::list::<S>).post(sections::create::<S>))
    .route(
      "/sections/{id}",
      get(sections::get_one::<S>)
        .put(sections::update::<S>)
        .delete(sections::delete_one::<S>),
    )
    .route("/sections/{id}/duplicate", post(sections::duplicate::<S>))
    .route(
      "/sections/{id}/items",
      get(sections::list_items::<S>).post(sections::attach_item::<S>),
    )
    .route(
      "/sections/{id}/items/{item_id}",
      patch(sections::update_link::<S>).delete(sections::detach_item::<S>),
    )
    // Analytics
    .route("/analytics", get(analytics::list::<S>).post(analytics::ingest::<S>))
    .route("/analytics/summary", get(analytics::summary::<S>))
    .route("/analytics/top", get(analytics::top::<S>))
    // Theme
    .route("/theme", get(theme::get_theme::<S>).put(theme::put_theme::<S>));

  // One collection per item kind; the handlers learn the kind from the
  // route's extension.
  for kind in ItemKind::iter() {
    let base = format!("/{}", kind.collection());
    router = router
      .route(
        &base,
        get(items::list::<S>).post(items::create::<S>).layer(Extension(kind)),
      )
      .route(
        &format!("{base}/{{id}}"),
        get(items::get_one::<S>)
          .put(items::update::<S>)
          .delete(items::delete_one::<S>)
          .layer(Extension(kind)),
      )
      .route(
        &format!("{base}/{{id}}/duplicate"),
        post(items::duplicate::<S>).layer(Extension(kind)),
      );
  }

  router
}

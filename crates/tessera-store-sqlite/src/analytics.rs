//! [`AnalyticsStore`] for [`SqliteStore`].
//!
//! Every aggregate is a `GROUP BY` over `analytics_events`; rows never leave
//! the database thread un-aggregated. The UTC day of an event is the first
//! ten characters of its `created_at`.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use tessera_core::{
  analytics::{
    AnalyticsEvent, AnalyticsSummary, DayCount, EntityCount, EventQuery, KeyCount,
    LocationCount, NewEvent,
  },
  store::AnalyticsStore,
};
use uuid::Uuid;

use crate::{
  encode::{encode_count, encode_dt, encode_uuid, RawEvent, EVENT_COLS},
  store::SqliteStore,
  Error, Result,
};

/// Page size when a listing does not name one.
const DEFAULT_LIMIT: usize = 100;

fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or_default() }

/// `(key, count)` pairs for a single grouped column, most frequent first.
fn group_by(
  conn: &Connection,
  column: &str,
  since: Option<&str>,
) -> rusqlite::Result<Vec<(Option<String>, i64)>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {column}, COUNT(*) AS n FROM analytics_events
     WHERE (?1 IS NULL OR created_at >= ?1)
     GROUP BY {column}
     ORDER BY n DESC, {column}"
  ))?;
  let rows = stmt
    .query_map([since], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Raw aggregates as read from SQLite.
struct RawSummary {
  total:           i64,
  unique_sessions: i64,
  by_day:          Vec<(String, i64)>,
  by_country:      Vec<(Option<String>, i64)>,
  by_location:     Vec<(Option<String>, Option<String>, i64)>,
  by_event_type:   Vec<(Option<String>, i64)>,
}

fn key_counts(rows: Vec<(Option<String>, i64)>) -> Vec<KeyCount> {
  rows
    .into_iter()
    .map(|(key, n)| KeyCount { key, count: count(n) })
    .collect()
}

impl AnalyticsStore for SqliteStore {
  async fn record_event(&self, input: NewEvent) -> Result<AnalyticsEvent> {
    let event = AnalyticsEvent {
      event_id:    Uuid::new_v4(),
      event_type:  input.event_type,
      entity_type: input.entity_type,
      entity_id:   input.entity_id,
      session_id:  input.session_id,
      page_path:   input.page_path,
      country:     input.country,
      city:        input.city,
      metadata:    input.metadata,
      created_at:  Utc::now(),
    };

    let id_str = encode_uuid(event.event_id);
    let at_str = encode_dt(event.created_at);
    let metadata = event.metadata.to_string();
    let e = event.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO analytics_events (
             event_id, event_type, entity_type, entity_id, session_id,
             page_path, country, city, metadata_json, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            e.event_type,
            e.entity_type,
            e.entity_id,
            e.session_id,
            e.page_path,
            e.country,
            e.city,
            metadata,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn list_events(&self, query: EventQuery) -> Result<Vec<AnalyticsEvent>> {
    let since = query.since.map(encode_dt);
    let limit = encode_count(query.limit.unwrap_or(DEFAULT_LIMIT));
    let offset = encode_count(query.offset.unwrap_or(0));

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLS} FROM analytics_events
           WHERE (?1 IS NULL OR created_at >= ?1)
             AND (?2 IS NULL OR event_type = ?2)
             AND (?3 IS NULL OR entity_type = ?3)
             AND (?4 IS NULL OR entity_id = ?4)
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              since,
              query.event_type,
              query.entity_type,
              query.entity_id,
              limit,
              offset,
            ],
            RawEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn summarize(&self, since: Option<DateTime<Utc>>) -> Result<AnalyticsSummary> {
    let since_str = since.map(encode_dt);

    let raw = self
      .conn
      .call(move |conn| {
        let since = since_str.as_deref();

        let (total, unique_sessions) = conn.query_row(
          "SELECT COUNT(*), COUNT(DISTINCT session_id) FROM analytics_events
           WHERE (?1 IS NULL OR created_at >= ?1)",
          [since],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let by_day = {
          let mut stmt = conn.prepare(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM analytics_events
             WHERE (?1 IS NULL OR created_at >= ?1)
             GROUP BY day
             ORDER BY day",
          )?;
          let rows = stmt
            .query_map([since], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        let by_location = {
          let mut stmt = conn.prepare(
            "SELECT country, city, COUNT(*) AS n FROM analytics_events
             WHERE (?1 IS NULL OR created_at >= ?1)
             GROUP BY country, city
             ORDER BY n DESC, country, city",
          )?;
          let rows = stmt
            .query_map([since], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        Ok(RawSummary {
          total,
          unique_sessions,
          by_day,
          by_country: group_by(conn, "country", since)?,
          by_location,
          by_event_type: group_by(conn, "event_type", since)?,
        })
      })
      .await?;

    let by_day = raw
      .by_day
      .into_iter()
      .map(|(day, n)| {
        NaiveDate::parse_from_str(&day, "%Y-%m-%d")
          .map(|day| DayCount { day, count: count(n) })
          .map_err(|e| Error::DateParse(e.to_string()))
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(AnalyticsSummary {
      since,
      total_events: count(raw.total),
      unique_sessions: count(raw.unique_sessions),
      by_day,
      by_country: key_counts(raw.by_country),
      by_location: raw
        .by_location
        .into_iter()
        .map(|(country, city, n)| LocationCount { country, city, count: count(n) })
        .collect(),
      by_event_type: key_counts(raw.by_event_type),
    })
  }

  async fn top_entities(
    &self,
    since: Option<DateTime<Utc>>,
    event_type: Option<String>,
    entity_type: Option<String>,
    limit: usize,
  ) -> Result<Vec<EntityCount>> {
    let since_str = since.map(encode_dt);
    let limit = encode_count(limit);

    let rows: Vec<(Option<String>, Option<String>, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_type, entity_id, COUNT(*) AS n FROM analytics_events
           WHERE entity_id IS NOT NULL
             AND (?1 IS NULL OR created_at >= ?1)
             AND (?2 IS NULL OR event_type = ?2)
             AND (?3 IS NULL OR entity_type = ?3)
           GROUP BY entity_type, entity_id
           ORDER BY n DESC, entity_type, entity_id
           LIMIT ?4",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![since_str, event_type, entity_type, limit],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(entity_type, entity_id, n)| EntityCount {
          entity_type,
          entity_id,
          count: count(n),
        })
        .collect(),
    )
  }
}

//! Chat-completion content deltas from an upstream `text/event-stream` body.

use std::{fmt, future};

use eventsource_stream::{EventStreamError, Eventsource as _};
use futures_util::{Stream, StreamExt as _};
use serde_json::Value;
use tessera_core::chat::{DeltaStream, GatewayError};

/// The `[DONE]` sentinel ending an OpenAI-style completion stream.
const DONE: &str = "[DONE]";

/// The content delta carried by one completion chunk, if any.
///
/// An `error` object in the chunk is an upstream failure.
pub fn content_delta(data: &str) -> Result<Option<String>, GatewayError> {
  let value: Value =
    serde_json::from_str(data).map_err(|e| GatewayError::Decode(e.to_string()))?;
  if let Some(error) = value.get("error") {
    let status = error
      .get("code")
      .and_then(Value::as_u64)
      .and_then(|c| u16::try_from(c).ok())
      .unwrap_or(500);
    let body = error
      .get("message")
      .and_then(Value::as_str)
      .map_or_else(|| error.to_string(), str::to_owned);
    return Err(GatewayError::Upstream { status, body });
  }
  Ok(
    value
      .pointer("/choices/0/delta/content")
      .and_then(Value::as_str)
      .map(str::to_owned),
  )
}

enum Step {
  Delta(String),
  Skip,
  Done,
}

fn step<E: fmt::Display>(
  event: Result<eventsource_stream::Event, EventStreamError<E>>,
) -> Result<Step, GatewayError> {
  let event = match event {
    Ok(event) => event,
    Err(EventStreamError::Transport(e)) => return Err(GatewayError::Transport(e.to_string())),
    Err(e) => return Err(GatewayError::Decode(e.to_string())),
  };
  let data = event.data.trim();
  if data.is_empty() {
    return Ok(Step::Skip);
  }
  if data == DONE {
    return Ok(Step::Done);
  }
  Ok(match content_delta(data)? {
    Some(delta) if !delta.is_empty() => Step::Delta(delta),
    _ => Step::Skip,
  })
}

/// Turn an SSE byte stream into a stream of non-empty content deltas.
///
/// The stream ends at `[DONE]` or at the end of the body. A transport or
/// decode failure is yielded once and ends the stream.
pub fn delta_stream<S, B, E>(body: S) -> DeltaStream
where
  S: Stream<Item = Result<B, E>> + Send + 'static,
  B: AsRef<[u8]> + Send + 'static,
  E: fmt::Display + Send + 'static,
{
  body
    .eventsource()
    .map(step)
    .scan(false, |failed: &mut bool, item| {
      let next = match item {
        _ if *failed => None,
        Ok(Step::Done) => None,
        Ok(step) => Some(Ok(step)),
        Err(e) => {
          *failed = true;
          Some(Err(e))
        }
      };
      future::ready(next)
    })
    .filter_map(|item| {
      future::ready(match item {
        Ok(Step::Delta(delta)) => Some(Ok(delta)),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
      })
    })
    .boxed()
}

//! Data-request event decoding.

use crate::error::EventError;
use crate::id::{DataSourceId, ExternalId, RequestId};
use crate::report::RawTask;
use crate::tx::EventLog;

/// Event type carrying the request-level attributes.
pub const EVENT_REQUEST: &str = "request";
/// Event type carrying the per-task attribute arrays.
pub const EVENT_RAW_REQUEST: &str = "raw_request";

pub const ATTR_ID: &str = "id";
pub const ATTR_VALIDATOR: &str = "validator";
pub const ATTR_ASK_COUNT: &str = "ask_count";
pub const ATTR_MIN_COUNT: &str = "min_count";
pub const ATTR_CALLDATA: &str = "calldata";
pub const ATTR_CLIENT_ID: &str = "client_id";
pub const ATTR_DATA_SOURCE_ID: &str = "data_source_id";
pub const ATTR_DATA_SOURCE_HASH: &str = "data_source_hash";
pub const ATTR_EXTERNAL_ID: &str = "external_id";

/// A fully decoded data-request event.
///
/// Carries everything the dispatcher needs: the task set for the execution
/// engine and the request-level fields for fee estimation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
  pub request_id: RequestId,
  pub requested_validators: Vec<String>,
  pub ask_count: u64,
  pub min_count: u64,
  pub calldata: Vec<u8>,
  pub client_id: String,
  pub tasks: Vec<RawTask>,
}

impl RequestEvent {
  /// The request id of a data-request log, without decoding the rest.
  ///
  /// Returns `Ok(None)` when the log carries no request event at all. The
  /// dispatcher uses this (plus [`RequestEvent::requested_validators`]) to
  /// discard irrelevant logs before paying for full extraction.
  pub fn request_id(log: &EventLog) -> Result<Option<RequestId>, EventError> {
    match log.value(EVENT_REQUEST, ATTR_ID) {
      Some(raw_id) => Ok(Some(RequestId(parse_u64(ATTR_ID, raw_id)?))),
      None => Ok(None),
    }
  }

  /// The validator identities the request is assigned to.
  pub fn requested_validators(log: &EventLog) -> Vec<String> {
    log
      .values(EVENT_REQUEST, ATTR_VALIDATOR)
      .into_iter()
      .map(str::to_string)
      .collect()
  }

  /// Decode a data-request event from one event log.
  ///
  /// Returns `Ok(None)` when the log carries no request event at all, and an
  /// error when it does but a required attribute is missing or malformed.
  pub fn from_log(log: &EventLog) -> Result<Option<Self>, EventError> {
    let Some(request_id) = Self::request_id(log)? else {
      return Ok(None);
    };

    let requested_validators = Self::requested_validators(log);

    let ask_count = parse_u64(ATTR_ASK_COUNT, single(log, EVENT_REQUEST, ATTR_ASK_COUNT)?)?;
    let min_count = parse_u64(ATTR_MIN_COUNT, single(log, EVENT_REQUEST, ATTR_MIN_COUNT)?)?;

    let raw_calldata = single(log, EVENT_REQUEST, ATTR_CALLDATA)?;
    let calldata = hex::decode(raw_calldata).map_err(|e| EventError::InvalidAttribute {
      key: ATTR_CALLDATA,
      message: e.to_string(),
    })?;

    // Client id is optional; requests made without one report an empty string.
    let client_id = log
      .value(EVENT_REQUEST, ATTR_CLIENT_ID)
      .unwrap_or_default()
      .to_string();

    let tasks = decode_raw_tasks(log, request_id)?;

    Ok(Some(Self {
      request_id,
      requested_validators,
      ask_count,
      min_count,
      calldata,
      client_id,
      tasks,
    }))
  }
}

/// Decode the zipped per-task attribute arrays into tasks.
///
/// The chain emits one `raw_request` attribute per field per task; the arrays
/// line up positionally, so a length disagreement means the event is corrupt.
fn decode_raw_tasks(log: &EventLog, request_id: RequestId) -> Result<Vec<RawTask>, EventError> {
  let data_source_ids = log.values(EVENT_RAW_REQUEST, ATTR_DATA_SOURCE_ID);
  let hashes = log.values(EVENT_RAW_REQUEST, ATTR_DATA_SOURCE_HASH);
  let external_ids = log.values(EVENT_RAW_REQUEST, ATTR_EXTERNAL_ID);
  let calldatas = log.values(EVENT_RAW_REQUEST, ATTR_CALLDATA);

  if data_source_ids.len() != external_ids.len()
    || data_source_ids.len() != calldatas.len()
    || data_source_ids.len() != hashes.len()
  {
    return Err(EventError::MisalignedRawRequests {
      data_source_ids: data_source_ids.len(),
      external_ids: external_ids.len(),
      calldatas: calldatas.len(),
      hashes: hashes.len(),
    });
  }

  let mut tasks = Vec::with_capacity(data_source_ids.len());
  for (((raw_did, raw_eid), hash), calldata) in data_source_ids
    .into_iter()
    .zip(external_ids)
    .zip(hashes)
    .zip(calldatas)
  {
    tasks.push(RawTask {
      request_id,
      data_source_id: DataSourceId(parse_u64(ATTR_DATA_SOURCE_ID, raw_did)?),
      data_source_hash: hash.to_string(),
      external_id: ExternalId(parse_u64(ATTR_EXTERNAL_ID, raw_eid)?),
      calldata: calldata.to_string(),
    });
  }

  Ok(tasks)
}

fn single<'a>(
  log: &'a EventLog,
  event_type: &'static str,
  key: &'static str,
) -> Result<&'a str, EventError> {
  let values = log.values(event_type, key);
  match values.as_slice() {
    [value] => Ok(value),
    _ => Err(EventError::MissingAttribute { event_type, key }),
  }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, EventError> {
  raw.parse().map_err(|_| EventError::InvalidAttribute {
    key,
    message: format!("not an integer: {:?}", raw),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tx::{Attribute, Event};

  fn attr(key: &str, value: &str) -> Attribute {
    Attribute {
      key: key.to_string(),
      value: value.to_string(),
    }
  }

  fn request_log() -> EventLog {
    EventLog {
      events: vec![
        Event {
          kind: EVENT_REQUEST.to_string(),
          attributes: vec![
            attr(ATTR_ID, "42"),
            attr(ATTR_VALIDATOR, "valoper1aaa"),
            attr(ATTR_VALIDATOR, "valoper1bbb"),
            attr(ATTR_ASK_COUNT, "2"),
            attr(ATTR_MIN_COUNT, "1"),
            attr(ATTR_CALLDATA, "0042"),
            attr(ATTR_CLIENT_ID, "client-7"),
          ],
        },
        Event {
          kind: EVENT_RAW_REQUEST.to_string(),
          attributes: vec![
            attr(ATTR_DATA_SOURCE_ID, "10"),
            attr(ATTR_DATA_SOURCE_HASH, "hash-10"),
            attr(ATTR_EXTERNAL_ID, "1"),
            attr(ATTR_CALLDATA, "BTC"),
            attr(ATTR_DATA_SOURCE_ID, "11"),
            attr(ATTR_DATA_SOURCE_HASH, "hash-11"),
            attr(ATTR_EXTERNAL_ID, "2"),
            attr(ATTR_CALLDATA, "ETH"),
          ],
        },
      ],
    }
  }

  #[test]
  fn decodes_a_full_request_event() {
    let event = RequestEvent::from_log(&request_log()).unwrap().unwrap();

    assert_eq!(event.request_id, RequestId(42));
    assert_eq!(event.requested_validators, vec!["valoper1aaa", "valoper1bbb"]);
    assert_eq!(event.ask_count, 2);
    assert_eq!(event.min_count, 1);
    assert_eq!(event.calldata, vec![0x00, 0x42]);
    assert_eq!(event.client_id, "client-7");
    assert_eq!(event.tasks.len(), 2);
    assert_eq!(event.tasks[0].external_id, ExternalId(1));
    assert_eq!(event.tasks[0].data_source_hash, "hash-10");
    assert_eq!(event.tasks[1].calldata, "ETH");
  }

  #[test]
  fn non_request_log_decodes_to_none() {
    let log = EventLog {
      events: vec![Event {
        kind: "transfer".to_string(),
        attributes: vec![attr("amount", "10")],
      }],
    };
    assert!(RequestEvent::from_log(&log).unwrap().is_none());
  }

  #[test]
  fn missing_ask_count_is_an_error() {
    let mut log = request_log();
    log.events[0]
      .attributes
      .retain(|a| a.key != ATTR_ASK_COUNT);

    let err = RequestEvent::from_log(&log).unwrap_err();
    assert!(matches!(
      err,
      EventError::MissingAttribute {
        key: ATTR_ASK_COUNT,
        ..
      }
    ));
  }

  #[test]
  fn absent_client_id_defaults_to_empty() {
    let mut log = request_log();
    log.events[0].attributes.retain(|a| a.key != ATTR_CLIENT_ID);

    let event = RequestEvent::from_log(&log).unwrap().unwrap();
    assert_eq!(event.client_id, "");
  }

  #[test]
  fn bad_calldata_hex_is_an_error() {
    let mut log = request_log();
    for a in &mut log.events[0].attributes {
      if a.key == ATTR_CALLDATA {
        a.value = "zz".to_string();
      }
    }

    let err = RequestEvent::from_log(&log).unwrap_err();
    assert!(matches!(err, EventError::InvalidAttribute { key: ATTR_CALLDATA, .. }));
  }

  #[test]
  fn misaligned_task_arrays_are_an_error() {
    let mut log = request_log();
    log.events[1]
      .attributes
      .push(attr(ATTR_EXTERNAL_ID, "3"));

    let err = RequestEvent::from_log(&log).unwrap_err();
    assert!(matches!(err, EventError::MisalignedRawRequests { .. }));
  }
}

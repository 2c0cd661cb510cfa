//! Concrete time-series scenarios from spec.md §8 (scenarios 3 and 4).

use conn_pushqueue::{ContentType, PushOutcome, PushQueue, PushTransport, SubmitOutcome};
use conn_recorder::Recorder;
use serde_cbor::Value as Cbor;

struct ImmediateTransport {
    next_id: u64,
}

impl Default for ImmediateTransport {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl PushTransport for ImmediateTransport {
    fn submit(&mut self, _payload: &[u8], _content_type: ContentType) -> SubmitOutcome {
        let id = self.next_id;
        self.next_id += 1;
        SubmitOutcome::Submitted(id)
    }
}

/// Scenario 3: keep adding incrementing samples 100ms apart until the
/// record overflows, then push it — after the push, the record is back to
/// empty (`resources == [] && timestamps == []`).
#[test]
fn overflow_then_push_leaves_record_empty() {
    let mut recorder = Recorder::with_buffer_cap(256);
    let handle = recorder.create();

    let mut ts = 1_412_320_402_000i64;
    let mut value = 0i64;
    let mut added = 0;
    loop {
        match recorder.add_int(handle, "intOverflow", value, ts) {
            Ok(()) => {
                added += 1;
                value += 1;
                ts += 100;
            }
            Err(e) => {
                assert_eq!(e.kind, conn_types::Kind::NoMemory);
                break;
            }
        }
    }
    assert!(added > 0, "expected at least one sample before overflow");

    let mut queue = PushQueue::new();
    let mut transport = ImmediateTransport::default();
    recorder
        .push(handle, &mut transport, &mut queue, |_, ()| {}, ())
        .unwrap();

    let record = recorder.get(handle).unwrap();
    assert!(record.is_empty());
    assert_eq!(record.sample_count(), 0);
}

/// Scenario 4: samples added out of timestamp order end up sorted
/// ascending in both the internal timestamp list and the encoded frame.
#[test]
fn unordered_inserts_encode_in_ascending_timestamp_order() {
    let mut recorder = Recorder::new();
    let handle = recorder.create();
    let timestamps = [6000, 2000, 4000, 7000, 3000, 8000, 5000, 9000];
    for (i, &ts) in timestamps.iter().enumerate() {
        recorder.add_int(handle, "intValue", i as i64, ts).unwrap();
    }

    let record = recorder.get(handle).unwrap();
    let frame: Cbor = serde_cbor::from_slice(record.encoded_bytes()).unwrap();
    let map = match frame {
        Cbor::Map(m) => m,
        _ => panic!("expected a CBOR map"),
    };
    let samples = match map.get(&Cbor::Text("s".to_string())).unwrap() {
        Cbor::Array(a) => a.clone(),
        _ => panic!("expected an array"),
    };
    // Each row is [ts_delta, intValue]; 8 rows of width 2 = 16 entries.
    assert_eq!(samples.len(), 16, "expected one row per sample, width 2");

    // Reconstruct absolute timestamps from the deltas and confirm ascending order.
    let mut running_ts = 0i64;
    let mut absolute = Vec::new();
    for row in samples.chunks(2) {
        let delta = match row[0] {
            Cbor::Integer(d) => d as i64,
            _ => panic!("expected integer timestamp delta"),
        };
        running_ts += delta;
        absolute.push(running_ts);
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    assert_eq!(absolute, sorted.into_iter().map(i64::from).collect::<Vec<_>>());
}

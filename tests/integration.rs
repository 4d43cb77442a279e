//! Integration tests: load definitions, drive sessions over memory and file
//! transports, check wire bytes and decoded model values.

use genproto::{
    load_protocol_str, ConfigError, Direction, FileTransport, MemoryModel, MemoryTransport,
    ProtocolSession, SessionError, SessionState, Transport, Value,
};
use std::io;

const CSV3: &str = r#"
output {
  var_separator = ",";
  line_separator = newline;
  chunk { type = int; format = "%d"; node = /a; }
  chunk { type = int; format = "%d"; node = /b; }
  chunk { type = int; format = "%d"; node = /c; }
}
input {
  var_separator = ",";
  line_separator = newline;
  chunk { type = int; node = /a; }
  chunk { type = int; node = /b; }
  chunk { type = int; node = /c; }
}
"#;

const ALL_KINDS_BINARY: &str = r#"
output {
  binary_mode = true;
  chunk { type = bool; node = /gear; }
  chunk { type = byte; node = /flaps; }
  chunk { type = word; factor = 10; node = /heading; }
  chunk { type = int; offset = 100; factor = 2; node = /count; }
  chunk { type = fixed; node = /altitude; }
  chunk { type = float; offset = 1; factor = 0.5; node = /speed; }
  chunk { type = double; node = /latitude; }
}
input {
  binary_mode = true;
  chunk { type = bool; node = /gear; }
  chunk { type = byte; node = /flaps; }
  chunk { type = word; factor = 10; node = /heading; }
  chunk { type = int; offset = 100; factor = 2; node = /count; }
  chunk { type = fixed; node = /altitude; }
  chunk { type = float; offset = 1; factor = 0.5; node = /speed; }
  chunk { type = double; node = /latitude; }
}
"#;

const ALL_KINDS_ASCII: &str = r#"
output {
  var_separator = ";";
  line_separator = "\r\n";
  chunk { type = bool; node = /gear; }
  chunk { type = int; offset = 100; factor = 2; node = /count; }
  chunk { type = float; offset = 1; factor = 0.5; format = "%.3f"; node = /speed; }
  chunk { type = double; format = "%.6f"; node = /latitude; }
  chunk { type = string; node = /callsign; }
}
input {
  var_separator = ";";
  line_separator = "\r\n";
  chunk { type = bool; node = /gear; }
  chunk { type = int; offset = 100; factor = 2; node = /count; }
  chunk { type = float; offset = 1; factor = 0.5; node = /speed; }
  chunk { type = double; node = /latitude; }
  chunk { type = string; node = /callsign; }
}
"#;

fn session(def: &str, direction: Direction, transport: MemoryTransport) -> ProtocolSession<MemoryTransport, usize> {
    let definition = load_protocol_str(def).expect("load");
    let mut s = ProtocolSession::new(definition, direction, transport).expect("session");
    s.open().expect("open");
    s
}

fn sample_model() -> MemoryModel {
    let mut m = MemoryModel::new();
    m.set_value("/gear", true);
    m.set_value("/flaps", -5);
    m.set_value("/heading", 123);
    m.set_value("/count", 21);
    m.set_value("/altitude", 12.25f32);
    m.set_value("/speed", 3.5f32);
    m.set_value("/latitude", -1234.5678f64);
    m.set_value("/callsign", "hello world");
    m
}

#[test]
fn test_ascii_encode_example() {
    let mut model = MemoryModel::new();
    model.set_value("/a", 1);
    model.set_value("/b", 2);
    model.set_value("/c", 3);

    let mut out = session(CSV3, Direction::Out, MemoryTransport::new());
    let report = out.process(&mut model).expect("process");
    assert_eq!(report.written, 1);
    assert_eq!(out.transport().outgoing(), b"1,2,3\n");
}

#[test]
fn test_binary_round_trip_all_kinds() {
    let mut source = sample_model();
    let mut out = session(ALL_KINDS_BINARY, Direction::Out, MemoryTransport::new());
    out.process(&mut source).expect("encode");
    let record = out.transport_mut().take_outgoing();
    assert_eq!(record.len(), 1 + 1 + 2 + 4 + 4 + 4 + 8);
    assert_eq!(out.output_schema().and_then(|s| s.record_length()), Some(24));

    let mut inp = session(ALL_KINDS_BINARY, Direction::In, MemoryTransport::new());
    inp.transport_mut().push_incoming(&record);
    let mut decoded = MemoryModel::new();
    let report = inp.process(&mut decoded).expect("decode");
    assert_eq!(report.decoded, 1);
    assert_eq!(report.discarded, 0);

    assert_eq!(decoded.value("/gear"), Some(&Value::Bool(true)));
    assert_eq!(decoded.value("/flaps"), Some(&Value::Int(-5)));
    assert_eq!(decoded.value("/heading"), Some(&Value::Int(123)));
    assert_eq!(decoded.value("/count"), Some(&Value::Int(21)));
    assert_eq!(decoded.value("/altitude"), Some(&Value::Float(12.25)));
    assert_eq!(decoded.value("/speed"), Some(&Value::Float(3.5)));
    assert_eq!(decoded.value("/latitude"), Some(&Value::Double(-1234.5678)));
}

#[test]
fn test_binary_wire_layout() {
    let mut source = sample_model();
    let mut out = session(ALL_KINDS_BINARY, Direction::Out, MemoryTransport::new());
    out.process(&mut source).expect("encode");
    let r = out.transport().outgoing();

    assert_eq!(r[0], 1);
    assert_eq!(r[1], 0xfb); // -5
    assert_eq!(&r[2..4], &1230i16.to_be_bytes());
    assert_eq!(&r[4..8], &142i32.to_be_bytes());
    assert_eq!(&r[8..12], &((12.25f64 * 65536.0) as i32).to_be_bytes());
    assert_eq!(&r[12..16], &2.75f32.to_bits().to_be_bytes());
    assert_eq!(&r[16..24], &(-1234.5678f64).to_bits().to_be_bytes());
}

#[test]
fn test_ascii_round_trip_all_kinds() {
    let mut source = sample_model();
    let mut out = session(ALL_KINDS_ASCII, Direction::Out, MemoryTransport::new());
    out.process(&mut source).expect("encode");
    let line = out.transport_mut().take_outgoing();
    assert_eq!(line, b"1;142;2.750;-1234.567800;hello world\r\n");

    let mut inp = session(ALL_KINDS_ASCII, Direction::In, MemoryTransport::new());
    inp.transport_mut().push_incoming(&line);
    let mut decoded = MemoryModel::new();
    let report = inp.process(&mut decoded).expect("decode");
    assert_eq!(report.decoded, 1);

    assert_eq!(decoded.value("/gear"), Some(&Value::Bool(true)));
    assert_eq!(decoded.value("/count"), Some(&Value::Int(21)));
    assert_eq!(decoded.value("/speed"), Some(&Value::Float(3.5)));
    assert_eq!(decoded.value("/latitude"), Some(&Value::Double(-1234.5678)));
    assert_eq!(decoded.value("/callsign"), Some(&Value::String("hello world".to_string())));
}

#[test]
fn test_word_network_byte_order() {
    let def = r#"
output { binary_mode = true; byte_order = network; chunk { type = word; node = /w; } }
input  { binary_mode = true; byte_order = network; chunk { type = word; node = /w; } }
"#;
    let mut model = MemoryModel::new();
    model.set_value("/w", 0x1234);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    let wire = out.transport_mut().take_outgoing();
    assert_eq!(wire, vec![0x12, 0x34]);

    let mut inp = session(def, Direction::In, MemoryTransport::new());
    inp.transport_mut().push_incoming(&wire);
    let mut decoded = MemoryModel::new();
    inp.process(&mut decoded).expect("decode");
    assert_eq!(decoded.value("/w"), Some(&Value::Int(0x1234)));
}

#[test]
fn test_word_host_byte_order() {
    let def = r#"output { binary_mode = true; byte_order = host; chunk { type = word; node = /w; } }"#;
    let mut model = MemoryModel::new();
    model.set_value("/w", 0x1234);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    assert_eq!(out.transport().outgoing(), &0x1234i16.to_ne_bytes());
}

#[test]
fn test_fixed_point_wire_value() {
    let def = r#"output { binary_mode = true; chunk { type = fixed; node = /x; } }"#;
    let mut model = MemoryModel::new();
    model.set_value("/x", 1.5f64);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    assert_eq!(out.transport().outgoing(), &[0x00, 0x01, 0x80, 0x00]);
}

#[test]
fn test_binary_width_sum_and_footers() {
    let plain = load_protocol_str(
        r#"output { binary_mode = true;
             chunk { type = bool; node = /a; } chunk { type = word; node = /b; } chunk { type = double; node = /c; } }"#,
    )
    .expect("load");
    assert_eq!(plain.output.as_ref().and_then(|s| s.record_length()), Some(11));

    let footed = load_protocol_str(
        r#"output { binary_mode = true; binary_footer = length;
             chunk { type = bool; node = /a; } chunk { type = word; node = /b; } chunk { type = double; node = /c; } }"#,
    )
    .expect("load");
    assert_eq!(footed.output.as_ref().and_then(|s| s.record_length()), Some(15));
}

#[test]
fn test_length_footer_bytes() {
    let def = r#"output { binary_mode = true; binary_footer = length; chunk { type = word; node = /w; } }"#;
    let mut model = MemoryModel::new();
    model.set_value("/w", 0x1234);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    assert_eq!(out.transport().outgoing(), &[0x12, 0x34, 0, 0, 0, 6]);
}

#[test]
fn test_magic_footer_mismatch_discards_record() {
    let def = r#"
input { binary_mode = true; binary_footer = "magic:0xCAFEBABE"; chunk { type = word; node = /w; } }
"#;
    let mut inp = session(def, Direction::In, MemoryTransport::new());
    let mut model = MemoryModel::new();
    model.set_value("/w", 7);

    inp.transport_mut().push_incoming(&[0x00, 0x09, 0xde, 0xad, 0xbe, 0xef]);
    let report = inp.process(&mut model).expect("process");
    assert_eq!(report.discarded, 1);
    assert_eq!(model.value("/w"), Some(&Value::Int(7)));

    inp.transport_mut().push_incoming(&[0x00, 0x09, 0xca, 0xfe, 0xba, 0xbe]);
    let report = inp.process(&mut model).expect("process");
    assert_eq!(report.decoded, 1);
    assert_eq!(model.value("/w"), Some(&Value::Int(9)));
}

#[test]
fn test_record_length_override() {
    let larger = r#"output { binary_mode = true; record_length = 8; chunk { type = word; node = /w; } }"#;
    let mut model = MemoryModel::new();
    model.set_value("/w", 0x1234);
    let mut out = session(larger, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    assert_eq!(out.transport().outgoing(), &[0x12, 0x34, 0, 0, 0, 0, 0, 0]);

    let smaller = load_protocol_str(
        r#"output { binary_mode = true; record_length = 1; chunk { type = word; node = /w; } }"#,
    )
    .expect("load");
    assert_eq!(smaller.output.as_ref().and_then(|s| s.record_length()), Some(2));
}

#[test]
fn test_binary_short_record_is_discarded() {
    let def = r#"input { binary_mode = true;
        chunk { type = bool; node = /a; } chunk { type = word; node = /b; } chunk { type = double; node = /c; } }"#;
    let mut inp = session(def, Direction::In, MemoryTransport::new());
    let mut model = MemoryModel::new();
    inp.transport_mut().push_incoming(&[0u8; 10]);
    let report = inp.process(&mut model).expect("process");
    assert_eq!(report.decoded, 0);
    assert_eq!(report.discarded, 1);
    assert_eq!(model.value("/a"), None);
}

#[test]
fn test_file_like_transport_reads_one_record_per_cycle() {
    let def = r#"input { binary_mode = true; chunk { type = word; node = /w; } }"#;
    let mut inp = session(def, Direction::In, MemoryTransport::file_like());
    inp.transport_mut().push_incoming(&[0x00, 0x01, 0x00, 0x02]);
    let mut model = MemoryModel::new();

    assert_eq!(inp.process(&mut model).expect("process").decoded, 1);
    assert_eq!(model.value("/w"), Some(&Value::Int(1)));
    assert_eq!(inp.process(&mut model).expect("process").decoded, 1);
    assert_eq!(model.value("/w"), Some(&Value::Int(2)));
    assert_eq!(inp.process(&mut model).expect("process").decoded, 0);
}

#[test]
fn test_describe_schema_layout() {
    let def = load_protocol_str(
        r#"output { binary_mode = true; binary_footer = length;
             chunk { name = "gear"; type = bool; node = /gear; }
             chunk { type = word; factor = 10; node = /hdg; }
             chunk { type = string; const = "id"; }
             chunk { type = int; node = /n; } }"#,
    )
    .expect("load");
    let text = genproto::dump::describe_schema(def.output.as_ref().expect("output"));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("binary, Network byte order, record 11 bytes, footer length"));
    assert!(lines[1].contains("@0") && lines[1].contains("gear") && lines[1].contains("/gear"));
    assert!(lines[2].contains("@1") && lines[2].contains("0 + x*10"));
    assert!(lines[3].contains("@3") && lines[3].contains("var") && lines[3].contains("const \"id\""));
    assert!(lines[4].contains("@?"));
}

#[test]
fn test_binary_string_encode_and_decode_skip() {
    let def = r#"
output { binary_mode = true; chunk { type = string; node = /s; } chunk { type = bool; node = /b; } }
input  { binary_mode = true; chunk { type = string; node = /s; } chunk { type = bool; node = /b; } }
"#;
    let mut model = MemoryModel::new();
    model.set_value("/s", "abc");
    model.set_value("/b", true);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    assert_eq!(out.transport().outgoing(), &[0, 0, 0, 3, b'a', b'b', b'c', 1]);

    // Strings are not decoded and consume nothing: the single byte feeds the bool.
    let mut inp = session(def, Direction::In, MemoryTransport::new());
    assert_eq!(inp.input_schema().and_then(|s| s.record_length()), Some(1));
    inp.transport_mut().push_incoming(&[1]);
    let mut decoded = MemoryModel::new();
    let report = inp.process(&mut decoded).expect("decode");
    assert_eq!(report.decoded, 1);
    assert_eq!(decoded.value("/b"), Some(&Value::Bool(true)));
    assert_eq!(decoded.value("/s"), None);
}

#[test]
fn test_relative_bool_toggles() {
    let def = r#"input { line_separator = newline; chunk { type = bool; relative = true; node = /toggle; } }"#;
    let mut inp = session(def, Direction::In, MemoryTransport::new());
    let mut model = MemoryModel::new();
    model.set_value("/toggle", false);

    inp.transport_mut().push_incoming(b"0\n");
    inp.process(&mut model).expect("process");
    assert_eq!(model.value("/toggle"), Some(&Value::Bool(false)));

    inp.transport_mut().push_incoming(b"1\n");
    inp.process(&mut model).expect("process");
    assert_eq!(model.value("/toggle"), Some(&Value::Bool(true)));

    inp.transport_mut().push_incoming(b"1\n");
    inp.process(&mut model).expect("process");
    assert_eq!(model.value("/toggle"), Some(&Value::Bool(false)));
}

#[test]
fn test_relative_numeric_wrap_and_clamp() {
    let def = r#"
input {
  var_separator = ",";
  line_separator = newline;
  chunk { type = int; relative = true; min = 0; max = 360; wrap = true; node = /heading; }
  chunk { type = double; relative = true; min = 0; max = 100; node = /throttle; }
}
"#;
    let mut inp = session(def, Direction::In, MemoryTransport::new());
    let mut model = MemoryModel::new();
    model.set_value("/heading", 350);
    model.set_value("/throttle", 90.0f64);

    inp.transport_mut().push_incoming(b"20,25\n");
    inp.process(&mut model).expect("process");
    assert_eq!(model.value("/heading"), Some(&Value::Int(10)));
    assert_eq!(model.value("/throttle"), Some(&Value::Double(100.0)));
}

#[test]
fn test_ascii_fewer_fields_keeps_remaining_values() {
    let mut inp = session(CSV3, Direction::In, MemoryTransport::new());
    let mut model = MemoryModel::new();
    model.set_value("/c", 99);
    inp.transport_mut().push_incoming(b"5,6\n");
    let report = inp.process(&mut model).expect("process");
    assert_eq!(report.decoded, 1);
    assert_eq!(model.value("/a"), Some(&Value::Int(5)));
    assert_eq!(model.value("/b"), Some(&Value::Int(6)));
    assert_eq!(model.value("/c"), Some(&Value::Int(99)));
}

#[test]
fn test_ascii_reads_every_available_line() {
    let mut inp = session(CSV3, Direction::In, MemoryTransport::new());
    let mut model = MemoryModel::new();
    inp.transport_mut().push_incoming(b"1,2,3\n4,5,6\n7,8");
    let report = inp.process(&mut model).expect("process");
    assert_eq!(report.decoded, 2);
    assert_eq!(model.value("/a"), Some(&Value::Int(4)));
    assert_eq!(model.value("/c"), Some(&Value::Int(6)));

    // The incomplete line is picked up once its terminator arrives.
    inp.transport_mut().push_incoming(b",9\n");
    let report = inp.process(&mut model).expect("process");
    assert_eq!(report.decoded, 1);
    assert_eq!(model.value("/a"), Some(&Value::Int(7)));
    assert_eq!(model.value("/c"), Some(&Value::Int(9)));
}

#[test]
fn test_const_chunks() {
    let def = r#"
output {
  var_separator = ",";
  line_separator = newline;
  chunk { type = string; const = "$SIM"; }
  chunk { type = int; node = /n; }
}
"#;
    let mut model = MemoryModel::new();
    model.set_value("/n", 5);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    assert_eq!(out.transport().outgoing(), b"$SIM,5\n");
    assert_eq!(out.resolved_bindings(), 1);
}

#[test]
fn test_kiss_wrapped_binary_session() {
    let def = r#"
output { binary_mode = true; wrapper = kiss; chunk { type = byte; node = /b; } }
input  { binary_mode = true; wrapper = kiss; chunk { type = byte; node = /b; } }
"#;
    let mut model = MemoryModel::new();
    model.set_value("/b", -64); // 0xC0 on the wire
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    let framed = out.transport_mut().take_outgoing();
    assert_eq!(framed, vec![0xC0, 0x00, 0xDB, 0xDC, 0xC0]);

    let mut inp = session(def, Direction::In, MemoryTransport::new());
    inp.transport_mut().push_incoming(&framed);
    let mut decoded = MemoryModel::new();
    let report = inp.process(&mut decoded).expect("decode");
    assert_eq!(report.decoded, 1);
    assert_eq!(decoded.value("/b"), Some(&Value::Int(-64)));
}

#[test]
fn test_stxetx_wrapped_output() {
    let def = r#"output { binary_mode = true; wrapper = stxetx; chunk { type = bool; node = /b; } }"#;
    let mut model = MemoryModel::new();
    model.set_value("/b", false);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("encode");
    assert_eq!(out.transport().outgoing(), &[0x00, 0x02, 0x00, 0x00, 0x00, 0x03]);
}

#[test]
fn test_preamble_and_postamble() {
    let def = r#"
output {
  preamble = "START\n";
  postamble = "END\n";
  line_separator = newline;
  chunk { type = int; node = /n; }
}
"#;
    let mut model = MemoryModel::new();
    model.set_value("/n", 42);
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    assert_eq!(out.transport().outgoing(), b"START\n");
    out.process(&mut model).expect("process");
    out.close().expect("close");
    assert_eq!(out.transport().outgoing(), b"START\n42\nEND\n");
    assert!(!out.transport().is_open());
    assert_eq!(out.state(), SessionState::Closed);
}

#[test]
fn test_session_state_machine() {
    let definition = load_protocol_str(CSV3).expect("load");
    let mut s: ProtocolSession<MemoryTransport, usize> =
        ProtocolSession::new(definition, Direction::Out, MemoryTransport::new()).expect("session");
    let mut model = MemoryModel::new();

    assert!(matches!(s.process(&mut model), Err(SessionError::InvalidState { .. })));
    assert!(matches!(s.close(), Err(SessionError::InvalidState { .. })));
    s.open().expect("open");
    assert!(matches!(s.open(), Err(SessionError::InvalidState { .. })));
    s.close().expect("close");
    assert!(matches!(s.open(), Err(SessionError::InvalidState { .. })));
    assert!(matches!(s.process(&mut model), Err(SessionError::InvalidState { .. })));
}

#[test]
fn test_session_requires_schema_for_direction() {
    let definition = load_protocol_str(r#"output { chunk { type = int; node = /n; } }"#).expect("load");
    let result: Result<ProtocolSession<MemoryTransport, usize>, _> =
        ProtocolSession::new(definition, Direction::Bidirectional, MemoryTransport::new());
    assert!(matches!(
        result,
        Err(SessionError::Config(ConfigError::MissingSection(_)))
    ));
}

#[test]
fn test_empty_separator_rejects_definition() {
    let def = r#"
output {
  var_separator = "";
  chunk { type = int; node = /a; }
  chunk { type = int; node = /b; }
}
"#;
    assert!(matches!(
        load_protocol_str(def),
        Err(ConfigError::EmptySeparator { chunks: 2, .. })
    ));
}

#[test]
fn test_binding_cache_resolves_once() {
    let mut model = MemoryModel::new();
    let mut out = session(CSV3, Direction::Out, MemoryTransport::new());
    for _ in 0..3 {
        out.process(&mut model).expect("process");
    }
    assert_eq!(out.resolved_bindings(), 3);
    assert_eq!(out.transport().outgoing(), b"0,0,0\n0,0,0\n0,0,0\n");
}

#[test]
fn test_file_transport_round_trip() {
    let def = r#"
output { binary_mode = true; chunk { type = word; node = /w; } chunk { type = double; node = /d; } }
input  { binary_mode = true; chunk { type = word; node = /w; } chunk { type = double; node = /d; } }
"#;
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("records.bin");

    let mut out = ProtocolSession::new(
        load_protocol_str(def).expect("load"),
        Direction::Out,
        FileTransport::writer(path.clone()),
    )
    .expect("session");
    out.open().expect("open");
    let mut model = MemoryModel::new();
    for (w, d) in [(1, 0.5f64), (2, -2.25)] {
        model.set_value("/w", w);
        model.set_value("/d", d);
        out.process(&mut model).expect("write");
    }
    out.close().expect("close");
    assert_eq!(std::fs::metadata(&path).expect("metadata").len(), 20);

    let mut inp = ProtocolSession::new(
        load_protocol_str(def).expect("load"),
        Direction::In,
        FileTransport::reader(path.clone()),
    )
    .expect("session");
    inp.open().expect("open");
    let mut decoded = MemoryModel::new();

    assert_eq!(inp.process(&mut decoded).expect("read").decoded, 1);
    assert_eq!(decoded.value("/w"), Some(&Value::Int(1)));
    assert_eq!(decoded.value("/d"), Some(&Value::Double(0.5)));

    assert_eq!(inp.process(&mut decoded).expect("read").decoded, 1);
    assert_eq!(decoded.value("/w"), Some(&Value::Int(2)));
    assert_eq!(decoded.value("/d"), Some(&Value::Double(-2.25)));

    let last = inp.process(&mut decoded).expect("read");
    assert_eq!(last.decoded + last.discarded, 0);
    inp.close().expect("close");
}

#[test]
fn test_bidirectional_writes_before_reading() {
    let mut model = MemoryModel::new();
    model.set_value("/a", 1);
    model.set_value("/b", 2);
    model.set_value("/c", 3);
    let mut s = session(CSV3, Direction::Bidirectional, MemoryTransport::new());
    s.transport_mut().push_incoming(b"7,8,9\n");

    let report = s.process(&mut model).expect("process");
    assert_eq!(report.written, 1);
    assert_eq!(report.decoded, 1);
    // The record went out with the values held before the input was applied.
    assert_eq!(s.transport().outgoing(), b"1,2,3\n");
    assert_eq!(model.value("/a"), Some(&Value::Int(7)));
    assert_eq!(model.value("/c"), Some(&Value::Int(9)));
}

#[test]
fn test_ascii_line_missing_separator_is_decoded() {
    let def = r#"
input {
  var_separator = ",";
  line_separator = "\r\n";
  chunk { type = int; node = /a; }
  chunk { type = string; node = /s; }
}
"#;
    let mut inp = session(def, Direction::In, MemoryTransport::new());
    let mut model = MemoryModel::new();
    inp.transport_mut().push_incoming(b"3,abc\n");
    let report = inp.process(&mut model).expect("process");
    assert_eq!(report.decoded, 1);
    assert_eq!(report.discarded, 0);
    assert_eq!(model.value("/a"), Some(&Value::Int(3)));
    assert_eq!(model.value("/s"), Some(&Value::String("abc".to_string())));
}

#[test]
fn test_line_separator_defaults_to_newline() {
    let mut model = MemoryModel::new();
    model.set_value("/a", 1);
    model.set_value("/b", 2);

    let def = r#"output { var_separator = ","; chunk { type = int; node = /a; } chunk { type = int; node = /b; } }"#;
    let mut out = session(def, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("process");
    out.process(&mut model).expect("process");
    assert_eq!(out.transport().outgoing(), b"1,2\n1,2\n");

    let bare = r#"output { var_separator = ","; line_separator = ""; chunk { type = int; node = /a; } chunk { type = int; node = /b; } }"#;
    let mut out = session(bare, Direction::Out, MemoryTransport::new());
    out.process(&mut model).expect("process");
    out.process(&mut model).expect("process");
    assert_eq!(out.transport().outgoing(), b"1,21,2");
}

/// Opens fine, then fails every read and write.
#[derive(Debug, Default)]
struct BrokenTransport;

impl Transport for BrokenTransport {
    fn open(&mut self, _direction: Direction) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "link down"))
    }

    fn read_line(&mut self, _delimiter: u8, _buf: &mut Vec<u8>) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "link down"))
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down"))
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_transport_failure_fails_the_cycle() {
    let mut model = MemoryModel::new();

    let mut out: ProtocolSession<BrokenTransport, usize> =
        ProtocolSession::new(load_protocol_str(CSV3).expect("load"), Direction::Out, BrokenTransport)
            .expect("session");
    out.open().expect("open");
    match out.process(&mut model) {
        Err(SessionError::Transport(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected a transport error, got {:?}", other),
    }
    assert_eq!(out.state(), SessionState::Open);

    let mut inp: ProtocolSession<BrokenTransport, usize> =
        ProtocolSession::new(load_protocol_str(CSV3).expect("load"), Direction::In, BrokenTransport)
            .expect("session");
    inp.open().expect("open");
    match inp.process(&mut model) {
        Err(SessionError::Transport(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("expected a transport error, got {:?}", other),
    }
    inp.close().expect("close");
}

#[test]
fn test_missing_input_file_fails_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut inp: ProtocolSession<FileTransport, usize> = ProtocolSession::new(
        load_protocol_str(CSV3).expect("load"),
        Direction::In,
        FileTransport::reader(dir.path().join("absent.txt")),
    )
    .expect("session");
    assert!(matches!(inp.open(), Err(SessionError::Transport(_))));
    assert_eq!(inp.state(), SessionState::Created);
}

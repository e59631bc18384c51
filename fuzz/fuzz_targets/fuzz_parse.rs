#![no_main]

use jsontape::{Document, PaddedBytes, Parser, TapeType};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

/// Container start and end words must point at each other and the sentinels
/// must frame the tape, no matter what bytes went in.
fn check_tape(doc: &Document) {
    let n = doc.tape_len();
    assert!(n >= 3);
    let mut cur = doc.cursor();
    walk(&mut cur);
}

fn walk(cur: &mut jsontape::TapeCursor<'_>) {
    loop {
        match cur.tape_type() {
            TapeType::StartArray | TapeType::StartObject => {
                if cur.down() {
                    walk(cur);
                    assert!(cur.up());
                }
            }
            TapeType::String => {
                // Arena strings must be valid UTF-8.
                let _ = cur.as_str().unwrap();
            }
            _ => {}
        }
        if !cur.next() {
            break;
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let padded = PaddedBytes::from_slice(data);
    let mut parser = Parser::new();
    let Ok(doc) = parser.parse(&padded) else {
        return;
    };
    check_tape(doc);

    // When the oracle also accepts the input, both sides must agree on
    // document kind.
    if let Ok(oracle) = serde_json::from_slice::<Value>(data) {
        let root = doc.root();
        match oracle {
            Value::Array(_) => assert!(root.get_array().is_ok()),
            Value::Object(_) => assert!(root.get_object().is_ok()),
            Value::String(s) => assert_eq!(root.as_str().unwrap(), s),
            Value::Bool(b) => assert_eq!(root.as_bool().unwrap(), b),
            Value::Null => assert!(root.is_null()),
            Value::Number(_) => assert!(root.as_f64().is_ok()),
        }
    }
});

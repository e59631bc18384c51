use crate::{Error, TapeType, parse};

#[test]
fn cursor_and_elements_agree() {
    let doc = parse(&r#"{"rows": [{"id": 1}, {"id": 2}], "total": 2}"#.into()).unwrap();

    let total = doc.root().at_key("total").unwrap().as_i64().unwrap();

    let mut cur = doc.cursor();
    assert!(cur.down());
    assert!(cur.move_to_key("rows"));
    assert!(cur.down());
    let mut seen = 0;
    loop {
        assert_eq!(cur.tape_type(), TapeType::StartObject);
        seen += cur.element().at_key("id").unwrap().as_i64().unwrap();
        if !cur.next() {
            break;
        }
    }
    assert_eq!(seen, 3);
    assert_eq!(total, 2);
}

#[test]
fn cursor_survives_failed_probes() {
    let doc = parse(&r#"[{"a": 1}]"#.into()).unwrap();
    let mut cur = doc.cursor();
    assert!(cur.down());
    // Failed moves must not shift the position.
    assert!(!cur.next());
    assert!(!cur.prev());
    assert_eq!(cur.tape_type(), TapeType::StartObject);
    assert!(cur.down());
    assert!(!cur.move_to_key("b"));
    assert!(cur.move_to_key("a"));
    assert_eq!(cur.as_i64().unwrap(), 1);
}

#[test]
fn element_handles_are_independent() {
    let doc = parse(&r#"{"x": [1, 2], "y": "z"}"#.into()).unwrap();
    let x = doc.root().at_key("x").unwrap();
    let y = doc.root().at_key("y").unwrap();
    // Copies of the same handle stay usable after each other's reads.
    let first = x.at(0).unwrap();
    assert_eq!(y.as_str().unwrap(), "z");
    assert_eq!(first.as_i64().unwrap(), 1);
    assert_eq!(x.at(1).unwrap().as_i64().unwrap(), 2);
}

#[test]
fn object_iteration_yields_tape_order_with_duplicates() {
    let doc = parse(&r#"{"k": 1, "other": 2, "k": 3}"#.into()).unwrap();
    let entries: Vec<(String, i64)> = doc
        .root()
        .get_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.to_owned(), v.as_i64().unwrap()))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("k".to_owned(), 1),
            ("other".to_owned(), 2),
            ("k".to_owned(), 3),
        ]
    );
}

#[test]
fn lookup_misses_are_recoverable() {
    let doc = parse(&r#"{"present": [0]}"#.into()).unwrap();
    let root = doc.root();
    assert_eq!(root.at_key("absent").unwrap_err(), Error::NoSuchField);
    let arr = root.at_key("present").unwrap();
    assert_eq!(arr.at(5).unwrap_err(), Error::IndexOutOfBounds);
    assert_eq!(arr.at(0).unwrap().as_i64().unwrap(), 0);
}

#[test]
fn mixed_array_walk() {
    let doc = parse(&r#"[null, true, 3, "four", [5], {"six": 6}]"#.into()).unwrap();
    let kinds: Vec<TapeType> = doc
        .root()
        .get_array()
        .unwrap()
        .iter()
        .map(|e| e.tape_type())
        .collect();
    assert_eq!(
        kinds,
        vec![
            TapeType::Null,
            TapeType::True,
            TapeType::Int64,
            TapeType::String,
            TapeType::StartArray,
            TapeType::StartObject,
        ]
    );
}

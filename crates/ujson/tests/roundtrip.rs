//! Round-trip tests: documents produced by the writer parse back to the
//! same values, and agree with an independent JSON implementation.

use quickcheck_macros::quickcheck;
use serde_json::{Value, json};
use ujson::{Reader, Type, Val, Writer};

fn node(reader: &mut Reader<'_>, val: &Val) -> Value {
    match val.ty() {
        Type::Null | Type::Void => Value::Null,
        Type::Bool => Value::Bool(val.as_bool()),
        Type::Int => Value::from(val.as_int()),
        Type::Float => Value::from(val.as_float()),
        Type::Str => Value::from(val.as_str()),
        Type::Arr => arr(reader),
        Type::Obj => obj(reader),
    }
}

fn obj(reader: &mut Reader<'_>) -> Value {
    let mut val = Val::new();
    let mut map = serde_json::Map::new();
    let mut have = reader.obj_first(&mut val);

    while have {
        let key = val.id().to_string();
        map.insert(key, node(reader, &val));
        have = reader.obj_next(&mut val);
    }

    Value::Object(map)
}

fn arr(reader: &mut Reader<'_>) -> Value {
    let mut val = Val::new();
    let mut items = Vec::new();
    let mut have = reader.arr_first(&mut val);

    while have {
        items.push(node(reader, &val));
        have = reader.arr_next(&mut val);
    }

    Value::Array(items)
}

fn collect(json: &[u8]) -> Value {
    let mut reader = Reader::new(json);

    let value = match reader.start() {
        Type::Obj => obj(&mut reader),
        Type::Arr => arr(&mut reader),
        ty => panic!("unexpected top level type {ty}"),
    };

    reader.finish().unwrap();
    value
}

#[test]
fn written_document_reads_back() {
    let mut writer = Writer::new(Vec::new());

    writer.obj_start(None);
    writer.int_add(Some("id"), 7);
    writer.str_add(Some("name"), "tab\there");
    writer.float_add(Some("ratio"), 1.5);
    writer.arr_start(Some("tags"));
    writer.str_add(None, "a");
    writer.bool_add(None, true);
    writer.null_add(None);
    writer.obj_start(None);
    writer.int_add(Some("n"), -3);
    writer.obj_finish();
    writer.arr_finish();
    writer.obj_start(Some("empty"));
    writer.obj_finish();
    writer.obj_finish();

    let bytes = writer.finish().unwrap();

    let expected = json!({
        "id": 7,
        "name": "tab\there",
        "ratio": 1.5,
        "tags": ["a", true, null, {"n": -3}],
        "empty": {},
    });

    // Both this reader and an independent parser agree on the output.
    assert_eq!(collect(&bytes), expected);
    assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), expected);
}

#[quickcheck]
fn roundtrips_strings(s: String) -> bool {
    // Control characters below 0x20 without a short escape are not
    // representable by this writer.
    let clean: String = s
        .chars()
        .filter(|&c| c as u32 >= 0x20 || matches!(c, '\n' | '\r' | '\t' | '\u{8}' | '\u{c}'))
        .collect();

    let mut writer = Writer::new(Vec::new());
    writer.arr_start(None);
    writer.str_add(None, &clean);
    writer.arr_finish();

    let bytes = match writer.finish() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut reader = Reader::new(&bytes);
    let mut val = Val::with_limit(usize::MAX);

    reader.arr_first(&mut val) && val.as_str() == clean && !reader.arr_next(&mut val)
}

#[quickcheck]
fn roundtrips_integers(xs: Vec<i64>) -> bool {
    // i64::MIN has no in-range positive magnitude while parsing.
    let xs: Vec<i64> = xs.into_iter().filter(|&x| x != i64::MIN).collect();

    let mut writer = Writer::new(Vec::new());
    writer.arr_start(None);
    for &x in &xs {
        writer.int_add(None, x);
    }
    writer.arr_finish();

    let bytes = match writer.finish() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut reader = Reader::new(&bytes);
    let mut val = Val::new();
    let mut back = Vec::new();
    let mut have = reader.arr_first(&mut val);

    while have {
        if val.ty() != Type::Int {
            return false;
        }
        back.push(val.as_int());
        have = reader.arr_next(&mut val);
    }

    reader.finish().is_ok() && back == xs
}

#[quickcheck]
fn roundtrips_floats(x: f64) -> bool {
    if !x.is_finite() {
        return true;
    }

    let mut writer = Writer::new(Vec::new());
    writer.arr_start(None);
    writer.float_add(None, x);
    writer.arr_finish();

    let bytes = match writer.finish() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut reader = Reader::new(&bytes);
    let mut val = Val::new();

    reader.arr_first(&mut val) && val.as_float() == x && !reader.arr_next(&mut val)
}

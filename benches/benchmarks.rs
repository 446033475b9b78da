use amf_codec::amf0::{Amf0Decoder, Amf0Encoder};
use amf_codec::amf3::{Amf3Decoder, Amf3Encoder};
use amf_codec::types::{Element, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::rc::Rc;

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

/// A representative message-shaped value: a mapping holding scalars, a
/// shared string and a nested dense array
fn sample_value() -> Rc<Value> {
    let items = (0..100)
        .map(|i| {
            Rc::new(Value::Map(vec![
                Element::new("id", Value::Integer(i)),
                Element::new("label", Value::String(format!("item-{i}"))),
                Element::new("group", Value::String("shared-group".to_string())),
                Element::new("weight", Value::Number(i as f64 * 0.5)),
            ]))
        })
        .collect();

    Rc::new(Value::Map(vec![
        Element::new("items", Value::Array(items)),
        Element::new("count", Value::Integer(100)),
    ]))
}

fn criterion_benchmark(c: &mut Criterion) {
    let value = sample_value();

    let amf3_bytes = Amf3Encoder::default().encode(&value).unwrap();
    c.bench_function("amf3_decode", |b| {
        let mut decoder = Amf3Decoder::default();
        b.iter(|| {
            black_box(decoder.decode(&amf3_bytes).unwrap());
        })
    });

    c.bench_function("amf3_encode", |b| {
        let encoder = Amf3Encoder::default();
        b.iter(|| {
            black_box(encoder.encode(&value).unwrap());
        })
    });

    let amf0_bytes = Amf0Encoder::default().encode(&value).unwrap();
    c.bench_function("amf0_decode", |b| {
        let mut decoder = Amf0Decoder::default();
        b.iter(|| {
            black_box(decoder.decode(&amf0_bytes).unwrap());
        })
    });

    c.bench_function("amf0_encode", |b| {
        let encoder = Amf0Encoder::default();
        b.iter(|| {
            black_box(encoder.encode(&value).unwrap());
        })
    });
}

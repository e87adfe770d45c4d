//! Benchmarks for pooled encoding and snapshot publication.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hearth_core::{BufferPool, ByteSerializable, ByteWriter, CodecResult, SnapshotSlot};

struct Sample {
    tick: i64,
    values: [f32; 32],
}

impl ByteSerializable for Sample {
    fn size_of(&self) -> usize {
        8 + 4 * self.values.len()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_i64(self.tick)?;
        for v in &self.values {
            out.write_f32(*v)?;
        }
        Ok(())
    }
}

fn bench_pooled_encode(c: &mut Criterion) {
    let pool = BufferPool::new(8);
    let sample = Sample { tick: 42, values: [1.5; 32] };

    c.bench_function("pooled_encode_136b", |b| {
        b.iter(|| {
            let bytes = pool.encode(black_box(&sample)).unwrap();
            black_box(bytes.len())
        });
    });
}

fn bench_slot_publish_load(c: &mut Criterion) {
    let slot = SnapshotSlot::new();
    let mut n = 0u64;

    c.bench_function("slot_publish_then_load", |b| {
        b.iter(|| {
            n += 1;
            slot.publish(Arc::new(n));
            black_box(slot.load())
        });
    });
}

criterion_group!(benches, bench_pooled_encode, bench_slot_publish_load);
criterion_main!(benches);

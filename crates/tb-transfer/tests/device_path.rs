//! Device-path tests: staged copies through the d2h/h2d streams, the
//! seal-after-all-copies ordering on Put, and the compute-stream wait on
//! Get.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use tb_device::{
    DeviceBuffer, DeviceTensor, Event, PinnedRegistry, StagingStreams, TransferStream,
};
use tb_store::{InMemoryStore, StoreClient, StoreHandle};
use tb_transfer::{
    DeviceAllocator, DeviceContext, ExecContext, GetPipeline, HostAllocator, PutPipeline, Tensor,
    TensorData,
};
use tb_types::{DType, ObjectId};

struct Harness {
    raw: Arc<InMemoryStore>,
    staging: Arc<StagingStreams>,
    pinned: Arc<PinnedRegistry>,
    put: PutPipeline,
    get: GetPipeline,
}

fn harness() -> Harness {
    let raw = Arc::new(InMemoryStore::default());
    let handle = Arc::new(StoreHandle::new(Arc::clone(&raw) as Arc<dyn StoreClient>));
    handle.connect();
    let staging = Arc::new(StagingStreams::new());
    let pinned = Arc::new(PinnedRegistry::new());

    Harness {
        raw,
        staging: Arc::clone(&staging),
        pinned: Arc::clone(&pinned),
        put: PutPipeline::new(Arc::clone(&handle), Arc::clone(&staging), Arc::clone(&pinned)),
        get: GetPipeline::new(handle, staging, pinned)
            .with_fetch_timeout(Duration::from_secs(5)),
    }
}

fn oid(byte: u8) -> ObjectId {
    ObjectId::from([byte; 20])
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Device tensor whose bytes are already resident (producer has no pending
/// work on it).
fn device_tensor(values: &[f32], producer: &Arc<TransferStream>) -> Tensor {
    Tensor::device(
        DType::F32,
        vec![values.len() as u64],
        DeviceTensor::new(DeviceBuffer::from_host(&f32_bytes(values)), Arc::clone(producer)),
    )
}

// ---------------------------------------------------------------------------
// Put: seal strictly after all staged copies
// ---------------------------------------------------------------------------

#[test]
fn device_put_roundtrips_through_staging() {
    let h = harness();
    let producer = Arc::new(TransferStream::new("producer"));
    let a = device_tensor(&[1.0, 2.0], &producer);
    let b = device_tensor(&[3.0, 4.0, 5.0], &producer);
    let ctx = ExecContext::Device(DeviceContext::new(Arc::clone(&producer)));

    h.put.put(&[a, b], oid(1), &ctx).wait().unwrap();
    assert!(h.raw.is_sealed(&oid(1)));
    assert!(h.staging.d2h_initialized());
    // The payload region was pinned for the staged copies.
    assert_eq!(h.pinned.len(), 1);

    let out = h
        .get
        .get(oid(1), DType::F32, &ExecContext::Host, &HostAllocator)
        .wait()
        .unwrap();
    assert_eq!(out.to_f32_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn device_put_seals_only_after_producer_finishes() {
    let h = harness();
    let producer = Arc::new(TransferStream::new("gated-producer"));
    let gate = Event::new();

    // The producer's write of the tensor bytes is held behind the gate, so
    // the staged copy (and therefore the seal) cannot have run yet.
    let buffer = DeviceBuffer::zeroed(8);
    producer.wait_event(&gate).unwrap();
    {
        let buffer = buffer.clone();
        producer
            .enqueue(move || {
                buffer.with_mut(|b| b.copy_from_slice(&f32_bytes(&[6.0, 7.0])));
            })
            .unwrap();
    }

    let tensor = Tensor::device(
        DType::F32,
        vec![2],
        DeviceTensor::new(buffer, Arc::clone(&producer)),
    );
    let ctx = ExecContext::Device(DeviceContext::new(Arc::clone(&producer)));
    let waiter = h.put.put(&[tensor], oid(2), &ctx);

    thread::sleep(Duration::from_millis(50));
    assert!(!h.raw.is_sealed(&oid(2)), "sealed before the copy landed");
    assert!(!waiter.is_resolved(), "resolved before the copy landed");

    gate.signal();
    waiter.wait().unwrap();
    assert!(h.raw.is_sealed(&oid(2)));

    let out = h
        .get
        .get(oid(2), DType::F32, &ExecContext::Host, &HostAllocator)
        .wait()
        .unwrap();
    assert_eq!(out.to_f32_vec(), vec![6.0, 7.0]);
}

#[test]
fn device_put_accepts_mixed_host_and_device_inputs() {
    let h = harness();
    let producer = Arc::new(TransferStream::new("mixed-producer"));
    let a = Tensor::from_f32(&[10.0]);
    let b = device_tensor(&[20.0, 30.0], &producer);
    let ctx = ExecContext::Device(DeviceContext::new(producer));

    h.put.put(&[a, b], oid(3), &ctx).wait().unwrap();

    let out = h
        .get
        .get(oid(3), DType::F32, &ExecContext::Host, &HostAllocator)
        .wait()
        .unwrap();
    assert_eq!(out.to_f32_vec(), vec![10.0, 20.0, 30.0]);
}

#[test]
fn randomized_producer_delays_never_corrupt_the_sealed_object() {
    let h = harness();
    let mut rng = rand::thread_rng();

    for trial in 0..12u8 {
        let producer = Arc::new(TransferStream::new(format!("trial-{trial}")));
        let tensor_count = rng.gen_range(1..=3);
        let mut tensors = Vec::new();
        let mut expected = Vec::new();

        for _ in 0..tensor_count {
            let mut bytes = vec![0u8; 4 * rng.gen_range(1..=8)];
            rng.fill(&mut bytes[..]);
            expected.extend_from_slice(&bytes);

            // The producer fills the buffer after a random delay; a seal
            // that jumped ahead of the copies would publish zeroes.
            let buffer = DeviceBuffer::zeroed(bytes.len());
            let delay = Duration::from_millis(rng.gen_range(0..10));
            {
                let buffer = buffer.clone();
                producer
                    .enqueue(move || {
                        thread::sleep(delay);
                        buffer.with_mut(|b| b.copy_from_slice(&bytes));
                    })
                    .unwrap();
            }
            tensors.push(Tensor::device(
                DType::F32,
                vec![(buffer.len() / 4) as u64],
                DeviceTensor::new(buffer, Arc::clone(&producer)),
            ));
        }

        let id = oid(100 + trial);
        let ctx = ExecContext::Device(DeviceContext::new(Arc::clone(&producer)));
        h.put.put(&tensors, id, &ctx).wait().unwrap();

        let objects = h.raw.get(&[id], Some(Duration::from_secs(1))).unwrap();
        let payload_len = expected.len();
        assert_eq!(
            &objects[0][objects[0].len() - payload_len..],
            &expected[..],
            "trial {trial}: sealed payload does not match producer output"
        );
    }
}

// ---------------------------------------------------------------------------
// Get: compute stream waits on the staged copy
// ---------------------------------------------------------------------------

#[test]
fn device_get_roundtrips_through_staging() {
    let h = harness();
    let t = Tensor::from_f32(&[1.5, 2.5, 3.5]);
    h.put.put(&[t], oid(4), &ExecContext::Host).wait().unwrap();

    let compute = Arc::new(TransferStream::new("compute"));
    let allocator = DeviceAllocator::new(h.staging.h2d());
    let ctx = ExecContext::Device(DeviceContext::new(Arc::clone(&compute)));

    let out = h.get.get(oid(4), DType::F32, &ctx, &allocator).wait().unwrap();
    assert!(matches!(out.data, TensorData::Device(_)));
    assert_eq!(out.to_f32_vec(), vec![1.5, 2.5, 3.5]);
    assert!(h.staging.h2d_initialized());
}

#[test]
fn device_get_blocks_compute_stream_until_copy_lands() {
    let h = harness();
    let t = Tensor::from_f32(&[9.0, 8.0]);
    h.put.put(&[t], oid(5), &ExecContext::Host).wait().unwrap();

    // Hold the h2d stream behind a gate so the staged copy cannot run.
    let gate = Event::new();
    let h2d = h.staging.h2d();
    h2d.wait_event(&gate).unwrap();

    let compute = Arc::new(TransferStream::new("gated-compute"));
    let allocator = DeviceAllocator::new(Arc::clone(&h2d));
    let ctx = ExecContext::Device(DeviceContext::new(Arc::clone(&compute)));
    let waiter = h.get.get(oid(5), DType::F32, &ctx, &allocator);

    // Work submitted to the compute stream after the Get must not run
    // until the copy has landed.
    let fence = compute.record_event().unwrap();
    assert!(!fence.wait_timeout(Duration::from_millis(50)));
    assert!(!waiter.is_resolved());

    gate.signal();
    let out = waiter.wait().unwrap();
    assert!(fence.wait_timeout(Duration::from_secs(5)));
    assert_eq!(out.to_f32_vec(), vec![9.0, 8.0]);
}

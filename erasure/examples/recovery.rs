// Walkthrough of the three ways to drive the engine: incremental encoding,
// batch encoding, and recovery timing on a large random data set.

use std::time::Instant;

use erasure::Engine;
use rand::Rng;

fn main() {
    tracing_subscriber::fmt::init();

    println!("Shard by shard encoding:");
    shard_by_shard();
    println!("\nAt once encoding:");
    at_once();
    println!("\nLarge data recovery:");
    large_data();
}

fn shard_by_shard() {
    let engine = Engine::new(3, 2).unwrap();

    let data = [vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9, 10, 11]];

    // Parity accumulators start zeroed; each data shard is folded in as it
    // "arrives", no full batch resident at any point
    let mut parity = vec![vec![0; 4]; 2];
    for (index, shard) in data.iter().enumerate() {
        engine.encode_idx(shard, index, &mut parity).unwrap();
    }

    let mut shards: Vec<Option<Vec<u8>>> = data
        .iter()
        .cloned()
        .chain(parity.iter().cloned())
        .map(Some)
        .collect();
    shards[0] = None;
    shards[4] = None;

    let start = Instant::now();
    engine.reconstruct(&mut shards).unwrap();
    println!("Reconstruction time: {:?}", start.elapsed());

    let restored: Vec<Vec<u8>> = shards.into_iter().flatten().collect();
    assert_eq!(restored[0], vec![0, 1, 2, 3]);
    assert!(engine.verify(&restored).unwrap());
    println!("Verification successful!");
}

fn at_once() {
    let engine = Engine::new(3, 2).unwrap();

    let mut shards = vec![
        vec![0, 1, 2, 3],
        vec![4, 5, 6, 7],
        vec![8, 9, 10, 11],
        Vec::new(),
        Vec::new(),
    ];
    engine.encode(&mut shards).unwrap();

    let mut holed: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
    holed[0] = None;
    holed[4] = None;

    let start = Instant::now();
    engine.reconstruct(&mut holed).unwrap();
    println!("Reconstruction time: {:?}", start.elapsed());

    let restored: Vec<Vec<u8>> = holed.into_iter().flatten().collect();
    assert_eq!(restored, shards);
    assert!(engine.verify(&restored).unwrap());
    println!("Verification successful!");
}

fn large_data() {
    const TOTAL_SIZE: usize = 64 * 1024 * 1024;
    const SHARD_SIZE: usize = TOTAL_SIZE / 4;

    let engine = Engine::new(4, 2).unwrap();

    let mut rng = rand::thread_rng();
    let mut shards: Vec<Vec<u8>> = (0..4)
        .map(|_| (0..SHARD_SIZE).map(|_| rng.gen()).collect())
        .collect();
    shards.resize(engine.total_shard_count(), Vec::new());

    println!("Encoding {} MB of data with 4+2 coding...", TOTAL_SIZE / 1024 / 1024);
    let start = Instant::now();
    engine.encode(&mut shards).unwrap();
    println!("Encoding time: {:?}", start.elapsed());

    let mut holed: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
    holed[0] = None;
    holed[4] = None;

    println!("Reconstructing 2 missing shards...");
    let start = Instant::now();
    engine.reconstruct(&mut holed).unwrap();
    println!("Reconstruction time: {:?}", start.elapsed());

    let restored: Vec<Vec<u8>> = holed.into_iter().flatten().collect();
    assert_eq!(restored, shards);
    assert!(engine.verify(&restored).unwrap());
    println!("Verification successful!");
}

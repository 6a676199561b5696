use std::time::Duration;

use points::{
    codec::decode_line,
    glue::{spawn_glue, GlueConfig},
    throttle::throttle_points,
    Point,
};
use tokio::{sync::mpsc, time::Instant};

#[tokio::test(start_paused = true)]
async fn throttled_points_are_batched_by_timeout() {
    let (tx, input) = mpsc::channel(64);
    let (paced, throttle) = throttle_points(input, 10, 64);
    let (chunk_tx, mut chunks) = mpsc::unbounded_channel();
    let config = GlueConfig::new(1 << 20, Duration::from_millis(500)).unwrap();
    let glue = spawn_glue(paced, config, move |chunk: Vec<u8>| {
        let _ = chunk_tx.send((Instant::now(), chunk));
    });

    let start = Instant::now();
    for i in 0..20 {
        tx.send(Point::one("paced", i as f64, i)).await.unwrap();
    }
    drop(tx);
    throttle.join().await;
    glue.join().await;

    let mut lines = vec![];
    let mut flushes = 0;
    while let Some((at, chunk)) = chunks.recv().await {
        assert!(at.duration_since(start) <= Duration::from_secs(2));
        flushes += 1;
        let text = String::from_utf8(chunk).unwrap();
        lines.extend(text.lines().map(|line| decode_line(line).unwrap()));
    }
    // Twenty points at ten per second span about two seconds of 500ms windows.
    assert!((4..=5).contains(&flushes), "{flushes}");
    let expected: Vec<_> = (0..20).map(|i| Point::one("paced", i as f64, i)).collect();
    assert_eq!(lines, expected);
}

// packages/listener/benches/interception_bench.rs
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http_request_listener::interception::RequestPipeline;
use http_request_listener::{RequestModel, RequestPatch, ResponseModel};

fn bench_before_send_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("before_send_fold");

    for subscribers in [0usize, 1, 8, 32].iter() {
        let pipeline = RequestPipeline::default();
        pipeline.state().start();

        let subs: Vec<_> = (0..*subscribers)
            .map(|i| {
                pipeline.subscribe_before_send(move |_| {
                    if i % 2 == 0 {
                        Ok(Some(RequestPatch::new().method("post")))
                    } else {
                        Ok(None)
                    }
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            subscribers,
            |b, _| {
                b.iter(|| {
                    let request = RequestModel::new("get", "http://localhost:3000/posts")
                        .with_header("Authorization", "any-auth");
                    black_box(pipeline.before_send(black_box(request)))
                });
            },
        );

        drop(subs);
    }

    group.finish();
}

fn bench_after_arrival_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("after_arrival_fanout");
    let body = Bytes::from_static(br#"[{"id":1,"title":"json-server","author":"typicode"}]"#);

    for subscribers in [1usize, 8, 32].iter() {
        let pipeline = RequestPipeline::default();
        pipeline.state().start();

        let subs: Vec<_> = (0..*subscribers)
            .map(|_| {
                pipeline.subscribe_after_arrival(|pair| {
                    black_box(pair.response.status_code);
                    Ok(())
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            subscribers,
            |b, _| {
                b.iter(|| {
                    let request = RequestModel::new("get", "http://localhost:3000/posts");
                    let response = ResponseModel::from_parts(200, "OK", body.clone());
                    pipeline.after_arrival(request, response);
                });
            },
        );

        drop(subs);
    }

    group.finish();
}

fn bench_stopped_pass_through(c: &mut Criterion) {
    let pipeline = RequestPipeline::default();
    let _sub = pipeline.subscribe_before_send(|_| Ok(None));

    c.bench_function("before_send_stopped", |b| {
        b.iter(|| {
            let request = RequestModel::new("get", "http://localhost:3000/posts");
            black_box(pipeline.before_send(black_box(request)))
        });
    });
}

criterion_group!(
    benches,
    bench_before_send_fold,
    bench_after_arrival_fanout,
    bench_stopped_pass_through
);
criterion_main!(benches);

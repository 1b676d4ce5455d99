use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use trellis::handler::sync;
use trellis::prelude::*;
use trellis::{PathPattern, RouteDescriptor, RouteStore};

fn bench_path_pattern(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_pattern");

    group.bench_function("parse", |b| {
        b.iter(|| PathPattern::parse(black_box("/users/:user/posts/:post?")))
    });

    let pattern = PathPattern::parse("/users/:user/posts/:post?").unwrap();
    group.bench_function("match_hit", |b| {
        b.iter(|| pattern.matches(black_box("/users/42/posts/7")))
    });
    group.bench_function("match_miss", |b| {
        b.iter(|| pattern.matches(black_box("/accounts/42")))
    });

    group.finish();
}

fn bench_route_lookup(c: &mut Criterion) {
    let store = RouteStore::new();
    for i in 0..100 {
        store.push(
            RouteDescriptor::new(
                &format!("/resource{}/:id", i),
                vec![HttpMethod::GET],
                Action::new(sync(|_params, _req| Ok::<_, Error>(()))),
                RouteOptions::default(),
            )
            .unwrap(),
        );
    }

    c.bench_function("route_lookup_last_of_100", |b| {
        b.iter(|| store.find(HttpMethod::GET, black_box("/resource99/abc")))
    });
}

fn bench_respond(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let injector = Arc::new(Injector::new());
    let router = Router::new(injector).unwrap();
    router
        .get("/users/:id", sync(|params, _req| {
            Ok::<_, Error>(format!("user {}", params.get("id").unwrap_or_default()))
        }))
        .unwrap();

    let mut group = c.benchmark_group("respond");

    group.bench_function("matched_route", |b| {
        b.to_async(&rt)
            .iter(|| async { router.respond(HttpRequest::new("GET", "/users/42")).await })
    });

    group.bench_function("not_found", |b| {
        b.to_async(&rt)
            .iter(|| async { router.respond(HttpRequest::new("GET", "/missing")).await })
    });

    group.finish();
}

criterion_group!(benches, bench_path_pattern, bench_route_lookup, bench_respond);
criterion_main!(benches);

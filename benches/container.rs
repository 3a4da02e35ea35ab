use criterion::{criterion_group, criterion_main, Criterion};
use plugboard::{component, Component, Container, Slot};

#[derive(Default)]
struct Leaf;
impl Component for Leaf {}

#[derive(Default)]
struct Mid {
    leaf: Slot<Leaf>,
}
impl Component for Mid {}

#[derive(Default)]
struct SharedMid {
    leaf: Slot<Leaf>,
}
impl Component for SharedMid {}

#[derive(Default)]
struct Root {
    mid: Slot<Mid>,
    shared_mid: Slot<SharedMid>,
}
impl Component for Root {}

component! { Leaf { name: "bench::Leaf" } }
component! { Mid { name: "bench::Mid", slots: [leaf: Leaf] } }
component! { SharedMid { name: "bench::SharedMid", shared, slots: [leaf: Leaf] } }
component! { Root { name: "bench::Root", slots: [mid: Mid, shared_mid: SharedMid] } }

fn container_new(c: &mut Criterion) {
    c.bench_function("container_new", |b| b.iter(Container::new));
}

fn resolve_chain(c: &mut Criterion) {
    let container = Container::new();
    c.bench_function("resolve_chain", |b| {
        b.iter(|| container.get::<Root>().unwrap());
    });
}

fn resolve_shared_hit(c: &mut Criterion) {
    let container = Container::new();
    let _ = container.get::<SharedMid>().unwrap();
    c.bench_function("resolve_shared_hit", |b| {
        b.iter(|| container.get::<SharedMid>().unwrap());
    });
}

criterion_group!(benches, container_new, resolve_chain, resolve_shared_hit);
criterion_main!(benches);

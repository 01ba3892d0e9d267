#![cfg(all(
    feature = "criterion-bench",
    feature = "memory-store",
    feature = "memory-cache"
))]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use futures::executor::block_on;
use nested_rbac::{
    Cache, GroupKind, MemoryCache, MemoryStore, NewGroup, NewPermission, NewRole, Rbac,
    RbacBuilder, Status, TargetId, TenantId,
};
use std::time::Duration;

fn seed_tenant<C: Cache>(
    rbac: &Rbac<MemoryStore, C>,
    roles: usize,
    permissions_per_role: usize,
) -> (TenantId, TargetId, String) {
    let ctx = TenantId::try_from("tenant_bench").unwrap();
    let target = TargetId::try_from("target_bench").unwrap();

    let group = block_on(rbac.create_group(
        &ctx,
        NewGroup {
            kind: GroupKind::Permission,
            name: "bench".to_string(),
            alias_name: String::new(),
            status: Status::Enabled,
        },
    ))
    .unwrap();

    let mut last_name = String::new();
    for r in 0..roles {
        let role = block_on(rbac.add_role(
            &ctx,
            NewRole {
                parent: None,
                group: None,
                name: format!("role_{r}"),
                alias_name: String::new(),
                description: String::new(),
                status: Status::Enabled,
            },
        ))
        .unwrap();

        let mut ids = Vec::with_capacity(permissions_per_role);
        for p in 0..permissions_per_role {
            last_name = format!("perm_{r}_{p}");
            let permission = block_on(rbac.create_permission(
                &ctx,
                NewPermission {
                    group: group.id,
                    name: last_name.clone(),
                    alias_name: String::new(),
                    identifier: None,
                    description: String::new(),
                    status: Status::Enabled,
                },
            ))
            .unwrap();
            ids.push(permission.id);
        }
        block_on(rbac.grant_permission(&ctx, role.id, &ids)).unwrap();
        block_on(rbac.grant_role(&ctx, &target, &[role.id])).unwrap();
    }

    (ctx, target, last_name)
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("check");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    let rbac = RbacBuilder::new(MemoryStore::new()).build();
    let (ctx, target, name) = seed_tenant(&rbac, 8, 8);
    group.bench_function("no_cache", |b| {
        b.iter(|| {
            let allowed = block_on(rbac.check(&ctx, &target, &name)).unwrap();
            black_box(allowed);
        });
    });

    let rbac = RbacBuilder::new(MemoryStore::new())
        .cache(MemoryCache::new(8_192).with_ttl(Duration::from_secs(60)))
        .build();
    let (ctx, target, name) = seed_tenant(&rbac, 8, 8);
    assert!(block_on(rbac.check(&ctx, &target, &name)).unwrap());
    group.bench_function("hot_cache", |b| {
        b.iter(|| {
            let allowed = block_on(rbac.check(&ctx, &target, &name)).unwrap();
            black_box(allowed);
        });
    });

    group.finish();
}

fn bench_role_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_role_fanout");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    for role_count in [1usize, 8, 32] {
        let rbac = RbacBuilder::new(MemoryStore::new()).build();
        let (ctx, target, name) = seed_tenant(&rbac, role_count, 4);

        let id = BenchmarkId::from_parameter(role_count);
        group.bench_with_input(id, &role_count, |b, _| {
            b.iter(|| {
                let allowed = block_on(rbac.check(&ctx, &target, &name)).unwrap();
                black_box(allowed);
            });
        });
    }

    group.finish();
}

fn bench_add_role(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_role");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    group.bench_function("deep_chain_insert", |b| {
        b.iter_batched(
            || {
                let rbac = RbacBuilder::new(MemoryStore::new()).build();
                let ctx = TenantId::try_from("tenant_bench").unwrap();
                let mut parent = None;
                for i in 0..16 {
                    let role = block_on(rbac.add_role(
                        &ctx,
                        NewRole {
                            parent,
                            group: None,
                            name: format!("chain_{i}"),
                            alias_name: String::new(),
                            description: String::new(),
                            status: Status::Enabled,
                        },
                    ))
                    .unwrap();
                    parent = Some(role.id);
                }
                (rbac, ctx, parent)
            },
            |(rbac, ctx, parent)| {
                let role = block_on(rbac.add_role(
                    &ctx,
                    NewRole {
                        parent,
                        group: None,
                        name: "leaf".to_string(),
                        alias_name: String::new(),
                        description: String::new(),
                        status: Status::Enabled,
                    },
                ))
                .unwrap();
                black_box(role);
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_check, bench_role_fanout, bench_add_role);
criterion_main!(benches);

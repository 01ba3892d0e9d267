#![cfg(all(feature = "memory-store", feature = "memory-cache"))]

use futures::executor::block_on;
use nested_rbac::{
    GroupKind, MemoryCache, MemoryStore, NewGroup, NewPermission, NewRole, NoCache, Rbac,
    RbacBuilder, Status, TargetId, TenantId,
};
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

const REPEATS: usize = 5;

fn benchmark_sync<F>(name: &str, iterations: usize, mut op: F)
where
    F: FnMut(),
{
    let mut samples = Vec::with_capacity(REPEATS);

    for _ in 0..REPEATS {
        let start = Instant::now();
        for _ in 0..iterations {
            op();
        }
        samples.push(start.elapsed());
    }

    samples.sort_unstable();
    let median = samples[REPEATS / 2];
    let total_ms = median.as_secs_f64() * 1_000.0;
    let ns_per_op = median.as_secs_f64() * 1_000_000_000.0 / iterations as f64;
    let ops_per_sec = iterations as f64 / median.as_secs_f64();

    println!(
        "{name}: median={total_ms:.3} ms, ns/op={ns_per_op:.1}, ops/s={ops_per_sec:.0} (iters={iterations}, repeats={REPEATS})"
    );
}

fn benchmark_parallel<F>(name: &str, threads: usize, iterations_per_thread: usize, op_factory: F)
where
    F: Fn() -> Box<dyn FnMut() + Send> + Send + Sync + 'static,
{
    let op_factory = Arc::new(op_factory);
    let mut samples = Vec::with_capacity(REPEATS);

    for _ in 0..REPEATS {
        let start = Instant::now();
        let mut joins = Vec::with_capacity(threads);
        for _ in 0..threads {
            let factory = Arc::clone(&op_factory);
            joins.push(std::thread::spawn(move || {
                let mut op = factory();
                for _ in 0..iterations_per_thread {
                    op();
                }
            }));
        }
        for join in joins {
            join.join().expect("thread panicked");
        }
        samples.push(start.elapsed());
    }

    samples.sort_unstable();
    let median = samples[REPEATS / 2];
    let total_ops = threads * iterations_per_thread;
    let total_ms = median.as_secs_f64() * 1_000.0;
    let ns_per_op = median.as_secs_f64() * 1_000_000_000.0 / total_ops as f64;
    let ops_per_sec = total_ops as f64 / median.as_secs_f64();

    println!(
        "{name}: median={total_ms:.3} ms, ns/op={ns_per_op:.1}, ops/s={ops_per_sec:.0} (threads={threads}, total_ops={total_ops}, repeats={REPEATS})"
    );
}

fn seed_tenant<C: nested_rbac::Cache>(
    rbac: &Rbac<MemoryStore, C>,
    roles: usize,
    permissions_per_role: usize,
) -> (TenantId, TargetId, String) {
    let ctx = TenantId::try_from("tenant_perf").unwrap();
    let target = TargetId::try_from("target_perf").unwrap();

    let group = block_on(rbac.create_group(
        &ctx,
        NewGroup {
            kind: GroupKind::Permission,
            name: "perf".to_string(),
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

#[test]
#[ignore = "manual performance test; run with --ignored --nocapture"]
fn perf_check_paths() {
    let iterations = 100_000;

    let rbac: Rbac<MemoryStore, NoCache> = RbacBuilder::new(MemoryStore::new()).build();
    let (ctx, target, name) = seed_tenant(&rbac, 8, 8);
    benchmark_sync("check_no_cache", iterations, || {
        let result = block_on(rbac.check(&ctx, &target, &name)).unwrap();
        black_box(result);
    });

    let rbac = RbacBuilder::new(MemoryStore::new())
        .cache(MemoryCache::new(8_192).with_ttl(Duration::from_secs(60)))
        .build();
    let (ctx, target, name) = seed_tenant(&rbac, 8, 8);
    let warm = block_on(rbac.check(&ctx, &target, &name)).unwrap();
    assert!(warm);
    benchmark_sync("check_hot_cache", iterations, || {
        let result = block_on(rbac.check(&ctx, &target, &name)).unwrap();
        black_box(result);
    });

    let threads = std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4);
    let iterations_per_thread = 25_000;

    let rbac = Arc::new(
        RbacBuilder::new(MemoryStore::new())
            .cache(MemoryCache::new(8_192).with_ttl(Duration::from_secs(60)))
            .build(),
    );
    let (ctx, target, name) = seed_tenant(rbac.as_ref(), 8, 8);
    let warm = block_on(rbac.check(&ctx, &target, &name)).unwrap();
    assert!(warm);

    benchmark_parallel(
        "check_hot_cache_parallel",
        threads,
        iterations_per_thread,
        move || {
            let rbac = Arc::clone(&rbac);
            let ctx = ctx.clone();
            let target = target.clone();
            let name = name.clone();
            Box::new(move || {
                let result = block_on(rbac.check(&ctx, &target, &name)).unwrap();
                black_box(result);
            })
        },
    );
}

//! Grant resolution and selection benchmarks
//!
//! Measures resolve + select_best for one subject as the number of
//! bindings grows, and a full single-claim evaluation with a cached program.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;
use warden_authz::{
    select_best, AuthzEngine, EngineConfig, GrantResolver, InMemoryPolicyRegistry, PolicyProgram, ProgramSource,
};
use warden_core::{
    BoundRole, GrantData, GrantStore, Group, InMemoryGrantStore, Project, Role, RoleBinding, RoleClaim, RoleScope,
    Subject, Tenant,
};

fn grant_data(bindings: usize) -> GrantData {
    let projects = (0..20)
        .map(|i| Project {
            uuid: format!("p{}", i),
            tenant_uuid: "t1".into(),
            identifier: format!("project-{}", i),
        })
        .collect();

    let role_bindings = (0..bindings)
        .map(|i| {
            let binding = RoleBinding::new(format!("rb{}", i), "t1")
                .with_project(format!("p{}", i % 20))
                .with_role(BoundRole::new("ssh").with_option("ttl", "1h"));
            let binding = if i % 2 == 0 { binding.with_user("u1") } else { binding.with_group("ops") };
            match i % 3 {
                0 => binding.with_mfa(),
                1 => binding.with_approvals(1),
                _ => binding,
            }
        })
        .collect();

    GrantData {
        tenants: vec![Tenant { uuid: "t1".into(), identifier: "acme".into() }],
        projects,
        roles: vec![Role::new("ssh", RoleScope::Project)],
        groups: vec![Group {
            uuid: "ops".into(),
            tenant_uuid: "t1".into(),
            users: vec!["u1".into()],
            service_accounts: vec![],
            groups: vec![],
        }],
        role_bindings,
        identity_sharings: vec![],
    }
}

fn bench_resolve_and_select(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let subject = Subject::user("u1", "t1");
    let roles = vec!["ssh".to_string()];

    let mut group = c.benchmark_group("resolve_and_select");
    for bindings in [10, 100, 1000].iter() {
        let store: Arc<dyn GrantStore> = Arc::new(InMemoryGrantStore::new(grant_data(*bindings)).current());
        group.bench_with_input(BenchmarkId::new("bindings", bindings), bindings, |b, _| {
            b.to_async(&rt).iter(|| async {
                let grants = GrantResolver::new(store.clone())
                    .resolve(black_box(&subject), &roles)
                    .await
                    .unwrap();
                black_box(select_best(&grants["ssh"]).cloned());
            });
        });
    }
    group.finish();
}

fn bench_single_claim(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = rt.block_on(async {
        let registry = InMemoryPolicyRegistry::new();
        let source = ProgramSource::new("size(data.effective_roles) > 0")
            .with_rules("[{'path': 'ssh/sign/' + input.project_uuid, 'capabilities': ['update']}]")
            .with_ttl("'1h'", "'2h'");
        registry
            .put(PolicyProgram::new("ssh", source).with_bound_role("ssh"))
            .await;
        AuthzEngine::new(
            EngineConfig::default(),
            Arc::new(InMemoryGrantStore::new(grant_data(100))),
            Arc::new(registry),
        )
        .unwrap()
    });
    let subject = Subject::user("u1", "t1");
    let claim = RoleClaim::new("ssh").at_project("t1", "p3");

    c.bench_function("evaluate_claim", |b| {
        b.to_async(&rt).iter(|| async {
            let decision = engine.evaluate_claim("okta", black_box(&subject), &claim).await.unwrap();
            black_box(decision);
        });
    });
}

criterion_group!(benches, bench_resolve_and_select, bench_single_claim);
criterion_main!(benches);

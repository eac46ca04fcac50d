//! Effective grant resolution against a full grant store

mod common;

use common::{alice, base_data, ssh_scenario, CountingStore};
use std::sync::Arc;
use warden_authz::{select_best, GrantResolver};
use warden_core::{BoundRole, GrantStore, InMemoryGrantStore, RoleBinding, Subject};

fn resolver(store: Arc<dyn GrantStore>) -> GrantResolver {
    GrantResolver::new(store)
}

#[test]
fn test_no_bindings_yield_an_empty_map() {
    let store = Arc::new(InMemoryGrantStore::new(base_data()).current());
    let grants = tokio_test::block_on(async {
        resolver(store)
            .resolve(&alice(), &["ssh".to_string(), "iam.read".to_string()])
            .await
            .unwrap()
    });
    assert!(grants.is_empty());
}

#[tokio::test]
async fn test_direct_and_group_bindings_merge() {
    let store = Arc::new(InMemoryGrantStore::new(ssh_scenario()).current());
    let grants = resolver(store).resolve(&alice(), &["ssh".to_string()]).await.unwrap();

    let ssh = &grants["ssh"];
    assert_eq!(ssh.len(), 1);
    let grant = &ssh[0];
    assert_eq!(grant.grant_id, "rb-direct");
    assert_eq!(grant.binding_ids, vec!["rb-direct".to_string(), "rb-group".to_string()]);
    assert_eq!(grant.project_uuid.as_deref(), Some("p1"));
    assert!(!grant.require_mfa);
    assert_eq!(grant.need_approvals, 0);
    assert_eq!(grant.options["ttl"], vec![serde_json::json!("100s")]);

    let best = select_best(ssh).unwrap();
    assert!(best.is_unconditional());
    assert_eq!(best.grant_id, "rb-direct");
}

#[tokio::test]
async fn test_project_listing_is_memoized_per_tenant() {
    let mut data = base_data();
    data.role_bindings = vec![
        RoleBinding::new("rb1", "t1")
            .with_user("u1")
            .with_any_project()
            .with_role(BoundRole::new("ssh")),
        RoleBinding::new("rb2", "t1")
            .with_group("ops")
            .with_any_project()
            .with_mfa()
            .with_role(BoundRole::new("ssh")),
    ];
    let store = Arc::new(CountingStore::new(data));

    let grants = resolver(store.clone()).resolve(&alice(), &["ssh".to_string()]).await.unwrap();

    assert_eq!(store.listings(), 1);
    let projects: Vec<_> = grants["ssh"].iter().filter_map(|g| g.project_uuid.clone()).collect();
    assert_eq!(projects.len(), 2);
    assert!(projects.contains(&"p1".to_string()) && projects.contains(&"p2".to_string()));
    assert!(grants["ssh"].iter().all(|g| g.any_project && !g.require_mfa));
}

#[tokio::test]
async fn test_expired_bindings_are_ignored() {
    let mut data = base_data();
    data.role_bindings = vec![RoleBinding::new("rb1", "t1")
        .with_user("u1")
        .with_valid_till(1_000)
        .with_role(BoundRole::new("iam.read"))];
    let store: Arc<dyn GrantStore> = Arc::new(InMemoryGrantStore::new(data).current());

    let before = resolver(store.clone()).at(999).resolve(&alice(), &["iam.read".to_string()]).await.unwrap();
    assert_eq!(before["iam.read"][0].valid_till, 1_000);

    let after = resolver(store).at(1_000).resolve(&alice(), &["iam.read".to_string()]).await.unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn test_snapshot_ignores_later_updates() {
    let store = InMemoryGrantStore::new(ssh_scenario());
    let snapshot: Arc<dyn GrantStore> = Arc::new(store.current());
    store.update(|data| data.role_bindings.clear());

    let grants = resolver(snapshot).resolve(&alice(), &["ssh".to_string()]).await.unwrap();
    assert_eq!(grants["ssh"].len(), 1);

    let fresh: Arc<dyn GrantStore> = Arc::new(store.current());
    assert!(resolver(fresh).resolve(&alice(), &["ssh".to_string()]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_available_tenants_and_projects() {
    let mut data = ssh_scenario();
    data.role_bindings.push(
        RoleBinding::new("rb-any", "t2")
            .with_user("u1")
            .with_any_project()
            .with_role(BoundRole::new("ssh")),
    );
    let store: Arc<dyn GrantStore> = Arc::new(InMemoryGrantStore::new(data).current());
    let resolver = resolver(store);

    let tenants = resolver.list_available_tenants(&alice()).await.unwrap();
    assert_eq!(tenants.into_iter().collect::<Vec<_>>(), vec!["t1".to_string(), "t2".to_string()]);

    let projects = resolver.list_available_projects(&alice()).await.unwrap();
    assert_eq!(projects.into_iter().collect::<Vec<_>>(), vec!["p1".to_string(), "p3".to_string()]);

    let stranger = Subject::user("u9", "t1");
    assert!(!resolver.is_tenant_reachable(&stranger, "t2").await.unwrap());
    assert!(resolver.is_tenant_reachable(&alice(), "t2").await.unwrap());
}

#[tokio::test]
async fn test_effective_role_report() {
    let mut data = ssh_scenario();
    data.role_bindings.push(
        RoleBinding::new("rb-tenant", "t1")
            .with_user("u1")
            .with_role(BoundRole::new("iam.read").with_option("scope", "all")),
    );
    let store: Arc<dyn GrantStore> = Arc::new(InMemoryGrantStore::new(data).current());

    let reports = resolver(store)
        .check_effective_roles(&alice(), &["ssh".to_string(), "iam.read".to_string()])
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);

    let ssh = reports.iter().find(|r| r.role == "ssh").unwrap();
    assert_eq!(ssh.tenants.len(), 1);
    let project = &ssh.tenants[0].projects[0];
    assert_eq!(project.identifier, "web");
    assert!(!project.require_mfa);
    assert!(!project.need_approvals);

    let iam = reports.iter().find(|r| r.role == "iam.read").unwrap();
    assert_eq!(iam.tenants[0].tenant_options["scope"], vec![serde_json::json!("all")]);
}

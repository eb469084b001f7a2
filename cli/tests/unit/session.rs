//! Full sessions through the public registry and verification API.

#![allow(clippy::expect_used)]

use eni_harness::application::{LifecycleRegistry, RegistryDefaults, RemoteProbe, verify_hotplug};
use eni_harness::domain::{HarnessError, LifecycleState, interface_description};

use crate::helpers::{GuestShell, InstantCloud, SilentReporter};

#[tokio::test(start_paused = true)]
async fn check_session_sets_up_verifies_and_sweeps() {
    let cloud = InstantCloud::default().with_instance("i-0abc");
    let shell = GuestShell::new(&cloud, "i-0abc", "eth1").configured_host();
    let registry = LifecycleRegistry::new(cloud.clone(), RegistryDefaults::default());

    let instance_id = RemoteProbe::new(shell.clone())
        .instance_id()
        .await
        .expect("instance id");
    registry
        .set_up(&instance_id, || shell.clone(), &SilentReporter)
        .await
        .expect("set up");
    assert_eq!(
        registry.state(&instance_id).await.expect("state"),
        Some(LifecycleState::Up)
    );

    let created = cloud.interfaces();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].description, interface_description("i-0abc"));
    assert_eq!(created[0].subnet_id, "subnet-a");
    assert_eq!(created[0].group_ids, vec!["sg-a".to_string(), "sg-b".to_string()]);

    let results = verify_hotplug(
        &RemoteProbe::new(shell.clone()),
        "eth1",
        1,
        "https://www.google.com",
        &SilentReporter,
    )
    .await
    .expect("verify");
    let failed: Vec<_> = results.iter().filter(|r| !r.passed).collect();
    assert!(failed.is_empty(), "{failed:?}");

    registry.shutdown(&SilentReporter).await.expect("sweep");
    assert!(cloud.interfaces().is_empty());
    assert_eq!(
        cloud.calls(),
        vec!["create", "tag", "attach", "detach", "delete"]
    );
}

#[tokio::test(start_paused = true)]
async fn unconfigured_host_fails_checks_without_erroring() {
    let cloud = InstantCloud::default().with_instance("i-0abc");
    let shell = GuestShell::new(&cloud, "i-0abc", "eth1");
    let registry = LifecycleRegistry::new(cloud.clone(), RegistryDefaults::default());
    registry
        .set_up("i-0abc", || shell.clone(), &SilentReporter)
        .await
        .expect("set up");

    let results = verify_hotplug(
        &RemoteProbe::new(shell.clone()),
        "eth1",
        1,
        "https://www.google.com",
        &SilentReporter,
    )
    .await
    .expect("verify");
    assert!(results.iter().all(|r| !r.passed));

    registry.shutdown(&SilentReporter).await.expect("sweep");
    assert!(cloud.interfaces().is_empty());
}

#[tokio::test]
async fn duplicate_markers_stop_the_session() {
    let marker = interface_description("i-0abc");
    let cloud = InstantCloud::default()
        .with_instance("i-0abc")
        .with_interface("eni-a", &marker)
        .with_interface("eni-b", &marker);
    let shell = GuestShell::new(&cloud, "i-0abc", "eth1");
    let registry = LifecycleRegistry::new(cloud.clone(), RegistryDefaults::default());

    let err = registry
        .set_up("i-0abc", || shell.clone(), &SilentReporter)
        .await
        .expect_err("ambiguous");
    assert!(matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::AmbiguousResource { count: 2, .. })
    ));
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn missing_instance_is_reported() {
    let cloud = InstantCloud::default();
    let shell = GuestShell::new(&cloud, "i-gone", "eth1");
    let registry = LifecycleRegistry::new(cloud.clone(), RegistryDefaults::default());
    let err = registry
        .set_up("i-gone", || shell.clone(), &SilentReporter)
        .await
        .expect_err("not found");
    assert!(matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::InstanceNotFound(id)) if id == "i-gone"
    ));
}

//! Rule containers and temporary container lifecycle.

mod common;

use std::time::Duration;

use ac_core::{ContainerColor, ContainerIcon, ContainerStyle};
use common::{router, FakePlatform};

const PAST_QUIET_PERIOD: Duration = Duration::from_secs(301);

#[tokio::test]
async fn test_resolver_creates_then_reuses_container() {
    let platform = FakePlatform::with_rules("youtube.com, YT\nexample.com, Work");
    let red_fruit = ContainerStyle::new(ContainerColor::Red, ContainerIcon::Fruit);
    platform.set_style("YT", red_fruit);
    let router = router(&platform);

    let id = router
        .resolver()
        .resolve("https://www.youtube.com/watch?v=1")
        .await
        .unwrap()
        .expect("rule matches");
    assert_eq!(platform.container_names(), vec!["YT"]);
    assert_eq!(platform.container_named("YT").unwrap().style, red_fruit);

    let again = router.resolver().resolve("https://youtube.com/").await.unwrap();
    assert_eq!(again, Some(id));
    assert_eq!(platform.container_names(), vec!["YT"]);

    let unmatched = router.resolver().resolve("https://example.org/").await.unwrap();
    assert_eq!(unmatched, None);
}

#[tokio::test]
async fn test_resolver_uses_first_matching_rule() {
    let platform = FakePlatform::with_rules("shop.example.com, Shop\n*.example.com, Example");
    let router = router(&platform);

    let rule = router
        .resolver()
        .target_rule("https://shop.example.com/cart")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rule.container, "Shop");

    let rule = router
        .resolver()
        .target_rule("https://mail.example.com/")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rule.container, "Example");

    assert!(router.resolver().target_rule("about:blank").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_resolves_create_one_container() {
    let platform = FakePlatform::with_rules("youtube.com, YT");
    platform.slow_lookups();
    let router = router(&platform);

    let (first, second) = tokio::join!(
        router.resolver().resolve("https://youtube.com/a"),
        router.resolver().resolve("https://www.youtube.com/b"),
    );
    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(platform.container_names(), vec!["YT"]);
}

#[tokio::test]
async fn test_resolver_without_rules() {
    let platform = FakePlatform::new();
    let router = router(&platform);
    assert_eq!(router.resolver().resolve("https://example.com/").await.unwrap(), None);
    assert!(platform.container_names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_fills_lowest_free_index() {
    let platform = FakePlatform::new();
    platform.add_container("tmp_1");
    platform.add_container("tmp_3");
    platform.add_container("Work");
    let router = router(&platform);

    let created = router.ephemeral().create().await.unwrap();
    assert_eq!(created.name, "tmp_2");
    assert_eq!(router.ephemeral().pending_timers(), vec![created.id.clone()]);

    let next = router.ephemeral().create().await.unwrap();
    assert_eq!(next.name, "tmp_4");
}

#[tokio::test(start_paused = true)]
async fn test_idle_container_deleted_after_quiet_period() {
    let platform = FakePlatform::new();
    let router = router(&platform);

    let created = router.ephemeral().create().await.unwrap();
    tokio::time::sleep(Duration::from_secs(200)).await;
    assert!(platform.container_named("tmp_1").is_some());

    tokio::time::sleep(Duration::from_secs(101)).await;
    tokio::task::yield_now().await;
    assert!(platform.container_named("tmp_1").is_none());
    assert!(!router.ephemeral().timers().is_armed(&created.id));
}

#[tokio::test(start_paused = true)]
async fn test_timer_keeps_container_with_tabs() {
    let platform = FakePlatform::new();
    let router = router(&platform);

    let created = router.ephemeral().create().await.unwrap();
    platform.open_tab("https://example.com/", &created.id, None);

    tokio::time::sleep(PAST_QUIET_PERIOD).await;
    tokio::task::yield_now().await;
    assert!(platform.container_named("tmp_1").is_some());
    assert!(router.ephemeral().pending_timers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_keeps_container() {
    let platform = FakePlatform::new();
    let router = router(&platform);

    let created = router.ephemeral().create().await.unwrap();
    assert!(router.ephemeral().cancel(&created.id));
    assert!(!router.ephemeral().cancel(&created.id));

    tokio::time::sleep(PAST_QUIET_PERIOD).await;
    tokio::task::yield_now().await;
    assert!(platform.container_named("tmp_1").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_rearm_restarts_quiet_period() {
    let platform = FakePlatform::new();
    let router = router(&platform);

    let created = router.ephemeral().create().await.unwrap();
    tokio::time::sleep(Duration::from_secs(200)).await;
    router.ephemeral().arm(&created.id);

    tokio::time::sleep(Duration::from_secs(200)).await;
    assert!(platform.container_named("tmp_1").is_some());

    tokio::time::sleep(Duration::from_secs(101)).await;
    tokio::task::yield_now().await;
    assert!(platform.container_named("tmp_1").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_startup_sweep() {
    let platform = FakePlatform::new();
    platform.add_container("tmp_1");
    let busy = platform.add_container("tmp_2");
    platform.add_container("Work");
    platform.open_tab("https://example.com/", &busy, None);
    let router = router(&platform);

    let stats = router.startup().await.unwrap();
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.armed, 1);
    assert_eq!(platform.container_names(), vec!["Work", "tmp_2"]);
    assert_eq!(router.ephemeral().pending_timers(), vec![busy]);
}

#[tokio::test(start_paused = true)]
async fn test_temp_container_style_setting() {
    let platform = FakePlatform::new();
    platform.put(
        ac_runtime::settings::TEMP_CONTAINER_STYLE_KEY,
        serde_json::json!({"color": "orange", "icon": "pet"}),
    );
    let router = router(&platform);

    let created = router.ephemeral().create().await.unwrap();
    assert_eq!(
        created.style,
        ContainerStyle::new(ContainerColor::Orange, ContainerIcon::Pet)
    );
}

/// Catalog discovery and reward sampling against scripted pages
mod common;

use common::{test_log, MockOpener, MockPage, PageScript, RecordingPause};
use manga_card_reader::discovery::{DiscoveryConfig, LinkDiscovery};
use manga_card_reader::pacing::Jitter;
use manga_card_reader::rewards::{RewardMonitor, DEFAULT_REWARD_MARKER};
use std::sync::Arc;

fn links(paths: &[&str]) -> Vec<String> {
    paths
        .iter()
        .map(|p| format!("https://mangabuff.ru{}", p))
        .collect()
}

#[tokio::test]
async fn test_discovery_walks_every_listing_page() {
    let listing = MockPage::new(PageScript {
        anchors: vec![
            links(&["/manga/one", "/manga/top", "/news/5", "/manga/two"]),
            links(&["/manga/two", "/manga/three"]),
            links(&["/", "/manga/one"]),
        ],
        ..PageScript::default()
    });
    let opener = Arc::new(MockOpener::with_pages(vec![listing.clone()]));
    let config = DiscoveryConfig {
        enabled: true,
        pages: 3,
        ..DiscoveryConfig::default()
    };

    let discovery = LinkDiscovery::new(
        opener.clone(),
        config,
        Jitter::none(),
        Arc::new(RecordingPause::default()),
        test_log("discovery"),
    );
    let titles = discovery.discover().await.unwrap();

    assert_eq!(
        titles,
        links(&["/manga/one", "/manga/two", "/manga/three"])
    );
    assert_eq!(
        opener.opened(),
        vec![("https://mangabuff.ru/manga?page=1".to_string(), false)]
    );
    assert_eq!(
        listing.navigations(),
        vec![
            "https://mangabuff.ru/manga?page=1",
            "https://mangabuff.ru/manga?page=2",
            "https://mangabuff.ru/manga?page=3",
        ]
    );
}

#[tokio::test]
async fn test_discovery_with_no_pages_opens_nothing() {
    let opener = Arc::new(MockOpener::default());
    let config = DiscoveryConfig {
        pages: 0,
        ..DiscoveryConfig::default()
    };

    let discovery = LinkDiscovery::new(
        opener.clone(),
        config,
        Jitter::none(),
        Arc::new(RecordingPause::default()),
        test_log("discovery"),
    );

    assert!(discovery.discover().await.unwrap().is_empty());
    assert!(opener.opened().is_empty());
}

#[tokio::test]
async fn test_monitor_reloads_before_counting() {
    let notifications = MockPage::notifications(&[1, 4]);
    let monitor = RewardMonitor::new(
        Box::new(notifications.clone()),
        DEFAULT_REWARD_MARKER,
        Jitter::none(),
        Arc::new(RecordingPause::default()),
        test_log("rewards"),
    );

    let baseline = monitor.sample().await.unwrap();
    let fresh = monitor.sample().await.unwrap();

    assert_eq!(baseline.count, 1);
    assert_eq!(fresh.count, 4);
    assert_eq!(monitor.delta(&baseline, &fresh), 3);
    assert_eq!(monitor.delta(&fresh, &baseline), 0);
    assert_eq!(notifications.reloads(), 2);
}

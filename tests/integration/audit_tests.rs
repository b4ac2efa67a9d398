//! Full audits against mock sites

use crate::helpers::{create_test_config, html_page, mount_html, mount_mock_site};
use site_audit::{run_audit, Coordinator, CrawlEvent, IssueCode};
use tokio::sync::mpsc;
use wiremock::MockServer;

#[tokio::test]
async fn test_full_audit_of_mock_site() {
    let mock_server = MockServer::start().await;
    mount_mock_site(&mock_server).await;
    let base = mock_server.uri();

    let result = run_audit(&base, create_test_config(20), None)
        .await
        .expect("audit should start");

    let home = format!("{}/", base);
    let about = format!("{}/about", base);
    let blog = format!("{}/blog", base);
    let missing = format!("{}/missing", base);
    let secret = format!("{}/private/secret", base);

    assert_eq!(result.base_url, home);
    assert!(result.pages.contains_key(&home));
    assert!(result.pages.contains_key(&about));
    assert!(result.pages.contains_key(&blog));
    assert!(result.pages.contains_key(&missing));
    assert!(!result.pages.contains_key(&secret));
    assert_eq!(result.total_scanned, result.pages.len());

    // robots.txt was read and the disallowed link was reported, not crawled
    assert!(result.robots_txt_content.contains("Disallow: /private"));
    assert_eq!(result.robots_linked_blocked, vec![secret]);

    // Sitemap entries nobody links to are orphans
    assert_eq!(result.sitemap_entries.len(), 3);
    assert_eq!(result.orphan_pages, vec![format!("{}/orphan", base)]);

    // The 404 is a broken link on the home page
    assert_eq!(result.pages[&missing].status_code, 404);
    assert!(result
        .broken_link_map
        .iter()
        .any(|b| b.source == home && b.broken_url == missing && b.status_code == 404));
    assert!(result.pages[&home].has_issue(IssueCode::BrokenInternalLinks));

    // The blog canonicalizes to a page that does not exist
    let blog_page = &result.pages[&blog];
    assert_eq!(blog_page.canonical_target_status, 404);
    assert!(blog_page.has_issue(IssueCode::CanonicalTargetError));

    // Home is linked from about and blog
    assert_eq!(result.pages[&home].inlink_count, 2);

    assert!(result.health_score < 100);
    assert_eq!(result.category_scores.len(), 5);
    assert!(!result.recommendations.is_empty());
    assert!(result.status_codes.get(&404).is_some());
}

#[tokio::test]
async fn test_max_pages_limits_crawl_and_resolves_uncrawled_links() {
    let mock_server = MockServer::start().await;
    mount_mock_site(&mock_server).await;
    let base = mock_server.uri();

    let result = run_audit(&base, create_test_config(1), None)
        .await
        .expect("audit should start");

    assert_eq!(result.pages.len(), 1);

    // /missing was never crawled, its status came from the post-crawl check
    let home = format!("{}/", base);
    assert!(result
        .broken_link_map
        .iter()
        .any(|b| b.source == home && b.broken_url == format!("{}/missing", base)));
    assert!(!result
        .broken_link_map
        .iter()
        .any(|b| b.broken_url == format!("{}/about", base)));
}

#[tokio::test]
async fn test_progress_events() {
    let mock_server = MockServer::start().await;
    mount_mock_site(&mock_server).await;

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let result = run_audit(&mock_server.uri(), create_test_config(20), Some(sender))
        .await
        .expect("audit should start");

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(CrawlEvent::PreCheck { .. })));
    let pages_done = events
        .iter()
        .filter(|e| matches!(e, CrawlEvent::PageDone { .. }))
        .count();
    assert_eq!(pages_done, result.pages.len());

    match events.last() {
        Some(CrawlEvent::Done {
            pages_scanned,
            health_score,
        }) => {
            assert_eq!(*pages_scanned, result.pages.len());
            assert_eq!(*health_score, result.health_score);
        }
        other => panic!("expected done event last, got {:?}", other),
    }

    // pages_scanned counts up by one per committed page
    let scanned: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            CrawlEvent::PageDone { pages_scanned, .. } => Some(*pages_scanned),
            _ => None,
        })
        .collect();
    assert_eq!(scanned, (1..=result.pages.len()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_stop_before_first_batch() {
    let mock_server = MockServer::start().await;
    mount_mock_site(&mock_server).await;

    let coordinator = Coordinator::new(&mock_server.uri(), create_test_config(20))
        .expect("coordinator should build");
    coordinator.stop_handle().stop();
    let result = coordinator.run().await;

    // Interrupted audits keep their pre-check facts but an empty crawl
    // gets no score
    assert!(result.pages.is_empty());
    assert_eq!(result.health_score, 0);
    assert!(result.category_scores.is_empty());
    assert_eq!(result.score_explanation.map(|e| e.pages_count), Some(0));
    assert_eq!(result.sitemap_entries.len(), 3);
}

#[tokio::test]
async fn test_ignore_robots_crawls_disallowed_links() {
    let mock_server = MockServer::start().await;
    mount_mock_site(&mock_server).await;
    let base = mock_server.uri();
    mount_html(
        &mock_server,
        "/private/secret",
        html_page(
            "Private secret page",
            &format!("{}/private/secret", base),
            "<p>Hidden.</p>",
        ),
    )
    .await;

    let mut config = create_test_config(20);
    config.crawler.respect_robots = false;
    let result = run_audit(&base, config, None).await.unwrap();

    let secret = format!("{}/private/secret", base);
    assert!(result.pages.contains_key(&secret));
    assert_eq!(result.robots_linked_blocked, vec![secret]);
}

#[tokio::test]
async fn test_duplicate_titles_across_pages() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let title = "Same title on every page here";

    mount_html(
        &mock_server,
        "/",
        html_page(
            title,
            &format!("{}/", base),
            r#"<a href="/a">A</a><a href="/b">B</a>"#,
        ),
    )
    .await;
    for route in ["/a", "/b"] {
        mount_html(
            &mock_server,
            route,
            html_page(
                title,
                &format!("{}{}", base, route),
                r#"<a href="/">Home</a>"#,
            ),
        )
        .await;
    }

    let result = run_audit(&base, create_test_config(10), None).await.unwrap();

    assert_eq!(result.pages.len(), 3);
    assert_eq!(result.duplicate_titles.len(), 1);
    assert_eq!(result.duplicate_titles[0].urls.len(), 3);
    assert!(result
        .pages
        .values()
        .all(|page| page.has_issue(IssueCode::DuplicateTitle)));
}

#[tokio::test]
async fn test_invalid_seed_is_rejected() {
    let result = run_audit("ftp://example.com/", create_test_config(5), None).await;
    assert!(result.is_err());
}

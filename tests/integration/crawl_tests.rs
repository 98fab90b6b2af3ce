//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock news websites and test
//! the full crawl cycle end-to-end, from the homepage to stored articles.

use newswire::config::{parse_config, Config};
use newswire::crawler::{spawn_worker, Orchestrator, Worker, WorkerOutcome};
use newswire::storage::{
    Article, ArticleStore, RunRecord, RunStatus, SqliteStorage, StorageError, StorageResult,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration crawling one website served by `server_uri`
fn create_test_config(server_uri: &str, db_path: &Path, website_extra: &str) -> Config {
    parse_config(&format!(
        r#"
[crawler]
user-agent = "TestCrawler/1.0"
robot-agent = "TestCrawler"
crawl-delay = 0
max-consecutive-failures = 2

[database]
driver = "sqlite"
connection = "{db}"

[[websites]]
identifier = "daily"
start-url = "{uri}/"
date-format = "{{MONTH_NAME}} {{DAY_NUM}}, {{YEAR_LONG}}"
{extra}

[websites.selectors]
title = "h1.headline"
content = "div.story"
date = "time"
author = ".byline"
description = "p.summary"
thumbnail = "img.lead"

[websites.query]
except = ["utm_source"]
"#,
        db = db_path.display(),
        uri = server_uri,
        extra = website_extra,
    ))
    .expect("test config should be valid")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(body, "text/html; charset=utf-8")
}

fn article_page(title: &str, date: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <h1 class="headline">{title}</h1>
        <p class="summary">About {title}</p>
        <span class="byline"><a href="/about">Ann Reporter</a></span>
        <time>{date}</time>
        <img class="lead" src="/img/{title}.jpg">
        <div class="story"><p>Read <a href="/about">more</a></p><aside>Ad</aside><script>track()</script></div>
        <a href="/">Home</a>
        </body></html>"#
    )
}

/// Mounts a homepage linking to two articles, an about page and a feed
async fn mount_news_site(server: &MockServer, article_hits: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="/news/one?utm_source=home">One</a>
            <a href="/news/one">One again</a>
            <a href="/news/two#comments">Two</a>
            <a href="/about">About</a>
            <a href="/feed.xml">Feed</a>
            <a href="https://other.example.com/news/three">Elsewhere</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/news/one"))
        .respond_with(html(article_page("one", "March 04, 2021")))
        .expect(article_hits)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/news/two"))
        .respond_with(html(article_page("two", "April 10, 2022")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(
            r#"<html><body><h1 class="headline">About us</h1><div class="story">We write news.</div></body></html>"#
                .to_string(),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<rss></rss>", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_stores_articles() {
    let server = MockServer::start().await;
    mount_news_site(&server, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("news.db");

    let config = create_test_config(&server.uri(), &db, "");
    let (_tx, rx) = watch::channel(false);
    let report = Orchestrator::new(Arc::new(config), "hash")
        .run(rx)
        .await
        .expect("crawl should run");

    let outcome = report.outcome("daily").unwrap();
    assert!(matches!(outcome, WorkerOutcome::Completed(_)), "{}", outcome);
    assert_eq!(outcome.stats().articles_saved, 2);
    // Homepage, two articles, about page and feed
    assert_eq!(outcome.stats().pages_visited, 5);
    assert!(report.failures_for("daily").is_empty());

    let storage = SqliteStorage::new(&db).unwrap();
    let base = server.uri();
    let urls = storage.retrieve_article_urls_for_website("daily").unwrap();
    let expected: HashSet<String> = [format!("{}/news/one", base), format!("{}/news/two", base)]
        .into_iter()
        .collect();
    assert_eq!(urls, expected);

    let one = storage
        .get_article("daily", &format!("{}/news/one", base))
        .unwrap()
        .unwrap();
    assert_eq!(one.title, "one");
    assert_eq!(one.description.as_deref(), Some("About one"));
    assert_eq!(one.author.as_deref(), Some("Ann Reporter"));
    assert_eq!(one.date.format("%Y-%m-%d").to_string(), "2021-03-04");
    assert_eq!(
        one.content,
        format!(
            r#"<img class="lead" src="{base}/img/one.jpg"><p>Read <a href="{base}/about">more</a></p>"#
        )
    );

    let run = storage.get_latest_run("daily").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash");
    assert_eq!(run.articles_saved, 2);
}

#[tokio::test]
async fn test_stored_articles_are_not_fetched_again() {
    let server = MockServer::start().await;
    mount_news_site(&server, 0).await;
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("news.db");

    {
        let mut storage = SqliteStorage::new(&db).unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2021, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        storage
            .save_article(&Article {
                website: "daily".to_string(),
                url: format!("{}/news/one", server.uri()),
                title: "one".to_string(),
                description: None,
                content: "<p>earlier</p>".to_string(),
                author: None,
                date,
            })
            .unwrap();
    }

    let config = create_test_config(&server.uri(), &db, "");
    let (_tx, rx) = watch::channel(false);
    let report = Orchestrator::new(Arc::new(config), "hash")
        .run(rx)
        .await
        .unwrap();

    assert_eq!(report.outcome("daily").unwrap().stats().articles_saved, 1);

    let storage = SqliteStorage::new(&db).unwrap();
    assert_eq!(storage.count_articles("daily").unwrap(), 2);
    let one = storage
        .get_article("daily", &format!("{}/news/one", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(one.content, "<p>earlier</p>");
}

#[tokio::test]
async fn test_restrict_and_exclude_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/news/one">1</a><a href="/news/live-blog">live</a><a href="/about">about</a>"#
                .to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/one"))
        .respond_with(html(article_page("one", "March 04, 2021")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/live-blog"))
        .respond_with(html(article_page("live", "March 05, 2021")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<p>about</p>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("news.db");
    let config = create_test_config(
        &server.uri(),
        &db,
        r#"
[websites.filters]
restrict = '/(news/.*)?$'
exclude = 'live'
"#,
    );

    let (_tx, rx) = watch::channel(false);
    let report = Orchestrator::new(Arc::new(config), "hash")
        .run(rx)
        .await
        .unwrap();

    let stats = report.outcome("daily").unwrap().stats();
    assert_eq!(stats.pages_visited, 2);
    assert_eq!(stats.articles_saved, 1);
}

#[tokio::test]
async fn test_fetch_failures_are_reported_without_aborting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/gone">gone</a><a href="/news/one">one</a>"#.to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<p>about</p>".to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/one"))
        .respond_with(html(article_page("one", "March 04, 2021")))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("news.db"), "");
    let (_tx, rx) = watch::channel(false);
    let report = Orchestrator::new(Arc::new(config), "hash")
        .run(rx)
        .await
        .unwrap();

    let outcome = report.outcome("daily").unwrap();
    assert!(!outcome.is_aborted());
    assert_eq!(outcome.stats().articles_saved, 1);
    assert_eq!(outcome.stats().failures, 1);
    assert_eq!(
        report.failures_for("daily").to_vec(),
        vec![format!("fetch error on {}/gone: HTTP status 410", server.uri())]
    );
}

#[tokio::test]
async fn test_shutdown_interrupts_the_run() {
    let server = MockServer::start().await;
    mount_news_site(&server, 0).await;
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("news.db");

    let config = create_test_config(&server.uri(), &db, "");
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let report = Orchestrator::new(Arc::new(config), "hash")
        .run(rx)
        .await
        .unwrap();

    assert!(matches!(
        report.outcome("daily"),
        Some(WorkerOutcome::Interrupted(_))
    ));
    let storage = SqliteStorage::new(&db).unwrap();
    let run = storage.get_latest_run("daily").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}

/// Store whose writes always fail
struct FailingStore;

impl ArticleStore for FailingStore {
    fn retrieve_article_urls_for_website(&self, _website: &str) -> StorageResult<HashSet<String>> {
        Ok(HashSet::new())
    }

    fn save_article(&mut self, _article: &Article) -> StorageResult<bool> {
        Err(StorageError::Database("disk full".to_string()))
    }

    fn get_article(&self, _website: &str, _url: &str) -> StorageResult<Option<Article>> {
        Ok(None)
    }

    fn count_articles(&self, _website: &str) -> StorageResult<u64> {
        Ok(0)
    }

    fn list_websites(&self) -> StorageResult<Vec<String>> {
        Ok(vec![])
    }

    fn create_run(&mut self, _website: &str, _config_hash: &str) -> StorageResult<i64> {
        Ok(1)
    }

    fn finish_run(
        &mut self,
        _run_id: i64,
        _status: RunStatus,
        _articles_saved: u64,
        _failures: u64,
    ) -> StorageResult<()> {
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        Err(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self, _website: &str) -> StorageResult<Option<RunRecord>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_aborting_worker_does_not_affect_other_worker() {
    let failing_site = MockServer::start().await;
    mount_news_site(&failing_site, 1).await;
    let healthy_site = MockServer::start().await;
    mount_news_site(&healthy_site, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("news.db");
    let failing = create_test_config(&failing_site.uri(), &db, "");
    let healthy = create_test_config(&healthy_site.uri(), &db, "");
    let (_tx, rx) = watch::channel(false);

    let mut failing_handle = spawn_worker(
        Worker::new(
            failing.websites[0].clone(),
            failing.crawler.clone(),
            "hash",
            FailingStore,
        ),
        rx.clone(),
    );
    let healthy_handle = spawn_worker(
        Worker::new(
            healthy.websites[0].clone(),
            healthy.crawler.clone(),
            "hash",
            SqliteStorage::new(&db).unwrap(),
        ),
        rx,
    );

    let failing_outcome = failing_handle.outcome.await.unwrap();
    let healthy_outcome = healthy_handle.outcome.await.unwrap();

    assert_eq!(
        failing_outcome.abort_reason(),
        Some("2 consecutive storage failures, last one: Database error: disk full")
    );
    assert_eq!(failing_outcome.stats().failures, 2);

    let mut messages = Vec::new();
    while let Some(failure) = failing_handle.failures.recv().await {
        messages.push(failure.to_string());
    }
    assert_eq!(
        messages,
        vec![
            format!(
                "storage error on {}/news/one: Database error: disk full",
                failing_site.uri()
            ),
            format!(
                "storage error on {}/news/two: Database error: disk full",
                failing_site.uri()
            ),
        ]
    );

    assert!(matches!(healthy_outcome, WorkerOutcome::Completed(_)));
    assert_eq!(healthy_outcome.stats().articles_saved, 2);
}

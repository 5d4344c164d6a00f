use chrono::{TimeZone, Utc};
use mockito::Server;
use selfupdate_provider::{
    create_provider, ProviderConfig, ProviderError, ReleaseProvider, GITEA, LATEST,
};
use selfupdate_utils::{Context, HttpError, HyperClient, Logger};
use std::fs;
use std::sync::Arc;

const LATEST_PATH: &str = "/api/v1/repos/tumaykin/test-repository/releases/latest";

fn provider(base_url: &str, token: Option<&str>) -> Box<dyn ReleaseProvider> {
    create_provider(
        GITEA,
        ProviderConfig {
            api_base_url: Some(base_url.to_string()),
            owner: "tumaykin".to_string(),
            repo: "test-repository".to_string(),
            filter: "test-linux-amd64".to_string(),
            token: token.map(str::to_string),
            http_client: Arc::new(HyperClient::new().unwrap()),
            logger: Logger::global(),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_latest_release() {
    let body = fs::read_to_string("tests/web/gitea_release_latest.json").unwrap();
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", LATEST_PATH)
        .match_header("accept", "application/json")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let release = provider(&server.url(), None)
        .fetch_release(&Context::new(), LATEST)
        .await
        .unwrap();
    m.assert_async().await;

    assert_eq!(release.tag_name, "1.0.0");
    assert_eq!(release.notes, "");
    assert_eq!(
        release.page_url,
        "https://gitea.com/tumaykin/test-repository/releases/tag/1.0.0"
    );
    assert_eq!(
        release.published_at,
        Some(Utc.with_ymd_and_hms(2024, 4, 26, 22, 45, 0).unwrap())
    );

    let asset = release.find_asset("test-linux-amd64").unwrap();
    assert_eq!(asset.size, 1897953);
    assert_eq!(
        asset.download_url,
        "https://gitea.com/tumaykin/test-repository/releases/download/1.0.0/test-linux-amd64"
    );
}

#[tokio::test]
async fn test_fetch_release_by_tag_with_token() {
    let body = fs::read_to_string("tests/web/gitea_release_latest.json").unwrap();
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/api/v1/repos/tumaykin/test-repository/releases/tags/1.0.0")
        .match_header("authorization", "token gitea_token")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let release = provider(&format!("{}/", server.url()), Some("gitea_token"))
        .fetch_release(&Context::new(), "1.0.0")
        .await
        .unwrap();
    m.assert_async().await;
    assert_eq!(release.assets.len(), 4);
}

#[tokio::test]
async fn test_fetch_release_server_error() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", LATEST_PATH)
        .with_status(500)
        .create_async()
        .await;

    let err = provider(&server.url(), None)
        .fetch_release(&Context::new(), LATEST)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Http(HttpError::Remote { .. })
    ));
    assert!(err.to_string().contains("500 Internal Server Error"));
}

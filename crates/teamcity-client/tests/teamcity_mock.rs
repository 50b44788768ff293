//! HTTP mock tests for the TeamCity client.

use branchgate_core::{
    BranchKey, BuildId, BuildLocator, BuildParameters, BuildServer, BuildStatus, ChangeId,
    ChangeLocator, EnqueueRequest, RemoteError,
};
use serde_json::json;
use teamcity_client::{TeamCityClient, TeamCityConfig};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTH: &str = "Basic cm9ib3Q6c2VjcmV0";

fn client(server: &MockServer) -> TeamCityClient {
    let config = TeamCityConfig::new(&server.uri(), "robot", "secret")
        .with_display_url("https://ci.example.com/");
    TeamCityClient::new(config).unwrap()
}

fn key(name: &str) -> BranchKey {
    BranchKey::normalize(name).unwrap()
}

#[tokio::test]
async fn running_builds_use_running_locator() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/httpAuth/app/rest/builds/"))
        .and(query_param("locator", "running:true,branch:default:any"))
        .and(header("authorization", AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "build": [
                {"id": 11, "buildTypeId": "Dev_Deploy", "state": "running", "branchName": "fn-1"},
                {"id": 12, "buildTypeId": "Dev_Unit", "state": "running"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let builds = client(&server)
        .list_builds(&BuildLocator::Running)
        .await
        .unwrap();
    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].branch_key(), Some(key("fn-1")));
    assert_eq!(builds[1].branch_key(), None);
}

#[tokio::test]
async fn queued_builds_read_build_queue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/httpAuth/app/rest/buildQueue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "build": [{"id": 40, "buildTypeId": "Dev_Deploy", "state": "queued", "branchName": "a"}]
        })))
        .mount(&server)
        .await;

    let builds = client(&server).queued_builds().await.unwrap();
    assert_eq!(builds[0].id, BuildId(40));
    assert_eq!(builds[0].status, BuildStatus::Unknown);
}

#[tokio::test]
async fn branch_history_uses_branch_and_build_type_locator() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/httpAuth/app/rest/builds/"))
        .and(query_param("locator", "branch:name:fn-1,buildType:Dev_Deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "build": [
                {"id": 3, "buildTypeId": "Dev_Deploy", "status": "FAILURE", "branchName": "fn-1"},
                {"id": 2, "buildTypeId": "Dev_Deploy", "status": "SUCCESS", "branchName": "fn-1"}
            ]
        })))
        .mount(&server)
        .await;

    let builds = client(&server)
        .list_builds(&BuildLocator::Branch {
            branch: key("fn-1"),
            build_type: "Dev_Deploy".to_string(),
        })
        .await
        .unwrap();
    let statuses: Vec<BuildStatus> = builds.iter().map(|b| b.status).collect();
    assert_eq!(statuses, vec![BuildStatus::Failure, BuildStatus::Success]);
}

#[tokio::test]
async fn build_detail_reads_status_text_and_last_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/httpAuth/app/rest/builds/id:500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 500,
            "buildTypeId": "Dev_Unit",
            "status": "FAILURE",
            "statusText": "Tests failed: 3",
            "branchName": "fn-1",
            "lastChanges": {"count": 1, "change": [{"id": 321, "version": "abc"}]}
        })))
        .mount(&server)
        .await;

    let build = client(&server).build(BuildId(500)).await.unwrap();
    assert_eq!(build.status_text.as_deref(), Some("Tests failed: 3"));
    assert_eq!(build.last_change, Some(ChangeId(321)));
}

#[tokio::test]
async fn changes_pass_since_change_when_known() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/httpAuth/app/rest/changes/"))
        .and(query_param("locator", "branch:name:fn-1,buildType:Dev_Deploy"))
        .and(query_param("sinceChange", "id:321"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "change": [{"id": 322}]
        })))
        .mount(&server)
        .await;

    let changes = client(&server)
        .list_changes(&ChangeLocator {
            branch: key("fn-1"),
            build_type: "Dev_Deploy".to_string(),
            since: Some(ChangeId(321)),
        })
        .await
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].id, ChangeId(322));
}

#[tokio::test]
async fn enqueue_posts_build_type_branch_and_properties() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/httpAuth/app/rest/buildQueue"))
        .and(header("authorization", AUTH))
        .and(body_json(json!({
            "buildType": {"id": "Dev_Deploy"},
            "branchName": "fn-1",
            "properties": {
                "count": 2,
                "property": [
                    {"name": "env.branchgate.domain", "value": "fn-1"},
                    {"name": "env.branchgate.jira", "value": "true"}
                ]
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 900, "state": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = EnqueueRequest {
        build_type: "Dev_Deploy".to_string(),
        branch: key("refs/heads/fn-1"),
        properties: BuildParameters::new()
            .with("jira", Some("true"))
            .with("domain", Some("fn-1")),
    };
    client(&server).enqueue(&request).await.unwrap();
}

#[tokio::test]
async fn not_found_is_a_status_error_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/httpAuth/app/rest/builds/id:7"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("No build found by locator 'id:7'."),
        )
        .mount(&server)
        .await;

    let err = client(&server).build(BuildId(7)).await.unwrap_err();
    match err {
        RemoteError::Status {
            status,
            description,
            body,
        } => {
            assert_eq!(status, 404);
            assert_eq!(description, "Not Found");
            assert!(body.contains("id:7"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/httpAuth/app/rest/buildQueue"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client(&server).queued_builds().await.unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let config = TeamCityConfig::new("http://127.0.0.1:1", "robot", "secret");
    let client = TeamCityClient::new(config).unwrap();
    let err = client.queued_builds().await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[test]
fn display_url_has_no_trailing_slash() {
    let config =
        TeamCityConfig::new("http://tc", "u", "p").with_display_url("https://ci.example.com/");
    let client = TeamCityClient::new(config).unwrap();
    assert_eq!(client.display_url(), "https://ci.example.com");
}

use std::net::SocketAddr;

use minuscule_api::WebConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = minuscule_api::app::build_app(&WebConfig::default()).expect("valid route table");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_json(client: &reqwest::Client, url: &str, body: Value) -> reqwest::Response {
    client.post(url).json(&body).send().await.unwrap()
}

#[tokio::test]
async fn health_is_served_outside_the_step_chain() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn projects_lifecycle() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Empty list.
    let res = client.get(server.url("/projects")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "results": [] }));

    // Create.
    let res = post_json(
        &client,
        &server.url("/projects"),
        json!({
            "shortName": "test1",
            "prod": false,
            "longName": "test one",
            "code": "eligible-x999",
            "bonusCode": "cool-bonus"
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["shortName"], "test1");
    assert_eq!(created["longName"], "test one");
    assert_eq!(created["code"], "eligible-x999");
    let id = created["id"].as_str().unwrap().to_string();

    // List and fetch.
    let body: Value = client
        .get(server.url("/projects"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let res = client
        .get(server.url(&format!("/projects/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, created);

    // Patch merges over the stored project.
    let res = client
        .patch(server.url(&format!("/projects/{id}")))
        .json(&json!({ "longName": "test one2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let patched: Value = res.json().await.unwrap();
    assert_eq!(patched["shortName"], "test1");
    assert_eq!(patched["longName"], "test one2");
    assert_eq!(patched["code"], "eligible-x999");
    assert_eq!(patched["id"], id.as_str());
}

#[tokio::test]
async fn invalid_payloads_are_rejected_with_400() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let url = server.url("/projects");

    // Wrong type for code.
    let res = post_json(
        &client,
        &url,
        json!({ "shortName": "test2", "prod": false, "longName": "test one", "code": 999 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), r"code must be a string and must match \w+");

    // bonusCode needs an eligible code (reads an earlier validated field).
    let res = post_json(
        &client,
        &url,
        json!({
            "shortName": "test3",
            "longName": "test one",
            "code": "ineligible-5",
            "bonusCode": "sneaky"
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // code without longName.
    let res = post_json(&client, &url, json!({ "shortName": "x", "altName": "a", "code": "c" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "code requires longName");

    // Missing required field.
    let res = post_json(&client, &url, json!({ "longName": "l" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "shortName is required");

    // Malformed JSON never reaches a step.
    let res = client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Nothing was stored.
    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "results": [] }));
}

#[tokio::test]
async fn cross_field_rule_requires_long_or_alt_name() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let url = server.url("/projects");

    let res = post_json(&client, &url, json!({ "shortName": "test3", "prod": false })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await.unwrap(),
        "At least one of longName and altName must be provided"
    );

    let res = post_json(
        &client,
        &url,
        json!({ "shortName": "test3", "prod": false, "altName": "alt name provided" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = post_json(
        &client,
        &url,
        json!({ "shortName": "test3", "prod": false, "longName": "long name provided" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn form_submissions_are_accepted() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/projects"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("shortName=form1&longName=from+a+form")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["longName"], "from a form");
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/projects/madethisup"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "project not found");

    let res = client.get(server.url("/projects/-bad")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await.unwrap(),
        "projectId must contain only letters, digits and underscores"
    );

    let res = client
        .patch(server.url("/projects/madethisup"))
        .json(&json!({ "longName": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

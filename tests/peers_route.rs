mod support;

#[tokio::test]
async fn when_no_peer_is_connected_then_peer_list_is_empty() {
    let base_url = support::ensure_server();

    let res = reqwest::get(format!("{base_url}/peers"))
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await.expect("peers json");
    assert_eq!(body, serde_json::json!({ "peers": [] }));
}

#[tokio::test]
async fn when_peer_is_unknown_then_lookup_returns_not_found() {
    let base_url = support::ensure_server();

    let res = reqwest::get(format!("{base_url}/peers/200"))
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.expect("error json");
    assert_eq!(body["error"], "peer not found");
}

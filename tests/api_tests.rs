// HttpHostApi against a local axum server: action outcomes follow the HTTP status

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::post;
use logique::api::{ActionResponse, HostApi, HttpHostApi};
use logique::error::CommandError;
use logique::models::ContainerAction;
use url::Url;

async fn action(Path((id, action)): Path<(String, String)>) -> (StatusCode, String) {
    match id.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "docker unavailable".into()),
        "plain" => (StatusCode::OK, format!("{} ok", action)),
        _ => (
            StatusCode::OK,
            format!(r#"{{"status": "{}", "container_id": "{}"}}"#, action, id),
        ),
    }
}

async fn serve() -> (HttpHostApi, tokio::task::JoinHandle<()>) {
    let app = Router::new().route("/dash/container/{id}/{action}", post(action));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base = Url::parse(&format!("http://{}/dash/", addr)).unwrap();
    (HttpHostApi::new(base).unwrap(), server)
}

#[tokio::test]
async fn container_action_outcome_follows_status() {
    let (api, server) = serve().await;

    let ok = api.container_action("abc", ContainerAction::Stop).await.unwrap();
    assert_eq!(ok.status, "stop");
    assert_eq!(ok.container_id, "abc");

    let plain = api
        .container_action("plain", ContainerAction::Restart)
        .await
        .unwrap();
    assert_eq!(plain, ActionResponse::default());

    let err = api
        .container_action("broken", ContainerAction::Start)
        .await
        .unwrap_err();
    match err {
        CommandError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "docker unavailable");
        }
        other => panic!("unexpected error: {}", other),
    }

    server.abort();
}

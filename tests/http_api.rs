use reclamation_admin::{
    error::Error,
    reclamation::{HttpApi, ListParams, NewReclamation, Reclamation, ReclamationApi, ReclamationService, ServiceOptions},
};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn api(server: &MockServer) -> HttpApi {
    HttpApi::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
}

fn options() -> ServiceOptions {
    ServiceOptions {
        stale_time: None,
        query_retries: 0,
        retry_base_delay: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn test_list_sends_paging_and_reads_total_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reclamation"))
        .and(query_param("page", "1"))
        .and(query_param("size", "20"))
        .and(query_param("sort", "id,desc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "45")
                .set_body_json(json!([
                    {"id": 25, "name": "a", "link": "https://a", "description": null},
                    {"id": 24, "name": "b", "link": "https://b"}
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = ReclamationService::new(api(&server), options());
    let query = service.list(ListParams::new(1, 20)).await.unwrap();

    assert_eq!(query.total_items(), 45);
    assert_eq!(query.total_pages(), 3);
    assert!(query.has_more());
    assert_eq!(query.reclamations()[1].description, None);

    // Served from the cache.
    service.list(ListParams::new(1, 20)).await.unwrap();
}

#[tokio::test]
async fn test_list_without_total_header_is_a_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reclamation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = ReclamationService::new(api(&server), options());
    match service.list(ListParams::new(0, 20)).await {
        Err(Error::Validation(err)) => assert_eq!(err.path, "totalItems"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_success_body_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reclamation"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "1")
                .set_body_string("<html>oops</html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = ReclamationService::new(
        api(&server),
        ServiceOptions {
            query_retries: 2,
            ..options()
        },
    );
    match service.list(ListParams::new(0, 20)).await {
        Err(Error::Validation(err)) => assert_eq!(err.path, "$"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_get_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reclamation/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "name": "seven", "link": "https://7", "description": "lucky"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reclamation/8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = ReclamationService::new(api(&server), options());
    let record = service.get(Some(7)).await.unwrap().data.unwrap();
    assert_eq!(record.description.as_deref(), Some("lucky"));

    match service.get(Some(8)).await {
        Err(Error::Rejected { status, .. }) => assert_eq!(status, 404),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_puts_full_record() {
    let server = MockServer::start().await;
    let record = Reclamation {
        id: 3,
        name: "renamed".to_string(),
        link: "https://3".to_string(),
        description: None,
    };
    Mock::given(method("PUT"))
        .and(path("/reclamation"))
        .and(body_json(json!({"id": 3, "name": "renamed", "link": "https://3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3, "name": "renamed", "link": "https://3", "description": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ReclamationService::new(api(&server), options());
    assert_eq!(service.update(record.clone()).await.unwrap(), record);
}

#[tokio::test]
async fn test_create_name_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reclamation"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorKey": "name_already_used",
            "title": "Name already used"
        })))
        .mount(&server)
        .await;

    let service = ReclamationService::new(api(&server), options());
    let err = service
        .create(NewReclamation {
            name: "taken".to_string(),
            link: "https://x".to_string(),
            description: None,
        })
        .await
        .unwrap_err();

    assert!(err.is_name_already_used());
}

#[tokio::test]
async fn test_create_response_is_validated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reclamation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "9", "name": "n", "link": "l"})))
        .mount(&server)
        .await;

    let service = ReclamationService::new(api(&server), options());
    let err = service
        .create(NewReclamation {
            name: "n".to_string(),
            link: "l".to_string(),
            description: None,
        })
        .await
        .unwrap_err();

    match err {
        Error::Validation(err) => assert_eq!(err.path, "id"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/reclamation/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    api(&server).delete(4).await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let api = HttpApi::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    assert!(matches!(api.get(1).await, Err(Error::Network(_))));
}

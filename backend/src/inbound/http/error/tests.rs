//! Tests for HTTP error mapping.

use super::*;
use actix_web::body::to_bytes;
use actix_web::{App, test as actix_test};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error_case() -> Error {
    Error::internal("pool exhausted")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": "x"}))
}

#[fixture]
fn unprocessable_case() -> Error {
    Error::unprocessable_schedule("schedule table has no body").with_details(json!({
        "reason": "no_table_body",
    }))
}

async fn decode_response(error: &Error) -> (StatusCode, Option<String>, Error) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .map(|value| value.to_str().expect("Trace-Id is ASCII").to_owned());
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds");
    (status, header, body)
}

#[rstest]
#[case::invalid(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case::not_found(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case::unprocessable(
    Error::unprocessable_schedule("no rows"),
    StatusCode::UNPROCESSABLE_ENTITY
)]
#[case::unavailable(
    Error::service_unavailable("store offline"),
    StatusCode::SERVICE_UNAVAILABLE
)]
#[case::internal(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(internal_error_case: Error) {
    let (status, header, body) = decode_response(&internal_error_case).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(body.message(), "Internal server error");
    assert_eq!(body.details(), None);
    assert_eq!(body.trace_id(), Some(TRACE_ID));
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_their_details(unprocessable_case: Error) {
    let (status, header, body) = decode_response(&unprocessable_case).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(header, None);
    assert_eq!(body, unprocessable_case);
}

#[derive(serde::Deserialize)]
struct NumberBody {
    number: i64,
}

async fn accept_number(body: web::Json<NumberBody>) -> HttpResponse {
    HttpResponse::Ok().body(body.number.to_string())
}

#[rstest]
#[case::malformed("{\"number\":", "application/json", "malformed_json")]
#[case::wrong_type("{\"number\":\"one\"}", "application/json", "malformed_json")]
#[case::not_json("number=1", "text/plain", "content_type")]
#[actix_web::test]
async fn rejected_bodies_use_the_error_shape(
    #[case] body: &'static str,
    #[case] content_type: &'static str,
    #[case] reason: &str,
) {
    let app = actix_test::init_service(
        App::new()
            .app_data(json_config())
            .route("/", web::post().to(accept_number)),
    )
    .await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["reason"], reason);
}

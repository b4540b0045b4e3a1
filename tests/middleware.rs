use actix_web::{
    App, HttpResponse,
    http::{StatusCode, header},
    middleware::from_fn,
    test, web,
};

use crm_backend::monitoring::{RequestMetrics, render_prometheus, security_headers, track_requests};

#[actix_web::test]
async fn security_headers_are_added() {
    let app = test::init_service(
        App::new()
            .wrap(security_headers())
            .default_service(web::to(|| async { HttpResponse::Ok().finish() })),
    )
    .await;

    let req = test::TestRequest::default().to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    assert_eq!(resp.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(
        resp.headers().get(header::REFERRER_POLICY).unwrap(),
        "same-origin"
    );
}

#[actix_web::test]
async fn metrics_count_responses_by_class() {
    let metrics = web::Data::new(RequestMetrics::new());
    let app = test::init_service(
        App::new()
            .app_data(metrics.clone())
            .wrap(from_fn(track_requests))
            .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() }))
            .route(
                "/fail",
                web::get().to(|| async { HttpResponse::InternalServerError().finish() }),
            ),
    )
    .await;

    for uri in ["/ok", "/ok", "/fail", "/missing"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        test::call_service(&app, req).await;
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total, 4);
    assert_eq!(snapshot.in_flight, 0);
    assert_eq!(snapshot.by_class, [0, 2, 0, 1, 1]);

    let text = render_prometheus(&snapshot, None, None);
    assert!(text.contains("crm_http_responses_total{class=\"5xx\"} 1"));
}

#[actix_web::test]
async fn metrics_middleware_tolerates_missing_state() {
    let app = test::init_service(
        App::new()
            .wrap(from_fn(track_requests))
            .default_service(web::to(|| async { HttpResponse::Accepted().finish() })),
    )
    .await;

    let req = test::TestRequest::default().to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

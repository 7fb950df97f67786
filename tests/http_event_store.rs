#![cfg(feature = "http-store")]

use std::time::Duration;

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, patch},
};
use bracket_sync::{
    dao::{
        error::FetchError,
        event_store::{
            EventStore,
            http::{HttpConfig, HttpEventStore},
        },
        models::NewEvent,
    },
    state::{EventId, MatchId},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

fn event_json(id: u64) -> Value {
    json!({
        "id": id,
        "title": "Spring Open",
        "description": "Double elimination",
        "date": "2024-05-01",
        "location": "Hall B",
        "participants": ["A", "B", "C", " "],
        "matches": [
            { "id": 1, "round": 1, "player1": "A", "player2": "B", "winner": null },
            { "id": "2", "round": "1", "player1": "C", "player2": "", "winner": "" }
        ]
    })
}

async fn get_event(Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    match id {
        404 => Err(StatusCode::NOT_FOUND),
        503 => Err(StatusCode::SERVICE_UNAVAILABLE),
        id => Ok(Json(json!({ "event": event_json(id) }))),
    }
}

async fn list_events() -> Json<Value> {
    Json(json!({ "events": [event_json(1), event_json(2)] }))
}

async fn create_event(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "event": {
            "id": 9,
            "title": body["title"],
            "description": body["description"],
            "date": body["date"],
            "location": body["location"],
            "participants": body["participants"],
            "matches": []
        }
    }))
}

async fn set_winner(
    Path((_event_id, match_id)): Path<(u64, u64)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if match_id != 1 {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "match": {
            "id": 1,
            "round": 1,
            "player1": "A",
            "player2": "B",
            "winner": body["winner"]
        }
    })))
}

async fn spawn_service() -> HttpEventStore {
    let app = Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{id}", get(get_event))
        .route("/api/events/{id}/matches/{match_id}", patch(set_winner));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    HttpEventStore::new(HttpConfig::new(format!("http://{addr}/api/"))).unwrap()
}

#[tokio::test]
async fn fetch_maps_event_payload() {
    let store = spawn_service().await;
    let event = store.fetch_event(EventId(5)).await.unwrap();

    assert_eq!(event.id, EventId(5));
    assert_eq!(event.details.title, "Spring Open");
    assert_eq!(event.details.location, "Hall B");
    assert_eq!(event.details.participants.len(), 3);
    assert_eq!(event.matches.len(), 2);

    let bye = &event.matches[1];
    assert_eq!(bye.id(), MatchId(2));
    assert!(bye.is_bye());
    assert_eq!(bye.winner(), None);
}

#[tokio::test]
async fn status_codes_map_to_fetch_errors() {
    let store = spawn_service().await;

    let missing = store.fetch_event(EventId(404)).await.unwrap_err();
    assert!(matches!(missing, FetchError::NotFound(_)));
    assert!(!missing.is_transient());

    let unavailable = store.fetch_event(EventId(503)).await.unwrap_err();
    assert!(matches!(unavailable, FetchError::Server { status: 503, .. }));
    assert!(unavailable.is_transient());
}

#[tokio::test]
async fn list_and_create_events() {
    let store = spawn_service().await;

    let events = store.list_events().await.unwrap();
    let ids: Vec<_> = events.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![EventId(1), EventId(2)]);

    let created = store
        .create_event(NewEvent {
            title: "Autumn Cup".into(),
            date: "2024-10-12".into(),
            location: "Main stage".into(),
            description: String::new(),
            participants: vec!["Ash".into(), "Misty".into()],
        })
        .await
        .unwrap();
    assert_eq!(created.id, EventId(9));
    assert_eq!(created.details.title, "Autumn Cup");
    assert_eq!(created.details.participants.len(), 2);
    assert!(created.matches.is_empty());
}

#[tokio::test]
async fn set_winner_returns_confirmed_match() {
    let store = spawn_service().await;

    let confirmed = store
        .set_winner(EventId(5), MatchId(1), "B".into())
        .await
        .unwrap();
    assert_eq!(confirmed.winner(), Some("B"));

    let missing = store
        .set_winner(EventId(5), MatchId(42), "B".into())
        .await
        .unwrap_err();
    assert!(matches!(missing, FetchError::NotFound(_)));
}

#[tokio::test]
async fn server_winner_outside_the_match_is_rejected() {
    let store = spawn_service().await;

    let err = store
        .set_winner(EventId(5), MatchId(1), "Z".into())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_service_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = HttpEventStore::new(
        HttpConfig::new(format!("http://{addr}/api")).with_timeout(Duration::from_secs(2)),
    )
    .unwrap();
    let err = store.fetch_event(EventId(1)).await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
    assert!(err.is_transient());
}

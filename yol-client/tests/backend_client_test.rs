use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yol_client::{
    BackendClient, BookingService, ClientError, NotificationSync, Notifier, SyncOutcome, SyncScheduler,
};
use yol_core::{
    ActionOutcome, ManualClock, Seat, SeatAction, SeatMap, SeatNo, SeatState, StartWarning, Trip, TripEnvelope,
    TripStatus, UserId,
};
use yol_store::app_config::BackendConfig;
use yol_store::{MemorySessionStore, Notification, NotificationKind, Session};

const DRIVER: &str = "u-driver";
const PASSENGER: &str = "u-passenger";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 5, 0, 0).unwrap()
}

fn session(user: &str) -> Session {
    Session {
        token: format!("tok-{user}"),
        user_id: UserId::new(user),
        display_name: Some("Aziz".to_string()),
    }
}

fn backend(server: &MockServer, session: Option<Session>) -> Arc<BackendClient> {
    let config = BackendConfig {
        base_url: server.uri(),
        timeout_secs: 1,
    };
    let store = match session {
        Some(s) => MemorySessionStore::with_session(s),
        None => MemorySessionStore::new(),
    };
    Arc::new(BackendClient::new(&config, Arc::new(store)).expect("client build"))
}

fn trip(id: Uuid) -> Trip {
    Trip {
        id,
        driver_id: UserId::new(DRIVER),
        status: TripStatus::Active,
        departure_time: t0() + Duration::hours(2),
        origin: "Toshkent".to_string(),
        destination: "Samarqand".to_string(),
        price_per_seat: 120_000,
        note: None,
        created_at: t0(),
    }
}

fn envelope(trip: &Trip, seats: &SeatMap) -> serde_json::Value {
    serde_json::to_value(TripEnvelope::from_domain(trip, seats, |_| None)).expect("envelope json")
}

fn booking(backend: Arc<BackendClient>) -> BookingService {
    BookingService::new(backend, Arc::new(ManualClock::new(t0())))
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<u64>>,
}

impl RecordingNotifier {
    fn seen(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, notification: &Notification) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(notification.id);
        Ok(())
    }
}

fn notification(id: u64, trip_id: Uuid) -> Notification {
    Notification {
        id,
        kind: NotificationKind::SeatRequested,
        trip_id,
        seat_no: Some(2),
        message: "Aziz requested seat 2".to_string(),
        created_at: t0(),
    }
}

// ── Session and error mapping ────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_stores_session_and_sends_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "tok-1",
            "userId": PASSENGER,
            "displayName": "Aziz"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/trips/mine"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = backend(&server, None);
    let session = client.sign_in("+998901234567", Some("Aziz")).await.expect("sign in");
    assert_eq!(session.user_id, UserId::new(PASSENGER));
    assert_eq!(client.session().await, Some(session));

    assert!(client.my_trips().await.expect("trips").is_empty());
}

#[tokio::test]
async fn test_rejected_token_maps_to_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/trips/mine"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "Authentication failed: token expired",
            "code": "unauthenticated"
        })))
        .mount(&server)
        .await;

    let err = backend(&server, Some(session(PASSENGER))).my_trips().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));
}

#[tokio::test]
async fn test_conflict_keeps_backend_message() {
    let server = MockServer::start().await;
    let trip_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/v1/trips/{trip_id}/start")))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": "Invalid transition from active to in_progress: departure time not reached",
            "code": "invalid_transition"
        })))
        .mount(&server)
        .await;

    let err = backend(&server, Some(session(DRIVER))).start_trip(trip_id).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.api_code().as_deref(), Some("invalid_transition"));
    assert!(err.user_message().contains("departure time not reached"));
}

#[tokio::test]
async fn test_malformed_body_is_a_deserialization_error() {
    let server = MockServer::start().await;
    let trip_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{trip_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = backend(&server, Some(session(PASSENGER))).get_trip(trip_id).await.unwrap_err();
    assert!(matches!(err, ClientError::Deserialization { .. }));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/notifications"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = backend(&server, Some(session(PASSENGER))).notifications(0).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout { .. }));
}

// ── Booking ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_is_applied_from_server_response() {
    let server = MockServer::start().await;
    let trip = trip(Uuid::new_v4());
    let seat_no = SeatNo::new(2).unwrap();
    let booked = SeatMap::new().with_seat(Seat {
        seat_no,
        state: SeatState::Pending {
            holder: UserId::new(PASSENGER),
        },
        holder_name: Some("Aziz".to_string()),
    });

    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{}", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&trip, &SeatMap::new())))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/trips/{}/seats/2/request", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&trip, &booked)))
        .expect(1)
        .mount(&server)
        .await;

    let service = booking(backend(&server, Some(session(PASSENGER))));
    let mut view = service.load(trip.id).await.expect("load");
    let outcome = service
        .seat_action(&mut view, seat_no, SeatAction::Request)
        .await
        .expect("request");

    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(view.seats, booked);
}

#[tokio::test]
async fn test_invalid_action_never_reaches_network() {
    let server = MockServer::start().await;
    let trip = trip(Uuid::new_v4());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{}", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&trip, &SeatMap::new())))
        .mount(&server)
        .await;

    // The driver cannot request a seat on their own trip.
    let service = booking(backend(&server, Some(session(DRIVER))));
    let mut view = service.load(trip.id).await.expect("load");
    let before = view.clone();

    let err = service
        .seat_action(&mut view, SeatNo::new(1).unwrap(), SeatAction::Request)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(yol_core::CoreError::Unauthorized(_))));
    assert_eq!(view, before);
}

#[tokio::test]
async fn test_lost_race_reports_seat_taken() {
    let server = MockServer::start().await;
    let trip = trip(Uuid::new_v4());
    let seat_no = SeatNo::new(2).unwrap();
    let taken = SeatMap::new().with_seat(Seat {
        seat_no,
        state: SeatState::Pending {
            holder: UserId::new("u-other"),
        },
        holder_name: Some("Jasur".to_string()),
    });

    // First load sees the seat free, the refresh after the conflict does not.
    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{}", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&trip, &SeatMap::new())))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{}", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&trip, &taken)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/trips/{}/seats/2/request", trip.id)))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": "Seat 2 is unavailable (currently pending)",
            "code": "seat_unavailable"
        })))
        .mount(&server)
        .await;

    let service = booking(backend(&server, Some(session(PASSENGER))));
    let mut view = service.load(trip.id).await.expect("load");
    let outcome = service
        .seat_action(&mut view, seat_no, SeatAction::Request)
        .await
        .expect("conflict is not an error");

    assert_eq!(
        outcome,
        ActionOutcome::SeatTaken {
            holder_name: Some("Jasur".to_string())
        }
    );
    assert_eq!(view.seats, taken);
}

#[tokio::test]
async fn test_locked_trip_conflict_is_not_seat_taken() {
    let server = MockServer::start().await;
    let trip = trip(Uuid::new_v4());
    let seat_no = SeatNo::new(2).unwrap();
    let mut started = trip.clone();
    started.status = TripStatus::InProgress;
    let taken = SeatMap::new().with_seat(Seat {
        seat_no,
        state: SeatState::Booked {
            holder: UserId::new("u-other"),
        },
        holder_name: Some("Jasur".to_string()),
    });

    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{}", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&trip, &SeatMap::new())))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    // A refresh would show the seat held, but none must happen.
    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{}", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&started, &taken)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/trips/{}/seats/2/request", trip.id)))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": "Trip is locked for seat changes",
            "code": "trip_locked"
        })))
        .mount(&server)
        .await;

    let service = booking(backend(&server, Some(session(PASSENGER))));
    let mut view = service.load(trip.id).await.expect("load");
    let before = view.clone();

    let err = service
        .seat_action(&mut view, seat_no, SeatAction::Request)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.api_code().as_deref(), Some("trip_locked"));
    assert_eq!(err.user_message(), "Trip is locked for seat changes");
    assert_eq!(view, before);
}

#[tokio::test]
async fn test_start_without_passengers_needs_confirmation() {
    let server = MockServer::start().await;
    let mut trip = trip(Uuid::new_v4());
    trip.departure_time = t0() - Duration::minutes(5);
    let mut started = trip.clone();
    started.status = TripStatus::InProgress;

    Mock::given(method("GET"))
        .and(path(format!("/v1/trips/{}", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&trip, &SeatMap::new())))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/trips/{}/start", trip.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&started, &SeatMap::new())))
        .expect(1)
        .mount(&server)
        .await;

    let service = booking(backend(&server, Some(session(DRIVER))));
    let mut view = service.load(trip.id).await.expect("load");

    let err = service.start_trip(&mut view, false).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::ConfirmationRequired(StartWarning::NoBookedPassengers)
    ));
    assert_eq!(view.trip.status, TripStatus::Active);

    let outcome = service.start_trip(&mut view, true).await.expect("start");
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(view.trip.status, TripStatus::InProgress);
}

// ── Notification sync ────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_delivers_each_notification_once() {
    let server = MockServer::start().await;
    let trip_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/v1/notifications"))
        .and(query_param("after", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![notification(3, trip_id), notification(7, trip_id)]),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/notifications"))
        .and(query_param("after", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let sync = NotificationSync::new(backend(&server, Some(session(DRIVER))), notifier.clone());

    assert_eq!(sync.run_once().await.unwrap(), SyncOutcome::Delivered(2));
    assert_eq!(sync.run_once().await.unwrap(), SyncOutcome::Delivered(0));
    assert_eq!(notifier.seen(), vec![3, 7]);
}

#[tokio::test]
async fn test_expired_session_syncs_silently() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/notifications"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let sync = NotificationSync::new(backend(&server, Some(session(DRIVER))), notifier.clone());

    assert_eq!(sync.run_once().await.unwrap(), SyncOutcome::SignedOut);
    assert!(notifier.seen().is_empty());
}

#[tokio::test]
async fn test_scheduler_retries_failed_unit() {
    let server = MockServer::start().await;
    let trip_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/v1/notifications"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![notification(1, trip_id)]))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let sync = Arc::new(NotificationSync::new(
        backend(&server, Some(session(DRIVER))),
        notifier.clone(),
    ));
    let scheduler = SyncScheduler {
        interval: std::time::Duration::from_secs(3600),
        retry: std::time::Duration::from_millis(20),
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = scheduler.spawn(sync, shutdown_rx);

    let delivered = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while notifier.seen().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(delivered.is_ok(), "retry never delivered");

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
    assert_eq!(notifier.seen(), vec![1]);
}

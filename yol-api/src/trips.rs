use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Duration;
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;
use yol_core::{
    apply_seat_action, finish_trip, start_trip, Identity, NewTrip, Seat, SeatAction, SeatMap,
    SeatNo, SeatStatus, TripEnvelope, TripSnapshot, TripStatus,
};
use yol_store::{NotificationKind, TripQuery, TripRecord};

use crate::{error::AppError, middleware::SessionClaims, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", post(publish_trip).get(search_trips))
        .route("/v1/trips/mine", get(my_trips))
        .route("/v1/trips/{trip_id}", get(get_trip))
        .route("/v1/trips/{trip_id}/start", post(start))
        .route("/v1/trips/{trip_id}/finish", post(finish))
        .route("/v1/trips/{trip_id}/seats/{seat_no}/{action}", post(seat_action))
        .route("/v1/trips/{trip_id}/stream", get(stream_trip))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/trips
/// Publish a trip; the caller becomes its driver
async fn publish_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<NewTrip>,
) -> Result<Json<TripEnvelope>, AppError> {
    let driver = claims.identity();
    let now = state.clock.now();
    let lead = Duration::minutes(state.business_rules.min_publish_lead_minutes);

    let blocked = req.validate(now, lead)?;
    let trip = req.into_trip(driver.user_id().clone(), now);

    let mut seats = SeatMap::new();
    for seat_no in blocked {
        seats = apply_seat_action(&trip, &seats, &driver, seat_no, SeatAction::Block, now)?;
    }

    let record = TripRecord { trip, seats };
    state.trips.insert(record.clone()).await;
    tracing::info!(trip_id = %record.trip.id, driver = %driver.user_id(), "trip published");

    Ok(Json(state.envelope(&record.trip, &record.seats).await))
}

/// GET /v1/trips?origin=&destination=&date=
async fn search_trips(
    State(state): State<AppState>,
    Query(query): Query<TripQuery>,
) -> Json<Vec<TripSnapshot>> {
    let found = state
        .trips
        .search(&query, state.clock.now(), state.business_rules.search_result_limit)
        .await;

    Json(
        found
            .iter()
            .map(|r| TripSnapshot::from_trip(&r.trip, &r.seats))
            .collect(),
    )
}

/// GET /v1/trips/mine
/// Trips the caller drives
async fn my_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Json<Vec<TripSnapshot>> {
    let identity = claims.identity();
    let found = state.trips.by_driver(identity.user_id()).await;
    Json(
        found
            .iter()
            .map(|r| TripSnapshot::from_trip(&r.trip, &r.seats))
            .collect(),
    )
}

/// GET /v1/trips/:id
async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripEnvelope>, AppError> {
    let record = state.trips.get(trip_id).await?;
    Ok(Json(state.envelope(&record.trip, &record.seats).await))
}

/// POST /v1/trips/:id/start
async fn start(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripEnvelope>, AppError> {
    let actor = claims.identity();
    let now = state.clock.now();

    let record = state
        .trips
        .update(trip_id, |r| {
            Ok(TripRecord {
                trip: start_trip(&r.trip, &actor, now)?,
                seats: r.seats.clone(),
            })
        })
        .await?;

    tracing::info!(trip_id = %trip_id, booked = record.seats.booked_count(), "trip started");
    notify_booked(&state, &record, TripStatus::InProgress).await;
    Ok(Json(state.publish(&record).await))
}

/// POST /v1/trips/:id/finish
async fn finish(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripEnvelope>, AppError> {
    let actor = claims.identity();
    let now = state.clock.now();

    let record = state
        .trips
        .update(trip_id, |r| {
            Ok(TripRecord {
                trip: finish_trip(&r.trip, &actor, now)?,
                seats: r.seats.clone(),
            })
        })
        .await?;

    tracing::info!(trip_id = %trip_id, "trip finished");
    notify_booked(&state, &record, TripStatus::Finished).await;
    Ok(Json(state.publish(&record).await))
}

/// POST /v1/trips/:id/seats/:seat_no/:action
async fn seat_action(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path((trip_id, seat_no, action)): Path<(Uuid, u8, String)>,
) -> Result<Json<TripEnvelope>, AppError> {
    let action: SeatAction = action.parse()?;
    let seat_no = SeatNo::new(seat_no)?;
    let actor = claims.identity();
    let now = state.clock.now();

    let mut previous = None;
    let record = state
        .trips
        .update(trip_id, |r| {
            previous = Some(r.seats.get(seat_no).clone());
            let seats = apply_seat_action(&r.trip, &r.seats, &actor, seat_no, action, now)?;
            Ok(TripRecord {
                trip: r.trip.clone(),
                seats,
            })
        })
        .await?;

    tracing::info!(
        trip_id = %trip_id,
        seat_no = seat_no.get(),
        action = %action,
        actor = %actor.user_id(),
        status = %record.seats.get(seat_no).status(),
        "seat action applied"
    );

    if let Some(previous) = previous {
        notify_seat_change(&state, &record, &previous, action, &actor).await;
    }
    Ok(Json(state.publish(&record).await))
}

/// GET /v1/trips/:id/stream
/// Server-sent `trip_updated` events for one trip
async fn stream_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    // Unknown trips get a 404 instead of an empty stream.
    state.trips.get(trip_id).await?;

    let rx = state.trip_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(envelope) if envelope.trip.id == trip_id => {
                Some(Event::default().event("trip_updated").json_data(&envelope))
            }
            // Lagged receivers skip ahead; the next event carries full state.
            _ => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ============================================================================
// Notifications to the counterpart
// ============================================================================

async fn notify_seat_change(
    state: &AppState,
    record: &TripRecord,
    previous: &Seat,
    action: SeatAction,
    actor: &Identity,
) {
    let trip = &record.trip;
    let route = format!("{} → {}", trip.origin, trip.destination);
    let seat = previous.seat_no;
    let who = actor.display_name().unwrap_or("A passenger").to_string();

    let (recipient, kind, message) = match (action, previous.holder()) {
        (SeatAction::Request, _) => (
            trip.driver_id.clone(),
            NotificationKind::SeatRequested,
            format!("{who} requested seat {seat} on {route}"),
        ),
        (SeatAction::Cancel, _) => (
            trip.driver_id.clone(),
            NotificationKind::RequestCancelled,
            format!("{who} cancelled the request for seat {seat} on {route}"),
        ),
        (SeatAction::Approve, Some(holder)) => (
            holder.clone(),
            NotificationKind::RequestApproved,
            format!("Your seat {seat} on {route} is booked"),
        ),
        (SeatAction::Reject, Some(holder)) => (
            holder.clone(),
            NotificationKind::RequestRejected,
            format!("Your request for seat {seat} on {route} was declined"),
        ),
        _ => return,
    };

    state
        .notifications
        .push(&recipient, kind, trip.id, Some(seat.get()), message, state.clock.now())
        .await;
}

async fn notify_booked(state: &AppState, record: &TripRecord, status: TripStatus) {
    let trip = &record.trip;
    let (kind, message) = match status {
        TripStatus::InProgress => (
            NotificationKind::TripStarted,
            format!("Your trip {} → {} has started", trip.origin, trip.destination),
        ),
        TripStatus::Finished => (
            NotificationKind::TripFinished,
            format!("Your trip {} → {} has finished", trip.origin, trip.destination),
        ),
        TripStatus::Active => return,
    };

    let now = state.clock.now();
    for seat in record.seats.iter() {
        if let (SeatStatus::Booked, Some(holder)) = (seat.status(), seat.holder()) {
            state
                .notifications
                .push(holder, kind, trip.id, Some(seat.seat_no.get()), message.clone(), now)
                .await;
        }
    }
}

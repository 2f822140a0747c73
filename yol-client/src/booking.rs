use crate::error::ClientError;
use crate::http::BackendClient;
use std::sync::Arc;
use uuid::Uuid;
use yol_core::{
    apply_seat_action, finish_trip, start_trip, start_warning, ActionOutcome, Clock, Identity, NewTrip,
    SeatAction, SeatNo, TripEnvelope, TripStatus, TripView,
};

/// Validates against the last confirmed view, sends the request, then
/// replaces the view with whatever the backend returned.
pub struct BookingService {
    backend: Arc<BackendClient>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(backend: Arc<BackendClient>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub async fn load(&self, trip_id: Uuid) -> Result<TripView, ClientError> {
        let endpoint = format!("/v1/trips/{trip_id}");
        let envelope = self.backend.get_trip(trip_id).await?;
        self.view_from(envelope, &endpoint)
    }

    /// Publish a new trip as the signed-in driver.
    pub async fn publish(&self, trip: &NewTrip) -> Result<TripView, ClientError> {
        trip.validate(self.clock.now(), chrono::Duration::zero())?;
        let envelope = self.backend.publish_trip(trip).await?;
        self.view_from(envelope, "/v1/trips")
    }

    /// Run a seat action and reconcile `view` with the backend's answer.
    ///
    /// Losing a race for a seat is reported as [`ActionOutcome::SeatTaken`],
    /// not as an error.
    pub async fn seat_action(
        &self,
        view: &mut TripView,
        seat_no: SeatNo,
        action: SeatAction,
    ) -> Result<ActionOutcome, ClientError> {
        let actor = self.identity().await?;
        apply_seat_action(&view.trip, &view.seats, &actor, seat_no, action, self.clock.now())?;

        let trip_id = view.trip.id;
        match self.backend.seat_action(trip_id, seat_no, action).await {
            Ok(envelope) => {
                self.replace(view, envelope, &format!("/v1/trips/{trip_id}/seats/{seat_no}/{action}"))?;
                Ok(view.outcome(&actor, seat_no, action))
            }
            Err(err) if action == SeatAction::Request && err.api_code().as_deref() == Some("seat_unavailable") => {
                // The seat moved under us; show the user who got it. Other
                // conflicts (locked trip, lifecycle moved on) pass through.
                tracing::info!(%trip_id, seat_no = seat_no.get(), "seat request conflicted, refreshing");
                let fresh = self.backend.get_trip(trip_id).await?;
                self.replace(view, fresh, &format!("/v1/trips/{trip_id}"))?;
                match view.outcome(&actor, seat_no, action) {
                    taken @ ActionOutcome::SeatTaken { .. } => Ok(taken),
                    _ => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Start the trip. With no booked passengers the caller must pass
    /// `confirmed = true` after showing the warning to the driver.
    pub async fn start_trip(&self, view: &mut TripView, confirmed: bool) -> Result<ActionOutcome, ClientError> {
        let actor = self.identity().await?;
        start_trip(&view.trip, &actor, self.clock.now())?;

        if let Some(warning) = start_warning(&view.seats) {
            if !confirmed {
                return Err(ClientError::ConfirmationRequired(warning));
            }
        }

        let trip_id = view.trip.id;
        let envelope = self.backend.start_trip(trip_id).await?;
        self.replace(view, envelope, &format!("/v1/trips/{trip_id}/start"))?;
        Ok(view.trip_outcome(TripStatus::InProgress))
    }

    pub async fn finish_trip(&self, view: &mut TripView) -> Result<ActionOutcome, ClientError> {
        let actor = self.identity().await?;
        finish_trip(&view.trip, &actor, self.clock.now())?;

        let trip_id = view.trip.id;
        let envelope = self.backend.finish_trip(trip_id).await?;
        self.replace(view, envelope, &format!("/v1/trips/{trip_id}/finish"))?;
        Ok(view.trip_outcome(TripStatus::Finished))
    }

    async fn identity(&self) -> Result<Identity, ClientError> {
        self.backend
            .session()
            .await
            .map(|s| s.identity())
            .ok_or(ClientError::Unauthenticated)
    }

    fn view_from(&self, envelope: TripEnvelope, endpoint: &str) -> Result<TripView, ClientError> {
        TripView::from_envelope(envelope, self.clock.now()).map_err(|source| ClientError::InvalidResponse {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn replace(&self, view: &mut TripView, envelope: TripEnvelope, endpoint: &str) -> Result<(), ClientError> {
        view.replace(envelope, self.clock.now())
            .map_err(|source| ClientError::InvalidResponse {
                endpoint: endpoint.to_string(),
                source,
            })
    }
}

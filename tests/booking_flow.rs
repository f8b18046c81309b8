use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use time::macros::datetime;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use salon_scheduling::booking::{BookingOutcome, BookingService, InMemoryScheduleStore, ScheduleStore};
use salon_scheduling::config::SchedulingConfig;
use salon_scheduling::db::models::{
    Appointment, AppointmentStatus, BlockedTime, BusinessHours, NewAppointment, NewBlockedTime,
};
use salon_scheduling::db::DatabaseError;
use salon_scheduling::error::SchedulingError;
use salon_scheduling::scheduling::ConflictKind;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salon_scheduling=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn service(store: Arc<InMemoryScheduleStore>) -> BookingService<InMemoryScheduleStore> {
    init_tracing();
    BookingService::new(store, SchedulingConfig::default())
}

fn request(provider_id: Uuid, client_id: Uuid, start: time::OffsetDateTime) -> NewAppointment {
    NewAppointment {
        provider_id,
        client_id,
        service_id: Uuid::new_v4(),
        duration_minutes: 30,
        start_time: start,
        notes: None,
    }
}

#[tokio::test]
async fn overlapping_provider_booking_is_rejected() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);
    let provider = Uuid::new_v4();

    let first = service
        .book(request(
            provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap();
    assert!(first.is_booked());

    let second = service
        .book(request(
            provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 10:15 UTC),
        ))
        .await
        .unwrap();
    match second {
        BookingOutcome::Rejected(conflicts) => {
            assert_eq!(conflicts[0].kind, ConflictKind::ProviderConflict);
        }
        other => panic!("expected provider conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn same_slot_for_a_free_provider_is_accepted() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);

    let busy_provider = Uuid::new_v4();
    service
        .book(request(
            busy_provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap();

    let outcome = service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-10 10:15 UTC),
        ))
        .await
        .unwrap();
    assert!(outcome.is_booked());
}

#[tokio::test]
async fn client_cannot_hold_two_overlapping_appointments() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);
    let client = Uuid::new_v4();

    service
        .book(request(
            Uuid::new_v4(),
            client,
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap();

    let outcome = service
        .book(request(
            Uuid::new_v4(),
            client,
            datetime!(2025-06-10 10:15 UTC),
        ))
        .await
        .unwrap();
    match outcome {
        BookingOutcome::Rejected(conflicts) => {
            assert_eq!(conflicts[0].kind, ConflictKind::ClientConflict);
        }
        other => panic!("expected client conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn blocked_time_rejection_names_the_block() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let provider = Uuid::new_v4();
    let block = store
        .add_blocked_time(NewBlockedTime {
            provider_id: provider,
            start_time: datetime!(2025-06-10 12:00 UTC),
            end_time: datetime!(2025-06-10 14:00 UTC),
            title: "Lunch".into(),
            all_day: false,
            created_by: Uuid::new_v4(),
        })
        .await;
    let service = service(store);

    let outcome = service
        .book(request(
            provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 13:00 UTC),
        ))
        .await
        .unwrap();
    match outcome {
        BookingOutcome::Rejected(conflicts) => {
            assert_eq!(conflicts[0].kind, ConflictKind::BlockedTime);
            assert_eq!(conflicts[0].source_id, block.id);
        }
        other => panic!("expected blocked-time conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn reschedule_does_not_collide_with_itself() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);
    let provider = Uuid::new_v4();

    let booked = match service
        .book(request(
            provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap()
    {
        BookingOutcome::Booked(appt) => appt,
        other => panic!("expected booking, got {other:?}"),
    };

    let outcome = service
        .reschedule(
            booked.id,
            datetime!(2025-06-10 10:15 UTC),
            datetime!(2025-06-10 10:45 UTC),
        )
        .await
        .unwrap();
    assert!(outcome.is_booked());
}

#[tokio::test]
async fn cancelled_slot_can_be_rebooked() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);
    let provider = Uuid::new_v4();

    let booked = match service
        .book(request(
            provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap()
    {
        BookingOutcome::Booked(appt) => appt,
        other => panic!("expected booking, got {other:?}"),
    };
    service.cancel(booked.id).await.unwrap();

    let outcome = service
        .book(request(
            provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap();
    assert!(outcome.is_booked());
}

#[tokio::test]
async fn completed_appointment_cannot_be_cancelled() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);

    let booked = match service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap()
    {
        BookingOutcome::Booked(appt) => appt,
        other => panic!("expected booking, got {other:?}"),
    };
    service.confirm(booked.id).await.unwrap();
    service.complete(booked.id).await.unwrap();

    let err = service.cancel(booked.id).await.unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::InvalidStatusTransition { .. }
    ));
}

#[tokio::test]
async fn business_hours_are_enforced_when_opted_in() {
    let store = Arc::new(InMemoryScheduleStore::new());
    store.set_business_hours(BusinessHours::default()).await;
    let service = BookingService::new(
        store,
        SchedulingConfig {
            enforce_business_hours: true,
            ..SchedulingConfig::default()
        },
    );

    // 2025-06-08 is a Sunday, closed under the default configuration.
    let outcome = service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-08 10:00 UTC),
        ))
        .await
        .unwrap();
    assert!(matches!(outcome, BookingOutcome::OutsideBusinessHours));

    // The exact closing instant is outside the half-open window.
    let at_close = service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-10 20:00 UTC),
        ))
        .await
        .unwrap();
    assert!(matches!(at_close, BookingOutcome::OutsideBusinessHours));

    let at_open = service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-10 08:00 UTC),
        ))
        .await
        .unwrap();
    assert!(at_open.is_booked());
}

#[tokio::test]
async fn missing_business_hours_fail_open() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = BookingService::new(
        store,
        SchedulingConfig {
            enforce_business_hours: true,
            ..SchedulingConfig::default()
        },
    );

    // No configuration saved: even a Sunday night booking goes through.
    let outcome = service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-08 23:00 UTC),
        ))
        .await
        .unwrap();
    assert!(outcome.is_booked());
}

#[tokio::test]
async fn suggest_slot_skips_the_conflicting_range() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);
    let provider = Uuid::new_v4();

    service
        .book(request(
            provider,
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap();

    let suggested = service
        .suggest_slot(provider, datetime!(2025-06-10 10:00 UTC), 30)
        .await
        .unwrap();
    assert_eq!(suggested, datetime!(2025-06-10 10:30 UTC));
}

#[tokio::test]
async fn suggest_slot_reports_no_slot_for_a_blocked_horizon() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let provider = Uuid::new_v4();
    // Block every day of the search horizon with all-day blocks.
    for offset in 0..7 {
        let day = datetime!(2025-06-10 00:00 UTC) + time::Duration::days(offset);
        store
            .add_blocked_time(NewBlockedTime {
                provider_id: provider,
                start_time: day,
                end_time: day + time::Duration::hours(1),
                title: "Closed".into(),
                all_day: true,
                created_by: Uuid::new_v4(),
            })
            .await;
    }
    let service = service(store);

    let err = service
        .suggest_slot(provider, datetime!(2025-06-10 08:00 UTC), 30)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NoSlotFound { .. }));
}

#[tokio::test]
async fn zero_duration_request_fails_validation() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = service(store);

    let mut req = request(
        Uuid::new_v4(),
        Uuid::new_v4(),
        datetime!(2025-06-10 10:00 UTC),
    );
    req.duration_minutes = 0;
    let err = service.book(req).await.unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));
}

/// Store whose appointment range scan fails a fixed number of times before
/// delegating to the in-memory store. Counts scan attempts.
struct FlakyStore {
    inner: InMemoryScheduleStore,
    failures_left: AtomicUsize,
    transient: bool,
    scan_attempts: AtomicUsize,
}

impl FlakyStore {
    fn failing(times: usize, transient: bool) -> Self {
        Self {
            inner: InMemoryScheduleStore::new(),
            failures_left: AtomicUsize::new(times),
            transient,
            scan_attempts: AtomicUsize::new(0),
        }
    }

    fn next_error(&self) -> Option<DatabaseError> {
        self.scan_attempts.fetch_add(1, Ordering::SeqCst);
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| {
                if self.transient {
                    DatabaseError::ConnectionError("connection reset".into())
                } else {
                    DatabaseError::InvalidInput("malformed row".into())
                }
            })
    }
}

#[async_trait]
impl ScheduleStore for FlakyStore {
    async fn appointments_in_range(
        &self,
        provider_id: Option<Uuid>,
        client_id: Option<Uuid>,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        if let Some(err) = self.next_error() {
            return Err(err);
        }
        self.inner
            .appointments_in_range(provider_id, client_id, from, to)
            .await
    }

    async fn blocked_times(&self, provider_id: Uuid) -> Result<Vec<BlockedTime>, DatabaseError> {
        self.inner.blocked_times(provider_id).await
    }

    async fn business_hours(&self) -> Result<Option<BusinessHours>, DatabaseError> {
        self.inner.business_hours().await
    }

    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, DatabaseError> {
        self.inner.insert_appointment(appointment).await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        self.inner.get_appointment(id).await
    }

    async fn reschedule_appointment(
        &self,
        id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Appointment, DatabaseError> {
        self.inner.reschedule_appointment(id, start, end).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, DatabaseError> {
        self.inner.update_status(id, status).await
    }
}

#[tokio::test]
async fn transient_fetch_failure_is_retried_until_booking_succeeds() {
    init_tracing();
    let store = Arc::new(FlakyStore::failing(1, true));
    let service = BookingService::new(store.clone(), SchedulingConfig::default());

    let outcome = service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap();
    assert!(outcome.is_booked());
    assert_eq!(store.scan_attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_transient_fetch_failure_surfaces_without_retry() {
    init_tracing();
    let store = Arc::new(FlakyStore::failing(usize::MAX, false));
    let service = BookingService::new(store.clone(), SchedulingConfig::default());

    let err = service
        .book(request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            datetime!(2025-06-10 10:00 UTC),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Database(DatabaseError::InvalidInput(_))
    ));
    assert_eq!(store.scan_attempts.load(Ordering::SeqCst), 1);
}

//! Store tests against a real PostgreSQL (one fresh database per test)

use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;

use rtt_booking::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        provider::{CreateProvider, ProviderQuery, UpdateProvider},
        quotation::{CreateQuotation, QuotationFilter},
        reservation::{CreateReservation, ReservationQuery},
        tracking::{CreateTrackingEvent, RequestContext},
        Pagination, ProviderType, QuotationStatus, ReservationStatus,
    },
    repository::Repository,
    services::{
        cache::{Cache, CacheKeys, MemoryCache},
        payments::{CapturedOrder, Order, OrderRequest, PaymentGateway},
        Services,
    },
};

/// Cache whose evictions always fail
struct UnavailableCache;

#[async_trait]
impl Cache for UnavailableCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Err(AppError::Internal("cache unavailable".to_string()))
    }
}

/// Gateway that completes every capture for a fixed reference
struct CompletingGateway {
    reference: String,
}

#[async_trait]
impl PaymentGateway for CompletingGateway {
    async fn create_order(&self, order: &OrderRequest) -> AppResult<Order> {
        Ok(Order {
            id: "8AB12345CD678901E".to_string(),
            status: "CREATED".to_string(),
            approve_url: Some(format!("https://pay.example/approve/{}", order.reference_id)),
        })
    }

    async fn capture_order(&self, order_id: &str) -> AppResult<CapturedOrder> {
        Ok(CapturedOrder {
            id: order_id.to_string(),
            status: "COMPLETED".to_string(),
            reference_id: Some(self.reference.clone()),
        })
    }
}

async fn reservation_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
        .fetch_one(pool)
        .await
        .unwrap()
}

fn services(pool: PgPool) -> (Services, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let services = Services::new(Repository::new(pool), &AppConfig::default(), cache.clone(), None);
    (services, cache)
}

fn booking(tour: &str, date: &str, passengers: usize) -> CreateReservation {
    let list: Vec<_> = (0..passengers)
        .map(|i| {
            json!({
                "document_type": "passport",
                "document_number": format!("p{:06}", i),
                "full_name": format!("Passenger {}", i),
                "gender": if i % 2 == 0 { "F" } else { "M" },
                "nationality": "Perú",
            })
        })
        .collect();
    serde_json::from_value(json!({
        "tour_name": tour,
        "tour_date": date,
        "price": "USD 150",
        "representative_name": "María Quispe",
        "email": "Maria@Example.com",
        "phone": "+51 984 000 111",
        "country": "Perú",
        "passenger_count": passengers.max(1),
        "language": "es",
        "passengers": list,
    }))
    .unwrap()
}

fn event(session: &str, event_type: &str, step: i32) -> CreateTrackingEvent {
    serde_json::from_value(json!({
        "session_id": session,
        "event_type": event_type,
        "step_number": step,
        "page_url": "https://rtt.example/tours/machu-picchu",
    }))
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn created_reservation_codes_are_unique(pool: PgPool) {
    let (services, _) = services(pool);
    let pattern = Regex::new(r"^RTT-\d{8}-[A-Z0-9]{4}$").unwrap();

    let mut codes = HashSet::new();
    for _ in 0..25 {
        let details = services
            .reservations
            .create(&booking("Machu Picchu Full Day", "2031-03-15", 1))
            .await
            .unwrap();
        assert!(pattern.is_match(&details.reservation.code));
        assert_eq!(details.reservation.status, ReservationStatus::Pending);
        codes.insert(details.reservation.code);
    }
    assert_eq!(codes.len(), 25);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn create_sanitizes_and_parses_price(pool: PgPool) {
    let (services, _) = services(pool);
    let mut request = booking("  <b>Valle   Sagrado</b> ", "2031-04-01", 2);
    request.price = "S/ 1,250.50".to_string();

    let details = services.reservations.create(&request).await.unwrap();
    let r = &details.reservation;
    assert_eq!(r.tour_name, "Valle Sagrado");
    assert_eq!(r.email, "maria@example.com");
    assert_eq!(r.price_amount, Decimal::new(125050, 2));
    assert_eq!(r.price_currency.as_str(), "PEN");
    assert_eq!(details.passengers.len(), 2);
    assert_eq!(details.passengers[0].document_number, "P000000");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn deleting_a_reservation_removes_its_passengers(pool: PgPool) {
    let (services, _) = services(pool.clone());
    let details = services
        .reservations
        .create(&booking("Rainbow Mountain", "2031-05-02", 3))
        .await
        .unwrap();
    let id = details.reservation.id;

    services.reservations.delete(id).await.unwrap();

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passengers WHERE reservation_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(left, 0);
    assert!(matches!(services.reservations.get(id).await, Err(AppError::NotFound(_))));
    assert!(matches!(services.reservations.delete(id).await, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn passengers_can_be_added_later(pool: PgPool) {
    let (services, _) = services(pool);
    let details = services
        .reservations
        .create(&booking("Rainbow Mountain", "2031-05-02", 1))
        .await
        .unwrap();

    let extra = booking("x", "2031-05-02", 2).passengers;
    let updated = services
        .reservations
        .add_passengers(details.reservation.id, &extra)
        .await
        .unwrap();
    assert_eq!(updated.passengers.len(), 3);

    assert!(matches!(
        services.reservations.add_passengers(999_999, &extra).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn aggregates_follow_writes(pool: PgPool) {
    let (services, cache) = services(pool);
    let keys = CacheKeys::new(&AppConfig::default().cache.prefix);

    let stats = services.reservations.stats().await.unwrap();
    assert_eq!(stats.total, 0);
    assert!(services.reservations.tours().await.unwrap().is_empty());
    assert!(cache.get(&keys.reservation_stats()).await.unwrap().is_some());
    assert!(cache.get(&keys.tours_list()).await.unwrap().is_some());

    let created = services
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 2))
        .await
        .unwrap();
    assert!(cache.get(&keys.reservation_stats()).await.unwrap().is_none());

    let stats = services.reservations.stats().await.unwrap();
    assert_eq!((stats.total, stats.pending, stats.confirmed), (1, 1, 0));
    assert_eq!(stats.this_month, 1);
    assert_eq!(services.reservations.tours().await.unwrap(), vec!["Machu Picchu Full Day"]);

    services
        .reservations
        .update_status(created.reservation.id, "confirmada")
        .await
        .unwrap();
    let stats = services.reservations.stats().await.unwrap();
    assert_eq!((stats.pending, stats.confirmed), (0, 1));

    services.reservations.delete(created.reservation.id).await.unwrap();
    assert_eq!(services.reservations.stats().await.unwrap().total, 0);
    assert!(services.reservations.tours().await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failed_invalidation_rolls_the_write_back(pool: PgPool) {
    let (healthy, _) = services(pool.clone());
    let existing = healthy
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 1))
        .await
        .unwrap();

    let broken = Services::new(
        Repository::new(pool.clone()),
        &AppConfig::default(),
        Arc::new(UnavailableCache),
        None,
    );

    let err = broken
        .reservations
        .create(&booking("Lago Titicaca", "2031-03-16", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
    assert_eq!(reservation_count(&pool).await, 1);
    let orphans: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM passengers WHERE reservation_id <> $1",
    )
    .bind(existing.reservation.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(orphans, 0);

    let id = existing.reservation.id;
    assert!(broken.reservations.update_status(id, "confirmada").await.is_err());
    assert_eq!(
        healthy.reservations.get(id).await.unwrap().reservation.status,
        ReservationStatus::Pending
    );

    assert!(broken.reservations.delete(id).await.is_err());
    assert!(healthy.reservations.get(id).await.is_ok());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn status_change_waits_for_concurrent_completion(pool: PgPool) {
    let (services, _) = services(pool);
    let services = Arc::new(services);
    let created = services
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 1))
        .await
        .unwrap();
    let id = created.reservation.id;

    // Another admin completes the reservation and holds the row until commit
    let mut tx = services.repository.reservations.begin().await.unwrap();
    services
        .repository
        .reservations
        .update_status(&mut tx, id, ReservationStatus::Completed)
        .await
        .unwrap();

    let racing = {
        let services = services.clone();
        tokio::spawn(async move { services.reservations.update_status(id, "pendiente").await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.commit().await.unwrap();

    let result = racing.await.unwrap();
    assert!(matches!(result, Err(AppError::BusinessRule(_))));
    assert_eq!(
        services.reservations.get(id).await.unwrap().reservation.status,
        ReservationStatus::Completed
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn unknown_status_changes_nothing(pool: PgPool) {
    let (services, _) = services(pool);
    let created = services
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 1))
        .await
        .unwrap();
    let id = created.reservation.id;

    let err = services.reservations.update_status(id, "bogus").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let stored = services.reservations.get(id).await.unwrap();
    assert_eq!(stored.reservation.status, ReservationStatus::Pending);
    assert_eq!(stored.reservation.updated_at, created.reservation.updated_at);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn terminal_status_is_locked_but_payment_wins(pool: PgPool) {
    let (services, _) = services(pool);
    let created = services
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 1))
        .await
        .unwrap();
    let id = created.reservation.id;

    services.reservations.update_status(id, "completada").await.unwrap();
    let err = services.reservations.update_status(id, "pendiente").await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));

    let paid = services
        .reservations
        .mark_paid_by_code(&created.reservation.code)
        .await
        .unwrap();
    assert_eq!(paid.status, ReservationStatus::Paid);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn list_pages_newest_first(pool: PgPool) {
    let (services, _) = services(pool);
    let mut ids = Vec::new();
    for i in 0..45 {
        let tour = if i % 3 == 0 { "Lago Titicaca" } else { "Machu Picchu Full Day" };
        let details = services
            .reservations
            .create(&booking(tour, "2031-03-15", 1))
            .await
            .unwrap();
        ids.push(details.reservation.id);
    }

    let filter = ReservationQuery::default().into_filter().unwrap();
    let page = services.reservations.list(&filter).await.unwrap();
    assert_eq!(page.total, 45);
    assert_eq!(page.page_count, 3);
    assert_eq!(page.items.len(), 20);
    let newest: Vec<i32> = ids.iter().rev().take(20).copied().collect();
    assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), newest);

    let last = ReservationQuery {
        page: Some(3),
        ..Default::default()
    };
    let page = services.reservations.list(&last.into_filter().unwrap()).await.unwrap();
    assert_eq!(page.items.len(), 5);

    let search = ReservationQuery {
        search: Some("titicaca".to_string()),
        per_page: Some(100),
        ..Default::default()
    };
    let page = services.reservations.list(&search.into_filter().unwrap()).await.unwrap();
    assert_eq!(page.total, 15);
    assert!(page.items.iter().all(|r| r.tour_name == "Lago Titicaca"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn calendar_groups_by_tour_date(pool: PgPool) {
    let (services, _) = services(pool);
    services
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 2))
        .await
        .unwrap();
    services
        .reservations
        .create(&booking("Lago Titicaca", "2031-03-15", 1))
        .await
        .unwrap();
    let confirmed = services
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 3))
        .await
        .unwrap();
    services
        .reservations
        .update_status(confirmed.reservation.id, "confirmada")
        .await
        .unwrap();
    services
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-04-20", 1))
        .await
        .unwrap();

    let from = chrono::NaiveDate::from_ymd_opt(2031, 3, 1).unwrap();
    let to = chrono::NaiveDate::from_ymd_opt(2031, 3, 31).unwrap();
    let days = services.reservations.calendar(from, to).await.unwrap();
    assert_eq!(days.len(), 1);

    let day = &days[0];
    assert_eq!(day.tour_date, chrono::NaiveDate::from_ymd_opt(2031, 3, 15).unwrap());
    assert_eq!(day.total_reservations, 3);
    assert_eq!(day.total_passengers, 6);
    assert_eq!((day.pending, day.confirmed, day.paid), (2, 1, 0));
    assert_eq!(day.tour_names, "Lago Titicaca|Machu Picchu Full Day");

    let detail = services
        .reservations
        .day(chrono::NaiveDate::from_ymd_opt(2031, 3, 15).unwrap())
        .await
        .unwrap();
    assert_eq!(detail.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn pending_alerts_cover_the_window(pool: PgPool) {
    let (services, _) = services(pool);
    let today = chrono::Utc::now().date_naive();
    let in_three = (today + chrono::Duration::days(3)).to_string();
    let in_twenty = (today + chrono::Duration::days(20)).to_string();

    services.reservations.create(&booking("Soon", &in_three, 1)).await.unwrap();
    services.reservations.create(&booking("Later", &in_twenty, 1)).await.unwrap();

    let alerts = services.reservations.pending_alerts(None).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].tour_name, "Soon");
    assert_eq!(alerts[0].days_remaining, 3);

    assert_eq!(services.reservations.pending_alerts(Some(30)).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn quotation_costs_survive_storage(pool: PgPool) {
    let (services, _) = services(pool);
    let request: CreateQuotation = serde_json::from_value(json!({
        "client_name": "Hiro Tanaka",
        "client_email": "hiro@example.jp",
        "tour_name": "Inca Trail 4D",
        "passenger_count": 3,
        "unit_price": "150.00",
        "discount_value": "4",
        "discount_kind": "percentage",
        "costs": [
            {"concept": "Guía", "amount": "120.00"},
            {"concept": "Tren", "amount": "110.50"}
        ]
    }))
    .unwrap();

    let created = services.quotations.create(7, &request).await.unwrap();
    assert_eq!(created.quotation.total_price, Decimal::new(43200, 2));
    assert_eq!(created.effective_status, QuotationStatus::Draft);

    let stored = services.quotations.get(created.quotation.id, Some(7)).await.unwrap();
    assert_eq!(stored.quotation.costs.0, created.quotation.costs.0);
    assert_eq!(stored.quotation.costs.0[0].concept, "Guía");
    assert_eq!(stored.cost_total, Decimal::new(23050, 2));
    assert_eq!(stored.margin, Decimal::new(20150, 2));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn sellers_only_reach_their_quotations(pool: PgPool) {
    let (services, _) = services(pool);
    let request: CreateQuotation = serde_json::from_value(json!({
        "client_name": "Ana Ruiz",
        "client_email": "ana@example.com",
        "tour_name": "Valle Sagrado",
        "passenger_count": 2,
        "unit_price": "120"
    }))
    .unwrap();
    let mine = services.quotations.create(1, &request).await.unwrap();
    services.quotations.create(2, &request).await.unwrap();

    assert!(matches!(
        services.quotations.get(mine.quotation.id, Some(2)).await,
        Err(AppError::NotFound(_))
    ));
    assert!(services.quotations.get(mine.quotation.id, None).await.is_ok());
    assert!(matches!(
        services.quotations.delete(mine.quotation.id, Some(2)).await,
        Err(AppError::NotFound(_))
    ));

    let filter = QuotationFilter {
        seller_id: Some(1),
        pagination: Pagination::default(),
        ..Default::default()
    };
    assert_eq!(services.quotations.list(&filter).await.unwrap().total, 1);

    let stats = services.quotations.seller_stats(Some(1)).await.unwrap();
    assert_eq!((stats.total, stats.draft), (1, 1));
    assert_eq!(services.quotations.seller_stats(None).await.unwrap().total, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn stale_quotations_read_as_expired(pool: PgPool) {
    let (services, _) = services(pool.clone());
    let request: CreateQuotation = serde_json::from_value(json!({
        "client_name": "Ana Ruiz",
        "client_email": "ana@example.com",
        "tour_name": "Valle Sagrado",
        "passenger_count": 2,
        "unit_price": "120",
        "validity_days": 5
    }))
    .unwrap();
    let created = services.quotations.create(1, &request).await.unwrap();

    sqlx::query("UPDATE quotations SET created_at = NOW() - INTERVAL '6 days' WHERE id = $1")
        .bind(created.quotation.id)
        .execute(&pool)
        .await
        .unwrap();

    let view = services.quotations.get(created.quotation.id, None).await.unwrap();
    assert_eq!(view.quotation.status, QuotationStatus::Draft);
    assert_eq!(view.effective_status, QuotationStatus::Expired);

    let expired = QuotationFilter {
        status: Some(QuotationStatus::Expired),
        ..Default::default()
    };
    assert_eq!(services.quotations.list(&expired).await.unwrap().total, 1);
    let drafts = QuotationFilter {
        status: Some(QuotationStatus::Draft),
        ..Default::default()
    };
    assert_eq!(services.quotations.list(&drafts).await.unwrap().total, 0);

    let stats = services.quotations.seller_stats(None).await.unwrap();
    assert_eq!((stats.draft, stats.expired), (0, 1));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn conversion_rate_counts_distinct_sessions(pool: PgPool) {
    let (services, _) = services(pool);
    for i in 0..10 {
        let session = format!("s{}", i);
        services
            .tracking
            .record(&event(&session, "form_open", 1), RequestContext::default())
            .await
            .unwrap();
        // A second open of the same session must not count twice
        services
            .tracking
            .record(&event(&session, "form_open", 1), RequestContext::default())
            .await
            .unwrap();
        if i < 3 {
            services
                .tracking
                .record(&event(&session, "form_submit", 4), RequestContext::default())
                .await
                .unwrap();
        }
    }

    let stats = services.tracking.stats(None).await.unwrap();
    assert_eq!(stats.conversion.opens, 10);
    assert_eq!(stats.conversion.submits, 3);
    assert_eq!(stats.conversion.rate, 30.0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn funnel_and_abandonment_by_step(pool: PgPool) {
    let (services, _) = services(pool);
    let ctx = || RequestContext {
        client_ip: Some("203.0.113.7".to_string()),
        user_agent: Some("Mozilla/5.0".to_string()),
    };

    // Only opened the form
    services.tracking.record(&event("a", "form_open", 0), ctx()).await.unwrap();
    // Reached step 2
    services.tracking.record(&event("b", "form_open", 1), ctx()).await.unwrap();
    services.tracking.record(&event("b", "step_view", 2), ctx()).await.unwrap();
    // Completed
    services.tracking.record(&event("c", "step_view", 1), ctx()).await.unwrap();
    services.tracking.record(&event("c", "step_view", 2), ctx()).await.unwrap();
    services.tracking.record(&event("c", "form_submit", 3), ctx()).await.unwrap();

    let stats = services.tracking.stats(Some(7)).await.unwrap();

    let funnel: Vec<(i32, i64)> = stats.funnel.iter().map(|s| (s.step_number, s.sessions)).collect();
    assert_eq!(funnel, vec![(1, 2), (2, 2), (3, 1)]);

    let abandoned: Vec<(i32, i64)> = stats
        .abandonment_by_step
        .iter()
        .map(|s| (s.step_number, s.sessions))
        .collect();
    assert_eq!(abandoned, vec![(1, 1), (2, 1)]);

    assert_eq!(stats.recent_abandoned_sessions.len(), 2);
    assert_eq!(stats.top_entry_pages[0].sessions, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn purge_drops_only_old_events(pool: PgPool) {
    let (services, _) = services(pool.clone());
    services
        .tracking
        .record(&event("old", "form_open", 1), RequestContext::default())
        .await
        .unwrap();
    sqlx::query("UPDATE tracking_events SET created_at = NOW() - INTERVAL '120 days'")
        .execute(&pool)
        .await
        .unwrap();
    services
        .tracking
        .record(&event("new", "form_open", 1), RequestContext::default())
        .await
        .unwrap();

    let result = services.tracking.purge(None).await.unwrap();
    assert_eq!(result.deleted, 1);

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracking_events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(left, 1);
}

fn provider(kind: &str, name: &str, active: bool) -> CreateProvider {
    serde_json::from_value(json!({
        "provider_type": kind,
        "name": name,
        "contact_name": "Rosa Huamán",
        "phone": "+51 984 222 333",
        "email": "Rosa@Example.pe",
        "base_cost": "80.00",
        "currency": "PEN",
        "active": active,
        "notes": "Solo fines de semana",
    }))
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn provider_catalog_filters(pool: PgPool) {
    let (services, _) = services(pool);
    let guide = services
        .providers
        .create(&provider("guia", "Juan Mamani", true))
        .await
        .unwrap();
    assert_eq!(guide.provider_type, ProviderType::Guide);
    assert_eq!(guide.email.as_deref(), Some("rosa@example.pe"));
    assert_eq!(guide.base_cost, Decimal::new(8000, 2));

    services
        .providers
        .create(&provider("transporte", "Cusco Bus", true))
        .await
        .unwrap();
    services
        .providers
        .create(&provider("hotel", "Hostal Inti", false))
        .await
        .unwrap();

    let fetched = services.providers.get(guide.id).await.unwrap();
    assert_eq!(fetched.name, "Juan Mamani");

    let all = services.providers.list(&ProviderQuery::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let guides = ProviderQuery {
        provider_type: Some(ProviderType::Guide),
        ..Default::default()
    };
    let found = services.providers.list(&guides).await.unwrap();
    assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![guide.id]);

    let inactive = ProviderQuery {
        active: Some(false),
        ..Default::default()
    };
    let found = services.providers.list(&inactive).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].provider_type, ProviderType::Hotel);

    let search = ProviderQuery {
        search: Some("bus".to_string()),
        ..Default::default()
    };
    let found = services.providers.list(&search).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Cusco Bus");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn provider_update_and_delete(pool: PgPool) {
    let (services, _) = services(pool);
    let created = services
        .providers
        .create(&provider("entrada", "Boleto Turístico", true))
        .await
        .unwrap();

    let update = UpdateProvider {
        provider_type: Some(ProviderType::Other),
        contact_name: Some("  ".to_string()),
        notes: Some("".to_string()),
        active: Some(false),
        ..Default::default()
    };
    let updated = services.providers.update(created.id, &update).await.unwrap();
    assert_eq!(updated.provider_type, ProviderType::Other);
    assert_eq!(updated.contact_name, None);
    assert_eq!(updated.notes, None);
    assert!(!updated.active);
    // Untouched fields survive
    assert_eq!(updated.phone, created.phone);
    assert_eq!(updated.base_cost, created.base_cost);

    assert!(matches!(
        services.providers.update(999_999, &update).await,
        Err(AppError::NotFound(_))
    ));

    services.providers.delete(created.id).await.unwrap();
    assert!(matches!(services.providers.get(created.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(services.providers.delete(created.id).await, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn quotation_send_needs_email(pool: PgPool) {
    let (services, _) = services(pool);
    let request: CreateQuotation = serde_json::from_value(json!({
        "client_name": "Ana Ruiz",
        "client_email": "ana@example.com",
        "tour_name": "Valle Sagrado",
        "passenger_count": 2,
        "unit_price": "120"
    }))
    .unwrap();
    let created = services.quotations.create(1, &request).await.unwrap();

    let err = services
        .quotations
        .send(created.quotation.id, Some(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let stored = services.quotations.get(created.quotation.id, None).await.unwrap();
    assert_eq!(stored.quotation.status, QuotationStatus::Draft);
    assert_eq!(stored.quotation.sent_at, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn captured_payments_route_by_code(pool: PgPool) {
    let (plain, _) = services(pool.clone());
    let reservation = plain
        .reservations
        .create(&booking("Machu Picchu Full Day", "2031-03-15", 1))
        .await
        .unwrap();
    let request: CreateQuotation = serde_json::from_value(json!({
        "client_name": "Ana Ruiz",
        "client_email": "ana@example.com",
        "tour_name": "Valle Sagrado",
        "passenger_count": 2,
        "unit_price": "120"
    }))
    .unwrap();
    let quotation = plain.quotations.create(1, &request).await.unwrap();

    let with_gateway = |reference: &str| {
        Services::new(
            Repository::new(pool.clone()),
            &AppConfig::default(),
            Arc::new(MemoryCache::new()),
            Some(Arc::new(CompletingGateway {
                reference: reference.to_string(),
            })),
        )
    };

    let services = with_gateway(&quotation.quotation.code);
    let order = services.payments.create_order(&quotation.quotation.code).await.unwrap();
    let result = services.payments.capture_order(&order.id).await.unwrap();
    assert_eq!(result.target, "quotation");
    let stored = plain.quotations.get(quotation.quotation.id, None).await.unwrap();
    assert_eq!(stored.quotation.status, QuotationStatus::Accepted);
    assert!(stored.quotation.accepted_at.is_some());

    let services = with_gateway(&reservation.reservation.code);
    let result = services.payments.capture_order("8AB12345CD678901E").await.unwrap();
    assert_eq!(result.target, "reservation");
    let stored = plain.reservations.get(reservation.reservation.id).await.unwrap();
    assert_eq!(stored.reservation.status, ReservationStatus::Paid);
}

//! Revenue Aggregator.
//!
//! Read-only and recomputed on every call. Only orders whose status counts
//! toward revenue contribute, see
//! [`OrderStatus::REVENUE`](crate::domain::aggregates::OrderStatus::REVENUE).

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::{RevenueRow, Store, TimeWindow};
use crate::{EcommerceError, Result};

/// Most recent buckets returned by analytics.
pub const MAX_BUCKETS: usize = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// `YYYY-MM-DD`, ISO `YYYY-Www` or `YYYY-MM`. Labels sort in time order.
    pub fn label(&self, at: DateTime<Utc>) -> String {
        match self {
            Self::Daily => at.format("%Y-%m-%d").to_string(),
            Self::Weekly => {
                let week = at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Monthly => at.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for Period {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EcommerceError::Validation(format!("unknown period '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RevenueBucket {
    pub revenue: Decimal,
    pub orders: i64,
    pub average: Decimal,
}

impl RevenueBucket {
    fn add(&mut self, amount: Decimal) {
        self.revenue += amount;
        self.orders += 1;
        self.average = (self.revenue / Decimal::from(self.orders)).round_dp(2);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RevenueSummary {
    pub today: RevenueBucket,
    /// Rolling seven days up to the end of today.
    pub week: RevenueBucket,
    pub month: RevenueBucket,
    pub total: RevenueBucket,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RevenuePoint {
    pub date: String,
    #[serde(flatten)]
    pub bucket: RevenueBucket,
}

#[derive(Clone)]
pub struct RevenueService {
    store: Arc<dyn Store>,
}

impl RevenueService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn summary(&self, month: Option<u32>, year: Option<i32>) -> Result<RevenueSummary> {
        self.summary_at(Utc::now(), month, year).await
    }

    pub async fn summary_at(&self, now: DateTime<Utc>, month: Option<u32>, year: Option<i32>) -> Result<RevenueSummary> {
        let month_window = month_window(year.unwrap_or(now.year()), month.unwrap_or(now.month()))?;
        let rows = self.store.revenue_rows(None).await?;
        Ok(summarize(&rows, now, month_window))
    }

    pub async fn analytics(&self, period: Period, month: Option<u32>, year: Option<i32>) -> Result<Vec<RevenuePoint>> {
        self.analytics_at(Utc::now(), period, month, year).await
    }

    pub async fn analytics_at(&self, now: DateTime<Utc>, period: Period, month: Option<u32>, year: Option<i32>) -> Result<Vec<RevenuePoint>> {
        let window = resolve_window(now, month, year)?;
        let rows = self.store.revenue_rows(window).await?;
        Ok(bucketize(&rows, period))
    }
}

/// `month`+`year` is that month, `month` alone is that month this year,
/// `year` alone is that whole year, neither is unbounded.
pub fn resolve_window(now: DateTime<Utc>, month: Option<u32>, year: Option<i32>) -> Result<Option<TimeWindow>> {
    match (month, year) {
        (Some(m), y) => month_window(y.unwrap_or(now.year()), m).map(Some),
        (None, Some(y)) => Ok(Some(TimeWindow { start: start_of(y, 1)?, end: start_of(following_year(y)?, 1)? })),
        (None, None) => Ok(None),
    }
}

fn month_window(year: i32, month: u32) -> Result<TimeWindow> {
    if !(1..=12).contains(&month) {
        return Err(EcommerceError::Validation(format!("month must be between 1 and 12, got {month}")));
    }
    let (next_year, next_month) = if month == 12 { (following_year(year)?, 1) } else { (year, month + 1) };
    Ok(TimeWindow { start: start_of(year, month)?, end: start_of(next_year, next_month)? })
}

fn following_year(year: i32) -> Result<i32> {
    year.checked_add(1).ok_or_else(|| EcommerceError::Validation(format!("year {year} is out of range")))
}

fn start_of(year: i32, month: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| EcommerceError::Validation(format!("year {year} is out of range")))
}

fn summarize(rows: &[RevenueRow], now: DateTime<Utc>, month: TimeWindow) -> RevenueSummary {
    let today_start = Utc.from_utc_datetime(&now.date_naive().and_time(chrono::NaiveTime::MIN));
    let today = TimeWindow { start: today_start, end: today_start + Duration::days(1) };
    let week = TimeWindow { start: now - Duration::days(7), end: today.end };

    let mut summary = RevenueSummary::default();
    for row in rows.iter().filter(|r| r.status.counts_toward_revenue()) {
        summary.total.add(row.total_amount);
        if today.contains(row.created_at) { summary.today.add(row.total_amount); }
        if week.contains(row.created_at) { summary.week.add(row.total_amount); }
        if month.contains(row.created_at) { summary.month.add(row.total_amount); }
    }
    summary
}

/// Newest bucket first, at most [`MAX_BUCKETS`].
fn bucketize(rows: &[RevenueRow], period: Period) -> Vec<RevenuePoint> {
    let mut buckets: BTreeMap<String, RevenueBucket> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.status.counts_toward_revenue()) {
        buckets.entry(period.label(row.created_at)).or_default().add(row.total_amount);
    }
    buckets.into_iter().rev().take(MAX_BUCKETS)
        .map(|(date, bucket)| RevenuePoint { date, bucket })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CustomerInfo, DraftItem, NewProduct, OrderDraft, OrderStatus};
    use crate::domain::value_objects::{OrderNumber, Quantity, SessionId};
    use crate::store::{CatalogStore, MemoryStore};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap() }

    fn row(created_at: DateTime<Utc>, cents: i64, status: OrderStatus) -> RevenueRow {
        RevenueRow { created_at, total_amount: Decimal::new(cents, 2), status }
    }

    #[test]
    fn test_labels() {
        let t = at(2021, 1, 3, 12);
        assert_eq!(Period::Daily.label(t), "2021-01-03");
        // Jan 3rd 2021 still belongs to ISO week 53 of 2020.
        assert_eq!(Period::Weekly.label(t), "2020-W53");
        assert_eq!(Period::Monthly.label(t), "2021-01");
    }

    #[test]
    fn test_excluded_statuses_never_count() {
        let now = at(2026, 10, 18, 15);
        let rows = vec![
            row(at(2026, 10, 18, 9), 5000, OrderStatus::Processing),
            row(at(2026, 10, 18, 10), 10000, OrderStatus::Cancelled),
            row(at(2026, 10, 18, 11), 7000, OrderStatus::Pending),
        ];
        let month = month_window(2026, 10).unwrap();
        let summary = summarize(&rows, now, month);
        for bucket in [summary.today, summary.week, summary.month, summary.total] {
            assert_eq!(bucket.revenue, Decimal::new(5000, 2));
            assert_eq!(bucket.orders, 1);
        }
        let points = bucketize(&rows, Period::Daily);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].bucket.revenue, Decimal::new(5000, 2));
    }

    #[test]
    fn test_summary_windows() {
        let now = at(2026, 10, 18, 15);
        let rows = vec![
            row(at(2026, 10, 18, 1), 1000, OrderStatus::Delivered),
            row(at(2026, 10, 13, 1), 2000, OrderStatus::Shipped),
            row(at(2026, 10, 2, 1), 4000, OrderStatus::Processing),
            row(at(2026, 9, 30, 23), 8000, OrderStatus::Delivered),
        ];
        let summary = summarize(&rows, now, month_window(2026, 10).unwrap());
        assert_eq!(summary.today.revenue, Decimal::new(1000, 2));
        assert_eq!(summary.week.revenue, Decimal::new(3000, 2));
        assert_eq!(summary.month.revenue, Decimal::new(7000, 2));
        assert_eq!(summary.total.orders, 4);
        assert_eq!(summary.total.average, Decimal::new(3750, 2));

        let september = summarize(&rows, now, month_window(2026, 9).unwrap());
        assert_eq!(september.month.revenue, Decimal::new(8000, 2));
    }

    #[test]
    fn test_empty_bucket_average_is_zero() {
        let summary = summarize(&[], at(2026, 1, 1, 0), month_window(2026, 1).unwrap());
        assert_eq!(summary.today, RevenueBucket::default());
        assert_eq!(summary.today.average, Decimal::ZERO);
    }

    #[test]
    fn test_bucketize_orders_desc_and_limits() {
        let start = at(2026, 1, 1, 12);
        let rows: Vec<_> = (0..40).map(|d| row(start + Duration::days(d), 100, OrderStatus::Delivered)).collect();
        let points = bucketize(&rows, Period::Daily);
        assert_eq!(points.len(), MAX_BUCKETS);
        assert_eq!(points[0].date, "2026-02-09");
        assert!(points.windows(2).all(|w| w[0].date > w[1].date));

        let monthly = bucketize(&rows, Period::Monthly);
        assert_eq!(monthly.iter().map(|p| p.date.as_str()).collect::<Vec<_>>(), vec!["2026-02", "2026-01"]);
        assert_eq!(monthly[1].bucket.orders, 31);
    }

    #[test]
    fn test_resolve_window() {
        let now = at(2026, 10, 18, 0);
        assert_eq!(resolve_window(now, None, None).unwrap(), None);

        let feb = resolve_window(now, Some(2), Some(2024)).unwrap().unwrap();
        assert_eq!((feb.start, feb.end), (at(2024, 2, 1, 0), at(2024, 3, 1, 0)));

        let dec = resolve_window(now, Some(12), None).unwrap().unwrap();
        assert_eq!((dec.start, dec.end), (at(2026, 12, 1, 0), at(2027, 1, 1, 0)));

        let year = resolve_window(now, None, Some(2025)).unwrap().unwrap();
        assert_eq!((year.start, year.end), (at(2025, 1, 1, 0), at(2026, 1, 1, 0)));

        assert!(matches!(resolve_window(now, Some(13), None), Err(EcommerceError::Validation(_))));
        assert!(matches!(resolve_window(now, Some(0), Some(2026)), Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_last_representable_year_is_rejected() {
        let revenue = RevenueService::new(Arc::new(MemoryStore::new()));
        let now = at(2026, 10, 18, 0);
        assert!(matches!(revenue.summary_at(now, Some(12), Some(i32::MAX)).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(
            revenue.analytics_at(now, Period::Daily, Some(12), Some(i32::MAX)).await,
            Err(EcommerceError::Validation(_))
        ));
        assert!(matches!(resolve_window(now, None, Some(i32::MAX)), Err(EcommerceError::Validation(_))));
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("Weekly".parse::<Period>().unwrap(), Period::Weekly);
        assert!("hourly".parse::<Period>().is_err());
    }

    #[tokio::test]
    async fn test_summary_against_store() {
        use crate::store::OrderStore;

        let store = Arc::new(MemoryStore::new());
        let product = store.create_product(NewProduct { name: "Lamp".into(), price: Decimal::new(5000, 2), ..Default::default() }).await.unwrap();
        let session = SessionId::parse("s").unwrap();
        let mut ids = vec![];
        for (number, qty) in [("ORD-1", 1), ("ORD-2", 2)] {
            let draft = OrderDraft::new(OrderNumber::from_raw(number), CustomerInfo::default(), vec![DraftItem {
                product_id: product.id, name: "Lamp".into(), image: None,
                quantity: Quantity::new(qty).unwrap(), price: product.price, size: None, color: None,
            }]).unwrap();
            ids.push(store.place_order(&session, &draft).await.unwrap().order_id);
        }
        store.set_order_status(ids[0], OrderStatus::Pending, OrderStatus::Processing).await.unwrap();
        store.set_order_status(ids[1], OrderStatus::Pending, OrderStatus::Cancelled).await.unwrap();

        let revenue = RevenueService::new(store);
        let summary = revenue.summary(None, None).await.unwrap();
        assert_eq!(summary.today.revenue, Decimal::new(5000, 2));
        assert_eq!(summary.today.orders, 1);
        assert_eq!(summary.total.revenue, Decimal::new(5000, 2));

        let points = revenue.analytics(Period::Monthly, None, None).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].bucket.orders, 1);
    }
}

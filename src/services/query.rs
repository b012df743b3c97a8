//! Filtered, paginated reads over stored records.

use crate::db::models::{RecordFilter, RecordOrder, WeatherRecord};
use crate::db::WeatherStore;
use crate::errors::AppError;
use crate::helpers::parse_day;

/// Fixed page size for list reads.
pub const PAGE_SIZE: i64 = 10;

/// Raw list parameters as received from the client. Empty strings count
/// as absent.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<String>,
    pub q: Option<String>,
    pub date: Option<String>,
    pub country: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordPage {
    pub items: Vec<WeatherRecord>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Page numbers below 1 (or unparseable) are clamped to 1.
pub fn clamp_page(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .max(1)
}

impl ListParams {
    pub fn filter(&self) -> Result<RecordFilter, AppError> {
        let day = match non_empty(&self.date) {
            Some(raw) => Some(
                parse_day(raw)
                    .ok_or_else(|| AppError::ValidationFailed(format!("Invalid date: {}", raw)))?,
            ),
            None => None,
        };

        Ok(RecordFilter {
            text: non_empty(&self.q).map(str::to_lowercase),
            day,
            country: non_empty(&self.country).map(str::to_uppercase),
        })
    }

    pub fn order(&self) -> RecordOrder {
        RecordOrder::parse(non_empty(&self.order))
    }

    pub fn page(&self) -> i64 {
        clamp_page(non_empty(&self.page))
    }
}

/// Run the page query and the count query with the same filter.
///
/// The two reads are separate round trips; under concurrent writes `total`
/// may lag or lead `items` by the writes that landed in between.
pub async fn query_records(
    store: &dyn WeatherStore,
    params: &ListParams,
) -> Result<RecordPage, AppError> {
    let filter = params.filter()?;
    let order = params.order();
    let page = params.page();
    let offset = (page - 1).saturating_mul(PAGE_SIZE);

    let items = store.list(&filter, order, PAGE_SIZE, offset).await?;
    let total = store.count(&filter).await?;

    tracing::debug!(
        "Listed {} of {} records (page {}, filter {:?}, order {:?})",
        items.len(),
        total,
        page,
        filter,
        order
    );

    Ok(RecordPage {
        items,
        total,
        page,
        per_page: PAGE_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::models::NewWeatherRecord;
    use crate::helpers::parse_datetime;

    fn draft(city: &str, country: &str, date: &str) -> NewWeatherRecord {
        NewWeatherRecord {
            city: city.to_string(),
            country: country.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            date: parse_datetime(date).unwrap(),
            temperature: 15.0,
            precipitation: 0.0,
            wind_speed: 1.0,
            weathercode: None,
            humidity: None,
            sunrise: None,
            sunset: None,
            hourly_data: None,
            daily_forecast: None,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "page" => p.page = v,
                "q" => p.q = v,
                "date" => p.date = v,
                "country" => p.country = v,
                "order" => p.order = v,
                _ => unreachable!(),
            }
        }
        p
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for day in 1..=25 {
            store
                .insert(&draft("Paris", "FR", &format!("2025-05-{:02}T12:00:00", day)))
                .await
                .unwrap();
        }
        store
            .insert(&draft("Berlin", "DE", "2025-05-09T23:59:59"))
            .await
            .unwrap();
        store
            .insert(&draft("Parma", "IT", "2025-05-10T00:00:00"))
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some("0")), 1);
        assert_eq!(clamp_page(Some("-4")), 1);
        assert_eq!(clamp_page(Some("abc")), 1);
        assert_eq!(clamp_page(Some("3")), 3);
    }

    #[test]
    fn test_filter_normalizes_inputs() {
        let filter = params(&[("q", "PAR"), ("country", " fr "), ("date", "")])
            .filter()
            .unwrap();
        assert_eq!(filter.text.as_deref(), Some("par"));
        assert_eq!(filter.country.as_deref(), Some("FR"));
        assert_eq!(filter.day, None);
    }

    #[test]
    fn test_invalid_date_is_validation_error() {
        let err = params(&[("date", "09/05/2025")]).filter().unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_date_filter_is_day_window() {
        let store = seeded().await;

        let page = query_records(&store, &params(&[("date", "2025-05-09"), ("q", "berlin")]))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].city, "Berlin");

        let page = query_records(&store, &params(&[("date", "2025-05-10"), ("q", "berlin")]))
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_count_matches_items_across_pages() {
        let store = seeded().await;
        let base = [("q", "par")];

        let first = query_records(&store, &params(&base)).await.unwrap();
        assert_eq!(first.total, 26);
        assert_eq!(first.per_page, PAGE_SIZE);

        let mut seen = 0;
        let mut ids = std::collections::HashSet::new();
        for page in 1..=3 {
            let page_str = page.to_string();
            let result = query_records(&store, &params(&[("q", "par"), ("page", &page_str)]))
                .await
                .unwrap();
            assert_eq!(result.total, first.total);
            seen += result.items.len();
            ids.extend(result.items.iter().map(|r| r.id));
        }
        assert_eq!(seen as i64, first.total);
        assert_eq!(ids.len(), seen);
    }

    #[tokio::test]
    async fn test_country_filter_applies_to_count() {
        let store = seeded().await;
        let page = query_records(&store, &params(&[("q", "par"), ("country", "it")]))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].city, "Parma");
    }

    #[tokio::test]
    async fn test_page_below_one_is_first_page() {
        let store = seeded().await;
        let page = query_records(&store, &params(&[("page", "-2")])).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len() as i64, PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_date_order_and_unknown_order() {
        let store = seeded().await;
        let asc = query_records(&store, &params(&[("order", "date_asc")]))
            .await
            .unwrap();
        assert_eq!(asc.items[0].date, parse_datetime("2025-05-01T12:00:00").unwrap());

        let fallback = query_records(&store, &params(&[("order", "sideways")]))
            .await
            .unwrap();
        let mut sorted = fallback.items.clone();
        sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let expected: Vec<_> = sorted.iter().map(|r| r.updated_at).collect();
        let actual: Vec<_> = fallback.items.iter().map(|r| r.updated_at).collect();
        assert_eq!(actual, expected);
    }
}

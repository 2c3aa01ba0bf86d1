#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use business_dates::{
        BusinessDateEngine, HolidayCache, HttpHolidaySource, ScheduleCalendar, ServiceConfig,
        TimeZoneConverter, http_api,
    };
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = ServiceConfig::from_env()?;
    let calendar = ScheduleCalendar::new(config.work_schedule, TimeZoneConverter::bogota())?;
    let source = HttpHolidaySource::new(&config.holiday_api_url, config.holiday_timeout)?;
    let cache = Arc::new(HolidayCache::new(source, config.cache_ttl()));
    let engine = BusinessDateEngine::new(calendar, cache);

    tracing::info!(
        holiday_api = %config.holiday_api_url,
        cache_ttl_minutes = config.cache_ttl_minutes,
        "starting business-dates"
    );
    http_api::serve(config.bind_addr, engine).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}

use business_dates::{
    BusinessDateEngine, CalculationRequest, FileHolidaySource, HolidayCache, HolidaySource,
    HttpHolidaySource, ScheduleCalendar, ServiceConfig, TimeZoneConverter,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("Commands:");
    println!("  calc <days> <hours> [date]   add business days/hours to date (ISO 8601 UTC, default now)");
    println!("  holidays [year]              list holidays, optionally for one year");
    println!("  cache                        show holiday cache status");
    println!("  clear                        drop the cached holiday list");
    println!("  help                         show this help");
    println!("  quit | exit                  leave");
}

fn format_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_count(raw: &str) -> Option<u32> {
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        None
    }
}

fn run<S: HolidaySource>(engine: BusinessDateEngine<S>, runtime: Runtime) {
    let tz = *engine.calendar().timezone();
    println!("Business Dates (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "calc" => {
                let (days_s, hours_s) = match (parts.next(), parts.next()) {
                    (Some(d), Some(h)) => (d, h),
                    _ => {
                        println!("Usage: calc <days> <hours> [date]");
                        continue;
                    }
                };
                let (Some(days), Some(hours)) = (parse_count(days_s), parse_count(hours_s)) else {
                    println!("Days and hours must be non-negative integers.");
                    continue;
                };
                let anchor = match parts.next() {
                    Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                        Ok(parsed) if raw.ends_with('Z') => Some(parsed.with_timezone(&Utc)),
                        _ => {
                            println!("Invalid date '{raw}'. Use e.g. 2025-01-01T10:00:00Z");
                            continue;
                        }
                    },
                    None => None,
                };
                let request = CalculationRequest::new(anchor, Some(days), Some(hours));
                match runtime.block_on(engine.calculate(&request)) {
                    Ok(outcome) => println!(
                        "Result: {} (local {})",
                        format_utc(outcome.result),
                        tz.to_local(outcome.result).format("%a %Y-%m-%d %H:%M")
                    ),
                    Err(err) => println!("Error [{}]: {}", err.kind().as_str(), err),
                }
            }
            "holidays" => {
                let year = match parts.next() {
                    Some(raw) => match raw.parse::<i32>() {
                        Ok(year) => Some(year),
                        Err(_) => {
                            println!("Invalid year");
                            continue;
                        }
                    },
                    None => None,
                };
                let cache = engine.holiday_cache();
                match runtime.block_on(cache.get_holidays()) {
                    Ok(set) => {
                        let dates = match year {
                            Some(year) => set.for_year(year),
                            None => set.iter().collect(),
                        };
                        for date in &dates {
                            println!("{date}");
                        }
                        println!("{} holiday(s).", dates.len());
                    }
                    Err(err) => println!("Error [{}]: {}", err.kind().as_str(), err),
                }
            }
            "cache" => {
                let info = engine.holiday_cache().cache_info();
                match info.last_updated {
                    Some(at) => println!(
                        "Cached: yes, valid: {}, last updated: {}",
                        if info.is_valid { "yes" } else { "no" },
                        format_utc(at)
                    ),
                    None => println!("Cached: no"),
                }
            }
            "clear" => {
                engine.holiday_cache().clear_cache();
                println!("Holiday cache cleared.");
            }
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let mut args = std::env::args().skip(1);
    let mut holidays_file = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--holidays" => {
                holidays_file = Some(args.next().ok_or("--holidays requires a file path")?)
            }
            other => {
                eprintln!("Unknown argument '{other}'. Usage: cli [--holidays <file.json>]");
                std::process::exit(2);
            }
        }
    }

    let config = ServiceConfig::from_env()?;
    let calendar = ScheduleCalendar::new(config.work_schedule, TimeZoneConverter::bogota())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match holidays_file {
        Some(path) => {
            let cache = HolidayCache::new(FileHolidaySource::new(path), config.cache_ttl());
            run(BusinessDateEngine::new(calendar, Arc::new(cache)), runtime);
        }
        None => {
            let source = HttpHolidaySource::new(&config.holiday_api_url, config.holiday_timeout)?;
            let cache = HolidayCache::new(source, config.cache_ttl());
            run(BusinessDateEngine::new(calendar, Arc::new(cache)), runtime);
        }
    }
    Ok(())
}

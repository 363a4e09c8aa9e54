//! Client-side pacing for Discord REST routes.
//!
//! Routes are keyed by path with snowflakes collapsed, so every role of a
//! guild shares one bucket. A route is only blocked once Discord reports it
//! exhausted (`X-RateLimit-Remaining: 0`) or answers 429.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Blocks {
    global: Option<Instant>,
    routes: HashMap<String, Instant>,
}

#[derive(Debug, Default)]
pub(super) struct RateLimiter {
    blocks: Mutex<Blocks>,
}

impl RateLimiter {
    /// Sleep until neither the global limit nor `route` is blocked.
    pub(super) async fn pause(&self, route: &str) {
        let until = {
            let blocks = self.blocks.lock().await;
            blocks.global.max(blocks.routes.get(route).copied())
        };
        if let Some(until) = until
            && until > Instant::now()
        {
            sleep_until(until).await;
        }
    }

    /// Record the bucket state Discord reported for `route`.
    pub(super) async fn observe(&self, route: &str, headers: &HeaderMap) {
        let remaining: Option<u32> = header(headers, "X-RateLimit-Remaining");
        let reset_after: Option<f64> = header(headers, "X-RateLimit-Reset-After");
        let mut blocks = self.blocks.lock().await;
        match (remaining, reset_after) {
            (Some(0), Some(seconds)) => {
                blocks
                    .routes
                    .insert(route.to_string(), Instant::now() + seconds_to_duration(seconds));
            }
            _ => {
                blocks.routes.remove(route);
            }
        }
    }

    /// Block `route`, or every route for a global limit, after a 429.
    /// Returns how long Discord asked us to wait.
    pub(super) async fn throttled(&self, route: &str, headers: &HeaderMap) -> Duration {
        let wait = retry_after(headers);
        let until = Instant::now() + wait;
        let mut blocks = self.blocks.lock().await;
        if is_global(headers) {
            blocks.global = Some(until);
        } else {
            blocks.routes.insert(route.to_string(), until);
        }
        wait
    }
}

/// `/guilds/{id}/roles/{id}` for any guild and role.
pub(super) fn route_of(url: &str) -> String {
    let path = reqwest::Url::parse(url).map_or_else(|_| url.to_string(), |parsed| parsed.path().to_string());
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .skip_while(|segment| *segment == "api" || is_version(segment))
        .map(|segment| {
            if segment.bytes().all(|byte| byte.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

fn is_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|number| number.parse::<u8>().is_ok())
}

fn header<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn retry_after(headers: &HeaderMap) -> Duration {
    header::<f64>(headers, "Retry-After").map_or(DEFAULT_RETRY_AFTER, seconds_to_duration)
}

fn is_global(headers: &HeaderMap) -> bool {
    header::<String>(headers, "X-RateLimit-Global")
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

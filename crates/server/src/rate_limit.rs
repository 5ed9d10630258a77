//! Per-client request limiting.
//!
//! The router only sees the [`RateLimiter`] trait, so the in-process
//! [`KeyedRateLimiter`] can be replaced by a shared store without touching
//! the middleware.

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
};

use crate::{ServerError, server::ServerState};

/// Checks between two sweeps of idle clients.
const PRUNE_EVERY: u64 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

pub trait RateLimiter: Send + Sync + fmt::Debug {
    /// Count one request from `client` and decide whether it may proceed.
    fn check(&self, client: IpAddr) -> RateDecision;
}

/// Bursts of up to `requests` per client, refilled evenly over `window`.
///
/// State lives in a `governor` keyed store; every [`PRUNE_EVERY`] checks the
/// clients whose allowance is full again are evicted.
pub struct KeyedRateLimiter<C: Clock = DefaultClock> {
    limiter: governor::RateLimiter<IpAddr, DashMapStateStore<IpAddr>, C, NoOpMiddleware<C::Instant>>,
    clock: C,
    checks: AtomicU64,
}

impl KeyedRateLimiter {
    pub fn new(requests: u32, window: Duration) -> Self {
        Self::with_clock(requests, window, DefaultClock::default())
    }
}

impl<C: Clock> KeyedRateLimiter<C> {
    pub fn with_clock(requests: u32, window: Duration, clock: C) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .map(|quota| quota.allow_burst(burst))
            .unwrap_or_else(|| Quota::per_second(burst));
        Self {
            limiter: governor::RateLimiter::new(quota, DashMapStateStore::default(), &clock),
            clock,
            checks: AtomicU64::new(0),
        }
    }

    /// Drop clients that are back to a full allowance.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Clients currently tracked.
    pub fn len(&self) -> usize {
        self.limiter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> fmt::Debug for KeyedRateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedRateLimiter")
            .field("clients", &self.limiter.len())
            .finish()
    }
}

impl<C> RateLimiter for KeyedRateLimiter<C>
where
    C: Clock + Send + Sync,
    C::Instant: Send + Sync,
{
    fn check(&self, client: IpAddr) -> RateDecision {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.retain_recent();
        }
        match self.limiter.check_key(&client) {
            Ok(()) => RateDecision::Allowed,
            Err(not_until) => RateDecision::Limited {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }
}

/// Client address: the peer, or the first `x-forwarded-for` hop when the
/// server sits behind a trusted proxy.
fn client_addr(request: &Request, trust_forwarded_for: bool) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

pub async fn rate_limit(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(client) = client_addr(&request, state.trust_forwarded_for) else {
        tracing::warn!("could not determine client address for rate limiting");
        return next.run(request).await;
    };
    match state.rate_limiter.check(client) {
        RateDecision::Allowed => next.run(request).await,
        RateDecision::Limited { retry_after } => {
            tracing::debug!(%client, "request rate limited");
            ServerError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};
    use governor::clock::FakeRelativeClock;

    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn bursts_are_limited_and_refill_over_the_window() {
        let clock = FakeRelativeClock::default();
        let limiter = KeyedRateLimiter::with_clock(2, Duration::from_secs(60), clock.clone());

        assert_eq!(limiter.check(ip(1)), RateDecision::Allowed);
        assert_eq!(limiter.check(ip(1)), RateDecision::Allowed);
        let RateDecision::Limited { retry_after } = limiter.check(ip(1)) else {
            panic!("third request in the burst must be limited");
        };
        assert!(retry_after > Duration::ZERO && retry_after <= Duration::from_secs(30));
        assert_eq!(limiter.check(ip(2)), RateDecision::Allowed);

        clock.advance(Duration::from_secs(30));
        assert_eq!(limiter.check(ip(1)), RateDecision::Allowed);
    }

    #[test]
    fn idle_clients_are_evicted() {
        let clock = FakeRelativeClock::default();
        let limiter = KeyedRateLimiter::with_clock(2, Duration::from_secs(60), clock.clone());
        for last in 0..=255 {
            limiter.check(ip(last));
        }
        assert_eq!(limiter.len(), 256);

        clock.advance(Duration::from_secs(120));
        limiter.retain_recent();
        assert!(limiter.is_empty());
    }

    #[test]
    fn forwarded_header_is_ignored_unless_trusted() {
        let mut request = http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));

        assert_eq!(
            client_addr(&request, false),
            Some(IpAddr::from([192, 0, 2, 1]))
        );
        assert_eq!(
            client_addr(&request, true),
            Some(IpAddr::from([203, 0, 113, 9]))
        );
    }
}

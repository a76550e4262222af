//! Test suite for progressive brute-force protection
//!
//! Tests cover:
//! - The lockout lifecycle across the failure threshold
//! - Lock persistence through successful credential checks
//! - Watch window re-arming on repeated failures
//! - Isolation between (IP, identity) pairs
//! - Composition of the auth sliding window with the lockout guard

mod common;

use std::time::Duration;

use rampart::RateLimiterService;
use rampart::domain::{RequestContext, Tier, ViolationClass};

use common::{default_test_limits, strict_test_limits, test_service};

const IP: &str = "203.0.113.9";
const EMAIL: &str = "alice@example.com";

fn auth_ctx(ip: &str, identity: &str) -> RequestContext {
    let mut ctx = RequestContext::new(Tier::Auth);
    ctx.ip = Some(ip.to_string());
    ctx.identity = Some(identity.to_string());
    ctx
}

async fn fail_n(service: &RateLimiterService, n: u32) {
    for _ in 0..n {
        service.record_auth_failure(IP, EMAIL).await;
    }
}

// ============================================================================
// Lockout Lifecycle Tests
// ============================================================================

mod lockout_lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_failures_below_threshold_leave_login_open() {
        let service = test_service(default_test_limits());

        fail_n(&service, 4).await;

        let decision = service.classify_and_check(&auth_ctx(IP, EMAIL)).await;
        assert!(decision.allowed);

        let status = service.lockout_status(IP, EMAIL).await.unwrap().unwrap();
        assert_eq!(status.failures, 4);
        assert!(!status.locked);
    }

    #[tokio::test]
    async fn test_threshold_failure_locks_the_pair() {
        let service = test_service(default_test_limits());

        fail_n(&service, 4).await;
        let state = service.record_auth_failure(IP, EMAIL).await;
        assert!(state.is_locked());

        let decision = service.classify_and_check(&auth_ctx(IP, EMAIL)).await;
        assert!(!decision.allowed);
        assert!(decision.retry_after.unwrap() >= 1);

        let status = service.lockout_status(IP, EMAIL).await.unwrap().unwrap();
        assert!(status.locked);
        assert_eq!(status.failures, 5);
        assert!(status.expires_in_seconds > 0);
    }

    #[tokio::test]
    async fn test_correct_password_is_rejected_while_locked() {
        let service = test_service(default_test_limits());

        fail_n(&service, 5).await;

        // Sixth attempt guesses right; the lock must hold anyway
        let state = service.record_auth_success(IP, EMAIL).await;
        assert!(state.is_locked());

        let decision = service.classify_and_check(&auth_ctx(IP, EMAIL)).await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn test_success_resets_an_unlocked_pair() {
        let service = test_service(default_test_limits());

        fail_n(&service, 3).await;
        let state = service.record_auth_success(IP, EMAIL).await;
        assert!(!state.is_locked());

        // The slate is clean: no status, and the counter restarts at one
        assert!(service.lockout_status(IP, EMAIL).await.unwrap().is_none());
        fail_n(&service, 1).await;
        let status = service.lockout_status(IP, EMAIL).await.unwrap().unwrap();
        assert_eq!(status.failures, 1);
    }

    #[tokio::test]
    async fn test_lock_expires_with_the_watch_window() {
        // Strict config: 3 attempts, 1s lockout window
        let service = test_service(strict_test_limits());

        fail_n(&service, 3).await;
        assert!(!service.classify_and_check(&auth_ctx(IP, EMAIL)).await.allowed);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(service.classify_and_check(&auth_ctx(IP, EMAIL)).await.allowed);
        assert!(service.lockout_status(IP, EMAIL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_each_failure_rearms_the_watch_window() {
        // 1s window: the second failure at 600ms pushes expiry to 1600ms,
        // so at 1200ms the counter is past its original deadline yet alive.
        let service = test_service(strict_test_limits());

        fail_n(&service, 1).await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        fail_n(&service, 1).await;
        tokio::time::sleep(Duration::from_millis(600)).await;

        let status = service.lockout_status(IP, EMAIL).await.unwrap().unwrap();
        assert_eq!(status.failures, 2);

        // A third failure on the re-armed counter crosses the threshold
        fail_n(&service, 1).await;
        assert!(!service.classify_and_check(&auth_ctx(IP, EMAIL)).await.allowed);
    }
}

// ============================================================================
// Pair Isolation Tests
// ============================================================================

mod pair_isolation {
    use super::*;

    #[tokio::test]
    async fn test_other_identity_on_same_ip_unaffected() {
        let service = test_service(default_test_limits());

        fail_n(&service, 5).await;

        let decision = service
            .classify_and_check(&auth_ctx(IP, "bob@example.com"))
            .await;
        assert!(decision.allowed);
        assert!(
            service
                .lockout_status(IP, "bob@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_same_identity_from_other_ip_unaffected() {
        let service = test_service(default_test_limits());

        fail_n(&service, 5).await;

        let decision = service
            .classify_and_check(&auth_ctx("198.51.100.4", EMAIL))
            .await;
        assert!(decision.allowed);
    }
}

// ============================================================================
// Auth Window Composition Tests
// ============================================================================

mod auth_window_composition {
    use super::*;

    #[tokio::test]
    async fn test_auth_window_blocks_without_any_failures() {
        // Strict config: auth window allows 3 per 60s
        let service = test_service(strict_test_limits());
        let ctx = auth_ctx(IP, EMAIL);

        for _ in 0..3 {
            assert!(service.classify_and_check(&ctx).await.allowed);
        }
        assert!(!service.classify_and_check(&ctx).await.allowed);

        // No credential failure was ever recorded, so the guard is clean:
        // the deny came from the sliding window alone.
        assert!(service.lockout_status(IP, EMAIL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lock_refuses_despite_window_capacity() {
        let service = test_service(default_test_limits());

        fail_n(&service, 5).await;

        // The auth window was never touched; the guard alone refuses, and
        // each refusal lands in the progressive block aggregate.
        for _ in 0..3 {
            assert!(!service.classify_and_check(&auth_ctx(IP, EMAIL)).await.allowed);
        }

        let count = service
            .recorder()
            .count_for(ViolationClass::ProgressiveBlock, chrono::Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_locked_refusals_spend_no_window_capacity() {
        // Strict config: lockout expires after 1s, auth window allows 3/60s
        let service = test_service(strict_test_limits());

        fail_n(&service, 3).await;
        for _ in 0..5 {
            assert!(!service.classify_and_check(&auth_ctx(IP, EMAIL)).await.allowed);
        }

        tokio::time::sleep(Duration::from_millis(1100)).await;

        // The five refusals above never reached the window: the full
        // allowance is still there once the lock lapses.
        for _ in 0..3 {
            assert!(service.classify_and_check(&auth_ctx(IP, EMAIL)).await.allowed);
        }
    }
}

// ============================================================================
// Disabled Service Tests
// ============================================================================

mod disabled_service {
    use super::*;

    #[tokio::test]
    async fn test_disabled_service_records_nothing() {
        let mut limits = default_test_limits();
        limits.enabled = false;
        let service = test_service(limits);

        fail_n(&service, 10).await;

        let state = service.record_auth_success(IP, EMAIL).await;
        assert!(!state.is_locked());

        let decision = service.classify_and_check(&auth_ctx(IP, EMAIL)).await;
        assert!(decision.allowed);
        assert_eq!(decision.limit, u32::MAX);
    }
}

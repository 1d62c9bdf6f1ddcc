// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - signal handling and graceful shutdown

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    /// Test that SIGTERM signal handler can be created on Unix platforms
    #[tokio::test]
    #[cfg(unix)]
    async fn test_sigterm_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        // The actual signal delivery is tested manually or in integration tests
        let result = signal(SignalKind::terminate());
        assert!(
            result.is_ok(),
            "Should be able to create SIGTERM signal handler"
        );
    }

    /// Test that the shutdown future stays pending until a signal arrives
    #[tokio::test]
    async fn test_shutdown_signal_pending_without_signal() {
        let result = timeout(StdDuration::from_millis(100), shutdown_signal()).await;

        assert!(
            result.is_err(),
            "shutdown_signal() should time out when no signal is sent"
        );
    }

    /// Test that a fired oneshot stops a task waiting on it
    #[tokio::test]
    async fn test_oneshot_shutdown_trigger() {
        let (tx, rx) = futures::channel::oneshot::channel::<()>();

        let task = tokio::spawn(async {
            let _ = rx.await;
            "stopped"
        });

        tx.send(()).expect("receiver should still be waiting");
        let result = timeout(StdDuration::from_secs(1), task)
            .await
            .expect("task should stop promptly")
            .expect("task should not panic");
        assert_eq!(result, "stopped");
    }

    /// Test that a dropped trigger also releases the waiting task
    #[tokio::test]
    async fn test_dropped_shutdown_trigger_releases_waiter() {
        let (tx, rx) = futures::channel::oneshot::channel::<()>();

        let task = tokio::spawn(async {
            let _ = rx.await;
        });

        drop(tx);
        timeout(StdDuration::from_secs(1), task)
            .await
            .expect("task should stop promptly")
            .expect("task should not panic");
    }

    /// Test that signal handling works with tokio::select!
    #[tokio::test]
    async fn test_select_with_signal_and_task() {
        let result = tokio::select! {
            _ = shutdown_signal() => "signal",
            () = tokio::time::sleep(StdDuration::from_millis(10)) => "task",
        };

        assert_eq!(
            result, "task",
            "select! should complete on the task branch when no signal is sent"
        );
    }
}

// Integration test documentation
// ================================
// The signal handling functionality should also be tested manually:
//
// 1. Deploy the controller to a Kubernetes cluster
// 2. Watch logs: kubectl logs -f <pod-name>
// 3. Delete the pod: kubectl delete pod <pod-name>
// 4. Verify logs show:
//    - "Received SIGTERM, initiating graceful shutdown..."
//    - "Waiting for in-flight reconciliations to finish..."
//    - "Graceful shutdown completed successfully"
//
// For Ctrl+C testing (local development):
// 1. Run: cargo run -- --addon <name>
// 2. Press Ctrl+C
// 3. Verify logs show graceful shutdown messages

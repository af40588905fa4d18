// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use scheduler_core::JobPayload;
use std::sync::atomic::{AtomicUsize, Ordering};

fn noop_payload() -> Payload {
    Payload::Job(JobPayload::waiting())
}

#[test]
fn append_assigns_strictly_increasing_timestamps() {
    let log = EventLog::new();
    let t1 = log.append(TopicName::base("a"), noop_payload());
    let t2 = log.append(TopicName::base("a"), noop_payload());
    assert!(t2 > t1);
    assert_eq!(log.curr_timestamp(), t2);
}

#[test]
fn last_event_respects_at_bound() {
    let log = EventLog::new();
    let t1 = log.append(TopicName::base("a"), Payload::Job(JobPayload::waiting()));
    let _t2 = log.append(TopicName::base("a"), Payload::Job(JobPayload::run_requested("r1")));

    let ev = log.last_event(&TopicName::base("a"), t1).unwrap();
    assert_eq!(ev.timestamp, t1);
}

#[test]
fn events_and_state_is_inclusive_and_ordered() {
    let log = EventLog::new();
    let topic = TopicName::base("a");
    log.append(topic.clone(), noop_payload());
    log.append(topic.clone(), noop_payload());
    log.append(topic.clone(), noop_payload());

    let events = log.events_and_state(&topic, Timestamp(2), Timestamp(3));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].timestamp, Timestamp(2));
    assert_eq!(events[1].timestamp, Timestamp(3));
}

#[tokio::test]
async fn dispatcher_invokes_subscriber_exactly_once_per_window() {
    let log = EventLog::new();
    let topic = TopicName::base("watched");
    let call_count = Arc::new(AtomicUsize::new(0));
    let seen_windows: Arc<Mutex<Vec<(Timestamp, Timestamp)>>> = Arc::new(Mutex::new(Vec::new()));

    {
        let call_count = call_count.clone();
        let seen_windows = seen_windows.clone();
        log.subscribe(vec![topic.clone()], move |low, high| {
            let call_count = call_count.clone();
            let seen_windows = seen_windows.clone();
            Box::pin(async move {
                call_count.fetch_add(1, Ordering::SeqCst);
                seen_windows.lock().push((low, high));
            })
        });
    }

    log.append(topic.clone(), noop_payload());
    log.append(topic.clone(), noop_payload());

    let dispatcher = tokio::spawn(log.clone().run_dispatcher());
    // Give the dispatcher a chance to drain the pending window.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    dispatcher.abort();

    assert_eq!(call_count.load(Ordering::SeqCst), 1);
    assert_eq!(seen_windows.lock()[0], (Timestamp(0), Timestamp(2)));
}

#[tokio::test]
async fn first_dispatched_window_starts_at_zero_even_with_prior_history() {
    // A subscriber registered after events already exist on its topic must
    // still see low=0 on its first window, covering that pre-existing
    // history rather than starting from its own subscription point.
    let log = EventLog::new();
    let topic = TopicName::base("watched");
    log.append(topic.clone(), noop_payload());

    let seen_windows: Arc<Mutex<Vec<(Timestamp, Timestamp)>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let seen_windows = seen_windows.clone();
        log.subscribe(vec![topic.clone()], move |low, high| {
            let seen_windows = seen_windows.clone();
            Box::pin(async move {
                seen_windows.lock().push((low, high));
            })
        });
    }

    let dispatcher = tokio::spawn(log.clone().run_dispatcher());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    dispatcher.abort();

    assert_eq!(seen_windows.lock()[0], (Timestamp(0), Timestamp(1)));
}

#[tokio::test]
async fn dispatcher_ignores_events_on_unrelated_topics() {
    let log = EventLog::new();
    let watched = TopicName::base("watched");
    let other = TopicName::base("other");
    let call_count = Arc::new(AtomicUsize::new(0));

    {
        let call_count = call_count.clone();
        log.subscribe(vec![watched.clone()], move |_low, _high| {
            let call_count = call_count.clone();
            Box::pin(async move {
                call_count.fetch_add(1, Ordering::SeqCst);
            })
        });
    }

    log.append(other.clone(), noop_payload());

    let dispatcher = tokio::spawn(log.clone().run_dispatcher());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    dispatcher.abort();

    assert_eq!(call_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn all_subscribers_called_is_true_until_there_is_pending_work() {
    let log = EventLog::new();
    let topic = TopicName::base("watched");
    log.subscribe(vec![topic.clone()], |_low, _high| Box::pin(async {}));

    assert!(log.all_subscribers_called());

    log.append(topic.clone(), noop_payload());
    assert!(!log.all_subscribers_called());

    let dispatcher = tokio::spawn(log.clone().run_dispatcher());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    dispatcher.abort();

    assert!(log.all_subscribers_called());
}

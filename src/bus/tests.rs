//! Tests for the event bus

use super::*;
use crate::error::StreamError;
use crate::events::EventKind;
use parking_lot::Mutex;
use std::sync::Arc;

fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    (log.clone(), log)
}

#[test]
fn test_handlers_run_in_registration_order() {
    let bus: EventBus<u32> = EventBus::new();
    let (log, seen) = recorder();

    for name in ["first", "second", "third"] {
        let log = log.clone();
        bus.subscribe(Signal::Event, move |value: &u32| {
            log.lock().push(format!("{}:{}", name, value));
            Ok(())
        });
    }

    assert!(bus.publish(Signal::Event, &7).unwrap());
    assert_eq!(*seen.lock(), vec!["first:7", "second:7", "third:7"]);
}

#[test]
fn test_publish_only_reaches_matching_signal() {
    let bus: EventBus<&'static str> = EventBus::new();
    let (log, seen) = recorder();

    let l = log.clone();
    bus.subscribe("response.output_text.delta", move |v: &&str| {
        l.lock().push(format!("text:{}", v));
        Ok(())
    });
    bus.subscribe(Signal::Event, move |v: &&str| {
        log.lock().push(format!("event:{}", v));
        Ok(())
    });

    bus.publish(EventKind::OutputTextDelta, &"a").unwrap();
    bus.publish(Signal::named("response.completed"), &"b").unwrap();
    bus.publish(Signal::Event, &"c").unwrap();

    assert_eq!(*seen.lock(), vec!["text:a", "event:c"]);
}

#[test]
fn test_publish_without_subscribers_is_delivered() {
    let bus: EventBus<()> = EventBus::new();
    assert!(bus.publish(Signal::Connected, &()).unwrap());
    assert_eq!(bus.subscriber_count(Signal::Connected), 0);
}

#[test]
fn test_terminal_signal_blocks_later_publishes() {
    let bus: EventBus<u32> = EventBus::new();
    let (log, seen) = recorder();

    for signal in [Signal::Event, Signal::End, Signal::Abort, Signal::Error] {
        let log = log.clone();
        let name = signal.to_string();
        bus.subscribe(signal, move |_: &u32| {
            log.lock().push(name.clone());
            Ok(())
        });
    }

    bus.publish(Signal::Event, &1).unwrap();
    assert!(bus.publish(Signal::End, &0).unwrap());
    assert!(!bus.publish(Signal::Event, &2).unwrap());
    assert!(!bus.publish(Signal::Abort, &0).unwrap());
    assert!(!bus.publish(Signal::Error, &0).unwrap());

    assert_eq!(*seen.lock(), vec!["event", "end"]);
    assert_eq!(bus.terminal(), Some(Signal::End));
    assert!(bus.is_terminated());
}

#[test]
fn test_handler_error_propagates_and_stops_dispatch() {
    let bus: EventBus<u32> = EventBus::new();
    let (log, seen) = recorder();

    bus.subscribe(Signal::Event, |_: &u32| Err(StreamError::handler("boom")));
    bus.subscribe(Signal::Event, move |_: &u32| {
        log.lock().push("unreached".to_string());
        Ok(())
    });

    let err = bus.publish(Signal::Event, &1).unwrap_err();
    assert!(matches!(err, StreamError::Handler(ref msg) if msg == "boom"));
    assert!(seen.lock().is_empty());
    assert!(!bus.is_terminated());
}

#[test]
fn test_once_and_unsubscribe() {
    let bus: EventBus<u32> = EventBus::new();
    let (log, seen) = recorder();

    let l = log.clone();
    bus.once(Signal::Event, move |v: &u32| {
        l.lock().push(format!("once:{}", v));
        Ok(())
    });
    let id = bus.subscribe(Signal::Event, move |v: &u32| {
        log.lock().push(format!("always:{}", v));
        Ok(())
    });

    bus.publish(Signal::Event, &1).unwrap();
    bus.publish(Signal::Event, &2).unwrap();
    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    bus.publish(Signal::Event, &3).unwrap();

    assert_eq!(*seen.lock(), vec!["once:1", "always:1", "always:2"]);
    assert_eq!(bus.subscriber_count(Signal::Event), 0);
}

#[test]
fn test_handler_can_subscribe_during_dispatch() {
    let bus: Arc<EventBus<u32>> = Arc::new(EventBus::new());
    let (log, seen) = recorder();

    let inner_bus = bus.clone();
    bus.once(Signal::Event, move |_: &u32| {
        let log = log.clone();
        inner_bus.subscribe(Signal::Event, move |v: &u32| {
            log.lock().push(v.to_string());
            Ok(())
        });
        Ok(())
    });

    bus.publish(Signal::Event, &1).unwrap();
    bus.publish(Signal::Event, &2).unwrap();

    assert_eq!(*seen.lock(), vec!["2"]);
}

#[test]
fn test_signal_names() {
    assert_eq!(Signal::from("connected"), Signal::Connected);
    assert_eq!(Signal::from("error"), Signal::Error);
    assert_eq!(
        Signal::from("response.created"),
        Signal::named("response.created")
    );
    assert_eq!(
        Signal::from(EventKind::Completed).as_str(),
        "response.completed"
    );
    assert!(Signal::Abort.is_terminal());
    assert!(!Signal::Connected.is_terminal());
    assert!(!Signal::named("end").is_terminal());
}

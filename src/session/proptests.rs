//! Property-based tests for the session state machine
//!
//! Transport events are generated without a generation and stamped at
//! apply time, either with the current generation or with a stale one.

use super::*;
use crate::calendar::{CalendarEvent, WeekDay};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("http://127.0.0.1:3000")
}

fn connected(context: &SessionContext) -> SessionState {
    let mut state = SessionState::new();
    transition(&mut state, context, Event::Connect).unwrap();
    let generation = state.generation;
    transition(&mut state, context, Event::HandshakeSucceeded { generation }).unwrap();
    state
}

/// An event whose generation is decided when it is applied
#[derive(Debug, Clone)]
enum Step {
    Connect,
    Disconnect,
    Submit(String),
    Clear,
    HandshakeOk { stale: bool },
    HandshakeFail { stale: bool },
    Dropped { stale: bool, reconnect: bool },
    Retry { stale: bool },
    SendFailed { stale: bool },
    Push { stale: bool, push: Push },
}

impl Step {
    fn into_event(self, state: &SessionState) -> Event {
        let stamp = |stale: bool| {
            if stale {
                state.generation.wrapping_sub(1)
            } else {
                state.generation
            }
        };
        match self {
            Step::Connect => Event::Connect,
            Step::Disconnect => Event::Disconnect,
            Step::Submit(text) => Event::SubmitMessage { text },
            Step::Clear => Event::ClearAccumulated,
            Step::HandshakeOk { stale } => Event::HandshakeSucceeded {
                generation: stamp(stale),
            },
            Step::HandshakeFail { stale } => Event::HandshakeFailed {
                generation: stamp(stale),
                message: "refused".to_string(),
            },
            Step::Dropped { stale, reconnect } => Event::TransportDropped {
                generation: stamp(stale),
                reason: "transport close".to_string(),
                reconnect,
            },
            Step::Retry { stale } => Event::RetryTimeout {
                generation: stamp(stale),
            },
            Step::SendFailed { stale } => Event::SendFailed {
                generation: stamp(stale),
                message: "channel closed".to_string(),
            },
            Step::Push { stale, push } => Event::Push {
                generation: stamp(stale),
                push,
            },
        }
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_agent_name() -> impl Strategy<Value = String> {
    prop_oneof![Just("Maya".to_string()), Just("Marcus".to_string()), Just("Dr. Chen".to_string())]
}

fn arb_day() -> impl Strategy<Value = WeekDay> {
    prop_oneof![
        Just(WeekDay::Monday),
        Just(WeekDay::Wednesday),
        Just(WeekDay::Sunday),
        "[A-Z][a-z]{2}".prop_map(|s| WeekDay::parse(&s)),
    ]
}

fn arb_push() -> impl Strategy<Value = Push> {
    prop_oneof![
        arb_agent_name().prop_map(|name| Push::AgentCreated { name }),
        (arb_agent_name(), "[a-z ]{0,8}").prop_map(|(name, chunk)| Push::AgentChunk { name, chunk }),
        ("[A-Za-z ]{1,12}", arb_day(), 0.0f64..24.0, 0u32..240)
            .prop_map(|(title, day, hour, duration)| Push::CalendarEvent(CalendarEvent::new(title, day, hour, duration))),
        "[a-z ]{0,8}".prop_map(|chunk| Push::OrchestratorChunk { chunk }),
        "[a-z_]{3,10}".prop_map(|event| Push::Unknown { event }),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => Just(Step::Connect),
        1 => Just(Step::Disconnect),
        1 => "[a-z ]{1,10}".prop_map(Step::Submit),
        1 => Just(Step::Clear),
        2 => any::<bool>().prop_map(|stale| Step::HandshakeOk { stale }),
        2 => any::<bool>().prop_map(|stale| Step::HandshakeFail { stale }),
        1 => (any::<bool>(), any::<bool>()).prop_map(|(stale, reconnect)| Step::Dropped { stale, reconnect }),
        2 => any::<bool>().prop_map(|stale| Step::Retry { stale }),
        1 => any::<bool>().prop_map(|stale| Step::SendFailed { stale }),
        4 => (any::<bool>(), arb_push()).prop_map(|(stale, push)| Step::Push { stale, push }),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Rejected events leave the state exactly as it was
    #[test]
    fn prop_errors_do_not_mutate(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let context = test_context();
        let mut state = SessionState::new();

        for step in steps {
            let event = step.into_event(&state);
            let before = state.clone();
            match transition(&mut state, &context, event) {
                Ok(_) => {}
                Err(TransitionError::OrphanChunk { .. }) => {
                    // Dropped under the default policy
                    prop_assert_eq!(&state, &before);
                }
                Err(e) => {
                    prop_assert_eq!(&state, &before, "mutated on {:?}", e);
                }
            }
        }
    }

    // Events from a superseded transport never change anything
    #[test]
    fn prop_stale_events_are_ignored(
        steps in proptest::collection::vec(arb_step(), 0..30),
        late in arb_push(),
    ) {
        let context = test_context();
        let mut state = SessionState::new();
        for step in steps {
            let event = step.into_event(&state);
            let _ = transition(&mut state, &context, event);
        }

        let before = state.clone();
        let generation = state.generation.wrapping_sub(1);
        let result = transition(&mut state, &context, Event::Push { generation, push: late });
        prop_assert!(
            matches!(result, Err(TransitionError::Stale { .. })),
            "Expected stale rejection: {:?}",
            result
        );
        prop_assert_eq!(state, before);
    }

    // Counter never passes the ceiling and is zeroed on success
    #[test]
    fn prop_reconnect_attempts_bounded(steps in proptest::collection::vec(arb_step(), 0..60)) {
        let context = test_context();
        let max = context.reconnect.max_attempts;
        let mut state = SessionState::new();

        for step in steps {
            let event = step.into_event(&state);
            let effects = transition(&mut state, &context, event).unwrap_or_default();

            prop_assert!(state.reconnect_attempts <= max);
            if state.phase.is_connected() {
                prop_assert_eq!(state.reconnect_attempts, 0);
            }
            if state.phase == ConnectionPhase::Exhausted {
                let retried = effects.iter().any(|e| matches!(e, Effect::ScheduleRetry { .. }));
                prop_assert!(!retried, "retry scheduled after exhaustion");
            }
            for effect in &effects {
                if let Effect::ScheduleRetry { delay, generation } = effect {
                    prop_assert!(*delay <= context.reconnect.max_delay);
                    prop_assert_eq!(*generation, state.generation);
                }
            }
        }
    }

    // The connected flag and the connecting flag are never both set
    #[test]
    fn prop_flags_exclusive(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let context = test_context();
        let mut state = SessionState::new();
        for step in steps {
            let event = step.into_event(&state);
            let _ = transition(&mut state, &context, event);
            let snapshot = state.snapshot();
            prop_assert!(!(snapshot.is_connected && snapshot.is_connecting));
        }
    }

    // Each agent name appears at most once, whatever order events come in
    #[test]
    fn prop_agents_unique(pushes in proptest::collection::vec(arb_push(), 0..50)) {
        let context = test_context();
        let mut state = connected(&context);
        let generation = state.generation;
        for push in pushes {
            let _ = transition(&mut state, &context, Event::Push { generation, push });
        }

        let mut names: Vec<_> = state.turn.agents.iter().map(|a| a.name.clone()).collect();
        let len = names.len();
        names.sort();
        names.dedup();
        prop_assert_eq!(names.len(), len);
    }

    // An agent's text is its chunks concatenated in arrival order
    #[test]
    fn prop_chunks_concatenate_in_order(chunks in proptest::collection::vec("[a-zé \n]{0,6}", 0..20)) {
        let context = test_context();
        let mut state = connected(&context);
        let generation = state.generation;

        transition(&mut state, &context, Event::Push {
            generation,
            push: Push::AgentCreated { name: "Maya".to_string() },
        }).unwrap();
        for chunk in &chunks {
            transition(&mut state, &context, Event::Push {
                generation,
                push: Push::AgentChunk { name: "Maya".to_string(), chunk: chunk.clone() },
            }).unwrap();
        }

        prop_assert_eq!(&state.turn.agents[0].response, &chunks.concat());
    }

    // Buffered orphans end up in the same text as if they had arrived late
    #[test]
    fn prop_buffered_orphans_preserve_order(
        early in proptest::collection::vec("[a-z]{1,4}", 0..6),
        late in proptest::collection::vec("[a-z]{1,4}", 0..6),
    ) {
        let context = test_context().with_orphan_chunks(OrphanChunkPolicy::Buffer);
        let mut state = connected(&context);
        let generation = state.generation;
        let chunk = |text: &String| Event::Push {
            generation,
            push: Push::AgentChunk { name: "Marcus".to_string(), chunk: text.clone() },
        };

        for text in &early {
            let _ = transition(&mut state, &context, chunk(text));
        }
        transition(&mut state, &context, Event::Push {
            generation,
            push: Push::AgentCreated { name: "Marcus".to_string() },
        }).unwrap();
        for text in &late {
            transition(&mut state, &context, chunk(text)).unwrap();
        }

        let expected: String = early.iter().chain(late.iter()).map(String::as_str).collect();
        prop_assert_eq!(&state.turn.agents[0].response, &expected);
        prop_assert_eq!(state.turn.orphan_count(), 0);
    }

    // A submitted message always starts from an empty turn
    #[test]
    fn prop_submit_resets_turn(
        pushes in proptest::collection::vec(arb_push(), 0..20),
        text in "[a-z ]{1,20}",
    ) {
        let context = test_context();
        let mut state = connected(&context);
        let generation = state.generation;
        for push in pushes {
            let _ = transition(&mut state, &context, Event::Push { generation, push });
        }

        let effects = transition(&mut state, &context, Event::SubmitMessage { text: text.clone() }).unwrap();
        prop_assert!(state.turn.is_empty());
        prop_assert_eq!(&effects[0], &Effect::SendMessage { text });
    }
}

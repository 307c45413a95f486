mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use geofencer_core::config::ExecutorConfig;
use geofencer_core::execution::{Command, CommandExecutor};
use geofencer_core::models::WatchDefinition;
use geofencer_core::services::TransitionTarget;
use geofencer_core::test_utils::{ScriptedGeofencingService, ServiceCall};
use proptest::prelude::*;

fn to_command(op: &SubmittedOp) -> Command {
    match op {
        SubmittedOp::Add(ids) => Command::add(
            ids.iter()
                .map(|id| WatchDefinition::new(id.clone(), 1.0, 1.0, 100.0))
                .collect(),
            TransitionTarget::new(TEST_RECEIVER),
        ),
        SubmittedOp::Remove(ids) => Command::remove(ids.clone()),
    }
}

fn to_service_call(op: &SubmittedOp) -> ServiceCall {
    match op {
        SubmittedOp::Add(ids) => ServiceCall::Register(ids.clone()),
        SubmittedOp::Remove(ids) => ServiceCall::Unregister(ids.clone()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_service_sees_commands_in_submission_order(ops in submission_sequence_strategy()) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let service = Arc::new(ScriptedGeofencingService::new());
        service.set_operation_delay(Duration::from_millis(1));
        let executor = CommandExecutor::with_runtime(
            service.clone(),
            &ExecutorConfig::default(),
            runtime.handle().clone(),
        );

        let completions: Vec<_> = ops
            .iter()
            .map(|op| {
                let mut command = to_command(op);
                let done = command.completion();
                executor.enqueue(command);
                done
            })
            .collect();

        let outcomes = runtime.block_on(async {
            let mut outcomes = Vec::new();
            for done in completions {
                outcomes.push(within_a_second(done).await.unwrap());
            }
            outcomes
        });

        prop_assert!(outcomes.iter().all(|outcome| outcome.is_success()));
        let served: Vec<ServiceCall> = service
            .calls()
            .into_iter()
            .filter(|call| !matches!(call, ServiceCall::Connect | ServiceCall::Disconnect))
            .collect();
        let expected: Vec<ServiceCall> = ops.iter().map(to_service_call).collect();
        prop_assert_eq!(served, expected);
        prop_assert_eq!(service.max_concurrent_operations(), 1);
        prop_assert_eq!(executor.stats().succeeded, ops.len() as u64);
    }

    #[test]
    fn prop_every_command_completes_exactly_once(ops in submission_sequence_strategy()) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let service = Arc::new(ScriptedGeofencingService::new());
        let executor = CommandExecutor::with_runtime(
            service.clone(),
            &ExecutorConfig::default(),
            runtime.handle().clone(),
        );

        let fired = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut last = None;
        for (index, op) in ops.iter().enumerate() {
            let mut command = to_command(op);
            let fired = fired.clone();
            command.add_completion_listener(move |_| fired.lock().push(index));
            if index + 1 == ops.len() {
                last = Some(command.completion());
            }
            executor.enqueue(command);
        }

        if let Some(done) = last {
            runtime.block_on(within_a_second(done)).unwrap();
        }

        prop_assert_eq!(fired.lock().clone(), (0..ops.len()).collect::<Vec<_>>());
    }
}

mod common;

use common::*;
use serde_json::json;
use std::time::Duration;

use hrflow::engine::CANCELLATION_ERROR;
use hrflow::workflow::{
    Condition, ConditionOp, ExecutionStatus, StepAction, StepOutcome,
};

#[tokio::test]
async fn test_linear_workflow_completes() {
    let (engine, adapter) = scripted_engine();
    adapter.succeed_with("accounts/provision", {
        let mut patch = hrflow::ContextPatch::new();
        patch.insert("account_id".to_string(), json!("acc-7"));
        patch
    });

    let def = definition(
        "onboarding",
        chain(vec![
            action_step("provision", "accounts/provision"),
            action_step("welcome", "mail/send"),
        ]),
    );
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({ "employee": "dana" }), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.error.is_none());
    assert!(execution.completed_at.is_some());

    // patch from the first step is in the final context
    assert_eq!(execution.context.get("account_id"), Some(&json!("acc-7")));
    assert_eq!(execution.context.get("employee"), Some(&json!("dana")));

    let logs = engine.step_logs(id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].step_name, "provision");
    assert_eq!(logs[0].outcome, StepOutcome::Success);
    assert_eq!(logs[1].step_name, "welcome");
    assert_eq!(logs[1].outcome, StepOutcome::Success);

    assert_eq!(adapter.call_count("accounts/provision"), 1);
    assert_eq!(adapter.call_count("mail/send"), 1);
}

#[tokio::test]
async fn test_failure_takes_failure_branch() {
    let (engine, adapter) = scripted_engine();
    adapter.fail_once("accounts/provision", "directory unavailable");

    let mut provision = action_step("provision", "accounts/provision");
    provision.on_failure = Some("escalate".to_string());
    let def = definition(
        "onboarding",
        vec![provision, action_step("escalate", "tasks/escalate")],
    );
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    // the failure branch ran and ended successfully
    assert_eq!(execution.status, ExecutionStatus::Completed);

    let logs = engine.step_logs(id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].outcome, StepOutcome::Failure);
    assert_eq!(logs[0].error.as_deref(), Some("action failed: directory unavailable"));
    assert_eq!(logs[1].step_name, "escalate");
    assert_eq!(logs[1].outcome, StepOutcome::Success);
}

#[tokio::test]
async fn test_failure_without_branch_fails_run() {
    let (engine, adapter) = scripted_engine();
    adapter.fail_once("mail/send", "smtp refused");

    let def = definition("notify", vec![action_step("welcome", "mail/send")]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.unwrap().contains("smtp refused"));
}

#[tokio::test]
async fn test_retry_budget_logs_every_attempt() {
    let (engine, adapter) = scripted_engine();
    adapter.fail_times("tasks/create", 3, "queue full");

    let mut step = action_step("create task", "tasks/create");
    step.retry = quick_retry(2);
    let def = definition("tasks", vec![step]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);

    // retry budget of 2 means 3 attempts total, each logged
    let logs = engine.step_logs(id).await.unwrap();
    assert_eq!(logs.len(), 3);
    for (i, log) in logs.iter().enumerate() {
        assert_eq!(log.attempt, i as u32 + 1);
        assert_eq!(log.outcome, StepOutcome::Failure);
    }
    assert_eq!(adapter.call_count("tasks/create"), 3);
}

#[tokio::test]
async fn test_retry_then_success() {
    let (engine, adapter) = scripted_engine();
    adapter.fail_once("tasks/create", "queue full");

    let mut step = action_step("create task", "tasks/create");
    step.retry = quick_retry(2);
    let def = definition("tasks", vec![step]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);

    let logs = engine.step_logs(id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].outcome, StepOutcome::Failure);
    assert_eq!(logs[1].outcome, StepOutcome::Success);
    assert_eq!(logs[1].attempt, 2);
}

#[tokio::test]
async fn test_mid_chain_failure_skips_the_rest() {
    let (engine, adapter) = scripted_engine();
    adapter.fail_once("steps/b", "boom");

    let mut a = action_step("a", "steps/a");
    a.on_success = Some("b".to_string());
    let mut b = action_step("b", "steps/b");
    b.on_success = Some("c".to_string());
    let def = definition("chain", vec![a, b, action_step("c", "steps/c")]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);

    let logs = engine.step_logs(id).await.unwrap();
    let summary: Vec<_> = logs
        .iter()
        .map(|l| (l.step_name.as_str(), l.outcome))
        .collect();
    assert_eq!(
        summary,
        vec![("a", StepOutcome::Success), ("b", StepOutcome::Failure)]
    );
    assert_eq!(adapter.call_count("steps/c"), 0);
}

#[tokio::test]
async fn test_outcome_follows_the_failure_branch_not_the_failed_step() {
    let (engine, adapter) = scripted_engine();
    adapter.fail_once("steps/b", "boom");

    let mut a = action_step("a", "steps/a");
    a.on_success = Some("b".to_string());
    let mut b = action_step("b", "steps/b");
    b.on_success = Some("c".to_string());
    b.on_failure = Some("d".to_string());
    let def = definition(
        "chain",
        vec![
            a,
            b,
            action_step("c", "steps/c"),
            action_step("d", "steps/d"),
        ],
    );
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    // d succeeded, so the run did
    assert_eq!(execution.status, ExecutionStatus::Completed);

    let logs = engine.step_logs(id).await.unwrap();
    let names: Vec<_> = logs.iter().map(|l| l.step_name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "d"]);
    assert_eq!(adapter.call_count("steps/c"), 0);
}

#[tokio::test]
async fn test_retry_recovers_then_chain_continues() {
    let (engine, adapter) = scripted_engine();
    adapter.fail_times("steps/flaky", 2, "transient");

    let mut flaky = action_step("flaky", "steps/flaky");
    flaky.retry = quick_retry(2);
    flaky.on_success = Some("after".to_string());
    let def = definition("flaky chain", vec![flaky, action_step("after", "steps/after")]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);

    let logs = engine.step_logs(id).await.unwrap();
    let flaky_logs: Vec<_> = logs.iter().filter(|l| l.step_name == "flaky").collect();
    assert_eq!(flaky_logs.len(), 3);
    assert_eq!(flaky_logs[0].outcome, StepOutcome::Failure);
    assert_eq!(flaky_logs[1].outcome, StepOutcome::Failure);
    assert_eq!(flaky_logs[2].outcome, StepOutcome::Success);
    assert_eq!(adapter.call_count("steps/after"), 1);
}

#[tokio::test]
async fn test_condition_branches_without_adapter_call() {
    let (engine, adapter) = scripted_engine();

    let mut check = action_step("check approval", "unused/unused");
    check.action = StepAction::Condition {
        condition: Condition {
            field: "approved".to_string(),
            op: ConditionOp::Eq,
            value: Some(json!(true)),
        },
    };
    check.on_success = Some("proceed".to_string());
    check.on_failure = Some("escalate".to_string());

    let def = definition(
        "approvals",
        vec![
            check,
            action_step("proceed", "mail/send"),
            action_step("escalate", "tasks/escalate"),
        ],
    );
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({ "approved": false }), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);

    // the condition itself never touches an adapter
    assert_eq!(adapter.call_count("mail/send"), 0);
    assert_eq!(adapter.call_count("tasks/escalate"), 1);

    let logs = engine.step_logs(id).await.unwrap();
    assert_eq!(logs[0].outcome, StepOutcome::Failure);
    assert!(logs[0].error.as_deref().unwrap().contains("condition not satisfied"));
}

#[tokio::test]
async fn test_config_interpolation_reaches_adapter() {
    let (engine, adapter) = scripted_engine();

    let mut step = action_step("welcome", "mail/send");
    step.action = StepAction::Action {
        subtype: "mail/send".to_string(),
        config: json!({
            "to": "${{ context.employee.email }}",
            "subject": "Welcome ${{ context.employee.name }}!"
        }),
    };
    let def = definition("notify", vec![step]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(
            workflow.id,
            json!({ "employee": { "name": "Dana", "email": "dana@example.com" } }),
            "tests",
        )
        .await
        .unwrap();
    engine.await_terminal(id).await.unwrap();

    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].config,
        json!({ "to": "dana@example.com", "subject": "Welcome Dana!" })
    );
}

#[tokio::test]
async fn test_unknown_variable_fails_step() {
    let (engine, adapter) = scripted_engine();

    let mut step = action_step("welcome", "mail/send");
    step.action = StepAction::Action {
        subtype: "mail/send".to_string(),
        config: json!({ "to": "${{ context.missing.email }}" }),
    };
    let def = definition("notify", vec![step]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.unwrap().contains("Unknown variable"));
    // interpolation failed before any adapter was invoked
    assert!(adapter.calls().is_empty());
}

#[tokio::test]
async fn test_missing_adapter_fails_step() {
    let engine = bare_engine();

    let def = definition("notify", vec![action_step("welcome", "mail/send")]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution
        .error
        .unwrap()
        .contains("no adapter registered for subtype: mail/send"));
}

#[tokio::test]
async fn test_workflow_without_steps_fails() {
    let (engine, _) = scripted_engine();

    let def = definition("empty", vec![]);
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.error.as_deref(), Some("workflow has no steps"));
    assert!(engine.step_logs(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_during_delay() {
    let (engine, adapter) = scripted_engine();

    let mut wait = action_step("cooling off", "unused/unused");
    wait.action = StepAction::Delay {
        duration: "200ms".to_string(),
    };
    wait.on_success = Some("notify".to_string());
    let def = definition(
        "cooldown",
        vec![wait, action_step("notify", "mail/send")],
    );
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.cancel(id).await.unwrap();

    let execution = engine.await_terminal(id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.error.as_deref(), Some(CANCELLATION_ERROR));

    // the step after the delay never ran
    assert_eq!(adapter.call_count("mail/send"), 0);

    let logs = engine.step_logs(id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].step_name, "cooling off");
    assert_eq!(logs[0].error.as_deref(), Some(CANCELLATION_ERROR));
}

#[tokio::test]
async fn test_delay_step_resumes_chain() {
    let (engine, adapter) = scripted_engine();

    let mut wait = action_step("short wait", "unused/unused");
    wait.action = StepAction::Delay {
        duration: "20ms".to_string(),
    };
    wait.on_success = Some("notify".to_string());
    let def = definition(
        "cooldown",
        vec![wait, action_step("notify", "mail/send")],
    );
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(adapter.call_count("mail/send"), 1);
}

#[tokio::test]
async fn test_dangling_successor_edge_fails_the_run() {
    use std::sync::Arc;

    use hrflow::adapter::{AdapterRegistry, ScriptedAdapter};
    use hrflow::engine::{MemoryStore, WorkflowEngine, WorkflowStore};
    use hrflow::workflow::{
        RetryPolicy, TriggerKind, Workflow, WorkflowDomain, WorkflowStatus, WorkflowStep,
    };
    use uuid::Uuid;

    let store = Arc::new(MemoryStore::new());
    let adapter = Arc::new(ScriptedAdapter::new());
    let registry = AdapterRegistry::new().with_fallback(adapter.clone());

    // bypass definition validation to simulate a corrupted step set
    let workflow_id = Uuid::new_v4();
    let workflow = Workflow {
        id: workflow_id,
        name: "corrupt".to_string(),
        description: String::new(),
        domain: WorkflowDomain::Custom,
        trigger: TriggerKind::Manual,
        trigger_config: json!({}),
        status: WorkflowStatus::Draft,
        execution_count: 0,
        last_executed_at: None,
        created_by: "tests".to_string(),
        created_at: chrono::Utc::now(),
    };
    let step = WorkflowStep {
        id: Uuid::new_v4(),
        workflow_id,
        number: 1,
        name: "only".to_string(),
        action: StepAction::Action {
            subtype: "steps/only".to_string(),
            config: json!({}),
        },
        on_success: Some(Uuid::new_v4()),
        on_failure: None,
        retry: RetryPolicy::default(),
    };
    store.insert_workflow(workflow, vec![step]).await.unwrap();

    let engine = WorkflowEngine::new(store, registry);
    let id = engine
        .trigger_manual(workflow_id, json!({}), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.unwrap().contains("missing step"));

    // the step itself still ran and was logged before the walk stopped
    let logs = engine.step_logs(id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].outcome, StepOutcome::Success);
}

#[tokio::test]
async fn test_context_patches_accumulate_across_steps() {
    let (engine, adapter) = scripted_engine();
    adapter.succeed_with("accounts/provision", {
        let mut patch = hrflow::ContextPatch::new();
        patch.insert("account_id".to_string(), json!("acc-1"));
        patch
    });
    adapter.succeed_with("mail/send", {
        let mut patch = hrflow::ContextPatch::new();
        patch.insert("mail_sent".to_string(), json!(true));
        patch
    });

    let def = definition(
        "onboarding",
        chain(vec![
            action_step("provision", "accounts/provision"),
            action_step("welcome", "mail/send"),
        ]),
    );
    let workflow = engine.create_workflow(&def, "tests").await.unwrap();

    let id = engine
        .trigger_manual(workflow.id, json!({ "seed": 1 }), "tests")
        .await
        .unwrap();
    let execution = engine.await_terminal(id).await.unwrap();

    assert_eq!(execution.context.get("seed"), Some(&json!(1)));
    assert_eq!(execution.context.get("account_id"), Some(&json!("acc-1")));
    assert_eq!(execution.context.get("mail_sent"), Some(&json!(true)));

    // the second step saw the first step's patch
    let calls = adapter.calls();
    assert_eq!(
        calls[1].context.get("account_id"),
        Some(&json!("acc-1"))
    );
}

//! Onboarding workflow example
//!
//! Run with: cargo run --example onboarding

use std::sync::Arc;

use serde_json::json;

use hrflow::prelude::*;

const WORKFLOW_YAML: &str = r#"
name: engineer-onboarding
description: Standard onboarding for new engineering hires
domain: onboarding
trigger: manual
steps:
  - name: create accounts
    action:
      kind: integration
      subtype: directory/provision-accounts
      config:
        email: "${{ context.employee.email }}"
    on_success: send welcome mail
    retry:
      attempts: 2
      delay_ms: 200

  - name: send welcome mail
    action:
      kind: notification
      subtype: mail/send
      config:
        to: "${{ context.employee.email }}"
        template: welcome
    on_success: check seniority

  - name: check seniority
    action:
      kind: condition
      condition:
        field: employee.level
        op: gte
        value: 5
    on_success: schedule leadership intro
    on_failure: schedule team intro

  - name: schedule leadership intro
    action:
      kind: action
      subtype: calendar/schedule
      config:
        title: "Leadership intro: ${{ context.employee.name }}"

  - name: schedule team intro
    action:
      kind: action
      subtype: calendar/schedule
      config:
        title: "Team intro: ${{ context.employee.name }}"
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("hrflow=debug")
        .init();

    let definition: WorkflowDefinition = serde_yaml::from_str(WORKFLOW_YAML)?;

    let registry = AdapterRegistry::new().with_fallback(Arc::new(NoopAdapter));
    let engine = WorkflowEngine::in_memory(registry);

    let workflow = engine.create_workflow(&definition, "hr-admin").await?;
    println!("Created workflow {} ({})", workflow.name, workflow.id);

    let execution_id = engine
        .trigger_manual(
            workflow.id,
            json!({
                "employee": {
                    "name": "Dana Reyes",
                    "email": "dana.reyes@example.com",
                    "level": 6
                }
            }),
            "hr-admin",
        )
        .await?;

    let execution = engine.await_terminal(execution_id).await?;
    let logs = engine.step_logs(execution_id).await?;

    println!("\n=== Execution Results ===");
    println!("Status: {:?}", execution.status);
    println!();

    for log in &logs {
        let status = match log.outcome {
            StepOutcome::Success => "✓",
            StepOutcome::Failure => "✗",
        };
        println!("  [{}] {} (attempt {})", status, log.step_name, log.attempt);
        if let Some(error) = &log.error {
            println!("      Error: {}", error);
        }
    }

    Ok(())
}

//! Lifecycle hooks fired by the orchestrator.

use std::sync::{Arc, Mutex};

use specflow_core::{
    AgentResult, FlowOrchestrator, FnAgent, HookEvent, HookPoint, OrchestratorConfig, RunStatus,
    SectionId, SectionPolicy, SectionPolicyRegistry, SectionRouter, SpecInfo, Specification,
};

fn orchestrator() -> FlowOrchestrator {
    let spec = Arc::new(
        Specification::new(SpecInfo::new("hooks", "1")).with_text(SectionId::Overview, "x"),
    );
    let mut registry = SectionPolicyRegistry::empty();
    for name in ["writer", "checker", "after"] {
        registry.register(name, SectionPolicy::new([SectionId::Overview], []));
    }
    FlowOrchestrator::new(
        spec,
        SectionRouter::new(registry),
        Vec::new(),
        OrchestratorConfig::default(),
    )
}

fn record_all(orch: &mut FlowOrchestrator, log: &Arc<Mutex<Vec<String>>>) {
    for point in [
        HookPoint::PreAgent,
        HookPoint::PostAgent,
        HookPoint::OnError,
        HookPoint::OnComplete,
    ] {
        let log = Arc::clone(log);
        orch.add_hook(point, move |event| {
            let entry = match event {
                HookEvent::OnComplete { status, .. } => format!("on_complete:{status}"),
                other => format!("{}:{}", other.point(), other.agent().unwrap_or("-")),
            };
            log.lock().unwrap().push(entry);
            Ok(())
        });
    }
}

#[tokio::test]
async fn test_hooks_fire_in_lifecycle_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut orch = orchestrator();
    record_all(&mut orch, &log);

    orch.register_agent(
        Arc::new(FnAgent::new("writer", |_ctx| async {
            AgentResult::success("wrote")
        })),
        &[],
        &[],
        1,
    )
    .unwrap();
    orch.register_agent(
        Arc::new(FnAgent::new("checker", |_ctx| async {
            AgentResult::failure("lint failed")
        })),
        &["writer"],
        &[],
        0,
    )
    .unwrap();
    orch.register_agent(
        Arc::new(FnAgent::new("after", |_ctx| async {
            AgentResult::success("unreachable")
        })),
        &["checker"],
        &[],
        0,
    )
    .unwrap();

    let result = orch.execute().await.unwrap();
    assert_eq!(result.status, RunStatus::Failed);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "pre_agent:writer",
            "post_agent:writer",
            "pre_agent:checker",
            "post_agent:checker",
            "on_error:checker",
            "on_complete:failed",
        ]
    );
}

#[tokio::test]
async fn test_failing_and_panicking_hooks_do_not_affect_the_run() {
    let calls = Arc::new(Mutex::new(0));
    let mut orch = orchestrator();

    orch.add_hook(HookPoint::PreAgent, |_| anyhow::bail!("audit sink offline"));
    orch.add_hook(HookPoint::PostAgent, |_| panic!("hook bug"));
    let counter = Arc::clone(&calls);
    orch.add_hook(HookPoint::PostAgent, move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    orch.register_agent(
        Arc::new(FnAgent::new("writer", |_ctx| async {
            AgentResult::success("wrote")
        })),
        &[],
        &[],
        0,
    )
    .unwrap();

    let result = orch.execute().await.unwrap();

    assert!(result.is_success());
    assert_eq!(*calls.lock().unwrap(), 1, "later hooks still run");
}

#[tokio::test]
async fn test_pre_agent_hook_sees_routed_sections_and_rules() {
    let seen = Arc::new(Mutex::new(None));
    let mut orch = orchestrator();
    let sink = Arc::clone(&seen);
    orch.add_hook(HookPoint::PreAgent, move |event| {
        if let HookEvent::PreAgent { sections, rules, .. } = event {
            *sink.lock().unwrap() = Some((sections.clone(), rules.len()));
        }
        Ok(())
    });
    orch.register_agent(
        Arc::new(FnAgent::new("writer", |_ctx| async {
            AgentResult::success("wrote")
        })),
        &[],
        &[],
        0,
    )
    .unwrap();

    orch.execute().await.unwrap();

    let (sections, rules) = seen.lock().unwrap().take().unwrap();
    assert_eq!(sections, vec![SectionId::Overview]);
    assert_eq!(rules, 0);
}

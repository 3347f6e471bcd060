//! 执行器：Decision ↔ Action 主循环
//!
//! AWAITING_DECISION -> (Router) -> AWAITING_ACTIONS -> AWAITING_DECISION ... -> DONE / FAILED / CANCELLED。
//! 每次运行有独立的 History 与 run_id，Engine 本身只读，可在多个任务间共享（Arc<Engine>）。
//! 取消只在节点之间检查，已开始的动作批次总会完整执行；整次运行的墙钟超时会丢弃正在执行的节点。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::config::EngineSection;
use crate::core::{EngineError, RunFailure, RunResult, RunState, RunSuccess};
use crate::llm::DecisionService;
use crate::memory::{History, Turn};
use crate::react::{route, ActionNode, DecisionNode, EventSink, Route, RunEvent};
use crate::tools::{ActionExecutor, ActionRegistry, ActionSchema};

/// 步数预算与超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    /// 最多允许的 Decision→Action 往返次数
    pub max_round_trips: usize,
    pub action_timeout: Duration,
    pub run_timeout: Duration,
}

impl EngineLimits {
    pub fn from_config(cfg: &EngineSection) -> Self {
        Self {
            max_round_trips: cfg.max_round_trips,
            action_timeout: Duration::from_secs(cfg.action_timeout_secs),
            run_timeout: Duration::from_secs(cfg.run_timeout_secs),
        }
    }
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self::from_config(&EngineSection::default())
    }
}

/// 单次运行的可变部分；超时丢弃 drive 之后仍可取回部分历史
struct RunCtx {
    history: History,
    state: RunState,
    round_trips: usize,
}

pub struct Engine {
    decision: DecisionNode,
    actions: ActionNode,
    schemas: Vec<ActionSchema>,
    limits: EngineLimits,
    events: EventSink,
}

impl Engine {
    /// registry 在此之后只读；schema 列表在构造时固定
    pub fn new(
        service: Arc<dyn DecisionService>,
        registry: Arc<ActionRegistry>,
        directive: impl Into<String>,
        limits: EngineLimits,
    ) -> Self {
        let schemas = registry.list_schemas();
        Self {
            decision: DecisionNode::new(service, directive),
            actions: ActionNode::new(ActionExecutor::new(registry, limits.action_timeout)),
            schemas,
            limits,
            events: EventSink::default(),
        }
    }

    /// 推送运行过程事件
    pub fn with_event_tx(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn limits(&self) -> EngineLimits {
        self.limits
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        self.actions.executor().registry()
    }

    pub fn directive(&self) -> &str {
        self.decision.directive()
    }

    /// 以 seed 开始一次运行，直到终态
    pub async fn run_once(&self, seed: Turn, cancel: CancellationToken) -> RunResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut ctx = RunCtx {
            history: History::seeded(seed),
            state: RunState::AwaitingDecision,
            round_trips: 0,
        };
        tracing::info!(
            run_id = %run_id,
            model = self.decision.model_id(),
            actions = self.schemas.len(),
            max_round_trips = self.limits.max_round_trips,
            "run started"
        );
        self.events.send(RunEvent::RunStarted {
            run_id: run_id.clone(),
        });

        let driven =
            tokio::time::timeout(self.limits.run_timeout, self.drive(&mut ctx, &cancel)).await;
        let outcome = match driven {
            Ok(r) => r,
            Err(_) => Err(EngineError::RunTimeout(self.limits.run_timeout)),
        };

        match outcome {
            Ok(final_turn) => {
                self.transition(&mut ctx, RunState::Done);
                tracing::info!(
                    run_id = %run_id,
                    round_trips = ctx.round_trips,
                    turns = ctx.history.len(),
                    "run done"
                );
                self.finish(&run_id, &ctx);
                Ok(RunSuccess {
                    run_id,
                    final_turn,
                    history: ctx.history,
                    round_trips: ctx.round_trips,
                })
            }
            Err(error) => {
                let state = RunState::for_error(&error);
                self.transition(&mut ctx, state);
                if state == RunState::Cancelled {
                    tracing::info!(run_id = %run_id, round_trips = ctx.round_trips, "run cancelled");
                } else {
                    tracing::error!(
                        run_id = %run_id,
                        kind = ?error.kind(),
                        error = %error,
                        "run failed"
                    );
                }
                self.finish(&run_id, &ctx);
                let partial = std::mem::take(&mut ctx.history);
                Err(RunFailure::new(run_id, error, partial, ctx.round_trips))
            }
        }
    }

    async fn drive(&self, ctx: &mut RunCtx, cancel: &CancellationToken) -> Result<Turn, EngineError> {
        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let turn = self.decision.decide(&mut ctx.history, &self.schemas).await?;
            self.events.send(RunEvent::Decision {
                requested: turn
                    .requested_actions()
                    .iter()
                    .map(|r| r.name.clone())
                    .collect(),
            });

            match route(Some(&turn)) {
                Route::Stop => return Ok(turn),
                Route::Continue => {
                    if ctx.round_trips >= self.limits.max_round_trips {
                        return Err(EngineError::StepBudgetExceeded(ctx.round_trips));
                    }
                    if cancel.is_cancelled() {
                        return Err(EngineError::Cancelled);
                    }
                    self.transition(ctx, RunState::AwaitingActions);
                    self.actions.execute(&mut ctx.history, &self.events).await?;
                    ctx.round_trips += 1;
                    self.transition(ctx, RunState::AwaitingDecision);
                }
            }
        }
    }

    fn transition(&self, ctx: &mut RunCtx, to: RunState) {
        if ctx.state != to {
            tracing::debug!(from = ?ctx.state, to = ?to, "state");
            self.events.send(RunEvent::StateChanged {
                from: ctx.state,
                to,
            });
            ctx.state = to;
        }
    }

    fn finish(&self, run_id: &str, ctx: &RunCtx) {
        self.events.send(RunEvent::RunFinished {
            run_id: run_id.to_string(),
            state: ctx.state,
            round_trips: ctx.round_trips,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunErrorKind;
    use crate::llm::{MockDecisionService, ScriptedDecisionService};
    use crate::memory::ActionRequest;
    use crate::tools::EchoAction;
    use serde_json::json;

    fn echo_registry() -> Arc<ActionRegistry> {
        let mut registry = ActionRegistry::new();
        registry.register(EchoAction).unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_mock_round_trip() {
        let engine = Engine::new(
            Arc::new(MockDecisionService),
            echo_registry(),
            "directive",
            EngineLimits::default(),
        );
        let ok = engine
            .run_once(Turn::user("hi"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ok.final_turn, Turn::agent("Echo from Mock: hi"));
        assert_eq!(ok.round_trips, 1);
        assert_eq!(ok.history.len(), 4);
    }

    #[tokio::test]
    async fn test_events_trace_state_machine() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let svc = ScriptedDecisionService::new(vec![
            Turn::agent_requesting("", vec![ActionRequest::new("echo", json!({"text": "x"}))]),
            Turn::agent("done"),
        ]);
        let engine = Engine::new(
            Arc::new(svc),
            echo_registry(),
            "directive",
            EngineLimits::default(),
        )
        .with_event_tx(tx);
        engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap();
        drop(engine);

        let mut states = Vec::new();
        while let Some(ev) = rx.recv().await {
            if let RunEvent::StateChanged { to, .. } = ev {
                states.push(to);
            }
        }
        assert_eq!(
            states,
            vec![
                RunState::AwaitingActions,
                RunState::AwaitingDecision,
                RunState::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let svc = Arc::new(ScriptedDecisionService::new(vec![Turn::agent("never")]));
        let engine = Engine::new(svc.clone(), echo_registry(), "d", EngineLimits::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = engine.run_once(Turn::user("go"), cancel).await.unwrap_err();
        assert_eq!(failure.state, RunState::Cancelled);
        assert_eq!(failure.kind(), RunErrorKind::CancelledError);
        assert_eq!(failure.partial_history.len(), 1);
        assert_eq!(svc.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_history() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let svc = ScriptedDecisionService::new(vec![
            Turn::agent_requesting("", vec![ActionRequest::new("echo", json!({"text": "x"}))]),
            Turn::agent_requesting("", vec![ActionRequest::new("ghost", json!({}))]),
        ]);
        let engine = Engine::new(Arc::new(svc), echo_registry(), "d", EngineLimits::default())
            .with_event_tx(tx);

        let failure = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap_err();
        drop(engine);

        assert_eq!(failure.state, RunState::Failed);
        assert_eq!(failure.kind(), RunErrorKind::UnknownActionError);
        assert_eq!(failure.round_trips, 1);
        assert_eq!(failure.partial_history.len(), 4);
        assert!(failure.partial_history.all()[2].as_action_result().is_some());

        let mut finished = None;
        while let Some(ev) = rx.recv().await {
            if let RunEvent::RunFinished { state, .. } = ev {
                finished = Some(state);
            }
        }
        assert_eq!(finished, Some(RunState::Failed));
    }
}

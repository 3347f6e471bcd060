//! 引擎集成测试：Decision ↔ Action 循环的顺序、只追加历史、预算、超时与取消

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    use herald::config::AppConfig;
    use herald::core::{ActionError, ActionErrorKind, PipelineBuilder, RunErrorKind, RunState};
    use herald::llm::{DecisionError, DecisionService, MockDecisionService, ScriptedDecisionService};
    use herald::memory::{ActionRequest, Turn};
    use herald::react::{Engine, EngineLimits};
    use herald::tools::{Action, ActionRegistry, ActionSchema};

    /// 记录调用顺序与参数，返回 "<name> done" 或固定输出
    struct RecordingAction {
        name: String,
        output: Option<Value>,
        log: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl RecordingAction {
        fn new(name: &str, log: &Arc<Mutex<Vec<(String, Value)>>>) -> Self {
            Self {
                name: name.to_string(),
                output: None,
                log: Arc::clone(log),
            }
        }

        fn with_output(mut self, output: Value) -> Self {
            self.output = Some(output);
            self
        }
    }

    #[async_trait]
    impl Action for RecordingAction {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "records its invocation"
        }

        async fn invoke(&self, args: Value) -> Result<Value, ActionError> {
            self.log.lock().unwrap().push((self.name.clone(), args));
            Ok(self
                .output
                .clone()
                .unwrap_or_else(|| json!(format!("{} done", self.name))))
        }
    }

    struct NoopAction {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Action for NoopAction {
        fn name(&self) -> &str {
            "noop"
        }

        fn description(&self) -> &str {
            "does nothing"
        }

        async fn invoke(&self, _args: Value) -> Result<Value, ActionError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    }

    struct RejectingAction;

    #[async_trait]
    impl Action for RejectingAction {
        fn name(&self) -> &str {
            "reject"
        }

        fn description(&self) -> &str {
            "always rejects its input"
        }

        async fn invoke(&self, _args: Value) -> Result<Value, ActionError> {
            Err(ActionError::invalid_input("summary must not be empty"))
        }
    }

    struct SleepAction {
        delay: Duration,
    }

    #[async_trait]
    impl Action for SleepAction {
        fn name(&self) -> &str {
            "sleep"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn invoke(&self, _args: Value) -> Result<Value, ActionError> {
            tokio::time::sleep(self.delay).await;
            Ok(json!("woke up"))
        }
    }

    /// 执行时触发外部取消
    struct CancellingAction {
        token: CancellationToken,
    }

    #[async_trait]
    impl Action for CancellingAction {
        fn name(&self) -> &str {
            "cancel_me"
        }

        fn description(&self) -> &str {
            "cancels the run from inside a handler"
        }

        async fn invoke(&self, _args: Value) -> Result<Value, ActionError> {
            self.token.cancel();
            Ok(json!("finished anyway"))
        }
    }

    /// 由闭包决定下一条 Turn，并记录每次看到的历史
    struct FnDecision<F> {
        decide: F,
        seen: Mutex<Vec<Vec<Turn>>>,
    }

    impl<F> FnDecision<F>
    where
        F: Fn(&[Turn]) -> Result<Turn, DecisionError> + Send + Sync,
    {
        fn new(decide: F) -> Self {
            Self {
                decide,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<Vec<Turn>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<F> DecisionService for FnDecision<F>
    where
        F: Fn(&[Turn]) -> Result<Turn, DecisionError> + Send + Sync,
    {
        async fn decide(
            &self,
            _directive: &str,
            history: &[Turn],
            _actions: &[ActionSchema],
        ) -> Result<Turn, DecisionError> {
            self.seen.lock().unwrap().push(history.to_vec());
            (self.decide)(history)
        }
    }

    fn limits(max_round_trips: usize, action_timeout: Duration, run_timeout: Duration) -> EngineLimits {
        EngineLimits {
            max_round_trips,
            action_timeout,
            run_timeout,
        }
    }

    fn request(name: &str, args: Value) -> Turn {
        Turn::agent_requesting("", vec![ActionRequest::new(name, args)])
    }

    #[tokio::test]
    async fn test_actions_execute_in_request_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(RecordingAction::new(name, &log)).unwrap();
        }
        let svc = ScriptedDecisionService::new(vec![
            Turn::agent_requesting(
                "",
                vec![
                    ActionRequest::with_id("1", "c", json!({})),
                    ActionRequest::with_id("2", "a", json!({})),
                    ActionRequest::with_id("3", "b", json!({})),
                ],
            ),
            Turn::agent("done"),
        ]);
        let engine = Engine::new(Arc::new(svc), Arc::new(registry), "d", EngineLimits::default());

        let ok = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap();

        let invoked: Vec<String> = log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(invoked, vec!["c", "a", "b"]);
        let result_ids: Vec<String> = ok
            .history
            .all()
            .iter()
            .filter_map(|t| t.as_action_result())
            .map(|r| r.request.id.clone())
            .collect();
        assert_eq!(result_ids, vec!["1", "2", "3"]);
        assert_eq!(ok.history.len(), 6);
    }

    #[tokio::test]
    async fn test_history_is_append_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionRegistry::new();
        registry.register(RecordingAction::new("step", &log)).unwrap();
        let svc = Arc::new(FnDecision::new(|history: &[Turn]| {
            let results = history.iter().filter(|t| t.as_action_result().is_some()).count();
            if results < 3 {
                Ok(request("step", json!({ "n": results })))
            } else {
                Ok(Turn::agent("finished"))
            }
        }));
        let engine = Engine::new(svc.clone(), Arc::new(registry), "d", EngineLimits::default());

        let ok = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap();

        let mut snapshots = svc.seen();
        snapshots.push(ok.history.all().to_vec());
        assert_eq!(snapshots.len(), 5);
        for pair in snapshots.windows(2) {
            assert!(pair[1].len() > pair[0].len());
            assert_eq!(&pair[1][..pair[0].len()], pair[0].as_slice());
        }
        assert_eq!(ok.round_trips, 3);
    }

    #[tokio::test]
    async fn test_unknown_action_fails_before_any_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = ActionRegistry::new();
        registry
            .register(NoopAction {
                count: Arc::clone(&count),
            })
            .unwrap();
        let svc = ScriptedDecisionService::new(vec![Turn::agent_requesting(
            "",
            vec![
                ActionRequest::new("noop", json!({})),
                ActionRequest::new("ghost", json!({})),
            ],
        )]);
        let engine = Engine::new(Arc::new(svc), Arc::new(registry), "d", EngineLimits::default());

        let failure = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.state, RunState::Failed);
        assert_eq!(failure.kind(), RunErrorKind::UnknownActionError);
        assert!(failure.message().contains("ghost"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(failure.partial_history.len(), 2);
    }

    #[tokio::test]
    async fn test_step_budget_exceeded() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = ActionRegistry::new();
        registry
            .register(NoopAction {
                count: Arc::clone(&count),
            })
            .unwrap();
        let svc = Arc::new(FnDecision::new(|_: &[Turn]| Ok(request("noop", json!({})))));
        let engine = Engine::new(
            svc.clone(),
            Arc::new(registry),
            "d",
            limits(3, Duration::from_secs(5), Duration::from_secs(10)),
        );

        let failure = engine
            .run_once(Turn::user("loop forever"), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.state, RunState::Failed);
        assert_eq!(failure.kind(), RunErrorKind::StepBudgetExceeded);
        assert_eq!(failure.round_trips, 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(svc.seen().len(), 4);
        // seed + 4 个 agent Turn + 3 个结果
        assert_eq!(failure.partial_history.len(), 8);
    }

    #[tokio::test]
    async fn test_action_error_is_visible_to_next_decision() {
        let mut registry = ActionRegistry::new();
        registry.register(RejectingAction).unwrap();
        let svc = Arc::new(FnDecision::new(|history: &[Turn]| {
            match history.last().and_then(|t| t.as_action_result()) {
                Some(r) if r.is_error() => Ok(Turn::agent(format!("gave up: {}", r.to_content()))),
                _ => Ok(request("reject", json!({ "summary": "" }))),
            }
        }));
        let engine = Engine::new(svc.clone(), Arc::new(registry), "d", EngineLimits::default());

        let ok = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap();

        let seen = svc.seen();
        let latest = seen[1].last().and_then(|t| t.as_action_result()).unwrap();
        assert_eq!(latest.error_kind(), Some(ActionErrorKind::InvalidInput));
        assert!(ok.final_turn.content().contains("summary must not be empty"));
    }

    #[tokio::test]
    async fn test_fetch_then_render_end_to_end() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionRegistry::new();
        registry
            .register(RecordingAction::new("fetchData", &log).with_output(json!("Markets rally on rate cut")))
            .unwrap();
        registry
            .register(RecordingAction::new("renderArtifact", &log).with_output(json!("/tmp/post.png")))
            .unwrap();

        let svc = Arc::new(FnDecision::new(|history: &[Turn]| {
            match history.last() {
                Some(Turn::User { .. }) => Ok(request("fetchData", json!({}))),
                Some(Turn::ActionResult(r)) if r.request.name == "fetchData" => {
                    let data = r.output().cloned().unwrap_or(Value::Null);
                    Ok(request("renderArtifact", json!({ "summary": data })))
                }
                Some(Turn::ActionResult(r)) => Ok(Turn::agent(format!("rendered {}", r.to_content()))),
                _ => Err(DecisionError::Malformed("unexpected history".into())),
            }
        }));
        let engine = Engine::new(svc, Arc::new(registry), "d", EngineLimits::default());

        let ok = engine
            .run_once(Turn::user("publish the news"), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ok.history.len(), 6);
        assert_eq!(ok.final_turn, Turn::agent("rendered /tmp/post.png"));
        let calls = log.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "renderArtifact");
        assert_eq!(calls[1].1["summary"], "Markets rally on rate cut");
    }

    #[tokio::test]
    async fn test_cancel_observed_at_step_boundary() {
        let token = CancellationToken::new();
        let mut registry = ActionRegistry::new();
        registry
            .register(CancellingAction {
                token: token.clone(),
            })
            .unwrap();
        let svc = Arc::new(FnDecision::new(|_: &[Turn]| Ok(request("cancel_me", json!({})))));
        let engine = Engine::new(svc.clone(), Arc::new(registry), "d", EngineLimits::default());

        let failure = engine.run_once(Turn::user("go"), token).await.unwrap_err();

        assert!(failure.is_cancelled());
        assert_eq!(failure.state, RunState::Cancelled);
        assert_eq!(failure.kind(), RunErrorKind::CancelledError);
        // 已开始的动作跑完并记录，之后不再请求决策
        assert_eq!(failure.partial_history.len(), 3);
        let result = failure.partial_history.latest().and_then(|t| t.as_action_result()).unwrap();
        assert_eq!(result.output(), Some(&json!("finished anyway")));
        assert_eq!(svc.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_completes_batch() {
        let token = CancellationToken::new();
        let mut registry = ActionRegistry::new();
        registry
            .register(CancellingAction {
                token: token.clone(),
            })
            .unwrap();
        let svc = Arc::new(FnDecision::new(|_: &[Turn]| {
            Ok(Turn::agent_requesting(
                "",
                vec![
                    ActionRequest::with_id("c1", "cancel_me", json!({})),
                    ActionRequest::with_id("c2", "cancel_me", json!({})),
                    ActionRequest::with_id("c3", "cancel_me", json!({})),
                ],
            ))
        }));
        let engine = Engine::new(svc.clone(), Arc::new(registry), "d", EngineLimits::default());

        let failure = engine.run_once(Turn::user("go"), token).await.unwrap_err();

        assert!(failure.is_cancelled());
        // 第一个处理器就触发了取消，整批仍全部执行
        let results: Vec<_> = failure
            .partial_history
            .all()
            .iter()
            .filter_map(|t| t.as_action_result())
            .collect();
        assert_eq!(results.len(), 3);
        assert_eq!(failure.partial_history.len(), 5);
        let ids: Vec<_> = results.iter().map(|r| r.request.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(results.iter().all(|r| r.output() == Some(&json!("finished anyway"))));
        assert_eq!(svc.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_action_timeout_becomes_result_error() {
        let mut registry = ActionRegistry::new();
        registry
            .register(SleepAction {
                delay: Duration::from_secs(5),
            })
            .unwrap();
        let svc = Arc::new(FnDecision::new(|history: &[Turn]| {
            match history.last().and_then(|t| t.as_action_result()) {
                Some(r) => Ok(Turn::agent(format!("stopped: {:?}", r.error_kind()))),
                None => Ok(request("sleep", json!({}))),
            }
        }));
        let engine = Engine::new(
            svc,
            Arc::new(registry),
            "d",
            limits(5, Duration::from_millis(50), Duration::from_secs(10)),
        );

        let ok = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap();

        let result = ok.history.all()[2].as_action_result().unwrap();
        assert_eq!(result.error_kind(), Some(ActionErrorKind::Timeout));
        assert_eq!(ok.final_turn, Turn::agent("stopped: Some(Timeout)"));
    }

    #[tokio::test]
    async fn test_run_timeout_fails_run() {
        let mut registry = ActionRegistry::new();
        registry
            .register(SleepAction {
                delay: Duration::from_secs(5),
            })
            .unwrap();
        let svc = ScriptedDecisionService::new(vec![request("sleep", json!({}))]);
        let engine = Engine::new(
            Arc::new(svc),
            Arc::new(registry),
            "d",
            limits(5, Duration::from_secs(10), Duration::from_millis(100)),
        );

        let failure = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.state, RunState::Failed);
        assert_eq!(failure.kind(), RunErrorKind::RunTimeout);
        assert_eq!(failure.partial_history.len(), 2);
    }

    #[tokio::test]
    async fn test_decision_service_error_is_fatal() {
        let svc = ScriptedDecisionService::with_results(vec![Err(DecisionError::Api(
            "overloaded".into(),
        ))]);
        let engine = Engine::new(
            Arc::new(svc),
            Arc::new(ActionRegistry::new()),
            "d",
            EngineLimits::default(),
        );

        let failure = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.kind(), RunErrorKind::DecisionServiceError);
        assert!(failure.message().contains("overloaded"));
        assert_eq!(failure.partial_history.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_isolated() {
        let mut registry = ActionRegistry::new();
        registry.register(herald::tools::EchoAction).unwrap();
        let engine = Arc::new(Engine::new(
            Arc::new(MockDecisionService),
            Arc::new(registry),
            "d",
            EngineLimits::default(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .run_once(Turn::user(format!("seed {i}")), CancellationToken::new())
                        .await
                })
            })
            .collect();

        let mut run_ids = Vec::new();
        for (i, handle) in handles.into_iter().enumerate() {
            let ok = handle.await.unwrap().unwrap();
            assert_eq!(ok.final_turn, Turn::agent(format!("Echo from Mock: seed {i}")));
            assert_eq!(ok.history.len(), 4);
            run_ids.push(ok.run_id);
        }
        run_ids.sort();
        run_ids.dedup();
        assert_eq!(run_ids.len(), 8);
    }

    #[tokio::test]
    async fn test_pipeline_surfaces_missing_config() {
        let svc = Arc::new(ScriptedDecisionService::new(vec![
            request("fetch_news", json!({})),
            Turn::agent("news source is not configured"),
        ]));
        let engine = PipelineBuilder::new(AppConfig::default())
            .with_directive("d")
            .with_decision_service(svc.clone())
            .build_engine()
            .unwrap();

        let ok = engine
            .run_once(Turn::user("go"), CancellationToken::new())
            .await
            .unwrap();

        let result = ok.history.all()[2].as_action_result().unwrap();
        assert_eq!(result.error_kind(), Some(ActionErrorKind::ConfigMissing));
        assert_eq!(
            svc.calls()[0].action_names,
            vec!["fetch_news", "make_post_image", "upload_image", "publish_post"]
        );
    }
}

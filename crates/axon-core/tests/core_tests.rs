#[cfg(test)]
mod tests {
    use axon_core::*;
    use serde_json::json;
    use uuid::Uuid;

    // ── Message tests ──────────────────────────────────────────

    #[test]
    fn test_message_user_constructor() {
        let sid = Uuid::new_v4();
        let msg = Message::user(sid, "hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.session_id, sid);
        assert!(msg.metadata.is_empty());
    }

    #[test]
    fn test_message_metadata_builder() {
        let msg = Message::user(Uuid::new_v4(), "hi").with_metadata("channel", json!("webchat"));
        assert_eq!(msg.metadata.get("channel"), Some(&json!("webchat")));
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = Message::new(Uuid::new_v4(), Role::Agent, "test message");
        let json = serde_json::to_string(&msg).unwrap();
        let restored: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.role, Role::Agent);
        assert_eq!(restored.content, "test message");
    }

    // ── Error tests ────────────────────────────────────────────

    #[test]
    fn test_error_duplicate_service() {
        let err = AxonError::DuplicateService("wallet".into());
        assert!(err.to_string().contains("wallet"));
    }

    #[test]
    fn test_error_missing_dependency() {
        let err = AxonError::MissingDependency {
            plugin: "swap".into(),
            dependency: "wallet".into(),
        };
        let s = err.to_string();
        assert!(s.contains("swap"));
        assert!(s.contains("wallet"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AxonError = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_deadline() {
        let err = AxonError::DeadlineExceeded(500);
        assert!(err.to_string().contains("500"));
    }

    // ── State tests ────────────────────────────────────────────

    #[test]
    fn test_state_from_outputs_merges_values() {
        let state = State::from_outputs(vec![
            NamedOutput {
                provider: "bio".into(),
                dynamic: false,
                output: ProviderOutput::text("I am an agent").with_value("name", json!("axon")),
            },
            NamedOutput {
                provider: "recent".into(),
                dynamic: true,
                output: ProviderOutput::text("user: hi").with_value("name", json!("override")),
            },
        ]);
        assert_eq!(state.get_value("name"), Some(&json!("override")));
        assert_eq!(state.text(), "I am an agent\n\nuser: hi");
        assert_eq!(state.outputs().len(), 2);
    }

    #[test]
    fn test_state_empty() {
        let state = State::default();
        assert!(state.is_empty());
        assert_eq!(state.text(), "");
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let state = State::from_outputs(vec![NamedOutput {
            provider: "bio".into(),
            dynamic: false,
            output: ProviderOutput::text("hello"),
        }]);
        let json = serde_json::to_string(&state).unwrap();
        let restored: State = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.text(), "hello");
        assert_eq!(restored.outputs().len(), 1);
    }

    // ── Task tests ─────────────────────────────────────────────

    #[test]
    fn test_task_builder() {
        let world = Uuid::new_v4();
        let task = Task::new("PING", "ping the queue", world)
            .with_tags(&["queue", "repeat"])
            .with_interval_ms(300_000);
        assert_eq!(task.name, "PING");
        assert_eq!(task.world_id, world);
        assert!(task.has_tag("queue"));
        assert_eq!(task.metadata.update_interval_ms, Some(300_000));
        assert!(task.is_recurring());
    }

    #[test]
    fn test_task_serde_roundtrip() {
        let task = Task::new("SYNC", "sync balances", Uuid::new_v4()).with_tags(&["queue"]);
        let json = serde_json::to_string(&task).unwrap();
        let restored: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "SYNC");
        assert_eq!(restored.tags, vec!["queue".to_string()]);
    }

    // ── ActionOutput tests ─────────────────────────────────────

    #[test]
    fn test_action_output_serde() {
        let out = ActionOutput::text("done").with_data(json!({"tx": "0xabc"}));
        let json = serde_json::to_string(&out).unwrap();
        let restored: ActionOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.text, "done");
        assert!(!restored.is_error);
        assert_eq!(restored.data, Some(json!({"tx": "0xabc"})));
    }

    #[test]
    fn test_action_definition_serde() {
        let def = ActionDefinition {
            name: "REPLY".into(),
            similes: vec!["RESPOND".into(), "ANSWER".into()],
            description: "Reply to the user".into(),
            examples: vec![],
        };
        let json = serde_json::to_string(&def).unwrap();
        let restored: ActionDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "REPLY");
        assert_eq!(restored.similes.len(), 2);
    }

    // ── Event Bus tests ────────────────────────────────────────

    #[test]
    fn test_event_bus_pub_sub() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(RuntimeEvent::Shutdown);

        let event = rx.try_recv().unwrap();
        assert!(matches!(event, RuntimeEvent::Shutdown));
    }

    #[test]
    fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(RuntimeEvent::Shutdown);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = RuntimeEvent::TaskExecuted {
            task_id: Uuid::new_v4(),
            name: "PING".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let restored: RuntimeEvent = serde_json::from_str(&json).unwrap();
        if let RuntimeEvent::TaskExecuted { name, .. } = restored {
            assert_eq!(name, "PING");
        } else {
            panic!("wrong variant");
        }
    }
}

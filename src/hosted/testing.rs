//! Scripted [`AgentBackend`] for session and loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::types::{
    AgentDefinition, CreateAgentRequest, Run, RunStatus, Thread, ThreadMessage, ToolOutput,
};
use super::{AgentBackend, AgentServiceError};

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    /// Every backend call, in order, e.g. `create_run thread_1`.
    pub calls: Mutex<Vec<String>>,
    /// Runs handed out by successive `get_run` calls; a completed run once empty.
    pub polls: Mutex<VecDeque<Run>>,
    /// Replies handed out per completed run; `"ok"` once empty.
    pub replies: Mutex<VecDeque<String>>,
    pub submitted: Mutex<Vec<ToolOutput>>,
    pub registered: Mutex<Option<CreateAgentRequest>>,
    pub fail_deletes: bool,
    run_counter: Mutex<usize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub fn push_poll(&self, run: Run) {
        self.polls.lock().unwrap().push_back(run);
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn current_run_id(&self) -> String {
        format!("run_{}", *self.run_counter.lock().unwrap())
    }

    fn delete_result(&self) -> Result<(), AgentServiceError> {
        if self.fail_deletes {
            Err(AgentServiceError::Api {
                status: 500,
                message: "delete failed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Run in the given state with no pending action.
pub(crate) fn run(id: &str, status: RunStatus) -> Run {
    Run {
        id: id.to_string(),
        status,
        required_action: None,
        last_error: None,
    }
}

/// Run asking for one `search_flights`-style tool call.
pub(crate) fn run_requiring_tool(id: &str, call_id: &str, name: &str, arguments: &str) -> Run {
    serde_json::from_value(json!({
        "id": id,
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {
                "tool_calls": [{
                    "id": call_id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments}
                }]
            }
        }
    }))
    .expect("valid run fixture")
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<AgentDefinition, AgentServiceError> {
        self.record(format!("create_agent {}", request.name));
        *self.registered.lock().unwrap() = Some(request.clone());
        Ok(AgentDefinition {
            id: "asst_1".to_string(),
            name: Some(request.name.clone()),
            model: Some(request.model.clone()),
        })
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), AgentServiceError> {
        self.record(format!("delete_agent {}", agent_id));
        self.delete_result()
    }

    async fn create_thread(&self) -> Result<Thread, AgentServiceError> {
        self.record("create_thread".to_string());
        Ok(Thread {
            id: "thread_1".to_string(),
        })
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), AgentServiceError> {
        self.record(format!("delete_thread {}", thread_id));
        self.delete_result()
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AgentServiceError> {
        self.record(format!("add_message {} {}", thread_id, content));
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, AgentServiceError> {
        *self.run_counter.lock().unwrap() += 1;
        let id = self.current_run_id();
        self.record(format!("create_run {} {}", thread_id, agent_id));
        Ok(run(&id, RunStatus::Queued))
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> Result<Run, AgentServiceError> {
        self.record(format!("get_run {}", run_id));
        let next = self.polls.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| run(run_id, RunStatus::Completed)))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AgentServiceError> {
        self.record(format!("submit_tool_outputs {}", run_id));
        self.submitted.lock().unwrap().extend_from_slice(outputs);
        Ok(run(run_id, RunStatus::Queued))
    }

    async fn list_messages(
        &self,
        _thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<ThreadMessage>, AgentServiceError> {
        let run_id = run_id.map(String::from).unwrap_or_else(|| self.current_run_id());
        self.record(format!("list_messages {}", run_id));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string());

        let message = serde_json::from_value(json!({
            "id": format!("msg_{}", run_id),
            "role": "assistant",
            "run_id": run_id,
            "content": [{"type": "text", "text": {"value": reply}}]
        }))
        .expect("valid message fixture");
        Ok(vec![message])
    }
}

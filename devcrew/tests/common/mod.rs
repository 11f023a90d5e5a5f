//! Scripted model shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use devcrew::config::{ModelConfig, PipelineConfig};
use devcrew::llm::{ChatModel, LlmError, Message};
use devcrew::roles::Role;

/// Answers each role from its own reply list; the last reply repeats.
/// A role marked failing returns a 503 instead.
pub struct ScriptedModel {
    replies: HashMap<Role, Vec<String>>,
    failing: Option<Role>,
    calls: Mutex<HashMap<Role, usize>>,
    prompts: Mutex<Vec<(Role, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            failing: None,
            calls: Mutex::new(HashMap::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// The calculator run: every role answers sensibly, review approves.
    pub fn calculator() -> Self {
        Self::new()
            .reply(
                Role::Analyst,
                r#"{"title":"Calculator","features":["add","subtract"]}"#,
            )
            .reply(Role::Developer, "def add(a,b): return a+b")
            .reply(Role::Reviewer, r#"{"status":"approved","score":9}"#)
            .reply(Role::Writer, "# Calculator Documentation")
            .reply(Role::Qa, "def test_add():\n    assert add(1, 2) == 3")
            .reply(Role::DevOps, "#!/bin/bash\necho 'Deploy'")
    }

    pub fn reply(mut self, role: Role, text: &str) -> Self {
        self.replies.entry(role).or_default().push(text.to_string());
        self
    }

    pub fn replace(mut self, role: Role, text: &str) -> Self {
        self.replies.insert(role, vec![text.to_string()]);
        self
    }

    pub fn failing(mut self, role: Role) -> Self {
        self.failing = Some(role);
        self
    }

    pub fn calls(&self, role: Role) -> usize {
        self.calls.lock().unwrap().get(&role).copied().unwrap_or(0)
    }

    pub fn prompts_to(&self, role: Role) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

fn role_for(system: &str) -> Role {
    Role::ALL
        .into_iter()
        .find(|r| r.system_prompt() == system)
        .expect("system prompt belongs to a role")
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, system: &str, messages: &[Message]) -> Result<String, LlmError> {
        let role = role_for(system);
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(role).or_insert(0);
            *n += 1;
            *n
        };
        if let Some(first) = messages.first() {
            self.prompts.lock().unwrap().push((role, first.content.clone()));
        }

        if self.failing == Some(role) {
            return Err(LlmError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }

        let list = self
            .replies
            .get(&role)
            .unwrap_or_else(|| panic!("no script for {role}"));
        Ok(list[(n - 1).min(list.len() - 1)].clone())
    }
}

pub fn test_config(max_review_iterations: u32) -> PipelineConfig {
    let mut config = PipelineConfig::new(ModelConfig::new("test_api_key_123"));
    config.max_review_iterations = max_review_iterations;
    config
}

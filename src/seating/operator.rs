//! Диалог с оператором. Движок не знает про UI: он отдаёт `Prompt`
//! и ждёт `Choice` от реализации `Operator`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::OperatorPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Choice {
    TrySecondDay,
    ReorderGroups,
    UseBlockedSeats,
    Cancel,
    Confirm,
    Decline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptKind {
    /// Выбор из четырёх вариантов при конфликте с блокировками
    Conflict,
    /// Да/нет
    Confirmation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    pub kind: PromptKind,
    pub title: String,
    pub message: String,
    pub detail: String,
    pub choices: Vec<Choice>,
    pub default: Choice,
}

impl Prompt {
    pub fn confirmation(title: impl Into<String>, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Confirmation,
            title: title.into(),
            message: message.into(),
            detail: detail.into(),
            choices: vec![Choice::Confirm, Choice::Decline],
            default: Choice::Decline,
        }
    }

    pub fn allows(&self, choice: Choice) -> bool {
        self.choices.contains(&choice)
    }
}

#[async_trait]
pub trait Operator: Send + Sync {
    /// Блокирует прогон до ответа; таймаута нет
    async fn choose(&self, prompt: &Prompt) -> Choice;
}

/// Заранее заданные ответы. Когда ответы кончились, берётся вариант по умолчанию.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<Choice>>,
    asked: Mutex<Vec<Prompt>>,
}

impl ScriptedOperator {
    pub fn new(answers: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Все показанные оператору вопросы
    pub async fn prompts(&self) -> Vec<Prompt> {
        self.asked.lock().await.clone()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn choose(&self, prompt: &Prompt) -> Choice {
        self.asked.lock().await.push(prompt.clone());
        self.answers.lock().await.pop_front().unwrap_or(prompt.default)
    }
}

/// Неинтерактивный оператор сервера: всегда отвечает по политике из конфигурации
#[derive(Debug, Clone, Copy)]
pub struct PolicyOperator {
    policy: OperatorPolicy,
}

impl PolicyOperator {
    pub fn new(policy: OperatorPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Operator for PolicyOperator {
    async fn choose(&self, prompt: &Prompt) -> Choice {
        let choice = match (prompt.kind, self.policy) {
            (PromptKind::Conflict, OperatorPolicy::Cancel) => Choice::Cancel,
            (PromptKind::Conflict, OperatorPolicy::SecondDay) => Choice::TrySecondDay,
            (PromptKind::Conflict, OperatorPolicy::UseBlocked) => Choice::UseBlockedSeats,
            (PromptKind::Conflict, OperatorPolicy::Reorder) => Choice::ReorderGroups,
            (PromptKind::Confirmation, OperatorPolicy::UseBlocked | OperatorPolicy::Reorder) => {
                Choice::Confirm
            }
            (PromptKind::Confirmation, _) => Choice::Decline,
        };
        info!("Operator policy answered {} with {:?}", prompt.title, choice);
        choice
    }
}

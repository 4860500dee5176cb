//! # テスト用モック
//!
//! 各トレイト（[`MailStore`] / [`MailSender`] / [`MailNoticeQueue`] /
//! [`StackDeployer`]）のインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! mailferry-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mailferry_domain::receipt::MailArrivalNotice;

use crate::{
    cloudformation::{StackDeployer, StackOutcome, StackPlan},
    error::InfraError,
    s3::MailStore,
    ses::MailSender,
    sqs::MailNoticeQueue,
};

// ===== MockMailStore =====

/// インメモリの受信メールストア
#[derive(Clone, Default)]
pub struct MockMailStore {
    messages: Arc<Mutex<HashMap<String, String>>>,
}

impl MockMailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// メッセージを登録する
    pub fn insert_message(&self, message_id: impl Into<String>, raw: impl Into<String>) {
        self.messages
            .lock()
            .unwrap()
            .insert(message_id.into(), raw.into());
    }
}

#[async_trait]
impl MailStore for MockMailStore {
    async fn fetch_message(&self, message_id: &str) -> Result<String, InfraError> {
        self.messages
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .ok_or_else(|| InfraError::s3(format!("オブジェクトが存在しません: {message_id}")))
    }
}

// ===== MockMailSender =====

/// 送信された生メッセージの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRawMail {
    pub from_address: String,
    pub to_addresses: Vec<String>,
    pub raw_message:  String,
}

/// 送信を記録するだけのメール送信モック
#[derive(Clone, Default)]
pub struct MockMailSender {
    sent: Arc<Mutex<Vec<SentRawMail>>>,
}

impl MockMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに送信されたメッセージを返す
    pub fn sent(&self) -> Vec<SentRawMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for MockMailSender {
    async fn send_raw(
        &self,
        from_address: &str,
        to_addresses: &[String],
        raw_message: &str,
    ) -> Result<Option<String>, InfraError> {
        self.sent.lock().unwrap().push(SentRawMail {
            from_address: from_address.to_string(),
            to_addresses: to_addresses.to_vec(),
            raw_message:  raw_message.to_string(),
        });
        Ok(Some(format!(
            "mock-message-{}",
            self.sent.lock().unwrap().len()
        )))
    }
}

// ===== MockMailNoticeQueue =====

/// 投入を記録する着信通知キューのモック
///
/// [`failing`](MockMailNoticeQueue::failing) で常に失敗するモックを作成できる
/// （fire-and-forget 動作のテスト用）。
#[derive(Clone, Default)]
pub struct MockMailNoticeQueue {
    published: Arc<Mutex<Vec<MailArrivalNotice>>>,
    fail:      bool,
}

impl MockMailNoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に投入が失敗するモックを作成する
    pub fn failing() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            fail:      true,
        }
    }

    /// これまでに投入された通知を返す
    pub fn published(&self) -> Vec<MailArrivalNotice> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailNoticeQueue for MockMailNoticeQueue {
    async fn publish(&self, notice: &MailArrivalNotice) -> Result<(), InfraError> {
        if self.fail {
            return Err(InfraError::sqs("モックは常に失敗します".to_string()));
        }
        self.published.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

// ===== MockStackDeployer =====

/// デプロイ計画を記録するスタックデプロイのモック
///
/// 返す結果は [`with_outcome`](MockStackDeployer::with_outcome) で指定でき、
/// [`failing`](MockStackDeployer::failing) で常に失敗するモックを作成できる。
#[derive(Clone)]
pub struct MockStackDeployer {
    deployed: Arc<Mutex<Vec<StackPlan>>>,
    outcome:  StackOutcome,
    fail:     bool,
}

impl MockStackDeployer {
    pub fn new() -> Self {
        Self::with_outcome(StackOutcome::Created)
    }

    /// 指定した結果を返すモックを作成する
    pub fn with_outcome(outcome: StackOutcome) -> Self {
        Self {
            deployed: Arc::new(Mutex::new(Vec::new())),
            outcome,
            fail: false,
        }
    }

    /// 常にデプロイが失敗するモックを作成する
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// これまでに受け取ったデプロイ計画を返す
    pub fn deployed(&self) -> Vec<StackPlan> {
        self.deployed.lock().unwrap().clone()
    }
}

impl Default for MockStackDeployer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackDeployer for MockStackDeployer {
    async fn deploy(&self, plan: &StackPlan) -> Result<StackOutcome, InfraError> {
        if self.fail {
            return Err(InfraError::cloud_formation(
                "モックは常に失敗します".to_string(),
            ));
        }
        self.deployed.lock().unwrap().push(plan.clone());
        Ok(self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InfraErrorKind;

    fn plan() -> StackPlan {
        StackPlan {
            stack_name:    "MailReceiveStack".to_string(),
            template_body: "Resources: {}".to_string(),
            parameters:    vec![("DomainName".to_string(), "ferry.example.com".to_string())],
            named_iam:     true,
        }
    }

    // ===== MockStackDeployer のテスト =====

    #[tokio::test]
    async fn test_デプロイ計画が記録され指定の結果が返る() {
        let deployer = MockStackDeployer::with_outcome(StackOutcome::Unchanged);

        let outcome = deployer.deploy(&plan()).await.unwrap();

        assert_eq!(outcome, StackOutcome::Unchanged);
        let deployed = deployer.deployed();
        assert_eq!(deployed.len(), 1);
        assert_eq!(deployed[0].stack_name, "MailReceiveStack");
        assert!(deployed[0].named_iam);
    }

    #[tokio::test]
    async fn test_failingのデプロイはエラーになり記録されない() {
        let deployer = MockStackDeployer::failing();

        let err = deployer.deploy(&plan()).await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::CloudFormation(_)));
        assert!(deployer.deployed().is_empty());
    }
}

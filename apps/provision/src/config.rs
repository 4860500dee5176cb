//! # プロビジョニング CLI 設定
//!
//! 環境変数からスタックデプロイの設定を読み込み、デプロイ対象の
//! [`StackPlan`] を組み立てる。

use std::{env, time::Duration};

use mailferry_infra::StackPlan;

/// デフォルトのスタック名
const DEFAULT_STACK_NAME: &str = "MailReceiveStack";

/// デフォルトのテンプレートパス
const DEFAULT_TEMPLATE_PATH: &str = "cf.template.yaml";

/// デフォルトの完了待機上限（秒）
const DEFAULT_MAX_WAIT_SECS: u64 = 30 * 60;

/// プロビジョニング CLI の設定
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// デプロイ対象のスタック名
    pub stack_name:     String,
    /// テンプレートファイルのパス
    pub template_path:  String,
    /// 受信ドメイン名（テンプレートパラメータ）
    pub domain_name:    String,
    /// ドメインのホストゾーン ID（テンプレートパラメータ）
    pub hosted_zone_id: String,
    /// 着信通知キューの URL（テンプレートパラメータ）
    pub sqs_queue_url:  String,
    /// スタック完了の待機上限
    pub max_wait:       Duration,
}

impl ProvisionConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        let max_wait_secs = env::var("STACK_MAX_WAIT_SECS")
            .map(|v| {
                v.parse()
                    .expect("STACK_MAX_WAIT_SECS は秒数（整数）である必要があります")
            })
            .unwrap_or(DEFAULT_MAX_WAIT_SECS);

        Self {
            stack_name:     env::var("STACK_NAME")
                .unwrap_or_else(|_| DEFAULT_STACK_NAME.to_string()),
            template_path:  env::var("TEMPLATE_PATH")
                .unwrap_or_else(|_| DEFAULT_TEMPLATE_PATH.to_string()),
            domain_name:    env::var("DOMAIN_NAME").expect("DOMAIN_NAME が設定されていません"),
            hosted_zone_id: env::var("HOSTED_ZONE_ID")
                .expect("HOSTED_ZONE_ID が設定されていません"),
            sqs_queue_url:  env::var("SQS_QUEUE_URL")
                .expect("SQS_QUEUE_URL が設定されていません"),
            max_wait:       Duration::from_secs(max_wait_secs),
        }
    }

    /// テンプレート本文と組み合わせてデプロイ対象の [`StackPlan`] を組み立てる
    pub fn stack_plan(&self, template_body: String) -> StackPlan {
        StackPlan {
            stack_name: self.stack_name.clone(),
            template_body,
            parameters: vec![
                ("DomainName".to_string(), self.domain_name.clone()),
                ("HostedZoneId".to_string(), self.hosted_zone_id.clone()),
                ("SqsQueueUrl".to_string(), self.sqs_queue_url.clone()),
            ],
            // テンプレートは受信 Lambda のロールを含むため NAMED_IAM が必須
            named_iam: true,
        }
    }
}

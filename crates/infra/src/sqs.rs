//! # 着信通知キュー（SQS）
//!
//! 監視対象アドレス宛の着信を下流コンシューマへ知らせるため、
//! 共通ヘッダーとメッセージ ID を JSON で SQS キューへ投入する。
//!
//! 投入の失敗は呼び出し側で警告ログに留める（fire-and-forget）。
//! 転送処理を巻き込んで失敗させない。

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use mailferry_domain::receipt::MailArrivalNotice;

use crate::InfraError;

/// 着信通知キューのインターフェース
///
/// テスト時はモックに差し替え可能。
#[async_trait]
pub trait MailNoticeQueue: Send + Sync {
    /// 着信通知をキューへ投入する
    async fn publish(&self, notice: &MailArrivalNotice) -> Result<(), InfraError>;
}

/// SQS 着信通知キュー
///
/// `aws_sdk_sqs::Client` をラップする。
pub struct SqsMailNoticeQueue {
    client:    Client,
    queue_url: String,
}

impl SqsMailNoticeQueue {
    /// 新しい着信通知キューを作成する
    ///
    /// # 引数
    ///
    /// - `client`: SQS クライアント
    /// - `queue_url`: 投入先キューの URL
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl MailNoticeQueue for SqsMailNoticeQueue {
    async fn publish(&self, notice: &MailArrivalNotice) -> Result<(), InfraError> {
        let body = serde_json::to_string(notice)?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| InfraError::sqs(format!("メッセージ投入失敗: {e}")))?;

        Ok(())
    }
}

/// SQS クライアントを作成する
///
/// 認証情報とリージョンは SDK のデフォルトチェーンで解決する。
pub async fn create_client() -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    Client::new(&config)
}

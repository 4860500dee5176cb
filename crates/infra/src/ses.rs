//! # メール送信（SES v2）
//!
//! AWS SES v2 API を使用して書き換え済みの生メッセージを再送信する。
//!
//! 構造化メッセージ（Simple）ではなく Raw 送信を使用する。ヘッダー書き換えは
//! ドメイン層がテキストとして済ませており、送信 API には全文をそのまま渡す。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    primitives::Blob,
    types::{Destination, EmailContent, RawMessage},
};

use crate::InfraError;

/// メール送信のインターフェース
///
/// 生メッセージ全文を指定の宛先へ送信する。
/// テスト時はモックに差し替え可能。
#[async_trait]
pub trait MailSender: Send + Sync {
    /// 生メッセージを送信する
    ///
    /// # 引数
    ///
    /// - `from_address`: エンベロープ送信元（検証済みドメインのアドレスであること）
    /// - `to_addresses`: 転送先アドレス一覧
    /// - `raw_message`: 書き換え済みの生メッセージ全文
    ///
    /// # 戻り値
    ///
    /// 送信 API が発行したメッセージ ID（返されない場合は `None`）
    async fn send_raw(
        &self,
        from_address: &str,
        to_addresses: &[String],
        raw_message: &str,
    ) -> Result<Option<String>, InfraError>;
}

/// SES v2 メール送信
///
/// `aws_sdk_sesv2::Client` をラップする。
pub struct SesMailSender {
    client: Client,
}

impl SesMailSender {
    /// 新しい SES 送信インスタンスを作成する
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MailSender for SesMailSender {
    async fn send_raw(
        &self,
        from_address: &str,
        to_addresses: &[String],
        raw_message: &str,
    ) -> Result<Option<String>, InfraError> {
        let destination = Destination::builder()
            .set_to_addresses(Some(to_addresses.to_vec()))
            .build();

        let raw = RawMessage::builder()
            .data(Blob::new(raw_message.as_bytes()))
            .build()
            .map_err(|e| InfraError::ses(format!("Raw メッセージ構築失敗: {e}")))?;

        let content = EmailContent::builder().raw(raw).build();

        let output = self
            .client
            .send_email()
            .from_email_address(from_address)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| InfraError::ses(format!("SES 送信失敗: {e}")))?;

        Ok(output.message_id().map(str::to_string))
    }
}

/// SES v2 クライアントを作成する
///
/// 認証情報とリージョンは SDK のデフォルトチェーンで解決する。
pub async fn create_client() -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    Client::new(&config)
}

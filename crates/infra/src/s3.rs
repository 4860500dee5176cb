//! # 受信メールストア（S3）
//!
//! 受信ルールが保存した生メッセージを Amazon S3 から取得する。
//!
//! ## 設計方針
//!
//! - **本番環境**: IAM ロールによる認証で Amazon S3 に接続（`S3_ENDPOINT_URL` 未設定）
//! - **ローカル開発**: MinIO / LocalStack を使用（`S3_ENDPOINT_URL` で接続先を指定）
//! - **オブジェクトキー**: `キープレフィックス + メッセージ ID`

use async_trait::async_trait;
use aws_sdk_s3::Client;

use crate::InfraError;

/// 受信メールストアのインターフェース
///
/// メッセージ ID から生メッセージ本文を取得する。
/// テスト時はモックに差し替え可能。
#[async_trait]
pub trait MailStore: Send + Sync {
    /// 生メッセージをテキストとして取得する
    ///
    /// # 引数
    ///
    /// * `message_id` - 受信通知に含まれるメッセージ ID
    async fn fetch_message(&self, message_id: &str) -> Result<String, InfraError>;
}

/// S3 受信メールストア
///
/// `aws-sdk-s3` を使用した [`MailStore`] の実装。
pub struct S3MailStore {
    client:     Client,
    bucket:     String,
    key_prefix: String,
}

impl S3MailStore {
    /// 新しい受信メールストアを作成する
    ///
    /// # 引数
    ///
    /// - `client`: S3 クライアント
    /// - `bucket`: 受信メールが保存されるバケット名
    /// - `key_prefix`: オブジェクトキーの接頭辞（不要なら空文字列）
    pub fn new(client: Client, bucket: String, key_prefix: String) -> Self {
        Self {
            client,
            bucket,
            key_prefix,
        }
    }
}

#[async_trait]
impl MailStore for S3MailStore {
    async fn fetch_message(&self, message_id: &str) -> Result<String, InfraError> {
        let key = format!("{}{}", self.key_prefix, message_id);

        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                InfraError::s3(format!("オブジェクト取得に失敗（key={key}）: {e}"))
            })?;

        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| InfraError::s3(format!("本文ストリームの読み取りに失敗: {e}")))?
            .into_bytes();

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// S3 クライアントを作成する
///
/// `endpoint` が `Some` の場合は MinIO / LocalStack 等のカスタムエンドポイントに
/// 接続する。`None` の場合はデフォルトエンドポイントを使用する。
///
/// 認証情報とリージョンは SDK のデフォルトチェーンで解決する:
/// - ローカル: 環境変数 `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`（`.env` で設定）
/// - 本番: Lambda 実行ロール
pub async fn create_client(endpoint: Option<&str>) -> Client {
    let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(endpoint_url) = endpoint {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let config = config_builder.load().await;

    // MinIO はパススタイルが必要（バーチャルホスト型 URL を使わない）
    // エンドポイント指定時のみ force_path_style を有効化
    let s3_config_builder = aws_sdk_s3::config::Builder::from(&config);
    let s3_config = if endpoint.is_some() {
        s3_config_builder.force_path_style(true).build()
    } else {
        s3_config_builder.build()
    };

    Client::from_conf(s3_config)
}

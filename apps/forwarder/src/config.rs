//! # 転送 Lambda 設定
//!
//! 環境変数から転送 Lambda の設定を読み込む。
//!
//! 必須変数の欠落は起動時の失敗として扱う（受信のたびに同じエラーで
//! 落ちるより、デプロイ直後に気付けるほうがよい）。

use std::env;

use mailferry_domain::{DomainError, mapping::ForwardMapping, rewrite::RewriteConfig};

/// 転送 Lambda の設定
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// 受信メールが保存されるバケット名
    pub email_bucket:     String,
    /// オブジェクトキーの接頭辞（未設定なら空文字列）
    pub email_key_prefix: String,
    /// S3 エンドポイント URL（MinIO / LocalStack 使用時に設定、未設定でデフォルト）
    pub s3_endpoint_url:  Option<String>,
    /// 転送マッピングテーブル
    pub mapping:          ForwardMapping,
    /// ヘッダー書き換えの設定
    pub rewrite:          RewriteConfig,
    /// 着信監視の設定（未設定なら通知しない）
    pub watch:            Option<WatchConfig>,
}

/// 着信監視の設定
///
/// `WATCH_RECIPIENT` 宛のメールが届いたとき、`SQS_QUEUE_URL` のキューに
/// 着信通知を投入する。
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// 監視対象のアドレス
    pub recipient: String,
    /// 通知先キューの URL
    pub queue_url: String,
}

impl ForwarderConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, DomainError> {
        let allow_plus_sign = env::var("ALLOW_PLUS_SIGN")
            .map(|v| {
                v.parse()
                    .expect("ALLOW_PLUS_SIGN は true または false である必要があります")
            })
            .unwrap_or(true);

        let mapping_json =
            env::var("FORWARD_MAPPING").expect("FORWARD_MAPPING が設定されていません");
        let mapping = ForwardMapping::from_json(&mapping_json, allow_plus_sign)?;

        let watch = env::var("WATCH_RECIPIENT").ok().map(|recipient| WatchConfig {
            recipient,
            queue_url: env::var("SQS_QUEUE_URL")
                .expect("WATCH_RECIPIENT 使用時は SQS_QUEUE_URL が必須です"),
        });

        Ok(Self {
            email_bucket: env::var("EMAIL_BUCKET").expect("EMAIL_BUCKET が設定されていません"),
            email_key_prefix: env::var("EMAIL_KEY_PREFIX").unwrap_or_default(),
            s3_endpoint_url: env::var("S3_ENDPOINT_URL").ok(),
            mapping,
            rewrite: RewriteConfig {
                from_address:   env::var("FROM_ADDRESS").ok(),
                to_address:     env::var("TO_ADDRESS").ok(),
                subject_prefix: env::var("SUBJECT_PREFIX").ok(),
            },
            watch,
        })
    }
}

//! # 転送 Lambda エントリポイント
//!
//! 受信通知イベントを受け取り、転送パイプライン
//! （[`handler::Forwarder`]）に委譲する。
//!
//! ## 設計方針
//!
//! - AWS クライアントと設定の読み込みは起動時に 1 回だけ行い、
//!   以降の呼び出しで使い回す
//! - 設定不備は起動時に失敗させる（呼び出しのたびに落とさない）

use std::sync::Arc;

use lambda_runtime::{LambdaEvent, service_fn};
use mailferry_domain::receipt::SesEvent;
use mailferry_forwarder::{config::ForwarderConfig, handler::Forwarder};
use mailferry_infra::{S3MailStore, SesMailSender, SqsMailNoticeQueue};
use mailferry_shared::observability::{LogFormat, init_tracing};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let config = ForwarderConfig::from_env()?;

    let s3_client = mailferry_infra::s3::create_client(config.s3_endpoint_url.as_deref()).await;
    let store = S3MailStore::new(
        s3_client,
        config.email_bucket.clone(),
        config.email_key_prefix.clone(),
    );

    let ses_client = mailferry_infra::ses::create_client().await;
    let sender = SesMailSender::new(ses_client);

    let (watch_recipient, queue) = match &config.watch {
        Some(watch) => {
            let sqs_client = mailferry_infra::sqs::create_client().await;
            (
                Some(watch.recipient.clone()),
                Some(SqsMailNoticeQueue::new(sqs_client, watch.queue_url.clone())),
            )
        }
        None => (None, None),
    };

    let forwarder = Arc::new(Forwarder::new(
        config.mapping,
        config.rewrite,
        watch_recipient,
        store,
        sender,
        queue,
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<SesEvent>| {
        let forwarder = Arc::clone(&forwarder);
        async move {
            forwarder
                .handle(event.payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
}

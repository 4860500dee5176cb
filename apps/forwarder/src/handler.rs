//! # 転送パイプライン
//!
//! 受信イベント 1 件を以下の順で処理する:
//!
//! 1. イベント形式の検証（レコード数・発生元・バージョン）
//! 2. 検証ゲート: SPF / DKIM / スパム / ウイルスのいずれかが `FAIL` なら
//!    `STOP_RULE_SET` を返して破棄する
//! 3. 着信監視: 監視対象アドレス宛ならキューへ着信通知を投入する
//!    （fire-and-forget。失敗しても転送は続行）
//! 4. 転送先解決: マッピングテーブルで受信者を付け替える
//! 5. 生メッセージ取得: ストアからメッセージ ID で取得する
//! 6. ヘッダー書き換え: Reply-To 追加・From 差し替え・不要ヘッダー除去
//! 7. 再送信: マッチした元の受信者を送信元として Raw 送信する
//!
//! ステップ 4 以降の失敗は呼び出し失敗として表面化する。

use itertools::Itertools as _;
use mailferry_domain::{
    mapping::ForwardMapping,
    receipt::{InboundMail, MailArrivalNotice, Receipt, ReceiptResponse, SesEvent},
    rewrite::{RewriteConfig, rewrite_for_forwarding},
};
use mailferry_infra::{MailNoticeQueue, MailSender, MailStore};

use crate::error::ForwarderError;

/// 転送パイプライン
///
/// インフラのトレイトに対してジェネリック。本番では S3 / SES / SQS の
/// 実装を、テストではインメモリモックを差し込む。
pub struct Forwarder<S, M, Q> {
    mapping:         ForwardMapping,
    rewrite:         RewriteConfig,
    watch_recipient: Option<String>,
    store:           S,
    sender:          M,
    queue:           Option<Q>,
}

impl<S, M, Q> Forwarder<S, M, Q>
where
    S: MailStore,
    M: MailSender,
    Q: MailNoticeQueue,
{
    /// 新しい転送パイプラインを組み立てる
    pub fn new(
        mapping: ForwardMapping,
        rewrite: RewriteConfig,
        watch_recipient: Option<String>,
        store: S,
        sender: M,
        queue: Option<Q>,
    ) -> Self {
        Self {
            mapping,
            rewrite,
            watch_recipient,
            store,
            sender,
            queue,
        }
    }

    /// 受信イベント 1 件を処理する
    pub async fn handle(&self, event: SesEvent) -> Result<ReceiptResponse, ForwarderError> {
        let record = event.into_record()?;
        let mail = record.ses.mail;
        let receipt = record.ses.receipt;

        // 検証ゲート: FAIL が 1 つでもあれば転送せずルールセットを停止
        let failures = receipt.verdict_failures();
        if !failures.is_empty() {
            tracing::info!(
                message_id = %mail.message_id,
                failed = failures.join(", "),
                "検証に失敗したメッセージを破棄します"
            );
            return Ok(ReceiptResponse::stop_rule_set());
        }

        self.notify_watcher(&mail, &receipt).await;

        let remapped = self.mapping.remap(&receipt.recipients)?;
        tracing::info!(
            original = receipt.recipients.iter().join(", "),
            forward_to = remapped.forward_to.iter().join(", "),
            "転送先を解決しました"
        );

        let raw = self.store.fetch_message(&mail.message_id).await?;

        let rewritten = rewrite_for_forwarding(&raw, &self.rewrite, &remapped.matched_original);
        match &rewritten.added_reply_to {
            Some(reply_to) => tracing::info!(%reply_to, "Reply-To を追加しました"),
            None => {
                tracing::debug!("Reply-To は追加しませんでした（既存または From 抽出不可）");
            }
        }

        let sent_id = self
            .sender
            .send_raw(
                &remapped.matched_original,
                &remapped.forward_to,
                &rewritten.text,
            )
            .await?;
        tracing::info!(
            message_id = %mail.message_id,
            sent_id = sent_id.as_deref().unwrap_or("-"),
            "転送を完了しました"
        );

        Ok(ReceiptResponse::continue_rule_set())
    }

    /// 監視対象アドレス宛なら着信通知をキューへ投入する
    ///
    /// 投入の失敗は警告ログに留め、転送処理には影響させない。
    async fn notify_watcher(&self, mail: &InboundMail, receipt: &Receipt) {
        let (Some(watch_recipient), Some(queue)) = (&self.watch_recipient, &self.queue) else {
            return;
        };
        let watched = receipt
            .recipients
            .iter()
            .any(|r| r.eq_ignore_ascii_case(watch_recipient));
        if !watched {
            return;
        }

        let notice = MailArrivalNotice {
            email:      mail.common_headers.clone(),
            message_id: mail.message_id.clone(),
        };
        match queue.publish(&notice).await {
            Ok(()) => {
                tracing::info!(recipient = %watch_recipient, "着信通知を投入しました");
            }
            Err(err) => {
                tracing::warn!(error = %err, "着信通知の投入に失敗しました（転送は継続します）");
            }
        }
    }
}

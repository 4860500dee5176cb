//! # SES 受信通知モデル
//!
//! SES の受信ルールが Lambda に渡すイベント（受信通知）の serde モデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 内容 |
//! |---|------------|------|
//! | [`SesEvent`] | 受信イベント | `Records` 配列のルート |
//! | [`SesEventRecord`] | 受信レコード | `eventSource` / `eventVersion` と本体 |
//! | [`InboundMail`] | 受信メール | メッセージ ID・送信元・共通ヘッダー |
//! | [`Receipt`] | 受信レシート | 受信者一覧と各種検証結果 |
//! | [`Verdict`] / [`VerdictStatus`] | 検証結果 | SPF / DKIM / スパム / ウイルスの判定 |
//! | [`ReceiptResponse`] | 受信ルール応答 | `STOP_RULE_SET` / `CONTINUE` |
//! | [`MailArrivalNotice`] | 着信通知 | キューへ送る JSON ペイロード |
//!
//! ## 設計方針
//!
//! - **欠けたフィールドに寛容**: 検証結果は `Option` で受け、欠落は「判定なし」扱い
//! - **ブロック条件は FAIL のみ**: `GRAY` や判定なしは転送を妨げない

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

/// SES 受信イベント（`Records` 配列のルート）
#[derive(Debug, Clone, Deserialize)]
pub struct SesEvent {
    /// 受信レコード一覧（正常な受信通知では常に 1 件）
    #[serde(rename = "Records", default)]
    pub records: Vec<SesEventRecord>,
}

impl SesEvent {
    /// イベントの形式を検証し、唯一の受信レコードを取り出す
    ///
    /// # 検証内容
    ///
    /// - レコード数がちょうど 1 件であること
    /// - `eventSource` が `aws:ses` であること
    /// - `eventVersion` が `1.0` であること
    ///
    /// # エラー
    ///
    /// いずれかの条件を満たさない場合は [`DomainError::InvalidEvent`] を返す。
    pub fn into_record(mut self) -> Result<SesEventRecord, DomainError> {
        if self.records.len() != 1 {
            return Err(DomainError::InvalidEvent(format!(
                "レコード数が 1 ではありません: {}",
                self.records.len()
            )));
        }
        let record = self.records.remove(0);
        if record.event_source != "aws:ses" {
            return Err(DomainError::InvalidEvent(format!(
                "eventSource が aws:ses ではありません: {}",
                record.event_source
            )));
        }
        if record.event_version != "1.0" {
            return Err(DomainError::InvalidEvent(format!(
                "未対応の eventVersion です: {}",
                record.event_version
            )));
        }
        Ok(record)
    }
}

/// 受信レコード
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SesEventRecord {
    /// イベント発生元（`aws:ses` であること）
    pub event_source:  String,
    /// イベント形式のバージョン（`1.0` であること）
    pub event_version: String,
    /// 受信通知の本体
    pub ses:           SesReceiptNotification,
}

/// 受信通知の本体（メール情報とレシート）
#[derive(Debug, Clone, Deserialize)]
pub struct SesReceiptNotification {
    /// 受信メールのメタデータ
    pub mail:    InboundMail,
    /// 受信レシート（受信者と検証結果）
    pub receipt: Receipt,
}

/// 受信メールのメタデータ
///
/// 生メッセージ本体は含まれない。本体はオブジェクトストレージに
/// `キープレフィックス + message_id` で保存されている。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMail {
    /// メッセージ ID（オブジェクトキーの末尾に一致する）
    pub message_id:     String,
    /// エンベロープ送信元
    pub source:         String,
    /// 受信時刻
    pub timestamp:      DateTime<Utc>,
    /// エンベロープ宛先
    #[serde(default)]
    pub destination:    Vec<String>,
    /// パース済みの共通ヘッダー
    pub common_headers: CommonHeaders,
}

/// パース済みの共通ヘッダー
///
/// 受信通知に含まれるヘッダーの抜粋。着信通知（[`MailArrivalNotice`]）の
/// ペイロードとしてそのままキューへ流す。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonHeaders {
    /// From ヘッダーのアドレス一覧
    #[serde(default)]
    pub from:        Vec<String>,
    /// To ヘッダーのアドレス一覧
    #[serde(default)]
    pub to:          Vec<String>,
    /// Date ヘッダー
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date:        Option<String>,
    /// Subject ヘッダー
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject:     Option<String>,
    /// Message-ID ヘッダー
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id:  Option<String>,
    /// Return-Path ヘッダー
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_path: Option<String>,
}

/// 受信レシート
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// 受信ルールにマッチした受信者一覧
    #[serde(default)]
    pub recipients:    Vec<String>,
    /// SPF 検証結果
    #[serde(default)]
    pub spf_verdict:   Option<Verdict>,
    /// DKIM 検証結果
    #[serde(default)]
    pub dkim_verdict:  Option<Verdict>,
    /// スパム判定結果
    #[serde(default)]
    pub spam_verdict:  Option<Verdict>,
    /// ウイルススキャン結果
    #[serde(default)]
    pub virus_verdict: Option<Verdict>,
    /// DMARC 検証結果（参考情報。ゲートには使用しない）
    #[serde(default)]
    pub dmarc_verdict: Option<Verdict>,
}

impl Receipt {
    /// `FAIL` となった検証のラベル一覧を返す
    ///
    /// ゲート対象は SPF / DKIM / スパム / ウイルスの 4 種。
    /// 欠落した検証や `GRAY` はブロック理由にならない。
    pub fn verdict_failures(&self) -> Vec<&'static str> {
        let checks = [
            ("SPF", &self.spf_verdict),
            ("DKIM", &self.dkim_verdict),
            ("spam", &self.spam_verdict),
            ("virus", &self.virus_verdict),
        ];
        checks
            .into_iter()
            .filter(|(_, verdict)| {
                verdict
                    .as_ref()
                    .is_some_and(|v| v.status == VerdictStatus::Fail)
            })
            .map(|(label, _)| label)
            .collect()
    }

    /// すべてのゲート対象検証を通過したか
    pub fn is_clean(&self) -> bool {
        self.verdict_failures().is_empty()
    }
}

/// 個別の検証結果
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    /// 判定ステータス
    pub status: VerdictStatus,
}

/// 検証結果のステータス
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    /// 検証を通過
    Pass,
    /// 検証に失敗（転送をブロックする）
    Fail,
    /// 判定不能
    Gray,
    /// 検証処理自体が失敗
    ProcessingFailed,
    /// 検証が無効化されている
    Disabled,
}

/// 受信ルールへの応答
///
/// 同期呼び出しされた Lambda の戻り値。`STOP_RULE_SET` を返すと
/// SES は後続の受信ルール処理を打ち切る（スパム破棄時に使用）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceiptResponse {
    /// 受信ルールセットへの指示
    pub disposition: Disposition,
}

impl ReceiptResponse {
    /// 後続の受信ルール処理を打ち切る応答
    pub fn stop_rule_set() -> Self {
        Self {
            disposition: Disposition::StopRuleSet,
        }
    }

    /// 受信ルール処理を継続する応答
    pub fn continue_rule_set() -> Self {
        Self {
            disposition: Disposition::Continue,
        }
    }
}

/// 受信ルールセットへの指示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// 受信ルールセットの処理を停止する
    StopRuleSet,
    /// 処理を継続する
    Continue,
}

/// 着信通知ペイロード
///
/// 監視対象アドレス宛のメールが届いたときにキューへ送る JSON。
/// 消費側は共通ヘッダーとメッセージ ID だけで処理を開始できる。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailArrivalNotice {
    /// 受信メールの共通ヘッダー
    pub email:      CommonHeaders,
    /// メッセージ ID
    pub message_id: String,
}

//! # ドメイン層エラー定義
//!
//! 転送処理のビジネスルール違反を表現するエラー型。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成
//! - **Lambda 応答へのマッピング**: アプリ層でこのエラーを受け取り、
//!   呼び出し失敗（再試行対象）として表面化する

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// 転送パイプラインの実行中に発生する例外状態を表現する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 設定値や入力値が期待する形式に違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 転送マッピング JSON のパース失敗
    /// - 空の転送マッピングテーブル
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// SES 受信イベントの形式が不正
    ///
    /// レコード数が 1 でない、`eventSource` が `aws:ses` でない、
    /// `eventVersion` が未対応など、SES 受信通知として解釈できない場合。
    #[error("SES イベントの形式が不正です: {0}")]
    InvalidEvent(String),

    /// 転送先が 1 件も解決できなかった
    ///
    /// 元の受信者のいずれもマッピングテーブルにマッチしなかった場合。
    /// 黙って成功扱いにせず、呼び出し失敗として表面化する。
    #[error("転送先が見つかりません（元の宛先: {}）", original.join(", "))]
    NoMatchingRecipients {
        /// マッチしなかった元の受信者一覧
        original: Vec<String>,
    },
}

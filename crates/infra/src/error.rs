//! # インフラ層エラー定義
//!
//! マネージドサービス（S3 / SES / SQS / CloudFormation）との通信で発生する
//! エラーを表現する。
//!
//! ## 設計方針
//!
//! - **エラーの変換**: AWS SDK のエラーをサービスごとのバリアントにラップ
//! - **ドメインエラーとの分離**: インフラ固有のエラーを明示
//! - **SpanTrace 自動捕捉**: `From` 実装や convenience constructor で
//!   エラー生成時の呼び出し経路を自動記録する
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別（S3, Ses, StackFailed 等）

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別（[`InfraErrorKind`]）と [`SpanTrace`]（呼び出し経路）を保持する。
/// convenience constructor でエラーを生成すると、その時点のスパン情報が
/// 自動的にキャプチャされる。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
///
/// AWS SDK のエラー型はジェネリクスが深く `#[from]` が困難なため、
/// 各サービスのバリアントは手動で String にマップする。
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// S3 エラー
    ///
    /// 受信メール本体の取得で発生するエラー。
    #[error("S3 エラー: {0}")]
    S3(String),

    /// SES エラー
    ///
    /// 書き換え済みメッセージの送信で発生するエラー。
    #[error("SES エラー: {0}")]
    Ses(String),

    /// SQS エラー
    ///
    /// 着信通知のキュー投入で発生するエラー。
    #[error("SQS エラー: {0}")]
    Sqs(String),

    /// CloudFormation API エラー
    ///
    /// スタックの describe / create / update 呼び出しで発生するエラー。
    #[error("CloudFormation エラー: {0}")]
    CloudFormation(String),

    /// スタックが失敗状態に到達した
    ///
    /// ロールバックや作成失敗など、待機を続けても回復しない終端状態。
    #[error("スタック {stack} が失敗状態になりました: {status}")]
    StackFailed {
        /// スタック名
        stack:  String,
        /// 到達した終端状態（例: `ROLLBACK_COMPLETE`）
        status: String,
    },

    /// スタック完了待機のタイムアウト
    #[error("スタック {stack} の完了待機がタイムアウトしました（{waited_secs} 秒）")]
    StackTimeout {
        /// スタック名
        stack:       String,
        /// 待機した秒数
        waited_secs: u64,
    },

    /// シリアライズ/デシリアライズエラー
    ///
    /// 着信通知ペイロードの JSON 変換に失敗した場合に使用する。
    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    /// 予期しないエラー
    ///
    /// 上記に分類できない予期しないエラー。
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

// ===== InfraError のメソッド =====

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    // ===== Convenience constructors =====

    /// S3 エラーを生成する
    pub fn s3(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::S3(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// SES エラーを生成する
    pub fn ses(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Ses(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// SQS エラーを生成する
    pub fn sqs(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Sqs(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// CloudFormation API エラーを生成する
    pub fn cloud_formation(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::CloudFormation(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// スタック失敗状態エラーを生成する
    pub fn stack_failed(stack: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::StackFailed {
                stack:  stack.into(),
                status: status.into(),
            },
            span_trace: SpanTrace::capture(),
        }
    }

    /// スタック待機タイムアウトエラーを生成する
    pub fn stack_timeout(stack: impl Into<String>, waited_secs: u64) -> Self {
        Self {
            kind:       InfraErrorKind::StackTimeout {
                stack: stack.into(),
                waited_secs,
            },
            span_trace: SpanTrace::capture(),
        }
    }

    /// 予期しないエラーを生成する
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Unexpected(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Serialization(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    // ===== Convenience constructor のテスト =====

    #[test]
    fn test_s3でspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_fetch", message_id = "abc");
            let _enter = span.enter();

            let err = InfraError::s3("取得失敗");

            assert!(matches!(err.kind(), InfraErrorKind::S3(msg) if msg == "取得失敗"));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_fetch"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_sesがエラー種別を保持する() {
        with_error_layer(|| {
            let err = InfraError::ses("送信失敗");
            assert!(matches!(err.kind(), InfraErrorKind::Ses(msg) if msg == "送信失敗"));
        });
    }

    #[test]
    fn test_stack_failedがスタック名と状態を保持する() {
        with_error_layer(|| {
            let err = InfraError::stack_failed("MailReceiveStack", "ROLLBACK_COMPLETE");
            assert!(matches!(
                err.kind(),
                InfraErrorKind::StackFailed { stack, status }
                    if stack == "MailReceiveStack" && status == "ROLLBACK_COMPLETE"
            ));
        });
    }

    // ===== From 実装のテスト =====

    #[test]
    fn test_from_serde_json_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_serialization");
            let _enter = span.enter();

            let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
            let err: InfraError = json_err.into();

            assert!(matches!(err.kind(), InfraErrorKind::Serialization(_)));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_serialization"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    // ===== Display / source のテスト =====

    #[test]
    fn test_displayがinfra_error_kindのメッセージを出力する() {
        let err = InfraError::stack_timeout("MailReceiveStack", 1800);
        assert_eq!(
            format!("{err}"),
            "スタック MailReceiveStack の完了待機がタイムアウトしました（1800 秒）"
        );
    }

    #[test]
    fn test_sourceがinfra_error_kindに委譲する() {
        use std::error::Error;

        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: InfraError = json_err.into();

        // Serialization バリアントは serde_json::Error を source として持つ
        assert!(err.source().is_some());
    }
}

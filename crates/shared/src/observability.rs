//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。
//! forwarder / provision の 2 バイナリで共通のログ初期化ロジックを集約し、
//! 環境変数 `LOG_FORMAT` による JSON / Pretty 出力の切り替えに対応する。
//!
//! CloudWatch Logs に流す本番の Lambda では JSON、ローカル実行では Pretty を
//! 使用する想定。

/// `RUST_LOG` 未設定時のデフォルトフィルタ
///
/// `EnvFilter` のディレクティブはクレート名単位でマッチするため、
/// ワークスペースの各クレートを個別に並べる（`mailferry` という
/// 接頭辞だけではどのターゲットにもマッチしない）。
pub const DEFAULT_LOG_FILTER: &str =
    "info,mailferry_forwarder=debug,mailferry_provision=debug,mailferry_infra=debug,mailferry_domain=debug";

/// ログ出力形式
///
/// 環境変数 `LOG_FORMAT` で切り替える。
/// 値が未設定または不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境・CloudWatch Logs 向け）
    Json,
    /// 人間が読みやすい形式（ローカル実行向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 不正な値の場合は [`Pretty`](LogFormat::Pretty) にフォールバックし、
    /// stderr に警告を出力する。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    /// 環境変数 `LOG_FORMAT` から読み取る
    ///
    /// 未設定の場合は [`Pretty`](LogFormat::Pretty) をデフォルトとする。
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(val) => Self::parse(&val),
            Err(_) => Self::default(),
        }
    }
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御可能。
/// 未設定の場合は [`DEFAULT_LOG_FILTER`] をデフォルトとする。
///
/// [`ErrorLayer`](tracing_error::ErrorLayer) を常に登録するため、
/// `InfraError` が生成時にキャプチャする `SpanTrace` が有効になる。
///
/// JSON モードでは `timestamp` / `level` / `target` / `message` が
/// トップレベルに出力される（CloudWatch Logs Insights でのクエリ用）。
#[cfg(feature = "observability")]
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();
}

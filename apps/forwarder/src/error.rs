//! # 転送 Lambda エラー定義
//!
//! パイプラインの失敗は Lambda の呼び出し失敗として表面化する。
//! 受信ルール側は呼び出し失敗を検知でき、メッセージ自体はバケットに
//! 残っているため再処理が可能。

use mailferry_domain::DomainError;
use mailferry_infra::InfraError;
use thiserror::Error;

/// 転送 Lambda で発生するエラー
#[derive(Debug, Error)]
pub enum ForwarderError {
    /// ドメイン層のエラー（イベント形式不正、転送先なし 等）
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// インフラ層のエラー（S3 取得失敗、SES 送信失敗 等）
    #[error(transparent)]
    Infra(#[from] InfraError),
}

//! # MailFerry ドメイン層
//!
//! メール転送のビジネスロジックの中核を定義する。
//!
//! ## 設計方針
//!
//! このクレートは AWS SDK にも Lambda ランタイムにも依存しない純粋なロジックのみを持つ:
//!
//! - **受信イベントモデル**: SES 受信通知（検証結果・共通ヘッダー・受信者）の serde モデル
//! - **転送先解決**: 優先順位付きルックアップテーブルによる受信者の付け替え
//! - **ヘッダー書き換え**: 生メッセージのヘッダーブロックに対するテキスト変換
//!
//! ## 依存関係の方向
//!
//! ```text
//! apps → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層（S3、SES、SQS、CloudFormation）に一切依存しない。
//! これにより転送ルールとヘッダー変換はネットワークなしでテストできる。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`receipt`] - SES 受信通知のモデルと検証
//! - [`mapping`] - 転送先解決（優先順位付きルックアップ）
//! - [`rewrite`] - 生ヘッダーの書き換え

pub mod error;
pub mod mapping;
pub mod receipt;
pub mod rewrite;

pub use error::DomainError;

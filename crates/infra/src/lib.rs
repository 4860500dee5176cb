//! # MailFerry インフラ層
//!
//! マネージドサービスとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! 外部サービスごとにトレイトを切り、その具体実装でサービスの詳細を
//! カプセル化する。ドメイン層（転送ルール・ヘッダー書き換え）は
//! インフラの変更から保護される。
//!
//! ## 責務
//!
//! - **受信メール取得**: S3 からの生メッセージ取得（[`s3`]）
//! - **メール再送信**: SES v2 Raw 送信（[`ses`]）
//! - **着信通知**: SQS へのペイロード投入（[`sqs`]）
//! - **スタック管理**: CloudFormation の作成・更新・完了待機（[`cloudformation`]）
//!
//! ## 依存関係
//!
//! ```text
//! apps → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層に依存しない（依存性逆転の原則）。

pub mod cloudformation;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod s3;
pub mod ses;
pub mod sqs;

pub use cloudformation::{CfnStackDeployer, StackDeployer, StackOutcome, StackPlan};
pub use error::InfraError;
pub use s3::{MailStore, S3MailStore};
pub use ses::{MailSender, SesMailSender};
pub use sqs::{MailNoticeQueue, SqsMailNoticeQueue};

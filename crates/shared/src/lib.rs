//! # MailFerry 共有ユーティリティ
//!
//! 転送 Lambda（forwarder）とスタック管理 CLI（provision）の両方から
//! 使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - 外部クレートへの依存は最小限に抑える（重い依存は feature で切る）

pub mod observability;

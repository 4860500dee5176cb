//! # プロビジョニング CLI エントリポイント
//!
//! 受信ルールセット・保存バケット・通知キューを束ねるスタックを
//! テンプレートからデプロイする。既存スタックがあれば更新し、
//! 変更がなければそのまま成功として終了する。

use anyhow::Context as _;
use mailferry_infra::{CfnStackDeployer, StackDeployer as _, StackOutcome};
use mailferry_shared::observability::{LogFormat, init_tracing};

mod config;

use config::ProvisionConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let config = ProvisionConfig::from_env();

    let template_body = tokio::fs::read_to_string(&config.template_path)
        .await
        .with_context(|| {
            format!(
                "テンプレートファイルの読み込みに失敗: {}",
                config.template_path
            )
        })?;
    let plan = config.stack_plan(template_body);

    let client = mailferry_infra::cloudformation::create_client().await;
    let deployer = CfnStackDeployer::with_wait(
        client,
        std::time::Duration::from_secs(15),
        config.max_wait,
    );

    tracing::info!(stack = %plan.stack_name, "スタックをデプロイします");
    let outcome = deployer.deploy(&plan).await?;
    match outcome {
        StackOutcome::Created => {
            tracing::info!(stack = %plan.stack_name, "スタックを新規作成しました");
        }
        StackOutcome::Updated => {
            tracing::info!(stack = %plan.stack_name, "スタックを更新しました");
        }
        StackOutcome::Unchanged => {
            tracing::info!(stack = %plan.stack_name, "スタックに変更はありません");
        }
    }

    Ok(())
}
